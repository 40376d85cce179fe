use crate::state::AppState;
use axum::Router;

mod dto;
pub mod error;
pub mod flash;
pub mod guard;
pub mod handlers;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod services;
pub mod session;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(handlers::public_routes())
        .merge(guard::protect(handlers::protected_routes(), state))
}
