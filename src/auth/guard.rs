use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
    Router,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;

use crate::{
    auth::{
        error::AuthError,
        flash::Notice,
        session::SessionState,
    },
    state::AppState,
};

/// The authenticated user's ID, available to handlers behind [`protect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub i64);

/// Wrap `routes` so that none of them runs without a live session.
pub fn protect(routes: Router<AppState>, state: AppState) -> Router<AppState> {
    routes.route_layer(middleware::from_fn_with_state(state, require_session))
}

pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    match state.sessions.current(&jar) {
        SessionState::Authenticated(user_id) => {
            req.extensions_mut().insert(CurrentUser(user_id));
            next.run(req).await
        }
        SessionState::Anonymous => {
            debug!(path = %req.uri().path(), "anonymous request to protected route");
            let jar = state.sessions.flash(state.sessions.clear(jar), Notice::LoginRequired);
            (jar, Redirect::to("/login")).into_response()
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .copied()
            .ok_or(AuthError::Unauthenticated)
    }
}
