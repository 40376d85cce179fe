use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{error, instrument, warn};

use crate::{
    auth::{
        dto::{LoginForm, RegisterForm},
        error::AuthError,
        flash::{self, Notice},
        guard::CurrentUser,
        services,
        session::SessionState,
    },
    pages::{self, DashboardPage, HomePage, LoginPage, RegisterPage},
    state::AppState,
};

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/register", get(register_page).post(register))
        .route("/login", get(login_page).post(login))
}

/// Routes that must sit behind the session guard.
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/logout", get(logout).post(logout))
}

pub async fn home(session: SessionState, jar: CookieJar) -> Response {
    let (jar, notice) = flash::take(jar);
    let page = HomePage {
        notice,
        signed_in: matches!(session, SessionState::Authenticated(_)),
    };
    (jar, pages::render(StatusCode::OK, &page)).into_response()
}

pub async fn register_page(jar: CookieJar) -> Response {
    let (jar, notice) = flash::take(jar);
    let page = RegisterPage {
        notice,
        error: None,
        username: "",
        email: "",
    };
    (jar, pages::render(StatusCode::OK, &page)).into_response()
}

#[instrument(skip(state, jar, form))]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<RegisterForm>,
) -> Response {
    match services::register(state.store.as_ref(), &form).await {
        Ok(_) => {
            let jar = state.sessions.flash(jar, Notice::Registered);
            (jar, Redirect::to("/login")).into_response()
        }
        Err(e @ AuthError::Internal(_)) => e.into_response(),
        Err(e) => {
            let page = RegisterPage {
                notice: None,
                error: Some(e.user_message()),
                username: form.username.trim(),
                email: form.email.trim(),
            };
            pages::render(e.status(), &page)
        }
    }
}

pub async fn login_page(jar: CookieJar) -> Response {
    let (jar, notice) = flash::take(jar);
    let page = LoginPage {
        notice,
        error: None,
        username: "",
    };
    (jar, pages::render(StatusCode::OK, &page)).into_response()
}

#[instrument(skip(state, jar, form))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let user = match services::authenticate(state.store.as_ref(), &form).await {
        Ok(user) => user,
        Err(e @ AuthError::Internal(_)) => return e.into_response(),
        Err(e) => {
            let page = LoginPage {
                notice: None,
                error: Some(e.user_message()),
                username: form.username.trim(),
            };
            return pages::render(e.status(), &page);
        }
    };

    let jar = match state.sessions.login(jar, user.id) {
        Ok(jar) => jar,
        Err(e) => {
            error!(error = %e, user_id = user.id, "session sign failed");
            return AuthError::Internal(e).into_response();
        }
    };
    let jar = state.sessions.flash(jar, Notice::LoggedIn);
    (jar, Redirect::to("/dashboard")).into_response()
}

#[instrument(skip(state, jar))]
pub async fn dashboard(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    jar: CookieJar,
) -> Result<Response, AuthError> {
    let Some(user) = state.store.find_by_id(user_id).await? else {
        warn!(user_id, "session points at a missing user");
        let jar = state.sessions.flash(state.sessions.logout(jar), Notice::AccountMissing);
        return Ok((jar, Redirect::to("/login")).into_response());
    };

    let (jar, notice) = flash::take(jar);
    let page = DashboardPage {
        notice,
        user_id: user.id,
        username: &user.username,
        email: &user.email,
        member_since: pages::member_since(user.created_at),
    };
    Ok((jar, pages::render(StatusCode::OK, &page)).into_response())
}

#[instrument(skip(state, jar))]
pub async fn logout(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    jar: CookieJar,
) -> impl IntoResponse {
    let jar = state.sessions.logout(jar);
    tracing::info!(user_id, "user logged out");
    (state.sessions.flash(jar, Notice::LoggedOut), Redirect::to("/"))
}
