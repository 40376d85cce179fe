//! HTML pages. Templates live in `templates/` and are auto-escaped by askama.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use time::OffsetDateTime;
use tracing::error;

use crate::auth::flash::Notice;

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomePage {
    pub notice: Option<Notice>,
    pub signed_in: bool,
}

#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterPage<'a> {
    pub notice: Option<Notice>,
    pub error: Option<String>,
    pub username: &'a str,
    pub email: &'a str,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginPage<'a> {
    pub notice: Option<Notice>,
    pub error: Option<String>,
    pub username: &'a str,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardPage<'a> {
    pub notice: Option<Notice>,
    pub user_id: i64,
    pub username: &'a str,
    pub email: &'a str,
    pub member_since: String,
}

pub fn member_since(created_at: OffsetDateTime) -> String {
    created_at.date().to_string()
}

pub fn render<T: Template>(status: StatusCode, page: &T) -> Response {
    match page.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            error!(error = %e, "template render failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}
