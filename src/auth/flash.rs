use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

const FLASH_COOKIE: &str = "flash";

/// One-shot notice carried across a redirect. Only the code goes in the cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Registered,
    LoggedIn,
    LoggedOut,
    LoginRequired,
    AccountMissing,
}

impl Notice {
    fn code(self) -> &'static str {
        match self {
            Notice::Registered => "registered",
            Notice::LoggedIn => "logged_in",
            Notice::LoggedOut => "logged_out",
            Notice::LoginRequired => "login_required",
            Notice::AccountMissing => "account_missing",
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        match code {
            "registered" => Some(Notice::Registered),
            "logged_in" => Some(Notice::LoggedIn),
            "logged_out" => Some(Notice::LoggedOut),
            "login_required" => Some(Notice::LoginRequired),
            "account_missing" => Some(Notice::AccountMissing),
            _ => None,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Notice::Registered => "Registration successful! Please log in.",
            Notice::LoggedIn => "Login successful!",
            Notice::LoggedOut => "You have been logged out.",
            Notice::LoginRequired => "Please log in to access this page.",
            Notice::AccountMissing => "User account not found. Please log in again.",
        }
    }

    /// CSS class for the notice box.
    pub fn level(&self) -> &'static str {
        match self {
            Notice::Registered | Notice::LoggedIn => "success",
            Notice::LoggedOut => "info",
            Notice::LoginRequired | Notice::AccountMissing => "error",
        }
    }
}

pub fn set(jar: CookieJar, notice: Notice, secure: bool) -> CookieJar {
    jar.add(
        Cookie::build((FLASH_COOKIE, notice.code()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(secure),
    )
}

/// Read the pending notice, if any, and expire the cookie.
pub fn take(jar: CookieJar) -> (CookieJar, Option<Notice>) {
    let Some(code) = jar.get(FLASH_COOKIE).map(|c| c.value().to_owned()) else {
        return (jar, None);
    };
    let jar = jar.remove(Cookie::build((FLASH_COOKIE, "")).path("/"));
    (jar, Notice::from_code(&code))
}
