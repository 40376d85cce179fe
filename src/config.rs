use std::net::SocketAddr;

use anyhow::Context;

const DEFAULT_TTL_MINUTES: i64 = 60;
/// Thirty days.
pub const MAX_TTL_MINUTES: i64 = 60 * 24 * 30;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub secret: String,
    pub issuer: String,
    pub ttl_minutes: i64,
    pub cookie_name: String,
    pub secure_cookie: bool,
}

impl SessionConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.secret.trim().is_empty() {
            anyhow::bail!("SESSION_SECRET must not be empty");
        }
        if self.ttl_minutes <= 0 {
            anyhow::bail!("SESSION_TTL_MINUTES must be positive");
        }
        if self.ttl_minutes > MAX_TTL_MINUTES {
            anyhow::bail!("SESSION_TTL_MINUTES must not exceed {MAX_TTL_MINUTES}");
        }
        if self.cookie_name.is_empty() {
            anyhow::bail!("SESSION_COOKIE_NAME must not be empty");
        }
        if self.secret.len() < 32 {
            tracing::warn!("SESSION_SECRET is shorter than 32 bytes");
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub session: SessionConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let session = SessionConfig {
            secret: std::env::var("SESSION_SECRET").context("SESSION_SECRET is not set")?,
            issuer: std::env::var("SESSION_ISSUER").unwrap_or_else(|_| "portal".into()),
            ttl_minutes: parse_ttl(std::env::var("SESSION_TTL_MINUTES").ok())?,
            cookie_name: std::env::var("SESSION_COOKIE_NAME").unwrap_or_else(|_| "session".into()),
            secure_cookie: std::env::var("SESSION_COOKIE_SECURE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        };
        session.validate()?;

        let port = match std::env::var("APP_PORT") {
            Ok(v) => v.parse::<u16>().context("APP_PORT is not a valid port")?,
            Err(_) => 8080,
        };
        Ok(Self {
            database_url,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port,
            session,
        })
    }

    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))?;
        Ok(addr)
    }
}

fn parse_ttl(raw: Option<String>) -> anyhow::Result<i64> {
    match raw {
        Some(v) => v
            .trim()
            .parse::<i64>()
            .context("SESSION_TTL_MINUTES is not a valid number of minutes"),
        None => Ok(DEFAULT_TTL_MINUTES),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(secret: &str, ttl_minutes: i64) -> SessionConfig {
        SessionConfig {
            secret: secret.into(),
            issuer: "test".into(),
            ttl_minutes,
            cookie_name: "session".into(),
            secure_cookie: false,
        }
    }

    #[test]
    fn rejects_empty_secret() {
        let err = session("   ", 60).validate().unwrap_err();
        assert!(err.to_string().contains("SESSION_SECRET"));
    }

    #[test]
    fn rejects_non_positive_ttl() {
        assert!(session("a-long-enough-secret-for-the-tests!!", 0).validate().is_err());
    }

    #[test]
    fn rejects_ttl_above_thirty_days() {
        let secret = "a-long-enough-secret-for-the-tests!!";
        assert!(session(secret, MAX_TTL_MINUTES).validate().is_ok());
        let err = session(secret, 10_000_000_000).validate().unwrap_err();
        assert!(err.to_string().contains("SESSION_TTL_MINUTES"));
    }

    #[test]
    fn unparseable_ttl_is_an_error_not_a_default() {
        let err = parse_ttl(Some("abc".into())).unwrap_err();
        assert!(err.to_string().contains("SESSION_TTL_MINUTES"));
        assert_eq!(parse_ttl(Some(" 15 ".into())).unwrap(), 15);
        assert_eq!(parse_ttl(None).unwrap(), DEFAULT_TTL_MINUTES);
    }

    #[test]
    fn accepts_short_secret_with_warning() {
        assert!(session("short", 5).validate().is_ok());
    }

    #[test]
    fn bind_addr_parses_host_and_port() {
        let cfg = AppConfig {
            database_url: "postgres://localhost/portal".into(),
            host: "127.0.0.1".into(),
            port: 3000,
            session: session("secret", 5),
        };
        assert_eq!(cfg.bind_addr().unwrap().port(), 3000);
    }
}
