use sqlx::FromRow;
use time::OffsetDateTime;

// Match the column widths in migrations/0001_create_users.sql.
pub const MAX_USERNAME_LEN: usize = 80;
pub const MAX_EMAIL_LEN: usize = 120;

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,                      // server-generated, never reused
    pub username: String,             // unique, case-sensitive
    pub email: String,                // unique, stored lower-cased
    pub password_hash: String,        // Argon2 PHC string, never exposed
    pub created_at: OffsetDateTime,   // set once by the database
}

/// Row about to be inserted. The password is already hashed.
#[derive(Debug, Clone, Copy)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
}
