use async_trait::async_trait;
use sqlx::PgPool;

use crate::auth::repo_types::{NewUser, User};

const USERNAME_CONSTRAINT: &str = "users_username_key";
const EMAIL_CONSTRAINT: &str = "users_email_key";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("username already exists")]
    DuplicateUsername,
    #[error("email already registered")]
    DuplicateEmail,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence for user records.
///
/// `create` must surface a uniqueness conflict as a single error, with no row written.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn create(&self, user: NewUser<'_>) -> Result<User, StoreError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError>;
}

#[derive(Clone)]
pub struct PgCredentialStore {
    db: PgPool,
}

impl PgCredentialStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    /// Insert a user; the table's UNIQUE constraints decide races.
    async fn create(&self, user: NewUser<'_>) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, password_hash, created_at
            "#,
        )
        .bind(user.username)
        .bind(user.email)
        .bind(user.password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(map_insert_error)?;
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT id, username, email, password_hash, created_at FROM users WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }
}

fn duplicate_from_constraint(constraint: Option<&str>) -> Option<StoreError> {
    match constraint {
        Some(USERNAME_CONSTRAINT) => Some(StoreError::DuplicateUsername),
        Some(EMAIL_CONSTRAINT) => Some(StoreError::DuplicateEmail),
        _ => None,
    }
}

fn map_insert_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            if let Some(dup) = duplicate_from_constraint(db_err.constraint()) {
                return dup;
            }
        }
    }
    StoreError::Database(err)
}

#[cfg(test)]
pub use memory::MemoryCredentialStore;

#[cfg(test)]
mod memory {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use time::OffsetDateTime;

    use super::{CredentialStore, StoreError};
    use crate::auth::repo_types::{NewUser, User};

    /// Vec-backed store with the same uniqueness rules as the `users` table.
    #[derive(Default)]
    pub struct MemoryCredentialStore {
        rows: Mutex<Vec<User>>,
    }

    impl MemoryCredentialStore {
        pub fn len(&self) -> usize {
            self.rows.lock().expect("store lock").len()
        }

        pub fn remove(&self, id: i64) {
            self.rows.lock().expect("store lock").retain(|u| u.id != id);
        }
    }

    #[async_trait]
    impl CredentialStore for MemoryCredentialStore {
        async fn create(&self, user: NewUser<'_>) -> Result<User, StoreError> {
            let mut rows = self.rows.lock().expect("store lock");
            if rows.iter().any(|u| u.username == user.username) {
                return Err(StoreError::DuplicateUsername);
            }
            if rows.iter().any(|u| u.email == user.email) {
                return Err(StoreError::DuplicateEmail);
            }
            let id = rows.iter().map(|u| u.id).max().unwrap_or(0) + 1;
            let row = User {
                id,
                username: user.username.to_string(),
                email: user.email.to_string(),
                password_hash: user.password_hash.to_string(),
                created_at: OffsetDateTime::now_utc(),
            };
            rows.push(row.clone());
            Ok(row)
        }

        async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
            let rows = self.rows.lock().expect("store lock");
            Ok(rows.iter().find(|u| u.username == username).cloned())
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
            let rows = self.rows.lock().expect("store lock");
            Ok(rows.iter().find(|u| u.email == email).cloned())
        }

        async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
            let rows = self.rows.lock().expect("store lock");
            Ok(rows.iter().find(|u| u.id == id).cloned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_constraints_to_duplicates() {
        assert!(matches!(
            duplicate_from_constraint(Some("users_username_key")),
            Some(StoreError::DuplicateUsername)
        ));
        assert!(matches!(
            duplicate_from_constraint(Some("users_email_key")),
            Some(StoreError::DuplicateEmail)
        ));
        assert!(duplicate_from_constraint(Some("users_pkey")).is_none());
        assert!(duplicate_from_constraint(None).is_none());
    }

    #[test]
    fn non_database_errors_stay_database_errors() {
        let err = map_insert_error(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Database(_)));
    }

    #[tokio::test]
    async fn memory_store_enforces_unique_username_and_email() {
        let store = MemoryCredentialStore::default();
        let first = store
            .create(NewUser { username: "alice", email: "a@x.com", password_hash: "h" })
            .await
            .expect("first insert");
        assert_eq!(first.id, 1);

        let err = store
            .create(NewUser { username: "alice", email: "b@x.com", password_hash: "h" })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateUsername));

        let err = store
            .create(NewUser { username: "bob", email: "a@x.com", password_hash: "h" })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
        assert_eq!(store.len(), 1);
    }
}
