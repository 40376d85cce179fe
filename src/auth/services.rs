use lazy_static::lazy_static;
use tracing::{error, info, warn};

use crate::auth::{
    dto::{LoginForm, RegisterForm},
    error::AuthError,
    password::{hash_password, hash_password_blocking, verify_password_blocking},
    repo::{CredentialStore, StoreError},
    repo_types::{NewUser, User, MAX_EMAIL_LEN, MAX_USERNAME_LEN},
};

lazy_static! {
    // Verified against when the username is unknown, so both failure paths cost the same.
    static ref DUMMY_HASH: String = match hash_password("portal-unknown-user") {
        Ok(digest) => digest,
        Err(e) => {
            error!(error = %e, "dummy digest unavailable, unknown-user logins will not hash");
            String::new()
        }
    };
}

/// Compute the dummy digest up front instead of inside the first failed login.
pub async fn warm_up() {
    if let Err(e) = tokio::task::spawn_blocking(|| lazy_static::initialize(&DUMMY_HASH)).await {
        error!(error = %e, "dummy digest warm-up failed");
    }
}

fn required(value: &str, field: &'static str) -> Result<(), AuthError> {
    if value.trim().is_empty() {
        return Err(AuthError::MissingField(field));
    }
    Ok(())
}

fn at_most(value: &str, max: usize, field: &'static str) -> Result<(), AuthError> {
    if value.chars().count() > max {
        return Err(AuthError::TooLong(field));
    }
    Ok(())
}

/// Credential Store `create`: pre-check, hash, insert.
///
/// The pre-check only saves a hash in the common case; the insert itself is what
/// rejects a duplicate when two registrations race.
pub async fn create_user(
    store: &dyn CredentialStore,
    username: &str,
    email: &str,
    password: &str,
) -> Result<User, AuthError> {
    let username = username.trim();
    let email = email.trim().to_lowercase();
    required(username, "Username")?;
    required(&email, "Email")?;
    required(password, "Password")?;
    at_most(username, MAX_USERNAME_LEN, "Username")?;
    at_most(&email, MAX_EMAIL_LEN, "Email")?;

    if store.find_by_username(username).await?.is_some() {
        warn!(username, "username already exists");
        return Err(AuthError::DuplicateUsername);
    }
    if store.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AuthError::DuplicateEmail);
    }

    let password_hash = hash_password_blocking(password.to_owned()).await?;

    let user = store
        .create(NewUser {
            username,
            email: &email,
            password_hash: &password_hash,
        })
        .await
        .map_err(|e| {
            if matches!(e, StoreError::DuplicateUsername | StoreError::DuplicateEmail) {
                warn!(username, error = %e, "lost registration race");
            }
            AuthError::from(e)
        })?;

    info!(user_id = user.id, username = %user.username, "user registered");
    Ok(user)
}

pub async fn register(store: &dyn CredentialStore, form: &RegisterForm) -> Result<User, AuthError> {
    required(&form.username, "Username")?;
    required(&form.email, "Email")?;
    required(&form.password, "Password")?;
    if form.password != form.confirm_password {
        return Err(AuthError::PasswordMismatch);
    }
    create_user(store, &form.username, &form.email, &form.password).await
}

pub async fn find_by_username(
    store: &dyn CredentialStore,
    username: &str,
) -> Result<Option<User>, AuthError> {
    Ok(store.find_by_username(username.trim()).await?)
}

/// Unknown user and wrong password both end in `InvalidCredentials`.
pub async fn authenticate(store: &dyn CredentialStore, form: &LoginForm) -> Result<User, AuthError> {
    let user = find_by_username(store, &form.username).await?;

    let digest = user
        .as_ref()
        .map(|u| u.password_hash.clone())
        .unwrap_or_else(|| DUMMY_HASH.clone());
    let ok = verify_password_blocking(form.password.clone(), digest).await;

    match user {
        Some(user) if ok => {
            info!(user_id = user.id, username = %user.username, "user logged in");
            Ok(user)
        }
        Some(user) => {
            warn!(user_id = user.id, "login invalid password");
            Err(AuthError::InvalidCredentials)
        }
        None => {
            warn!(username = %form.username.trim(), "login unknown username");
            Err(AuthError::InvalidCredentials)
        }
    }
}
