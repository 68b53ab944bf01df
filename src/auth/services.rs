use anyhow::Context;
use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use super::jwt::JwtKeys;
use super::password::{hash_password, verify_password};
use super::repo_types::User;
use crate::{db::now_utc, error::AppError, state::AppState};

pub const MIN_PASSWORD_LEN: usize = 8;

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex compiles");
    // Verified against when the email is unknown, so both login failures cost the same.
    static ref DUMMY_HASH: Option<String> = hash_password("dummy-password-for-timing").ok();
}

/// Argon2 hashing on the blocking pool.
async fn hash_blocking(password: &str) -> anyhow::Result<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .context("password hash task")?
}

/// Checks `password` against `hash`, or against a throwaway hash when there
/// is no user, on the blocking pool.
async fn verify_blocking(password: &str, hash: Option<String>) -> anyhow::Result<bool> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || match hash {
        Some(hash) => verify_password(&password, &hash),
        None => {
            if let Some(dummy) = DUMMY_HASH.as_deref() {
                let _ = verify_password(&password, dummy);
            }
            Ok(false)
        }
    })
    .await
    .context("password verify task")?
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Creates an account. Emails are matched exactly, without case folding.
pub async fn register(
    st: &AppState,
    email: &str,
    name: &str,
    password: &str,
) -> Result<User, AppError> {
    let email = email.trim();
    let name = name.trim();

    if !is_valid_email(email) {
        return Err(AppError::InvalidInput("Invalid email".into()));
    }
    if name.is_empty() {
        return Err(AppError::InvalidInput("Name is required".into()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::InvalidInput(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    if st.repo.find_user_by_email(email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::DuplicateEmail);
    }

    let user = User {
        id: Uuid::new_v4(),
        email: email.to_string(),
        name: name.to_string(),
        password_hash: hash_blocking(password).await?,
        created_at: now_utc(),
    };
    st.repo.insert_user(&user).await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(user)
}

/// Returns a session token and the user it was issued for.
pub async fn authenticate(
    st: &AppState,
    email: &str,
    password: &str,
) -> Result<(String, User), AppError> {
    let email = email.trim();

    let Some(user) = st.repo.find_user_by_email(email).await? else {
        verify_blocking(password, None).await?;
        warn!(email = %email, "login unknown email");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_blocking(password, Some(user.password_hash.clone())).await? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let token = JwtKeys::from_ref(st).sign(user.id)?;
    info!(user_id = %user.id, "user logged in");
    Ok((token, user))
}

/// The stored user behind an authenticated id.
pub async fn current_user(st: &AppState, user_id: Uuid) -> Result<User, AppError> {
    st.repo
        .find_user_by_id(user_id)
        .await?
        .ok_or(AppError::InvalidToken)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_format() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("no-at.example.com"));
        assert!(!is_valid_email("a b@c.d"));
        assert!(!is_valid_email("a@nodot"));
    }

    #[tokio::test]
    async fn password_work_runs_off_the_runtime() {
        let hash = hash_blocking("long-enough-pw").await.expect("hash");
        assert!(verify_blocking("long-enough-pw", Some(hash.clone())).await.unwrap());
        assert!(!verify_blocking("wrong-password", Some(hash)).await.unwrap());
        assert!(!verify_blocking("long-enough-pw", None).await.unwrap());
    }

    #[tokio::test]
    async fn register_then_authenticate() {
        let st = AppState::fake();
        let user = register(&st, " ann@example.com ", "Ann", "long-enough-pw")
            .await
            .expect("register");
        assert_eq!(user.email, "ann@example.com");
        assert_ne!(user.password_hash, "long-enough-pw");

        let (token, logged_in) = authenticate(&st, "ann@example.com", "long-enough-pw")
            .await
            .expect("login");
        assert_eq!(logged_in.id, user.id);
        let claims = JwtKeys::from_ref(&st).verify(&token).expect("verify");
        assert_eq!(claims.sub, user.id);
        assert_eq!(current_user(&st, user.id).await.unwrap().name, "Ann");
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_exact_match_only() {
        let st = AppState::fake();
        register(&st, "bob@example.com", "Bob", "password1").await.unwrap();
        assert!(matches!(
            register(&st, "bob@example.com", "Bob 2", "password2").await,
            Err(AppError::DuplicateEmail)
        ));
        // emails are case-sensitive
        register(&st, "Bob@example.com", "Bob 3", "password3")
            .await
            .expect("different case is a different account");
    }

    #[tokio::test]
    async fn invalid_signup_input() {
        let st = AppState::fake();
        for (email, name, pw) in [
            ("bad-email", "X", "password1"),
            ("x@example.com", "   ", "password1"),
            ("x@example.com", "X", "short"),
        ] {
            assert!(matches!(
                register(&st, email, name, pw).await,
                Err(AppError::InvalidInput(_))
            ));
        }
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let st = AppState::fake();
        register(&st, "cy@example.com", "Cy", "password1").await.unwrap();

        let unknown = authenticate(&st, "nobody@example.com", "password1").await.unwrap_err();
        let wrong = authenticate(&st, "cy@example.com", "password2").await.unwrap_err();
        assert!(matches!(unknown, AppError::InvalidCredentials));
        assert!(matches!(wrong, AppError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn current_user_unknown_id_is_invalid_token() {
        let st = AppState::fake();
        assert!(matches!(
            current_user(&st, Uuid::new_v4()).await,
            Err(AppError::InvalidToken)
        ));
    }
}
