//! Credential store: account creation and password checks on top of the
//! `users` table. Only Argon2id PHC strings are persisted.
//!
//! Everything here is CPU-heavy and blocking; call it from
//! `spawn_blocking`.

use std::sync::LazyLock;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{self, SaltString, rand_core::OsRng},
};

use bizmate_db::models::UserRow;
use bizmate_db::{Database, DbError};

const MIN_PASSWORD_LEN: usize = 8;
const MAX_EMAIL_LEN: usize = 254;

/// Hash checked against when the email is unknown, so a miss costs the same
/// as a wrong password.
static DUMMY_HASH: LazyLock<String> =
    LazyLock::new(|| hash_password("bizmate-dummy-password").unwrap_or_default());

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("email already registered")]
    DuplicateEmail,
    /// Unknown email or wrong password; never says which.
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("account is inactive")]
    Inactive,
    #[error("{0}")]
    Invalid(String),
    #[error("password hashing: {0}")]
    Hash(String),
    #[error(transparent)]
    Store(DbError),
}

impl From<DbError> for CredentialError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::DuplicateEmail => CredentialError::DuplicateEmail,
            other => CredentialError::Store(other),
        }
    }
}

pub fn register(db: &Database, email: &str, password: &str) -> Result<UserRow, CredentialError> {
    let email = normalize_email(email);
    validate_email(&email)?;
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(CredentialError::Invalid(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let password_hash = hash_password(password)?;

    // The UNIQUE constraint is the duplicate check; no lookup beforehand.
    Ok(db.create_user(&email, &password_hash)?)
}

pub fn verify(db: &Database, email: &str, password: &str) -> Result<UserRow, CredentialError> {
    let email = normalize_email(email);

    let Some(user) = db.get_user_by_email(&email)? else {
        let _ = check_password(password, &DUMMY_HASH);
        return Err(CredentialError::InvalidCredentials);
    };

    if !check_password(password, &user.hashed_password)? {
        return Err(CredentialError::InvalidCredentials);
    }
    if !user.is_active {
        return Err(CredentialError::Inactive);
    }

    Ok(user)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> Result<(), CredentialError> {
    let valid = email.len() <= MAX_EMAIL_LEN
        && !email.chars().any(char::is_whitespace)
        && email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty() && !domain.contains('@'));

    if valid {
        Ok(())
    } else {
        Err(CredentialError::Invalid("Invalid email address".to_string()))
    }
}

fn hash_password(password: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CredentialError::Hash(e.to_string()))
}

/// Argon2's verifier compares digests in constant time.
fn check_password(password: &str, stored: &str) -> Result<bool, CredentialError> {
    let parsed = PasswordHash::new(stored).map_err(|e| CredentialError::Hash(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(CredentialError::Hash(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_hash_is_not_the_password() {
        let db = Database::open_in_memory().unwrap();
        let user = register(&db, "owner@example.com", "correct horse").unwrap();

        assert_ne!(user.hashed_password, "correct horse");
        assert!(!user.hashed_password.contains("correct horse"));
        assert!(user.hashed_password.starts_with("$argon2id$"));
    }

    #[test]
    fn second_registration_is_a_duplicate() {
        let db = Database::open_in_memory().unwrap();
        register(&db, "owner@example.com", "password-1").unwrap();

        let err = register(&db, "Owner@Example.com ", "password-2").err().unwrap();
        assert!(matches!(err, CredentialError::DuplicateEmail));
    }

    #[test]
    fn verify_accepts_only_the_right_password() {
        let db = Database::open_in_memory().unwrap();
        let registered = register(&db, "owner@example.com", "password-1").unwrap();

        let user = verify(&db, "OWNER@example.com", "password-1").unwrap();
        assert_eq!(user.id, registered.id);

        assert!(matches!(
            verify(&db, "owner@example.com", "password-2"),
            Err(CredentialError::InvalidCredentials)
        ));
        assert!(matches!(
            verify(&db, "nobody@example.com", "password-1"),
            Err(CredentialError::InvalidCredentials)
        ));
    }

    #[test]
    fn inactive_accounts_cannot_log_in() {
        let db = Database::open_in_memory().unwrap();
        let user = register(&db, "owner@example.com", "password-1").unwrap();
        db.set_user_active(user.id, false).unwrap();

        assert!(matches!(
            verify(&db, "owner@example.com", "password-1"),
            Err(CredentialError::Inactive)
        ));
    }

    #[test]
    fn weak_input_is_rejected_before_hashing() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(register(&db, "owner@example.com", "short"), Err(CredentialError::Invalid(_))));
        assert!(matches!(register(&db, "not-an-email", "long enough"), Err(CredentialError::Invalid(_))));
        assert!(matches!(register(&db, "a@b@c", "long enough"), Err(CredentialError::Invalid(_))));
        assert!(db.get_user_by_email("owner@example.com").unwrap().is_none());
    }
}
