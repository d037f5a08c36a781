//! Password hashing.
//!
//! Passwords are stored as Argon2id PHC strings. A hash starting with `!`,
//! or an empty one, marks an account that cannot log in with a password.
//! Argon2 is deliberately slow, so the work runs on the blocking pool.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use rest_extras_core::{ExtrasError, ExtrasResult};

const UNUSABLE_PASSWORD_PREFIX: &str = "!";

async fn off_runtime<T, F>(work: F) -> ExtrasResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> ExtrasResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ExtrasError::InternalServerError(format!("password hashing task failed: {e}")))?
}

pub async fn make_password(password: &str) -> ExtrasResult<String> {
    let password = password.to_owned();
    off_runtime(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ExtrasError::InternalServerError(format!("cannot hash password: {e}")))
    })
    .await
}

/// Unusable hashes, and anything that is not an Argon2 PHC string, never match.
pub async fn check_password(password: &str, encoded: &str) -> ExtrasResult<bool> {
    if !is_password_usable(encoded) || !encoded.starts_with("$argon2") {
        return Ok(false);
    }
    let (password, encoded) = (password.to_owned(), encoded.to_owned());
    off_runtime(move || {
        let parsed = PasswordHash::new(&encoded)
            .map_err(|e| ExtrasError::InternalServerError(format!("malformed password hash: {e}")))?;
        Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
    })
    .await
}

pub fn is_password_usable(encoded: &str) -> bool {
    !encoded.is_empty() && !encoded.starts_with(UNUSABLE_PASSWORD_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_then_check() {
        let encoded = make_password("password").await.unwrap();
        assert!(encoded.starts_with("$argon2id$"));
        assert!(check_password("password", &encoded).await.unwrap());
        assert!(!check_password("Password", &encoded).await.unwrap());
    }

    #[tokio::test]
    async fn test_salted() {
        let first = make_password("password").await.unwrap();
        let second = make_password("password").await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_unusable_and_plaintext_never_match() {
        for stored in ["!unusable", "", "password", "$argon2id$garbage"] {
            assert!(!check_password("password", stored).await.unwrap_or(false), "{stored}");
        }
    }

    #[test]
    fn test_is_password_usable() {
        assert!(is_password_usable("$argon2id$..."));
        assert!(!is_password_usable("!x"));
        assert!(!is_password_usable(""));
    }
}
