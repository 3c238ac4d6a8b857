//! Password hashing and verification.

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use subtle::ConstantTimeEq;

use crate::config::PasswordScheme;
use crate::error::CredentialError;

/// Hashes new passwords and checks login attempts under one scheme.
#[derive(Debug, Clone, Copy)]
pub struct Credentials {
    scheme: PasswordScheme,
}

impl Credentials {
    pub fn new(scheme: PasswordScheme) -> Self {
        Self { scheme }
    }

    /// Produce the value stored in the user's `password` attribute.
    pub fn hash(&self, password: &str) -> Result<String, CredentialError> {
        match self.scheme {
            PasswordScheme::Argon2 => {
                let salt = SaltString::generate(&mut OsRng);
                Argon2::default()
                    .hash_password(password.as_bytes(), &salt)
                    .map(|hash| hash.to_string())
                    .map_err(|e| CredentialError::Hash(e.to_string()))
            }
            PasswordScheme::Plaintext => Ok(password.to_string()),
        }
    }

    /// Check a login attempt against the stored attribute.
    ///
    /// A stored value that is not a valid PHC string never verifies under
    /// the argon2 scheme.
    pub fn verify(&self, candidate: &str, stored: &str) -> bool {
        match self.scheme {
            PasswordScheme::Argon2 => match PasswordHash::new(stored) {
                Ok(parsed) => Argon2::default()
                    .verify_password(candidate.as_bytes(), &parsed)
                    .is_ok(),
                Err(e) => {
                    tracing::warn!("Stored password is not an argon2 hash: {}", e);
                    false
                }
            },
            PasswordScheme::Plaintext => candidate.as_bytes().ct_eq(stored.as_bytes()).into(),
        }
    }

    /// [`Self::hash`] on the blocking pool; argon2 is CPU-bound.
    pub async fn hash_blocking(&self, password: String) -> Result<String, CredentialError> {
        let credentials = *self;
        tokio::task::spawn_blocking(move || credentials.hash(&password))
            .await
            .map_err(|e| CredentialError::Hash(e.to_string()))?
    }

    /// [`Self::verify`] on the blocking pool.
    pub async fn verify_blocking(&self, candidate: String, stored: String) -> bool {
        let credentials = *self;
        match tokio::task::spawn_blocking(move || credentials.verify(&candidate, &stored)).await {
            Ok(matched) => matched,
            Err(e) => {
                tracing::error!("Password verification task failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argon2_hash_verifies_and_hides_the_password() {
        let credentials = Credentials::new(PasswordScheme::Argon2);
        let stored = credentials.hash("hunter2").expect("hash");
        assert!(stored.starts_with("$argon2"));
        assert!(!stored.contains("hunter2"));
        assert!(credentials.verify("hunter2", &stored));
        assert!(!credentials.verify("hunter3", &stored));
    }

    #[test]
    fn argon2_rejects_plaintext_stored_value() {
        let credentials = Credentials::new(PasswordScheme::Argon2);
        assert!(!credentials.verify("hunter2", "hunter2"));
    }

    #[test]
    fn plaintext_scheme_compares_exactly() {
        let credentials = Credentials::new(PasswordScheme::Plaintext);
        assert_eq!(credentials.hash("pw").expect("hash"), "pw");
        assert!(credentials.verify("pw", "pw"));
        assert!(!credentials.verify("pw", "pw "));
        assert!(!credentials.verify("", "pw"));
    }

    #[tokio::test]
    async fn blocking_wrappers_match_sync_results() {
        let credentials = Credentials::new(PasswordScheme::Argon2);
        let stored = credentials
            .hash_blocking("s3cret".to_string())
            .await
            .expect("hash");
        assert!(
            credentials
                .verify_blocking("s3cret".to_string(), stored)
                .await
        );
    }
}
