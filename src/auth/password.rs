// Argon2id password hashing and verification

use crate::core::errors::IdentityError;
use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use rand::rngs::OsRng;
use rand::RngCore;
use std::sync::Arc;

/// Argon2id hasher with deployment-configured cost parameters
///
/// Verification always uses the parameters embedded in the stored PHC string,
/// so raising the cost only affects newly created accounts.
#[derive(Clone)]
pub struct CredentialHasher {
    params: Params,
    dummy_hash: Arc<str>,
}

impl CredentialHasher {
    /// Create a hasher with explicit Argon2 cost parameters
    ///
    /// The dummy hash used for unknown logins is computed here with the same
    /// parameters, so a hasher that cannot hash is never constructed.
    pub fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, IdentityError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| IdentityError::Configuration(format!("Invalid Argon2 parameters: {}", e)))?;
        let dummy_hash = hash_with(&params, "keeper-identity-dummy")
            .map_err(|e| IdentityError::Configuration(format!("Cannot compute dummy hash: {}", e)))?;
        Ok(Self {
            params,
            dummy_hash: Arc::from(dummy_hash),
        })
    }

    fn argon2(&self) -> Argon2<'static> {
        argon2id(&self.params)
    }

    /// Hash a password into a PHC string with a random 16-byte salt
    pub fn hash(&self, password: &str) -> Result<String, IdentityError> {
        hash_with(&self.params, password)
            .map_err(|e| IdentityError::Storage(format!("Cannot hash password: {}", e)))
    }

    /// Verify a password against a stored PHC string
    ///
    /// Unparseable hashes verify as false.
    pub fn verify(&self, password: &str, password_hash: &str) -> bool {
        PasswordHash::new(password_hash)
            .ok()
            .as_ref()
            .map(|hash| self.argon2().verify_password(password.as_bytes(), hash).is_ok())
            .unwrap_or(false)
    }

    /// Verify against the stored hash, or against a dummy hash when the
    /// login is unknown, so both paths cost one Argon2 evaluation.
    pub fn verify_or_dummy(&self, password: &str, password_hash: Option<&str>) -> bool {
        match password_hash {
            Some(hash) => self.verify(password, hash),
            None => {
                let _ = self.verify(password, &self.dummy_hash);
                false
            }
        }
    }

    /// Hash on the blocking pool
    pub async fn hash_blocking(&self, password: String) -> Result<String, IdentityError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| IdentityError::Storage(format!("Hashing task failed: {}", e)))?
    }

    /// `verify_or_dummy` on the blocking pool
    pub async fn verify_blocking(&self, password: String, password_hash: Option<String>) -> Result<bool, IdentityError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.verify_or_dummy(&password, password_hash.as_deref()))
            .await
            .map_err(|e| IdentityError::Storage(format!("Verification task failed: {}", e)))
    }
}

fn argon2id(params: &Params) -> Argon2<'static> {
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params.clone())
}

fn hash_with(params: &Params, password: &str) -> Result<String, argon2::password_hash::Error> {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    let salt = SaltString::encode_b64(&bytes)?;

    argon2id(params)
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_hasher() -> CredentialHasher {
        CredentialHasher::new(8, 1, 1).unwrap()
    }

    #[test]
    fn test_hash_then_verify() {
        let hasher = fast_hasher();
        let hash = hasher.hash("correct horse").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("correct horse", &hash));
        assert!(!hasher.verify("battery staple", &hash));
    }

    #[test]
    fn test_hash_is_salted() {
        let hasher = fast_hasher();
        let first = hasher.hash("pw1").unwrap();
        let second = hasher.hash("pw1").unwrap();
        assert_ne!(first, second);
        assert!(!first.contains("pw1"));
    }

    #[test]
    fn test_verify_garbage_hash_is_false() {
        assert!(!fast_hasher().verify("pw1", "not-a-phc-string"));
    }

    #[test]
    fn test_verify_or_dummy_unknown_login() {
        let hasher = fast_hasher();
        assert!(!hasher.verify_or_dummy("pw1", None));
        // Even the dummy's own password never authenticates an unknown login
        assert!(!hasher.verify_or_dummy("keeper-identity-dummy", None));
    }

    #[test]
    fn test_dummy_hash_is_ready_at_construction() {
        let hasher = fast_hasher();
        let parsed = PasswordHash::new(&hasher.dummy_hash).unwrap();
        assert_eq!(parsed.algorithm.as_str(), "argon2id");
        // Same cost as real hashes, so unknown logins pay a full verify
        assert!(hasher.verify("keeper-identity-dummy", &hasher.dummy_hash));

        let clone = hasher.clone();
        assert_eq!(clone.dummy_hash, hasher.dummy_hash);
    }

    #[test]
    fn test_invalid_params_rejected() {
        assert!(matches!(
            CredentialHasher::new(0, 0, 0),
            Err(IdentityError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_blocking_wrappers() {
        let hasher = fast_hasher();
        let hash = hasher.hash_blocking("pw1".to_string()).await.unwrap();
        assert!(hasher.verify_blocking("pw1".to_string(), Some(hash.clone())).await.unwrap());
        assert!(!hasher.verify_blocking("pw2".to_string(), Some(hash)).await.unwrap());
        assert!(!hasher.verify_blocking("pw1".to_string(), None).await.unwrap());
    }
}
