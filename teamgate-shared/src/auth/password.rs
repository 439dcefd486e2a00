/// Password hashing behind the `CredentialHasher` port
///
/// Production uses Argon2id with 64 MB memory, 3 passes and 4 lanes. The
/// parameters and a random 16-byte salt are embedded in the PHC string, so
/// verification works for any hash regardless of the hasher's own settings.
///
/// ```text
/// $argon2id$v=19$m=65536,t=3,p=4$<salt>$<hash>
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params, ParamsBuilder, Version,
};

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Invalid password hash format
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

/// Produces and checks salted password hashes
pub trait CredentialHasher: Send + Sync {
    /// Hashes a plaintext password
    fn hash(&self, password: &str) -> Result<String, PasswordError>;

    /// Returns `Ok(false)` on a mismatch; errors only on a corrupt hash
    fn verify(&self, hash: &str, password: &str) -> Result<bool, PasswordError>;
}

/// Argon2id hasher
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    /// Hasher with the production parameters (64 MB, t=3, p=4)
    pub fn new() -> Result<Self, PasswordError> {
        Self::with_params(65536, 3, 4)
    }

    /// Hasher with explicit memory (KiB), iteration and lane counts
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self, PasswordError> {
        let params = ParamsBuilder::new()
            .m_cost(m_cost)
            .t_cost(t_cost)
            .p_cost(p_cost)
            .output_len(32)
            .build()
            .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);

        let password_hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

        Ok(password_hash.to_string())
    }

    fn verify(&self, hash: &str, password: &str) -> Result<bool, PasswordError> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

        // Parameters come from the PHC string
        match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(_) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_hasher() -> Argon2Hasher {
        Argon2Hasher::with_params(8, 1, 1).unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = fast_hasher();
        let hash = hasher.hash("correct horse battery").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify(&hash, "correct horse battery").unwrap());
        assert!(!hasher.verify(&hash, "wrong password").unwrap());
    }

    #[test]
    fn test_hash_is_salted() {
        let hasher = fast_hasher();
        let first = hasher.hash("same-password").unwrap();
        let second = hasher.hash("same-password").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_verify_across_parameter_sets() {
        let hash = fast_hasher().hash("password123").unwrap();
        let other = Argon2Hasher::with_params(16, 2, 1).unwrap();
        assert!(other.verify(&hash, "password123").unwrap());
    }

    #[test]
    fn test_production_params_are_embedded() {
        let hasher = Argon2Hasher::new().unwrap();
        let hash = hasher.hash("password123").unwrap();
        assert!(hash.contains("m=65536,t=3,p=4"));
    }

    #[test]
    fn test_invalid_hash() {
        let result = fast_hasher().verify("not-a-phc-string", "password");
        assert!(matches!(result, Err(PasswordError::InvalidHash(_))));
    }

    #[test]
    fn test_invalid_params() {
        assert!(Argon2Hasher::with_params(1, 0, 0).is_err());
    }
}
