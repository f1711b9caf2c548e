//! One-way password hashing with PBKDF2-HMAC-SHA256.
//!
//! Hashes are stored as PHC strings (`$pbkdf2-sha256$i=<rounds>,l=32$<salt>$<hash>`)
//! so the round count travels with each hash and can be raised later
//! without invalidating existing credentials.

use std::sync::{Arc, OnceLock};

use pbkdf2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use pbkdf2::{Algorithm, Params, Pbkdf2};
use rand::RngCore;
use thiserror::Error;

const SALT_LENGTH: usize = 16;
const OUTPUT_LENGTH: usize = 32;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error("Stored password hash is invalid: {0}")]
    InvalidHash(String),
}

#[derive(Debug, Clone)]
pub struct PasswordHashing {
    rounds: u32,
    /// Hash checked against when there is no account. Shared by clones.
    dummy: Arc<OnceLock<Option<String>>>,
}

impl PasswordHashing {
    pub fn new(rounds: u32) -> Self {
        Self {
            rounds: rounds.max(1),
            dummy: Arc::new(OnceLock::new()),
        }
    }

    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let mut salt_bytes = [0u8; SALT_LENGTH];
        rand::thread_rng().fill_bytes(&mut salt_bytes);
        let salt =
            SaltString::encode_b64(&salt_bytes).map_err(|e| PasswordError::Hash(e.to_string()))?;

        let params = Params {
            rounds: self.rounds,
            output_length: OUTPUT_LENGTH,
        };
        let hash = Pbkdf2
            .hash_password_customized(
                password.as_bytes(),
                Some(Algorithm::Pbkdf2Sha256.ident()),
                None,
                params,
                &salt,
            )
            .map_err(|e| PasswordError::Hash(e.to_string()))?;

        Ok(hash.to_string())
    }

    /// Check `password` against a stored PHC string. The comparison itself is
    /// constant-time.
    pub fn verify(&self, password: &str, stored: &str) -> Result<bool, PasswordError> {
        let parsed =
            PasswordHash::new(stored).map_err(|e| PasswordError::InvalidHash(e.to_string()))?;
        match Pbkdf2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(pbkdf2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::InvalidHash(e.to_string())),
        }
    }

    pub(crate) fn dummy_hash(&self) -> Option<&str> {
        self.dummy
            .get_or_init(|| self.hash("not-a-real-password").ok())
            .as_deref()
    }

    /// Hash once so later logins against unknown names cost one verification.
    pub fn warm_up(&self) {
        self.dummy_hash();
    }

    /// Burn the same work as a real verification. Used when there is no
    /// account, so a failed login takes as long either way.
    pub fn dummy_verify(&self, password: &str) {
        if let Some(hash) = self.dummy_hash() {
            let _ = self.verify(password, hash);
        }
    }
}
