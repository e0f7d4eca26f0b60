//! Token-based authentication.
//!
//! Tokens are validated against SHA-256 hashes stored in configuration.
//! This avoids storing plaintext tokens while allowing simple bearer auth.

use crate::config::AuthConfig;
use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// Validates bearer tokens against pre-configured hashes.
#[derive(Debug, Clone)]
pub struct TokenValidator {
    /// Set of valid token hashes (SHA-256 hex strings).
    valid_hashes: HashSet<String>,
}

impl TokenValidator {
    /// Creates a new validator with the given token hashes.
    pub fn new(hashes: impl IntoIterator<Item = String>) -> Self {
        Self {
            valid_hashes: hashes.into_iter().collect(),
        }
    }

    /// Builds a validator from auth configuration.
    ///
    /// Returns `None` when auth is not required or no hashes are configured,
    /// in which case the session falls back to accept-any-token behavior.
    pub fn from_config(config: &AuthConfig) -> Option<Self> {
        if config.required && !config.token_hashes.is_empty() {
            Some(Self::new(config.token_hashes.iter().cloned()))
        } else {
            None
        }
    }

    /// Returns the number of configured tokens.
    pub fn token_count(&self) -> usize {
        self.valid_hashes.len()
    }

    /// Validates a plaintext token by hashing and comparing.
    pub fn validate(&self, token: &str) -> bool {
        if self.valid_hashes.is_empty() {
            return false;
        }
        let hash = Self::hash_token(token);
        self.valid_hashes.contains(&hash)
    }

    /// Hashes a token using SHA-256, returning a lowercase hex string.
    pub fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }
}
