// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Password hashing strategy.
//!
//! The hasher is a strategy object so the algorithm and work factor are
//! configuration rather than hard-coded call sites.

use crate::error::AppError;

/// One-way, salted password hashing.
pub trait PasswordHasher: Send + Sync {
    /// Derive a hash from a raw password.
    fn hash(&self, raw: &str) -> Result<String, AppError>;

    /// Check a raw password against a stored hash.
    ///
    /// Comparison happens inside the algorithm and is constant-time with
    /// respect to the hash contents.
    fn verify(&self, raw: &str, hash: &str) -> bool;
}

/// Bcrypt hasher with a configurable work factor.
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    /// Create a hasher with the given cost (default 12 in production config).
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, raw: &str) -> Result<String, AppError> {
        bcrypt::hash(raw, self.cost)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("password hashing failed: {}", e)))
    }

    fn verify(&self, raw: &str, hash: &str) -> bool {
        bcrypt::verify(raw, hash).unwrap_or(false)
    }
}
