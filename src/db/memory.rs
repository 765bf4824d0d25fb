// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory user store with typed operations.
//!
//! Provides high-level operations for:
//! - Registration (with email uniqueness enforcement)
//! - Credential lookup by email or id
//! - Favorite ticker add/remove
//! - Login bookkeeping and profile updates
//!
//! Uniqueness is enforced through the email index: the index entry is the
//! write lock for its email, so two concurrent registrations of the same
//! address cannot both succeed.

use crate::error::AppError;
use crate::models::{User, UserProfile};
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;

/// In-memory user store.
///
/// Clones share the same underlying maps.
#[derive(Clone, Default)]
pub struct UserStore {
    /// user id -> record
    users: Arc<DashMap<String, User>>,
    /// lowercased email -> user id
    email_index: Arc<DashMap<String, String>>,
}

impl UserStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new user record.
    ///
    /// `email` must already be normalized to lowercase; `password_hash` is
    /// the output of the configured hasher. Fails with a conflict when the
    /// email is already registered.
    pub fn register(&self, email: &str, password_hash: String) -> Result<User, AppError> {
        let user = User::new(email.to_string(), password_hash);

        match self.email_index.entry(email.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(AppError::Conflict(
                    "an account with this email already exists".to_string(),
                ));
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(user.id.clone());
            }
        }

        self.users.insert(user.id.clone(), user.clone());
        tracing::debug!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Look up a user by email (case-insensitive).
    pub fn find_by_email(&self, email: &str) -> Option<User> {
        let id = self.email_index.get(&email.to_lowercase())?.clone();
        self.find_by_id(&id)
    }

    /// Look up a user by id.
    pub fn find_by_id(&self, id: &str) -> Option<User> {
        self.users.get(id).map(|u| u.clone())
    }

    /// Add a ticker to the user's favorites. Idempotent.
    pub fn add_favorite(&self, id: &str, ticker: &str) -> Result<User, AppError> {
        self.mutate(id, |user| {
            if !user.favorites.iter().any(|t| t == ticker) {
                user.favorites.push(ticker.to_string());
            }
        })
    }

    /// Remove a ticker from the user's favorites. No-op if absent.
    pub fn remove_favorite(&self, id: &str, ticker: &str) -> Result<User, AppError> {
        self.mutate(id, |user| {
            user.favorites.retain(|t| t != ticker);
        })
    }

    /// Record a successful login: update `last_login`, bump `login_count`.
    pub fn record_login(&self, id: &str) -> Result<User, AppError> {
        self.mutate(id, |user| {
            user.last_login = Some(Utc::now());
            user.login_count += 1;
        })
    }

    /// Replace the user's dashboard preferences.
    pub fn update_profile(&self, id: &str, profile: UserProfile) -> Result<User, AppError> {
        self.mutate(id, |user| {
            user.profile = profile.clone();
        })
    }

    /// Activate or deactivate an account.
    pub fn set_active(&self, id: &str, active: bool) -> Result<User, AppError> {
        self.mutate(id, |user| {
            user.is_active = active;
        })
    }

    /// Number of registered users.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Apply a mutation under the record's map shard lock.
    fn mutate(&self, id: &str, f: impl Fn(&mut User)) -> Result<User, AppError> {
        let mut entry = self
            .users
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("user {} not found", id)))?;
        f(entry.value_mut());
        Ok(entry.clone())
    }
}
