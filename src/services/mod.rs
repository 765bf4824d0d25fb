// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod cache;
pub mod password;
pub mod prediction;
pub mod token;

pub use cache::ResponseCache;
pub use password::{BcryptHasher, PasswordHasher};
pub use prediction::{BatchOutcome, PredictionClient, StockDataService};
pub use token::{Claims, TokenError, TokenService};
