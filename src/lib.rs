// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Stockdash: backend API for the stock prediction dashboard
//!
//! This crate provides the dashboard backend that authenticates users,
//! stores per-user favorite tickers and proxies market-data and prediction
//! requests to the external prediction service.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::UserStore;
use middleware::rate_limit::RateLimiter;
use services::password::PasswordHasher;
use services::{StockDataService, TokenService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub users: UserStore,
    pub tokens: TokenService,
    pub hasher: Arc<dyn PasswordHasher>,
    pub rate_limiter: RateLimiter,
    pub stocks: StockDataService,
}
