// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Stockdash API Server
//!
//! Backend for the stock prediction dashboard: authenticates users, stores
//! favorite tickers and proxies market-data requests to the prediction
//! service.

use stockdash::{
    config::Config,
    db::UserStore,
    middleware::rate_limit::RateLimiter,
    services::{BcryptHasher, PredictionClient, ResponseCache, StockDataService, TokenService},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Stockdash API");

    // Credential store starts empty; registration populates it
    let users = UserStore::new();

    let tokens = TokenService::new(&config.jwt_secret, config.token_expiry_days);
    let hasher = Arc::new(BcryptHasher::new(config.bcrypt_cost));

    // Rate-limit counters and the response cache are the only process-wide
    // shared state; both start empty and need no teardown
    let rate_limiter = RateLimiter::new(config.rate_quotas);
    let cache = ResponseCache::new();

    let client = PredictionClient::new(&config.upstream_url);
    let stocks = StockDataService::new(client, cache);
    tracing::info!(upstream = %config.upstream_url, "Prediction service client initialized");

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        users,
        tokens,
        hasher,
        rate_limiter,
        stocks,
    });

    // Build router
    let app = stockdash::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("stockdash=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
