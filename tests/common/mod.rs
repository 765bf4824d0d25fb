// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use stockdash::config::Config;
use stockdash::db::UserStore;
use stockdash::middleware::rate_limit::RateLimiter;
use stockdash::routes::create_router;
use stockdash::services::{
    BcryptHasher, PredictionClient, ResponseCache, StockDataService, TokenService,
};
use stockdash::AppState;
use tower::ServiceExt;

/// Create a test app with default test config.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let client = PredictionClient::new(&config.upstream_url);
    let stocks = StockDataService::new(client, ResponseCache::new());
    build_app(config, stocks)
}

/// Create a test app with a custom config, wiring the stock service to the
/// configured upstream URL.
#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> (axum::Router, Arc<AppState>) {
    let client = PredictionClient::new(&config.upstream_url);
    let stocks = StockDataService::new(client, ResponseCache::new());
    build_app(config, stocks)
}

/// Create a test app with an explicit stock-data service.
#[allow(dead_code)]
pub fn create_test_app_with_stocks(
    config: Config,
    stocks: StockDataService,
) -> (axum::Router, Arc<AppState>) {
    build_app(config, stocks)
}

fn build_app(config: Config, stocks: StockDataService) -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState {
        users: UserStore::new(),
        tokens: TokenService::new(&config.jwt_secret, config.token_expiry_days),
        hasher: Arc::new(BcryptHasher::new(config.bcrypt_cost)),
        rate_limiter: RateLimiter::new(config.rate_quotas),
        stocks,
        config,
    });

    (create_router(state.clone()), state)
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

/// Send a JSON POST through the router.
#[allow(dead_code)]
pub async fn post_json(
    app: &axum::Router,
    uri: &str,
    token: Option<&str>,
    body: Value,
) -> axum::response::Response {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    app.clone()
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

/// Send a GET through the router.
#[allow(dead_code)]
pub async fn get_with_token(
    app: &axum::Router,
    uri: &str,
    token: Option<&str>,
) -> axum::response::Response {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// Register a user and return (token, user id).
#[allow(dead_code)]
pub async fn register_user(app: &axum::Router, email: &str, password: &str) -> (String, String) {
    let response = post_json(
        app,
        "/api/auth/register",
        None,
        json!({"email": email, "password": password}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    let token = body["token"].as_str().expect("token present").to_string();
    let user_id = body["user"]["id"]
        .as_str()
        .expect("user id present")
        .to_string();
    (token, user_id)
}
