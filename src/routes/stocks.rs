// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Market-data proxy routes.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AppError, ErrorBody, Result};
use crate::models::user::is_valid_ticker;
use crate::routes::extractors::{AppJson, AppQuery};
use crate::AppState;

/// Stock data routes (require authentication via JWT).
/// Auth and stock-data rate limiting are applied in routes/mod.rs.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/stocks/history", get(history))
        .route("/api/stocks/predict", get(predict))
        .route("/api/stocks/batch-history", post(batch_history))
}

/// Upstream health probe (public, general rate limit).
pub fn health_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/stocks/health", get(upstream_health))
}

// ─── Single-Ticker Endpoints ─────────────────────────────────

#[derive(Deserialize)]
struct HistoryQuery {
    ticker: String,
    from: Option<String>,
    to: Option<String>,
}

#[derive(Serialize)]
struct DataResponse {
    data: Value,
}

/// Historical data for one ticker, proxied through the cache.
async fn history(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<HistoryQuery>,
) -> Result<Json<DataResponse>> {
    let ticker = require_ticker(&params.ticker)?;

    tracing::debug!(
        ticker = %ticker,
        from = ?params.from,
        to = ?params.to,
        "Fetching history"
    );

    let data = state
        .stocks
        .history(&ticker, params.from.as_deref(), params.to.as_deref())
        .await?;

    Ok(Json(DataResponse { data }))
}

#[derive(Deserialize)]
struct PredictQuery {
    ticker: String,
    /// Prediction horizon in days, 1..=90 (upstream default applies when
    /// omitted)
    days: Option<u32>,
}

/// Prediction for one ticker, proxied through the cache.
async fn predict(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<PredictQuery>,
) -> Result<Json<DataResponse>> {
    let ticker = require_ticker(&params.ticker)?;

    if let Some(days) = params.days {
        if !(1..=90).contains(&days) {
            return Err(AppError::Validation(
                "days must be between 1 and 90".to_string(),
            ));
        }
    }

    tracing::debug!(ticker = %ticker, days = ?params.days, "Fetching prediction");

    let data = state.stocks.predict(&ticker, params.days).await?;

    Ok(Json(DataResponse { data }))
}

fn require_ticker(raw: &str) -> Result<String> {
    let ticker = raw.trim().to_uppercase();
    if is_valid_ticker(&ticker) {
        Ok(ticker)
    } else {
        Err(AppError::Validation(format!(
            "invalid ticker symbol: {}",
            raw
        )))
    }
}

// ─── Batch Endpoint ──────────────────────────────────────────

#[derive(Deserialize)]
pub struct BatchHistoryRequest {
    pub tickers: Vec<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Serialize)]
pub struct BatchHistoryResponse {
    pub data: HashMap<String, Value>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub errors: HashMap<String, String>,
}

/// Historical data for several tickers at once.
///
/// Shape errors reject the whole request with 400 before any upstream
/// dispatch; after that, per-ticker failures land in `errors` and the
/// response is always 200.
async fn batch_history(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<BatchHistoryRequest>,
) -> Result<Json<BatchHistoryResponse>> {
    tracing::debug!(count = req.tickers.len(), "Batch history request");

    let outcome = state
        .stocks
        .batch_history(&req.tickers, req.from.as_deref(), req.to.as_deref())
        .await?;

    Ok(Json(BatchHistoryResponse {
        data: outcome.results,
        errors: outcome.errors,
    }))
}

// ─── Health ──────────────────────────────────────────────────

#[derive(Serialize)]
struct UpstreamHealthResponse {
    status: String,
    upstream: String,
}

/// Report upstream reachability: 200 when the prediction service answers,
/// 503 otherwise.
async fn upstream_health(State(state): State<Arc<AppState>>) -> Response {
    match state.stocks.upstream_health().await {
        Ok(()) => Json(UpstreamHealthResponse {
            status: "ok".to_string(),
            upstream: "reachable".to_string(),
        })
        .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Upstream health probe failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorBody::new(e.to_string())),
            )
                .into_response()
        }
    }
}
