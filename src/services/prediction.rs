// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Prediction service client and resilient proxy layer.
//!
//! Handles:
//! - Historical data and prediction fetching
//! - Transport failure normalization into typed errors
//! - Batch fan-out with per-ticker partial-failure aggregation
//! - Read-through TTL caching

use crate::error::AppError;
use crate::models::user::is_valid_ticker;
use crate::services::cache::{fingerprint, ResponseCache};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// Per-call upstream timeout.
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum tickers per batch request.
pub const MAX_BATCH_TICKERS: usize = 10;

/// Low-level HTTP client for the prediction service.
#[derive(Clone)]
pub struct PredictionClient {
    http: reqwest::Client,
    base_url: String,
}

impl PredictionClient {
    /// Create a client for the given base URL with the standard timeout.
    pub fn new(base_url: &str) -> Self {
        Self::with_timeout(base_url, UPSTREAM_TIMEOUT)
    }

    /// Create a client with an explicit per-call timeout.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("HTTP client construction cannot fail with static options"),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch historical data for one ticker.
    pub async fn fetch_history(
        &self,
        ticker: &str,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<Value, AppError> {
        let url = format!("{}/history", self.base_url);

        let mut query: Vec<(&str, &str)> = vec![("ticker", ticker)];
        if let Some(from) = from {
            query.push(("from", from));
        }
        if let Some(to) = to {
            query.push(("to", to));
        }

        let response = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(map_transport_error)?;

        check_response_json(response).await
    }

    /// Fetch a prediction for one ticker, optionally bounding the horizon.
    pub async fn fetch_prediction(
        &self,
        ticker: &str,
        days: Option<u32>,
    ) -> Result<Value, AppError> {
        let url = format!("{}/predict", self.base_url);

        let days = days.map(|d| d.to_string());
        let mut query: Vec<(&str, &str)> = vec![("ticker", ticker)];
        if let Some(days) = days.as_deref() {
            query.push(("days", days));
        }

        let response = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(map_transport_error)?;

        check_response_json(response).await
    }

    /// Probe upstream reachability.
    pub async fn health(&self) -> Result<(), AppError> {
        let url = format!("{}/health", self.base_url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(map_transport_error)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(AppError::UpstreamUnavailable)
        }
    }
}

/// Normalize a transport failure into a typed error.
///
/// The mapping is exhaustive: callers only ever see the four upstream kinds,
/// never raw transport detail.
fn map_transport_error(e: reqwest::Error) -> AppError {
    if e.is_timeout() {
        AppError::UpstreamTimeout
    } else if e.is_connect() {
        AppError::UpstreamUnavailable
    } else {
        AppError::UpstreamFailure
    }
}

/// Check status and parse the JSON body.
///
/// Application-level upstream errors surface the upstream's own message
/// field when present.
async fn check_response_json(response: reqwest::Response) -> Result<Value, AppError> {
    let status = response.status();

    if !status.is_success() {
        let body: Value = response.json().await.unwrap_or(Value::Null);
        let message = upstream_error_message(&body)
            .unwrap_or_else(|| format!("prediction service returned HTTP {}", status.as_u16()));
        return Err(AppError::UpstreamRejected(message));
    }

    response.json().await.map_err(|e| {
        tracing::warn!(error = %e, "Unparseable body from prediction service");
        AppError::UpstreamFailure
    })
}

/// Extract the error message from an upstream error body.
///
/// The FastAPI upstream uses `detail`; `error` and `message` are accepted
/// for compatibility.
fn upstream_error_message(body: &Value) -> Option<String> {
    ["detail", "error", "message"]
        .iter()
        .find_map(|field| body.get(field))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

/// Outcome of a batch fan-out: per-ticker payloads and per-ticker failures.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub results: HashMap<String, Value>,
    pub errors: HashMap<String, String>,
}

/// High-level market-data service: caching plus batch aggregation in front
/// of the low-level client.
#[derive(Clone)]
pub struct StockDataService {
    client: PredictionClient,
    cache: ResponseCache,
    history_ttl: Duration,
    prediction_ttl: Duration,
}

impl StockDataService {
    /// Historical data cache TTL (5 minutes).
    pub const HISTORY_TTL: Duration = Duration::from_secs(5 * 60);
    /// Prediction cache TTL (15 minutes).
    pub const PREDICTION_TTL: Duration = Duration::from_secs(15 * 60);

    pub fn new(client: PredictionClient, cache: ResponseCache) -> Self {
        Self {
            client,
            cache,
            history_ttl: Self::HISTORY_TTL,
            prediction_ttl: Self::PREDICTION_TTL,
        }
    }

    /// Override the cache TTLs (tests only need short ones).
    pub fn with_ttls(mut self, history: Duration, prediction: Duration) -> Self {
        self.history_ttl = history;
        self.prediction_ttl = prediction;
        self
    }

    /// Historical data for one ticker, read through the cache.
    pub async fn history(
        &self,
        ticker: &str,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<Value, AppError> {
        let key = fingerprint(
            "history",
            &[("ticker", Some(ticker)), ("from", from), ("to", to)],
        );

        if let Some(hit) = self.cache.get(&key) {
            tracing::debug!(ticker, "History served from cache");
            return Ok(hit);
        }

        let payload = self.client.fetch_history(ticker, from, to).await?;
        self.cache.insert(&key, payload.clone(), self.history_ttl);
        Ok(payload)
    }

    /// Prediction for one ticker, read through the cache.
    pub async fn predict(&self, ticker: &str, days: Option<u32>) -> Result<Value, AppError> {
        let days_str = days.map(|d| d.to_string());
        let key = fingerprint(
            "predict",
            &[("ticker", Some(ticker)), ("days", days_str.as_deref())],
        );

        if let Some(hit) = self.cache.get(&key) {
            tracing::debug!(ticker, "Prediction served from cache");
            return Ok(hit);
        }

        let payload = self.client.fetch_prediction(ticker, days).await?;
        self.cache.insert(&key, payload.clone(), self.prediction_ttl);
        Ok(payload)
    }

    /// Historical data for up to [`MAX_BATCH_TICKERS`] tickers.
    ///
    /// Input shape is validated before any upstream call; one invalid entry
    /// fails the whole batch. After validation the fan-out is concurrent and
    /// failures are isolated per ticker: the aggregate always succeeds,
    /// carrying whichever tickers worked plus an error map for the rest.
    pub async fn batch_history(
        &self,
        tickers: &[String],
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<BatchOutcome, AppError> {
        validate_batch_tickers(tickers)?;

        // Fingerprint over the sorted ticker set, so request order is
        // irrelevant to the cache too.
        let mut sorted = tickers.to_vec();
        sorted.sort();
        sorted.dedup();
        let joined = sorted.join(",");
        let key = fingerprint(
            "batch-history",
            &[("tickers", Some(joined.as_str())), ("from", from), ("to", to)],
        );

        if let Some(hit) = self.cache.get(&key) {
            if let Ok(results) = serde_json::from_value(hit) {
                tracing::debug!(count = sorted.len(), "Batch history served from cache");
                return Ok(BatchOutcome {
                    results,
                    errors: HashMap::new(),
                });
            }
        }

        // Dispatch every call before awaiting any; one ticker's failure or
        // timeout never cancels or delays its siblings.
        let calls = sorted
            .iter()
            .map(|ticker| async move {
                let outcome = self.client.fetch_history(ticker, from, to).await;
                (ticker.clone(), outcome)
            });
        let outcomes = futures_util::future::join_all(calls).await;

        let mut batch = BatchOutcome::default();
        for (ticker, outcome) in outcomes {
            match outcome {
                Ok(payload) => {
                    batch.results.insert(ticker, payload);
                }
                Err(e) => {
                    tracing::warn!(ticker = %ticker, error = %e, "Batch ticker failed");
                    batch.errors.insert(ticker, e.to_string());
                }
            }
        }

        // Only fully-successful batches are cached; a cached error map would
        // outlive the upstream condition that produced it.
        if batch.errors.is_empty() {
            if let Ok(value) = serde_json::to_value(&batch.results) {
                self.cache.insert(&key, value, self.history_ttl);
            }
        }

        Ok(batch)
    }

    /// Upstream reachability for the health endpoint.
    pub async fn upstream_health(&self) -> Result<(), AppError> {
        self.client.health().await
    }
}

/// Fail-fast shape validation for a batch ticker set.
pub fn validate_batch_tickers(tickers: &[String]) -> Result<(), AppError> {
    if tickers.is_empty() {
        return Err(AppError::Validation(
            "tickers must contain at least one symbol".to_string(),
        ));
    }
    if tickers.len() > MAX_BATCH_TICKERS {
        return Err(AppError::Validation(format!(
            "tickers must contain at most {} symbols",
            MAX_BATCH_TICKERS
        )));
    }
    for ticker in tickers {
        if !is_valid_ticker(ticker) {
            return Err(AppError::Validation(format!(
                "invalid ticker symbol: {}",
                ticker
            )));
        }
    }
    Ok(())
}
