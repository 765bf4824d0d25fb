// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-client-address request-rate governance.
//!
//! Three independent route classes (auth, stock-data, general), each with a
//! fixed counting window and ceiling per client address. Counters live in a
//! shared concurrent map; the entry is updated under its shard lock so
//! concurrent requests from one client cannot lose updates.

use crate::config::{RateQuota, RateQuotas};
use crate::error::ErrorBody;
use crate::AppState;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Route classes with independent windows and ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteClass {
    /// Register/login
    Auth,
    /// History/predict/batch-history
    StockData,
    /// All other API routes
    General,
}

impl RouteClass {
    fn quota(self, quotas: &RateQuotas) -> RateQuota {
        match self {
            RouteClass::Auth => quotas.auth,
            RouteClass::StockData => quotas.stock_data,
            RouteClass::General => quotas.general,
        }
    }

    fn message(self) -> &'static str {
        match self {
            RouteClass::Auth => "too many authentication attempts, please try again later",
            RouteClass::StockData => "too many market data requests, please slow down",
            RouteClass::General => "too many requests, please try again later",
        }
    }
}

struct Window {
    started: Instant,
    count: u32,
}

/// What the limiter decided for one request.
#[derive(Debug, Clone, Copy)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Time until the active window resets.
    pub reset_after: Duration,
}

/// Fixed-window rate limiter keyed by (route class, client address).
///
/// Clones share the same underlying counters.
#[derive(Clone)]
pub struct RateLimiter {
    quotas: RateQuotas,
    windows: Arc<DashMap<(RouteClass, String), Window>>,
}

impl RateLimiter {
    /// Create a limiter with the given per-class quotas and empty counters.
    pub fn new(quotas: RateQuotas) -> Self {
        Self {
            quotas,
            windows: Arc::new(DashMap::new()),
        }
    }

    /// Count one request from `client` against `class` and decide.
    pub fn check(&self, class: RouteClass, client: &str) -> RateDecision {
        let quota = class.quota(&self.quotas);
        let now = Instant::now();

        let mut entry = self
            .windows
            .entry((class, client.to_string()))
            .or_insert_with(|| Window {
                started: now,
                count: 0,
            });

        // Window elapsed: reset in place
        if now.duration_since(entry.started) >= quota.window {
            entry.started = now;
            entry.count = 0;
        }

        let allowed = entry.count < quota.max;
        if allowed {
            entry.count += 1;
        }

        let reset_after = quota
            .window
            .saturating_sub(now.duration_since(entry.started));

        RateDecision {
            allowed,
            limit: quota.max,
            remaining: quota.max.saturating_sub(entry.count),
            reset_after,
        }
    }

    /// Drop windows that have fully elapsed. Optional maintenance.
    pub fn purge_elapsed(&self) {
        let now = Instant::now();
        let quotas = self.quotas;
        self.windows.retain(|(class, _), window| {
            now.duration_since(window.started) < class.quota(&quotas).window
        });
    }
}

/// Middleware for the auth route class.
pub async fn limit_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    enforce(state, RouteClass::Auth, request, next).await
}

/// Middleware for the stock-data route class.
pub async fn limit_stock_data(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    enforce(state, RouteClass::StockData, request, next).await
}

/// Middleware for the general route class.
pub async fn limit_general(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    enforce(state, RouteClass::General, request, next).await
}

async fn enforce(
    state: Arc<AppState>,
    class: RouteClass,
    request: Request,
    next: Next,
) -> Response {
    let client = client_address(&state, &request);
    let decision = state.rate_limiter.check(class, &client);

    if !decision.allowed {
        tracing::warn!(
            client = %client,
            class = ?class,
            limit = decision.limit,
            "Rate limit exceeded"
        );

        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorBody::new(class.message())),
        )
            .into_response();
        apply_headers(&mut response, decision);
        return response;
    }

    let mut response = next.run(request).await;
    apply_headers(&mut response, decision);
    response
}

/// Surface the limiter state via standard rate-limit headers.
fn apply_headers(response: &mut Response, decision: RateDecision) {
    let headers = response.headers_mut();
    headers.insert("RateLimit-Limit", int_header(decision.limit as u64));
    headers.insert("RateLimit-Remaining", int_header(decision.remaining as u64));
    headers.insert(
        "RateLimit-Reset",
        int_header(decision.reset_after.as_secs()),
    );
}

fn int_header(value: u64) -> HeaderValue {
    // Decimal integers are always valid header values
    HeaderValue::from_str(&value.to_string()).expect("integer header value")
}

/// Identify the client for limiting purposes.
///
/// The peer address is authoritative unless the service sits behind a
/// trusted reverse proxy, in which case the first `X-Forwarded-For` entry
/// wins.
fn client_address(state: &AppState, request: &Request) -> String {
    if state.config.trust_proxy {
        if let Some(forwarded) = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
        {
            return forwarded.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateQuota;

    fn quotas(auth_max: u32, window: Duration) -> RateQuotas {
        RateQuotas {
            auth: RateQuota {
                window,
                max: auth_max,
            },
            ..RateQuotas::default()
        }
    }

    #[test]
    fn test_ceiling_within_window() {
        let limiter = RateLimiter::new(quotas(5, Duration::from_secs(900)));

        for i in 0..5 {
            let decision = limiter.check(RouteClass::Auth, "10.0.0.1");
            assert!(decision.allowed, "request {} should pass", i + 1);
            assert_eq!(decision.remaining, 4 - i);
        }

        let sixth = limiter.check(RouteClass::Auth, "10.0.0.1");
        assert!(!sixth.allowed);
        assert_eq!(sixth.remaining, 0);
        assert!(sixth.reset_after <= Duration::from_secs(900));
    }

    #[test]
    fn test_window_reset() {
        let limiter = RateLimiter::new(quotas(1, Duration::from_millis(20)));

        assert!(limiter.check(RouteClass::Auth, "10.0.0.1").allowed);
        assert!(!limiter.check(RouteClass::Auth, "10.0.0.1").allowed);

        std::thread::sleep(Duration::from_millis(40));

        assert!(limiter.check(RouteClass::Auth, "10.0.0.1").allowed);
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = RateLimiter::new(quotas(1, Duration::from_secs(900)));

        assert!(limiter.check(RouteClass::Auth, "10.0.0.1").allowed);
        assert!(!limiter.check(RouteClass::Auth, "10.0.0.1").allowed);
        assert!(limiter.check(RouteClass::Auth, "10.0.0.2").allowed);
    }

    #[test]
    fn test_route_classes_are_independent() {
        let limiter = RateLimiter::new(quotas(1, Duration::from_secs(900)));

        assert!(limiter.check(RouteClass::Auth, "10.0.0.1").allowed);
        assert!(!limiter.check(RouteClass::Auth, "10.0.0.1").allowed);

        // Same address, different class: separate counter
        assert!(limiter.check(RouteClass::StockData, "10.0.0.1").allowed);
        assert!(limiter.check(RouteClass::General, "10.0.0.1").allowed);
    }

    #[test]
    fn test_concurrent_counting_no_lost_updates() {
        let limiter = RateLimiter::new(quotas(1000, Duration::from_secs(900)));
        let mut handles = Vec::new();

        for _ in 0..8 {
            let limiter = limiter.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..50 {
                    limiter.check(RouteClass::Auth, "10.0.0.1");
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        // 400 requests counted exactly
        let next = limiter.check(RouteClass::Auth, "10.0.0.1");
        assert_eq!(next.remaining, 1000 - 401);
    }

    #[test]
    fn test_purge_elapsed() {
        let limiter = RateLimiter::new(quotas(5, Duration::from_millis(10)));
        limiter.check(RouteClass::Auth, "10.0.0.1");
        assert_eq!(limiter.windows.len(), 1);

        std::thread::sleep(Duration::from_millis(30));
        limiter.purge_elapsed();
        assert!(limiter.windows.is_empty());
    }
}
