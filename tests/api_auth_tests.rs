// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API authentication and CORS tests.
//!
//! These tests verify that:
//! 1. Protected routes reject requests without valid tokens, with the
//!    documented per-kind messages
//! 2. Protected routes accept requests with valid tokens
//! 3. CORS preflight requests return correct headers

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::{body_json, create_test_app, get_with_token, post_json, register_user};

#[tokio::test]
async fn test_protected_route_without_token() {
    let (app, _) = create_test_app();

    let response = get_with_token(&app, "/api/auth/profile", None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "access token required");
}

#[tokio::test]
async fn test_protected_route_with_garbage_token() {
    let (app, _) = create_test_app();

    let response = get_with_token(&app, "/api/auth/profile", Some("invalid.token.here")).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["message"], "invalid token");
}

#[tokio::test]
async fn test_protected_route_with_tampered_token() {
    let (app, _) = create_test_app();
    let (token, _) = register_user(&app, "alice@example.com", "hunter4242").await;

    // Flip the last signature character
    let mut tampered = token.clone();
    let last = tampered.pop().unwrap();
    tampered.push(if last == 'A' { 'B' } else { 'A' });

    let response = get_with_token(&app, "/api/auth/profile", Some(&tampered)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["message"], "invalid token");
}

#[tokio::test]
async fn test_protected_route_with_expired_token() {
    let (app, state) = create_test_app();
    let (_, user_id) = register_user(&app, "alice@example.com", "hunter4242").await;

    // Issue with a zero-lifetime service sharing the app's secret, then
    // backdate past validation leeway by signing expired claims directly.
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize;
    let claims = json!({"sub": user_id, "iat": now - 7200, "exp": now - 3600});
    let stale = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(&state.config.jwt_secret),
    )
    .unwrap();

    let response = get_with_token(&app, "/api/auth/profile", Some(&stale)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["message"], "token expired");
}

#[tokio::test]
async fn test_valid_token_for_unknown_user() {
    let (app, state) = create_test_app();

    // Properly signed token for a subject that was never registered
    let token = state.tokens.issue("no-such-user").unwrap();
    let response = get_with_token(&app, "/api/auth/profile", Some(&token)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["message"], "invalid token or user not found");
}

#[tokio::test]
async fn test_deactivated_user_rejected_everywhere() {
    let (app, state) = create_test_app();
    let (token, user_id) = register_user(&app, "alice@example.com", "hunter4242").await;

    state.users.set_active(&user_id, false).unwrap();

    // Still-valid token, but the account is deactivated: 401 on every
    // authenticated route
    for uri in ["/api/auth/profile", "/api/stocks/history?ticker=AAPL"] {
        let response = get_with_token(&app, uri, Some(&token)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "uri {}", uri);
        let body = body_json(response).await;
        assert_eq!(body["message"], "invalid token or user not found");
    }

    let response = post_json(
        &app,
        "/api/auth/favorites",
        Some(&token),
        json!({"ticker": "AAPL"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_with_valid_token() {
    let (app, _) = create_test_app();
    let (token, _) = register_user(&app, "alice@example.com", "hunter4242").await;

    let response = get_with_token(&app, "/api/auth/profile", Some(&token)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["user"]["email"], "alice@example.com");
}

#[tokio::test]
async fn test_cors_preflight() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/auth/profile")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // OPTIONS should return 200 (CORS preflight success)
    assert_eq!(response.status(), StatusCode::OK);

    // Should have CORS headers
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
}

#[tokio::test]
async fn test_optional_auth_attaches_identity_when_present() {
    use axum::{middleware, routing::get, Extension, Router};
    use stockdash::middleware::auth::{optional_auth, AuthUser};

    let (_, state) = create_test_app();
    let user = state.users.register("alice@example.com", "hash".into()).unwrap();
    let token = state.tokens.issue(&user.id).unwrap();

    async fn whoami(identity: Option<Extension<AuthUser>>) -> String {
        identity
            .map(|Extension(u)| u.email)
            .unwrap_or_else(|| "anonymous".to_string())
    }

    let app = Router::new()
        .route("/whoami", get(whoami))
        .layer(middleware::from_fn_with_state(state.clone(), optional_auth));

    // With a valid token the identity is attached
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/whoami")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"alice@example.com");

    // Verification failures proceed without identity instead of rejecting
    for auth in [None, Some("Bearer garbage")] {
        let mut builder = Request::builder().uri("/whoami");
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        let response = app
            .clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"anonymous");
    }
}

#[tokio::test]
async fn test_public_route_no_auth_required() {
    let (app, _) = create_test_app();

    let response = get_with_token(&app, "/health", None).await;

    // Liveness should be accessible without auth
    assert_eq!(response.status(), StatusCode::OK);
}
