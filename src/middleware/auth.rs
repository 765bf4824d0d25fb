// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT authentication middleware.

use crate::error::AppError;
use crate::services::TokenError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Authenticated identity extracted from a verified token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub email: String,
}

/// Middleware that requires valid bearer-token authentication.
///
/// The token must verify, and the referenced user must exist and be active.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&request).ok_or(AppError::AuthMissing)?;

    let auth_user = resolve_identity(&state, &token)?;
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

/// Middleware for routes that personalize but do not require identity.
///
/// Any verification failure proceeds without identity rather than
/// rejecting.
pub async fn optional_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(&request) {
        if let Ok(auth_user) = resolve_identity(&state, &token) {
            request.extensions_mut().insert(auth_user);
        }
    }

    next.run(request).await
}

/// Extract the token from an `Authorization: Bearer <token>` header.
fn bearer_token(request: &Request) -> Option<String> {
    let header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())?;

    header.strip_prefix("Bearer ").map(|t| t.to_string())
}

/// Verify the token and look up the referenced user.
fn resolve_identity(state: &AppState, token: &str) -> Result<AuthUser, AppError> {
    let claims = state.tokens.verify(token).map_err(|e| match e {
        TokenError::Expired => AppError::AuthExpired,
        TokenError::InvalidSignature | TokenError::Malformed => AppError::AuthInvalid,
    })?;

    let user = state
        .users
        .find_by_id(&claims.sub)
        .filter(|u| u.is_active)
        .ok_or(AppError::AuthUserNotFound)?;

    Ok(AuthUser {
        user_id: user.id,
        email: user.email,
    })
}
