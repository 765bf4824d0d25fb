// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Registration, login, profile and favorites routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::user::is_valid_ticker;
use crate::models::{ChartType, DateRange, Theme, User, UserProfile};
use crate::routes::extractors::AppJson;
use crate::AppState;

/// Public auth routes (register/login).
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
}

/// Account routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn account_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/profile", get(get_profile).put(update_profile))
        .route("/api/auth/favorites", post(add_favorite))
        .route(
            "/api/auth/favorites/{ticker}",
            axum::routing::delete(remove_favorite),
        )
}

// ─── Register / Login ────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(custom(function = validate_password_strength))]
    pub password: String,
}

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
}

/// Token plus user payload returned by register and login.
#[derive(Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// User-only payload returned by profile and favorites routes.
#[derive(Serialize)]
pub struct UserResponse {
    pub user: User,
}

/// Minimum 8 chars with at least one letter and one digit.
fn validate_password_strength(password: &str) -> std::result::Result<(), validator::ValidationError> {
    let long_enough = password.len() >= 8;
    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if long_enough && has_letter && has_digit {
        Ok(())
    } else {
        let mut err = validator::ValidationError::new("password_strength");
        err.message = Some("must be at least 8 characters with a letter and a digit".into());
        Err(err)
    }
}

/// Flatten validator output into the per-field error map.
fn check(input: &impl Validate) -> Result<()> {
    let errors = match input.validate() {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };

    let mut fields = BTreeMap::new();
    for (field, errs) in errors.field_errors() {
        let message = errs
            .first()
            .and_then(|e| e.message.as_ref())
            .map(|m| m.to_string())
            .unwrap_or_else(|| "is invalid".to_string());
        fields.insert(field.to_string(), message);
    }
    Err(AppError::FieldValidation(fields))
}

/// Create an account and issue a token.
async fn register(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    check(&req)?;

    let email = req.email.trim().to_lowercase();
    let password_hash = state.hasher.hash(&req.password)?;

    let user = state.users.register(&email, password_hash)?;
    let token = state
        .tokens
        .issue(&user.id)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("token issuance failed: {}", e)))?;

    tracing::info!(user_id = %user.id, "User registered");

    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

/// Verify credentials and issue a token.
async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    check(&req)?;

    let email = req.email.trim().to_lowercase();

    let user = state
        .users
        .find_by_email(&email)
        .ok_or(AppError::InvalidCredentials)?;

    if !state.hasher.verify(&req.password, &user.password_hash) {
        tracing::debug!(user_id = %user.id, "Password mismatch");
        return Err(AppError::InvalidCredentials);
    }

    if !user.is_active {
        return Err(AppError::AccountDeactivated);
    }

    let user = state.users.record_login(&user.id)?;
    let token = state
        .tokens
        .issue(&user.id)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("token issuance failed: {}", e)))?;

    tracing::info!(user_id = %user.id, login_count = user.login_count, "Login");

    Ok(Json(AuthResponse { token, user }))
}

// ─── Profile ─────────────────────────────────────────────────

/// Get current user profile.
async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<UserResponse>> {
    let user = state
        .users
        .find_by_id(&auth.user_id)
        .ok_or_else(|| AppError::NotFound(format!("user {} not found", auth.user_id)))?;

    Ok(Json(UserResponse { user }))
}

/// Partial profile update; omitted fields keep their current values.
#[derive(Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(max = 50, message = "must be at most 50 characters"))]
    pub display_name: Option<String>,
    #[validate(length(min = 1, max = 64, message = "must be a timezone name"))]
    pub timezone: Option<String>,
    pub default_range: Option<String>,
    pub chart_type: Option<String>,
    pub show_predictions: Option<bool>,
    pub theme: Option<String>,
}

/// Update preference fields on the current user.
async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    AppJson(req): AppJson<UpdateProfileRequest>,
) -> Result<Json<UserResponse>> {
    check(&req)?;

    let current = state
        .users
        .find_by_id(&auth.user_id)
        .ok_or_else(|| AppError::NotFound(format!("user {} not found", auth.user_id)))?;

    let profile = merge_profile(current.profile, &req)?;
    let user = state.users.update_profile(&auth.user_id, profile)?;

    tracing::debug!(user_id = %user.id, "Profile updated");

    Ok(Json(UserResponse { user }))
}

/// Apply the requested changes over the stored profile, rejecting values
/// outside the enumerated options with per-field errors.
fn merge_profile(mut profile: UserProfile, req: &UpdateProfileRequest) -> Result<UserProfile> {
    let mut fields = BTreeMap::new();

    if let Some(name) = &req.display_name {
        profile.display_name = Some(name.clone());
    }
    if let Some(tz) = &req.timezone {
        profile.timezone = tz.clone();
    }
    if let Some(range) = &req.default_range {
        match DateRange::from_str(range) {
            Ok(r) => profile.default_range = r,
            Err(()) => {
                fields.insert(
                    "default_range".to_string(),
                    "must be one of: 1w, 1m, 3m, 6m, 1y".to_string(),
                );
            }
        }
    }
    if let Some(chart) = &req.chart_type {
        match ChartType::from_str(chart) {
            Ok(c) => profile.chart_type = c,
            Err(()) => {
                fields.insert(
                    "chart_type".to_string(),
                    "must be one of: line, candlestick, area".to_string(),
                );
            }
        }
    }
    if let Some(show) = req.show_predictions {
        profile.show_predictions = show;
    }
    if let Some(theme) = &req.theme {
        match Theme::from_str(theme) {
            Ok(t) => profile.theme = t,
            Err(()) => {
                fields.insert(
                    "theme".to_string(),
                    "must be one of: light, dark".to_string(),
                );
            }
        }
    }

    if fields.is_empty() {
        Ok(profile)
    } else {
        Err(AppError::FieldValidation(fields))
    }
}

// ─── Favorites ───────────────────────────────────────────────

#[derive(Deserialize)]
pub struct FavoriteRequest {
    pub ticker: String,
}

/// Add a ticker to the current user's favorites.
async fn add_favorite(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    AppJson(req): AppJson<FavoriteRequest>,
) -> Result<Json<UserResponse>> {
    let ticker = req.ticker.trim().to_uppercase();
    if !is_valid_ticker(&ticker) {
        return Err(AppError::Validation(format!(
            "invalid ticker symbol: {}",
            req.ticker
        )));
    }

    let current = state
        .users
        .find_by_id(&auth.user_id)
        .ok_or_else(|| AppError::NotFound(format!("user {} not found", auth.user_id)))?;

    if current.favorites.iter().any(|t| t == &ticker) {
        return Err(AppError::Conflict(format!(
            "{} is already in favorites",
            ticker
        )));
    }

    let user = state.users.add_favorite(&auth.user_id, &ticker)?;
    tracing::debug!(user_id = %user.id, ticker = %ticker, "Favorite added");

    Ok(Json(UserResponse { user }))
}

/// Remove a ticker from the current user's favorites.
async fn remove_favorite(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(ticker): Path<String>,
) -> Result<Json<UserResponse>> {
    let ticker = ticker.trim().to_uppercase();

    let current = state
        .users
        .find_by_id(&auth.user_id)
        .ok_or_else(|| AppError::NotFound(format!("user {} not found", auth.user_id)))?;

    if !current.favorites.iter().any(|t| t == &ticker) {
        return Err(AppError::NotFound(format!("{} is not in favorites", ticker)));
    }

    let user = state.users.remove_favorite(&auth.user_id, &ticker)?;
    tracing::debug!(user_id = %user.id, ticker = %ticker, "Favorite removed");

    Ok(Json(UserResponse { user }))
}
