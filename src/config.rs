//! Application configuration loaded from environment variables.
//!
//! Secrets (the JWT signing key) are read once at startup and cached in
//! memory for the lifetime of the process.

use std::env;
use std::time::Duration;

/// Quota for one rate-limit route class.
#[derive(Debug, Clone, Copy)]
pub struct RateQuota {
    /// Length of the fixed counting window.
    pub window: Duration,
    /// Maximum requests per client address within one window.
    pub max: u32,
}

/// Rate-limit quotas for the three route classes.
#[derive(Debug, Clone, Copy)]
pub struct RateQuotas {
    /// Register/login attempts.
    pub auth: RateQuota,
    /// History/predict/batch-history requests.
    pub stock_data: RateQuota,
    /// Every other API route.
    pub general: RateQuota,
}

impl Default for RateQuotas {
    fn default() -> Self {
        Self {
            auth: RateQuota {
                window: Duration::from_secs(15 * 60),
                max: 5,
            },
            stock_data: RateQuota {
                window: Duration::from_secs(60),
                max: 30,
            },
            general: RateQuota {
                window: Duration::from_secs(15 * 60),
                max: 100,
            },
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL for CORS
    pub frontend_url: String,
    /// Base URL of the prediction service
    pub upstream_url: String,
    /// Server port
    pub port: u16,
    /// Honor X-Forwarded-For when sitting behind a reverse proxy
    pub trust_proxy: bool,
    /// Token lifetime in days
    pub token_expiry_days: i64,
    /// Bcrypt work factor for password hashing
    pub bcrypt_cost: u32,
    /// Per-class rate-limit quotas
    pub rate_quotas: RateQuotas,

    // --- Secrets ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_secret: Vec<u8>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            upstream_url: env::var("ML_SERVICE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            trust_proxy: env_flag("TRUST_PROXY"),
            token_expiry_days: env_parse("TOKEN_EXPIRY_DAYS", 7),
            bcrypt_cost: env_parse("BCRYPT_COST", 12),
            rate_quotas: rate_quotas_from_env(),

            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| ConfigError::Missing("JWT_SECRET"))?
                .into_bytes(),
        })
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            upstream_url: "http://localhost:8000".to_string(),
            port: 8080,
            trust_proxy: false,
            token_expiry_days: 7,
            // Minimum bcrypt cost keeps the test suite fast
            bcrypt_cost: 4,
            rate_quotas: RateQuotas::default(),
            jwt_secret: b"test_jwt_key_32_bytes_minimum!!!".to_vec(),
        }
    }
}

/// Read the per-class rate-limit quotas, honoring env overrides.
fn rate_quotas_from_env() -> RateQuotas {
    let defaults = RateQuotas::default();

    RateQuotas {
        auth: quota_from_env("AUTH", defaults.auth),
        stock_data: quota_from_env("STOCK", defaults.stock_data),
        general: quota_from_env("GENERAL", defaults.general),
    }
}

fn quota_from_env(prefix: &str, default: RateQuota) -> RateQuota {
    let window_secs = env::var(format!("{prefix}_RATE_WINDOW_SECS"))
        .ok()
        .and_then(|v| v.parse().ok());

    RateQuota {
        window: window_secs.map(Duration::from_secs).unwrap_or(default.window),
        max: env::var(format!("{prefix}_RATE_MAX"))
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default.max),
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "yes"))
        .unwrap_or(false)
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
