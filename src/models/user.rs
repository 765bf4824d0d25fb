//! User model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Dashboard user record.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Opaque unique identifier (UUID v4), assigned at creation
    pub id: String,
    /// Email address, lowercase, unique case-insensitively
    pub email: String,
    /// Bcrypt password hash, never serialized outward
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Favorite ticker symbols, each matching `^[A-Z]{1,5}$`, no duplicates
    pub favorites: Vec<String>,
    /// Dashboard preferences
    pub profile: UserProfile,
    /// Deactivated accounts may not authenticate
    pub is_active: bool,
    /// Last successful login
    pub last_login: Option<DateTime<Utc>>,
    /// Successful login count, never decreases
    pub login_count: u64,
    /// When the account was registered
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a fresh user record with default preferences.
    ///
    /// The email must already be normalized to lowercase.
    pub fn new(email: String, password_hash: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            email,
            password_hash,
            favorites: Vec::new(),
            profile: UserProfile::default(),
            is_active: true,
            last_login: None,
            login_count: 0,
            created_at: Utc::now(),
        }
    }
}

/// Dashboard preferences, constrained to enumerated option values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub display_name: Option<String>,
    pub timezone: String,
    pub default_range: DateRange,
    pub chart_type: ChartType,
    pub show_predictions: bool,
    pub theme: Theme,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            display_name: None,
            timezone: "UTC".to_string(),
            default_range: DateRange::OneMonth,
            chart_type: ChartType::Line,
            show_predictions: true,
            theme: Theme::Dark,
        }
    }
}

/// Default chart date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateRange {
    #[serde(rename = "1w")]
    OneWeek,
    #[serde(rename = "1m")]
    OneMonth,
    #[serde(rename = "3m")]
    ThreeMonths,
    #[serde(rename = "6m")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
}

impl FromStr for DateRange {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "1w" => Ok(Self::OneWeek),
            "1m" => Ok(Self::OneMonth),
            "3m" => Ok(Self::ThreeMonths),
            "6m" => Ok(Self::SixMonths),
            "1y" => Ok(Self::OneYear),
            _ => Err(()),
        }
    }
}

/// Chart rendering style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Line,
    Candlestick,
    Area,
}

impl FromStr for ChartType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "line" => Ok(Self::Line),
            "candlestick" => Ok(Self::Candlestick),
            "area" => Ok(Self::Area),
            _ => Err(()),
        }
    }
}

/// UI color theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl FromStr for Theme {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            _ => Err(()),
        }
    }
}

/// Check a candidate ticker symbol against `^[A-Z]{1,5}$`.
pub fn is_valid_ticker(ticker: &str) -> bool {
    !ticker.is_empty() && ticker.len() <= 5 && ticker.bytes().all(|b| b.is_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticker_pattern() {
        assert!(is_valid_ticker("A"));
        assert!(is_valid_ticker("AAPL"));
        assert!(is_valid_ticker("GOOGL"));

        assert!(!is_valid_ticker(""));
        assert!(!is_valid_ticker("TOOLONG"));
        assert!(!is_valid_ticker("aapl"));
        assert!(!is_valid_ticker("BRK.B"));
        assert!(!is_valid_ticker("AAP1"));
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User::new("a@b.com".into(), "$2b$12$hash".into());
        let json = serde_json::to_value(&user).unwrap();

        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "a@b.com");
        assert_eq!(json["is_active"], true);
    }

    #[test]
    fn test_profile_enum_wire_format() {
        let profile = UserProfile::default();
        let json = serde_json::to_value(&profile).unwrap();

        assert_eq!(json["default_range"], "1m");
        assert_eq!(json["chart_type"], "line");
        assert_eq!(json["theme"], "dark");
    }

    #[test]
    fn test_enum_parsing_rejects_unknown_values() {
        assert!(DateRange::from_str("2w").is_err());
        assert!(ChartType::from_str("bar").is_err());
        assert!(Theme::from_str("solarized").is_err());
    }
}
