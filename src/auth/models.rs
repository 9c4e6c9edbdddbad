//! Authentication Models
//! Mission: User accounts, role hierarchy, and JWT claim shapes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // bcrypt hash - never serialize
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

/// Totally-ordered role hierarchy. An endpoint requiring role R admits any
/// token whose role level is >= level(R).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UserRole {
    #[serde(rename = "TRADER")]
    Trader,
    #[serde(rename = "RISK_MANAGER")]
    RiskManager,
    #[serde(rename = "COMPLIANCE")]
    Compliance,
    #[serde(rename = "ADMIN")]
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &str {
        match self {
            UserRole::Trader => "TRADER",
            UserRole::RiskManager => "RISK_MANAGER",
            UserRole::Compliance => "COMPLIANCE",
            UserRole::Admin => "ADMIN",
        }
    }

    pub fn level(&self) -> u8 {
        match self {
            UserRole::Trader => 1,
            UserRole::RiskManager => 2,
            UserRole::Compliance => 3,
            UserRole::Admin => 4,
        }
    }

    pub fn at_least(&self, required: UserRole) -> bool {
        self.level() >= required.level()
    }
}

/// JWT Claims payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the username
    pub sub: String,
    pub user_id: String,
    pub role: UserRole,
    /// Expiration timestamp (seconds since epoch)
    pub exp: usize,
}

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    /// Seconds until expiration
    pub expires_in: usize,
}
