//! JWT Token Handler
//! Mission: Issue and validate HS256 bearer tokens

use crate::auth::models::{Claims, User};
use anyhow::{Context, Result};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use tracing::debug;

/// JWT Handler for token operations
pub struct JwtHandler {
    secret: String,
    expiration_minutes: i64,
}

impl JwtHandler {
    /// Create a new JWT handler with secret key. Tokens expire after 30
    /// minutes.
    pub fn new(secret: String) -> Self {
        Self {
            secret,
            expiration_minutes: 30,
        }
    }

    /// Generate a token for a user, returning the token and its lifetime
    /// in seconds
    pub fn generate_token(&self, user: &User) -> Result<(String, usize)> {
        let expiration = Utc::now()
            .checked_add_signed(chrono::Duration::minutes(self.expiration_minutes))
            .context("Invalid timestamp")?
            .timestamp() as usize;

        let expires_in = (self.expiration_minutes * 60) as usize;

        let claims = Claims {
            sub: user.username.clone(),
            user_id: user.id.to_string(),
            role: user.role,
            exp: expiration,
        };

        debug!(
            "Issuing JWT for user {} ({}), expires in {}m",
            user.username, user.id, self.expiration_minutes
        );

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .context("Failed to generate JWT")?;

        Ok((token, expires_in))
    }

    /// Validate a token and extract its claims
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .context("Invalid or expired token")?;

        Ok(decoded.claims)
    }
}
