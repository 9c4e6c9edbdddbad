//! Authentication API Endpoints
//! Mission: Credential exchange for bearer tokens

use crate::auth::{
    middleware::AuthError,
    models::{LoginRequest, LoginResponse},
};
use crate::api::AppState;
use axum::{extract::State, Json};
use tracing::{info, warn};

/// Login endpoint - POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthError> {
    let valid = state
        .user_store
        .verify_password(&payload.username, &payload.password)
        .map_err(|_| AuthError::Internal)?;

    if !valid {
        warn!("Failed login attempt: {}", payload.username);
        return Err(AuthError::InvalidCredentials);
    }

    let user = state
        .user_store
        .get_user_by_username(&payload.username)
        .ok_or(AuthError::InvalidCredentials)?;

    let (access_token, expires_in) = state
        .jwt_handler
        .generate_token(&user)
        .map_err(|_| AuthError::Internal)?;

    info!(
        "🔐 Login successful: {} ({})",
        user.username,
        user.role.as_str()
    );

    Ok(Json(LoginResponse {
        access_token,
        token_type: "bearer".to_string(),
        expires_in,
    }))
}
