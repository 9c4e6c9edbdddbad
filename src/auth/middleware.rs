//! Authentication Middleware
//! Mission: Bearer-token validation and role-hierarchy enforcement

use crate::auth::{
    jwt::JwtHandler,
    models::{Claims, UserRole},
};
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use futures_util::future::BoxFuture;
use serde_json::json;
use std::sync::Arc;

/// Validates the Authorization bearer token and stores the claims in the
/// request extensions for downstream handlers and guards.
pub async fn auth_middleware(
    State(jwt_handler): State<Arc<JwtHandler>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|t| t.to_string())
        .ok_or(AuthError::MissingToken)?;

    let claims = jwt_handler
        .validate_token(&token)
        .map_err(|_| AuthError::InvalidToken)?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Guard factory: admits requests whose token role is at least `required`.
/// Layer after `auth_middleware` so the claims are present.
pub fn require_role(
    required: UserRole,
) -> impl Fn(Request, Next) -> BoxFuture<'static, Result<Response, AuthError>> + Clone {
    move |req: Request, next: Next| {
        Box::pin(async move {
            let claims = req
                .extensions()
                .get::<Claims>()
                .ok_or(AuthError::MissingToken)?;
            if !claims.role.at_least(required) {
                return Err(AuthError::InsufficientRole);
            }
            Ok(next.run(req).await)
        })
    }
}

/// Auth error types
#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
    InvalidCredentials,
    InsufficientRole,
    Internal,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingToken => (StatusCode::UNAUTHORIZED, "Missing authorization token"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid or expired token"),
            AuthError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid username or password")
            }
            AuthError::InsufficientRole => (
                StatusCode::FORBIDDEN,
                "Insufficient role for this operation",
            ),
            AuthError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal authentication error",
            ),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
