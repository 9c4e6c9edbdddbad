//! API Module
//! Mission: Authenticated HTTP control surface over the gateway engines

pub mod audit;
pub mod orders;
pub mod risk_routes;
pub mod system;

use axum::{
    http::StatusCode,
    middleware as axum_mw,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::auth::{self, auth_middleware, require_role, JwtHandler, UserRole, UserStore};
use crate::events::EventStore;
use crate::execution::{ExecutionConfig, ExecutionEngine, ExecutionVenue, SimulatedVenue};
use crate::middleware::request_logging;
use crate::models::Config;
use crate::risk::RiskEngine;

/// Engines and auth collaborators, constructed once at startup and
/// injected into every handler. Tests build a fresh state per case.
#[derive(Clone)]
pub struct AppState {
    pub execution: Arc<ExecutionEngine>,
    pub risk: Arc<RiskEngine>,
    pub events: Arc<EventStore>,
    pub user_store: Arc<UserStore>,
    pub jwt_handler: Arc<JwtHandler>,
}

impl AppState {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        Self::with_venue(
            config,
            Arc::new(SimulatedVenue::default()),
            ExecutionConfig::default(),
        )
    }

    /// Build the triad with an injected venue and execution timing, for
    /// deterministic tests
    pub fn with_venue(
        config: &Config,
        venue: Arc<dyn ExecutionVenue>,
        execution_config: ExecutionConfig,
    ) -> anyhow::Result<Self> {
        let events = Arc::new(EventStore::new());
        let risk = Arc::new(RiskEngine::new(
            config.risk_limits.clone(),
            Arc::clone(&events),
        ));
        let execution = Arc::new(ExecutionEngine::new(
            Arc::clone(&risk),
            Arc::clone(&events),
            venue,
            execution_config,
        ));
        let user_store = Arc::new(UserStore::with_default_users()?);
        let jwt_handler = Arc::new(JwtHandler::new(config.jwt_secret.clone()));

        Ok(Self {
            execution,
            risk,
            events,
            user_store,
            jwt_handler,
        })
    }
}

/// Errors surfaced by API handlers, each with a stable status mapping
#[derive(Debug)]
pub enum ApiError {
    ValidationFailed(String),
    AuthorizationFailed,
    DuplicateSubmission,
    NotFound(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::ValidationFailed(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::AuthorizationFailed => (
                StatusCode::FORBIDDEN,
                "Insufficient role for this operation".to_string(),
            ),
            ApiError::DuplicateSubmission => (
                StatusCode::CONFLICT,
                "Duplicate order submission".to_string(),
            ),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Assemble the full application router. Auth and role guards are
/// route-scoped so unmatched paths fall through to a plain 404.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/api/v1/auth/login", post(auth::api::login))
        .route("/health", get(system::health));

    let any_authenticated = Router::new()
        .route(
            "/api/v1/orders",
            post(orders::submit_order).get(orders::list_orders),
        )
        .route("/api/v1/orders/:order_id", get(orders::get_order))
        .route("/api/v1/risk/metrics", get(risk_routes::get_risk_metrics))
        .route("/api/v1/risk/positions", get(risk_routes::get_positions))
        .route("/api/v1/metrics", get(system::system_metrics));

    let risk_managers = Router::new()
        .route(
            "/api/v1/risk/limits",
            get(risk_routes::get_limits).put(risk_routes::put_limits),
        )
        .route(
            "/api/v1/risk/kill-switch",
            post(risk_routes::set_kill_switch),
        )
        .route_layer(axum_mw::from_fn(require_role(UserRole::RiskManager)));

    let compliance = Router::new()
        .route("/api/v1/audit/events", get(audit::get_recent_events))
        .route(
            "/api/v1/audit/correlation/:correlation_id",
            get(audit::get_correlation_chain),
        )
        .route(
            "/api/v1/audit/order/:order_id/trail",
            get(audit::get_order_trail),
        )
        .route_layer(axum_mw::from_fn(require_role(UserRole::Compliance)));

    let protected = any_authenticated
        .merge(risk_managers)
        .merge(compliance)
        .route_layer(axum_mw::from_fn_with_state(
            Arc::clone(&state.jwt_handler),
            auth_middleware,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(axum_mw::from_fn(request_logging))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
