//! System Endpoints
//! Mission: Liveness and whole-system observability

use axum::{extract::State, Json};
use chrono::Utc;
use serde_json::{json, Value};

use crate::api::AppState;

/// GET /health - unauthenticated liveness probe
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now(),
        "components": {
            "execution_engine": { "status": "ok", "orders": state.execution.total_orders() },
            "risk_engine": { "status": "ok", "kill_switch": state.risk.metrics().kill_switch_active },
            "event_store": { "status": "ok", "events": state.events.len() },
        },
    }))
}

/// GET /api/v1/metrics - whole-system metrics snapshot
pub async fn system_metrics(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "total_orders": state.execution.total_orders(),
        "total_events": state.events.len(),
        "order_status_breakdown": state.execution.order_status_breakdown(),
        "circuit_breaker": state.execution.circuit_breaker_status(),
        "risk_metrics": state.risk.metrics(),
        "timestamp": Utc::now(),
    }))
}
