//! Audit Endpoints
//! Mission: Event-sourced reconstruction of any order's lifecycle

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::api::{ApiError, AppState};
use crate::events::Event;

const DEFAULT_EVENT_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub events: Vec<Event>,
    pub total: usize,
}

/// GET /api/v1/audit/events?limit=
pub async fn get_recent_events(
    State(state): State<AppState>,
    Query(params): Query<EventsQuery>,
) -> Json<EventsResponse> {
    let limit = params.limit.unwrap_or(DEFAULT_EVENT_LIMIT);
    let events = state.events.get_recent(limit);
    Json(EventsResponse {
        total: events.len(),
        events,
    })
}

#[derive(Debug, Serialize)]
pub struct CorrelationChainResponse {
    pub correlation_id: Uuid,
    pub events: Vec<Value>,
    pub total_events: usize,
}

/// GET /api/v1/audit/correlation/{correlation_id}
pub async fn get_correlation_chain(
    State(state): State<AppState>,
    Path(correlation_id): Path<String>,
) -> Result<Json<CorrelationChainResponse>, ApiError> {
    let not_found =
        || ApiError::NotFound(format!("No events for correlation: {correlation_id}"));
    let cid = Uuid::parse_str(&correlation_id).map_err(|_| not_found())?;

    let events = state.events.replay(cid);
    if events.is_empty() {
        return Err(not_found());
    }
    Ok(Json(CorrelationChainResponse {
        correlation_id: cid,
        total_events: events.len(),
        events,
    }))
}

#[derive(Debug, Serialize)]
pub struct OrderTrailResponse {
    pub order_id: Uuid,
    pub events: Vec<Event>,
    pub total_events: usize,
}

/// GET /api/v1/audit/order/{order_id}/trail
pub async fn get_order_trail(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<OrderTrailResponse>, ApiError> {
    let not_found = || ApiError::NotFound(format!("No events for order: {order_id}"));
    let oid = Uuid::parse_str(&order_id).map_err(|_| not_found())?;

    let events = state.events.get_by_order(oid);
    if events.is_empty() {
        return Err(not_found());
    }
    Ok(Json(OrderTrailResponse {
        order_id: oid,
        total_events: events.len(),
        events,
    }))
}
