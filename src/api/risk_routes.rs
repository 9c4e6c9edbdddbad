//! Risk Endpoints
//! Mission: Exposure visibility and limits administration

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{ApiError, AppState};
use crate::models::{Position, RiskLimitsConfig};
use crate::risk::RiskMetrics;

/// GET /api/v1/risk/metrics
pub async fn get_risk_metrics(State(state): State<AppState>) -> Json<RiskMetrics> {
    Json(state.risk.metrics())
}

/// GET /api/v1/risk/limits
pub async fn get_limits(State(state): State<AppState>) -> Json<RiskLimitsConfig> {
    Json(state.risk.limits())
}

/// PUT /api/v1/risk/limits
pub async fn put_limits(
    State(state): State<AppState>,
    Json(limits): Json<RiskLimitsConfig>,
) -> Result<Json<RiskLimitsConfig>, ApiError> {
    for (name, value) in [
        ("max_position_size", limits.max_position_size),
        ("max_daily_volume", limits.max_daily_volume),
        ("max_net_exposure", limits.max_net_exposure),
        ("max_gross_exposure", limits.max_gross_exposure),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(ApiError::ValidationFailed(format!(
                "{name} must be a non-negative finite number"
            )));
        }
    }

    Ok(Json(state.risk.set_limits(limits)))
}

#[derive(Debug, Deserialize)]
pub struct KillSwitchParams {
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct KillSwitchResponse {
    pub kill_switch_enabled: bool,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// POST /api/v1/risk/kill-switch?enabled=bool
pub async fn set_kill_switch(
    State(state): State<AppState>,
    Query(params): Query<KillSwitchParams>,
) -> Json<KillSwitchResponse> {
    let enabled = state.risk.set_kill_switch(params.enabled);
    let message = if enabled {
        "Kill switch ACTIVATED - all trading halted"
    } else {
        "Kill switch deactivated - trading resumed"
    };
    Json(KillSwitchResponse {
        kill_switch_enabled: enabled,
        message: message.to_string(),
        timestamp: Utc::now(),
    })
}

/// Position as reported to clients, with its marked value
#[derive(Debug, Serialize)]
pub struct PositionView {
    pub symbol: String,
    pub quantity: f64,
    pub average_price: f64,
    pub realized_pnl: f64,
    pub market_value: f64,
}

impl From<Position> for PositionView {
    fn from(position: Position) -> Self {
        Self {
            market_value: position.market_value(),
            symbol: position.symbol,
            quantity: position.quantity,
            average_price: position.average_price,
            realized_pnl: position.realized_pnl,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PositionsResponse {
    pub positions: Vec<PositionView>,
    pub total_positions: usize,
}

/// GET /api/v1/risk/positions
pub async fn get_positions(State(state): State<AppState>) -> Json<PositionsResponse> {
    let positions: Vec<PositionView> = state
        .risk
        .positions()
        .into_iter()
        .map(PositionView::from)
        .collect();
    Json(PositionsResponse {
        total_positions: positions.len(),
        positions,
    })
}
