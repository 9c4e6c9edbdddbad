//! Order Endpoints
//! Mission: Submission intake and order-state visibility

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::api::{ApiError, AppState};
use crate::auth::{Claims, UserRole};
use crate::execution::SubmitError;
use crate::models::{Order, OrderRequest, OrderResponse};

#[derive(Debug, Serialize)]
pub struct OrdersListResponse {
    pub orders: Vec<Order>,
    pub total: usize,
}

/// POST /api/v1/orders
pub async fn submit_order(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<OrderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    if !claims.role.at_least(UserRole::Trader) {
        return Err(ApiError::AuthorizationFailed);
    }
    request.validate().map_err(ApiError::ValidationFailed)?;

    match state.execution.submit_order(request, &claims.user_id) {
        Ok(response) => Ok(Json(response)),
        Err(SubmitError::DuplicateSubmission) => Err(ApiError::DuplicateSubmission),
    }
}

/// GET /api/v1/orders/{order_id}
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let not_found = || ApiError::NotFound(format!("Order not found: {order_id}"));
    let id = Uuid::parse_str(&order_id).map_err(|_| not_found())?;
    state.execution.get_order(id).map(Json).ok_or_else(not_found)
}

/// GET /api/v1/orders
pub async fn list_orders(State(state): State<AppState>) -> Json<OrdersListResponse> {
    let orders = state.execution.list_orders();
    Json(OrdersListResponse {
        total: orders.len(),
        orders,
    })
}
