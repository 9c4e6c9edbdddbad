//! Ordergate Library
//!
//! Institutional order-submission gateway: an authenticated HTTP control
//! surface over three in-process engines - pre-trade risk, order
//! execution, and an append-only event store.

pub mod api;
pub mod auth;
pub mod events;
pub mod execution;
pub mod middleware;
pub mod models;
pub mod risk;

pub use api::{ApiError, AppState};
pub use events::{Event, EventStore, EventType};
pub use execution::{ExecutionConfig, ExecutionEngine, ExecutionVenue, FillOutcome, SimulatedVenue};
pub use models::{Config, Order, OrderRequest, OrderResponse, OrderSide, OrderStatus};
pub use risk::{RiskEngine, RiskMetrics, RiskViolation};
