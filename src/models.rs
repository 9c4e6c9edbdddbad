//! Domain Models
//! Mission: Shared order, position, and configuration types for the gateway

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "SELL")]
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }

    /// Signed direction multiplier: +1 for BUY, -1 for SELL
    pub fn sign(&self) -> f64 {
        match self {
            OrderSide::Buy => 1.0,
            OrderSide::Sell => -1.0,
        }
    }
}

/// Order lifecycle states.
///
/// PENDING -> RISK_CHECK -> { APPROVED -> EXECUTING -> { EXECUTED, FAILED }, REJECTED }
/// CANCELLED is reserved for future order-management support and is never
/// produced by the current pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    RiskCheck,
    Approved,
    Executing,
    Executed,
    Failed,
    Rejected,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::RiskCheck => "RISK_CHECK",
            OrderStatus::Approved => "APPROVED",
            OrderStatus::Executing => "EXECUTING",
            OrderStatus::Executed => "EXECUTED",
            OrderStatus::Failed => "FAILED",
            OrderStatus::Rejected => "REJECTED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// Terminal states admit no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Executed | OrderStatus::Failed | OrderStatus::Rejected
        )
    }

    /// Whether the state machine admits `next` from this state
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, RiskCheck)
                | (RiskCheck, Approved)
                | (RiskCheck, Rejected)
                | (Approved, Executing)
                | (Approved, Failed)
                | (Executing, Executed)
                | (Executing, Failed)
        )
    }
}

/// A submitted order. Created once by the submission pipeline and mutated
/// only by the execution engine; never destroyed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub order_id: Uuid,
    /// Shared by every event produced for this order
    pub correlation_id: Uuid,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: f64,
    pub price: f64,
    pub strategy: String,
    pub user_id: String,
    pub client_order_id: Option<String>,
    pub status: OrderStatus,
    pub executed_quantity: f64,
    pub executed_price: Option<f64>,
    pub rejection_reason: Option<String>,
    pub retry_count: u32,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Notional value at the limit price
    pub fn notional_value(&self) -> f64 {
        self.quantity * self.price
    }
}

/// Position in a single symbol. Positive quantity = long, negative = short.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: f64,
    /// Volume-weighted cost basis of the open side
    pub average_price: f64,
    /// Reserved; always zero until realised-P&L accounting lands
    pub realized_pnl: f64,
}

impl Position {
    pub fn new(symbol: String) -> Self {
        Self {
            symbol,
            quantity: 0.0,
            average_price: 0.0,
            realized_pnl: 0.0,
        }
    }

    pub fn market_value(&self) -> f64 {
        self.quantity * self.average_price
    }
}

/// Pre-trade risk limits. Replaced atomically as a whole; individual fields
/// are never patched in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskLimitsConfig {
    pub max_position_size: f64,
    pub max_daily_volume: f64,
    pub max_net_exposure: f64,
    pub max_gross_exposure: f64,
    pub kill_switch_enabled: bool,
}

impl Default for RiskLimitsConfig {
    fn default() -> Self {
        Self {
            max_position_size: 1_000_000.0,
            max_daily_volume: 10_000_000.0,
            max_net_exposure: 5_000_000.0,
            max_gross_exposure: 20_000_000.0,
            kill_switch_enabled: false,
        }
    }
}

const MAX_SYMBOL_LEN: usize = 20;
const MAX_STRATEGY_LEN: usize = 50;

fn default_strategy() -> String {
    "default".to_string()
}

/// Order submission request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: f64,
    pub price: f64,
    #[serde(default = "default_strategy")]
    pub strategy: String,
    #[serde(default)]
    pub client_order_id: Option<String>,
}

impl OrderRequest {
    /// Validate field constraints. Returns the first violation as a
    /// user-facing message.
    pub fn validate(&self) -> Result<(), String> {
        if self.symbol.is_empty() || self.symbol.len() > MAX_SYMBOL_LEN {
            return Err(format!(
                "symbol must be 1-{MAX_SYMBOL_LEN} characters, got {}",
                self.symbol.len()
            ));
        }
        if !self.quantity.is_finite() || self.quantity <= 0.0 {
            return Err("quantity must be a positive finite number".to_string());
        }
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err("price must be a positive finite number".to_string());
        }
        if self.strategy.len() > MAX_STRATEGY_LEN {
            return Err(format!(
                "strategy must be at most {MAX_STRATEGY_LEN} characters"
            ));
        }
        Ok(())
    }
}

/// Synchronous reply to an order submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
    pub order_id: Uuid,
    pub correlation_id: Uuid,
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub jwt_secret: String,
    pub risk_limits: RiskLimitsConfig,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .unwrap_or(8000);

        let jwt_secret = std::env::var("JWT_SECRET")
            .unwrap_or_else(|_| "dev-secret-change-in-production".to_string());

        let mut risk_limits = RiskLimitsConfig::default();
        if let Some(v) = env_f64("MAX_POSITION_SIZE") {
            risk_limits.max_position_size = v;
        }
        if let Some(v) = env_f64("MAX_DAILY_VOLUME") {
            risk_limits.max_daily_volume = v;
        }
        if let Some(v) = env_f64("MAX_NET_EXPOSURE") {
            risk_limits.max_net_exposure = v;
        }
        if let Some(v) = env_f64("MAX_GROSS_EXPOSURE") {
            risk_limits.max_gross_exposure = v;
        }

        Ok(Self {
            port,
            jwt_secret,
            risk_limits,
        })
    }
}

fn env_f64(name: &str) -> Option<f64> {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
}
