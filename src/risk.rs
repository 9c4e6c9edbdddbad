//! Risk Engine
//! Mission: Institutional pre-trade guardrails, position bookkeeping, and
//! exposure accounting

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::events::{Event, EventStore, EventType};
use crate::models::{Order, Position, RiskLimitsConfig};

/// Fixed operator-facing message when the kill switch blocks an order
pub const KILL_SWITCH_MESSAGE: &str = "Kill switch is active - all trading halted";

/// A single pre-trade limit violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskViolation {
    KillSwitchActive,
    PositionLimit,
    DailyVolumeLimit,
    NetExposureLimit,
    GrossExposureLimit,
}

impl RiskViolation {
    pub fn as_str(&self) -> &str {
        match self {
            RiskViolation::KillSwitchActive => "KILL_SWITCH_ACTIVE",
            RiskViolation::PositionLimit => "POSITION_LIMIT",
            RiskViolation::DailyVolumeLimit => "DAILY_VOLUME_LIMIT",
            RiskViolation::NetExposureLimit => "NET_EXPOSURE_LIMIT",
            RiskViolation::GrossExposureLimit => "GROSS_EXPOSURE_LIMIT",
        }
    }
}

/// Outcome of a pre-trade check
#[derive(Debug, Clone)]
pub struct RiskDecision {
    pub passed: bool,
    pub violations: Vec<RiskViolation>,
    pub message: String,
}

/// Point-in-time snapshot of the engine's exposure accounting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub net_exposure: f64,
    pub gross_exposure: f64,
    pub daily_volume: f64,
    pub total_positions: usize,
    pub largest_position: f64,
    pub kill_switch_active: bool,
}

struct RiskState {
    limits: RiskLimitsConfig,
    positions: HashMap<String, Position>,
    daily_volume: f64,
    daily_volume_reset: DateTime<Utc>,
}

impl RiskState {
    /// Zero the daily-volume accumulator on the first operation of a new
    /// UTC day
    fn roll_daily_volume(&mut self) {
        let now = Utc::now();
        if now.date_naive() > self.daily_volume_reset.date_naive() {
            info!(
                previous_volume = self.daily_volume,
                "Daily volume reset for new UTC day"
            );
            self.daily_volume = 0.0;
            self.daily_volume_reset = now;
        }
    }

    /// Net and gross exposure as if `order` filled at its limit price.
    ///
    /// Each symbol is valued at its *current* average price, so a symbol
    /// with no existing position projects at price zero. This understates
    /// exposure for fresh symbols; it mirrors the accounting the rest of
    /// the platform reconciles against.
    fn projected_exposures(&self, order: &Order) -> (f64, f64) {
        let mut net = 0.0;
        let mut gross = 0.0;

        let order_delta = order.side.sign() * order.quantity;
        let mut saw_order_symbol = false;

        for position in self.positions.values() {
            let quantity = if position.symbol == order.symbol {
                saw_order_symbol = true;
                position.quantity + order_delta
            } else {
                position.quantity
            };
            let value = quantity * position.average_price;
            net += value;
            gross += value.abs();
        }

        if !saw_order_symbol {
            // New symbol projects at average price 0: contributes nothing
            let value = order_delta * 0.0;
            net += value;
            gross += value.abs();
        }

        (net, gross)
    }

    fn exposures(&self) -> (f64, f64) {
        let mut net = 0.0;
        let mut gross = 0.0;
        for position in self.positions.values() {
            let value = position.market_value();
            net += value;
            gross += value.abs();
        }
        (net, gross)
    }
}

/// Pre-trade risk evaluation and post-execution position settlement.
///
/// All state lives behind one mutex; the event store is only ever acquired
/// while this lock is held (engine lock ordering: execution, then risk,
/// then events).
pub struct RiskEngine {
    state: Mutex<RiskState>,
    events: Arc<EventStore>,
}

impl RiskEngine {
    pub fn new(limits: RiskLimitsConfig, events: Arc<EventStore>) -> Self {
        Self {
            state: Mutex::new(RiskState {
                limits,
                positions: HashMap::new(),
                daily_volume: 0.0,
                daily_volume_reset: Utc::now(),
            }),
            events,
        }
    }

    /// Evaluate an order against the active limits.
    ///
    /// Appends RISK_CHECK_STARTED and exactly one of RISK_CHECK_PASSED /
    /// RISK_CHECK_FAILED before returning. The kill switch short-circuits
    /// every other check.
    pub fn check_order(&self, order: &Order) -> RiskDecision {
        let mut state = self.state.lock();
        state.roll_daily_volume();

        self.events.append(Event::new(
            EventType::RiskCheckStarted,
            order.correlation_id,
            order.order_id,
            json!({
                "symbol": order.symbol,
                "side": order.side.as_str(),
                "notional_value": order.notional_value(),
            }),
            Some(order.user_id.clone()),
        ));

        if state.limits.kill_switch_enabled {
            warn!(order_id = %order.order_id, "Order blocked: kill switch active");
            let decision = RiskDecision {
                passed: false,
                violations: vec![RiskViolation::KillSwitchActive],
                message: KILL_SWITCH_MESSAGE.to_string(),
            };
            self.append_outcome(order, &decision, None);
            return decision;
        }

        let mut violations = Vec::new();
        let notional = order.notional_value();

        if notional > state.limits.max_position_size {
            violations.push(RiskViolation::PositionLimit);
        }
        if state.daily_volume + notional > state.limits.max_daily_volume {
            violations.push(RiskViolation::DailyVolumeLimit);
        }

        let (net, gross) = state.projected_exposures(order);
        if net.abs() > state.limits.max_net_exposure {
            violations.push(RiskViolation::NetExposureLimit);
        }
        if gross > state.limits.max_gross_exposure {
            violations.push(RiskViolation::GrossExposureLimit);
        }

        let decision = if violations.is_empty() {
            RiskDecision {
                passed: true,
                violations,
                message: "Risk check passed".to_string(),
            }
        } else {
            let message = violations
                .iter()
                .map(|v| v.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            warn!(order_id = %order.order_id, %message, "Order failed risk check");
            RiskDecision {
                passed: false,
                violations,
                message,
            }
        };

        self.append_outcome(order, &decision, Some((net, gross)));
        decision
    }

    fn append_outcome(&self, order: &Order, decision: &RiskDecision, exposures: Option<(f64, f64)>) {
        let event_type = if decision.passed {
            EventType::RiskCheckPassed
        } else {
            EventType::RiskCheckFailed
        };
        let mut payload = json!({
            "violations": decision.violations,
            "message": decision.message,
        });
        if let Some((net, gross)) = exposures {
            payload["projected_net_exposure"] = json!(net);
            payload["projected_gross_exposure"] = json!(gross);
        }
        self.events.append(Event::new(
            event_type,
            order.correlation_id,
            order.order_id,
            payload,
            Some(order.user_id.clone()),
        ));
    }

    /// Settle a fill into the positions map and the daily-volume
    /// accumulator. Called by the execution engine once an order reaches
    /// EXECUTED.
    ///
    /// Averaging deliberately blends cost basis across sign changes rather
    /// than realising P&L on the closed leg; a short-to-long flip therefore
    /// carries a blended average price. Kept for compatibility with the
    /// platform's historical accounting.
    pub fn update_position(&self, order: &Order) {
        let mut state = self.state.lock();
        state.roll_daily_volume();

        let fill_price = order.executed_price.unwrap_or(order.price);
        let delta = order.side.sign() * order.executed_quantity;

        let position = state
            .positions
            .entry(order.symbol.clone())
            .or_insert_with(|| Position::new(order.symbol.clone()));

        let new_quantity = position.quantity + delta;
        if new_quantity == 0.0 {
            position.quantity = 0.0;
            position.average_price = 0.0;
        } else {
            position.average_price = (position.quantity * position.average_price
                + delta * fill_price)
                / new_quantity;
            position.quantity = new_quantity;
        }

        info!(
            symbol = %order.symbol,
            quantity = position.quantity,
            average_price = position.average_price,
            "Position updated"
        );

        state.daily_volume += order.notional_value();
    }

    pub fn metrics(&self) -> RiskMetrics {
        let mut state = self.state.lock();
        state.roll_daily_volume();

        let (net, gross) = state.exposures();
        let largest_position = state
            .positions
            .values()
            .map(|p| p.market_value().abs())
            .fold(0.0, f64::max);

        RiskMetrics {
            net_exposure: net,
            gross_exposure: gross,
            daily_volume: state.daily_volume,
            total_positions: state.positions.len(),
            largest_position,
            kill_switch_active: state.limits.kill_switch_enabled,
        }
    }

    /// Snapshot of all positions, sorted by symbol for stable output
    pub fn positions(&self) -> Vec<Position> {
        let state = self.state.lock();
        let mut positions: Vec<_> = state.positions.values().cloned().collect();
        positions.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        positions
    }

    pub fn limits(&self) -> RiskLimitsConfig {
        self.state.lock().limits.clone()
    }

    /// Atomically replace the limits configuration. In-flight checks keep
    /// the snapshot they loaded under the lock.
    pub fn set_limits(&self, limits: RiskLimitsConfig) -> RiskLimitsConfig {
        let mut state = self.state.lock();
        info!(?limits, "Risk limits replaced");
        state.limits = limits;
        state.limits.clone()
    }

    pub fn set_kill_switch(&self, enabled: bool) -> bool {
        let mut state = self.state.lock();
        state.limits.kill_switch_enabled = enabled;
        if enabled {
            warn!("Kill switch ACTIVATED - all trading halted");
        } else {
            info!("Kill switch deactivated - trading resumed");
        }
        enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OrderSide, OrderStatus};
    use uuid::Uuid;

    fn engine() -> RiskEngine {
        RiskEngine::new(RiskLimitsConfig::default(), Arc::new(EventStore::new()))
    }

    fn order(symbol: &str, side: OrderSide, quantity: f64, price: f64) -> Order {
        Order {
            order_id: Uuid::new_v4(),
            correlation_id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            side,
            quantity,
            price,
            strategy: "test".to_string(),
            user_id: "trader1".to_string(),
            client_order_id: None,
            status: OrderStatus::RiskCheck,
            executed_quantity: 0.0,
            executed_price: None,
            rejection_reason: None,
            retry_count: 0,
            created_at: Utc::now(),
        }
    }

    fn executed(symbol: &str, side: OrderSide, quantity: f64, price: f64) -> Order {
        let mut o = order(symbol, side, quantity, price);
        o.status = OrderStatus::Executed;
        o.executed_quantity = quantity;
        o.executed_price = Some(price);
        o
    }

    #[test]
    fn test_order_within_limits_passes() {
        let engine = engine();
        let decision = engine.check_order(&order("AAPL", OrderSide::Buy, 100.0, 175.50));

        assert!(decision.passed);
        assert!(decision.violations.is_empty());
    }

    #[test]
    fn test_position_limit_violation() {
        let engine = engine();
        // 50_000 * 250 = 12.5M notional, over every default limit that
        // looks at notional
        let decision = engine.check_order(&order("TSLA", OrderSide::Buy, 50_000.0, 250.0));

        assert!(!decision.passed);
        assert!(decision.violations.contains(&RiskViolation::PositionLimit));
        assert!(decision
            .violations
            .contains(&RiskViolation::DailyVolumeLimit));
        assert!(decision.message.contains("POSITION_LIMIT"));
    }

    #[test]
    fn test_kill_switch_short_circuits() {
        let engine = engine();
        engine.set_kill_switch(true);

        let decision = engine.check_order(&order("GOOGL", OrderSide::Buy, 10.0, 100.0));
        assert!(!decision.passed);
        assert_eq!(decision.violations, vec![RiskViolation::KillSwitchActive]);
        assert_eq!(decision.message, KILL_SWITCH_MESSAGE);

        engine.set_kill_switch(false);
        assert!(engine
            .check_order(&order("GOOGL", OrderSide::Buy, 10.0, 100.0))
            .passed);
    }

    #[test]
    fn test_check_appends_started_and_outcome_events() {
        let events = Arc::new(EventStore::new());
        let engine = RiskEngine::new(RiskLimitsConfig::default(), Arc::clone(&events));
        let o = order("AAPL", OrderSide::Buy, 100.0, 175.50);

        engine.check_order(&o);

        let trail = events.get_by_order(o.order_id);
        assert_eq!(trail.len(), 2);
        assert_eq!(trail[0].event_type, EventType::RiskCheckStarted);
        assert_eq!(trail[1].event_type, EventType::RiskCheckPassed);
        assert_eq!(trail[0].correlation_id, o.correlation_id);
    }

    #[test]
    fn test_position_settlement_buy_then_buy() {
        let engine = engine();

        engine.update_position(&executed("AAPL", OrderSide::Buy, 100.0, 100.0));
        engine.update_position(&executed("AAPL", OrderSide::Buy, 100.0, 110.0));

        let positions = engine.positions();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].quantity, 200.0);
        assert!((positions[0].average_price - 105.0).abs() < 1e-9);
    }

    #[test]
    fn test_position_flat_after_round_trip() {
        let engine = engine();

        engine.update_position(&executed("MSFT", OrderSide::Buy, 50.0, 300.0));
        engine.update_position(&executed("MSFT", OrderSide::Sell, 50.0, 310.0));

        let positions = engine.positions();
        assert_eq!(positions[0].quantity, 0.0);
        assert_eq!(positions[0].average_price, 0.0);
    }

    #[test]
    fn test_daily_volume_accumulates() {
        let engine = engine();
        engine.update_position(&executed("AAPL", OrderSide::Buy, 100.0, 100.0));
        engine.update_position(&executed("MSFT", OrderSide::Sell, 10.0, 300.0));

        let metrics = engine.metrics();
        assert!((metrics.daily_volume - 13_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_metrics_exposures_and_largest() {
        let engine = engine();
        engine.update_position(&executed("AAPL", OrderSide::Buy, 100.0, 100.0));
        engine.update_position(&executed("TSLA", OrderSide::Sell, 20.0, 200.0));

        let metrics = engine.metrics();
        // +10_000 long AAPL, -4_000 short TSLA
        assert!((metrics.net_exposure - 6_000.0).abs() < 1e-9);
        assert!((metrics.gross_exposure - 14_000.0).abs() < 1e-9);
        assert!((metrics.largest_position - 10_000.0).abs() < 1e-9);
        assert_eq!(metrics.total_positions, 2);
        assert!(metrics.gross_exposure >= metrics.net_exposure.abs());
    }

    #[test]
    fn test_net_exposure_limit_uses_current_average_prices() {
        let events = Arc::new(EventStore::new());
        let engine = RiskEngine::new(
            RiskLimitsConfig {
                max_net_exposure: 15_000.0,
                ..RiskLimitsConfig::default()
            },
            events,
        );

        // Open 100 @ 100 -> net exposure 10_000
        engine.update_position(&executed("AAPL", OrderSide::Buy, 100.0, 100.0));

        // Projected at the *current* average price (100), +100 more shares
        // projects to 20_000 > 15_000
        let decision = engine.check_order(&order("AAPL", OrderSide::Buy, 100.0, 500.0));
        assert!(decision
            .violations
            .contains(&RiskViolation::NetExposureLimit));
    }

    #[test]
    fn test_fresh_symbol_projects_at_zero_price() {
        let events = Arc::new(EventStore::new());
        let engine = RiskEngine::new(
            RiskLimitsConfig {
                max_net_exposure: 1_000.0,
                max_gross_exposure: 1_000.0,
                ..RiskLimitsConfig::default()
            },
            events,
        );

        // Huge order in an unseen symbol: projected exposure is zero, so
        // only the notional-driven checks can fire
        let decision = engine.check_order(&order("NVDA", OrderSide::Buy, 1_000.0, 900.0));
        assert!(!decision
            .violations
            .contains(&RiskViolation::NetExposureLimit));
        assert!(!decision
            .violations
            .contains(&RiskViolation::GrossExposureLimit));
    }

    #[test]
    fn test_set_limits_replaces_atomically() {
        let engine = engine();
        let new_limits = RiskLimitsConfig {
            max_position_size: 10.0,
            ..RiskLimitsConfig::default()
        };
        engine.set_limits(new_limits.clone());
        assert_eq!(engine.limits(), new_limits);

        let decision = engine.check_order(&order("AAPL", OrderSide::Buy, 1.0, 11.0));
        assert!(decision.violations.contains(&RiskViolation::PositionLimit));
    }
}
