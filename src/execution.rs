//! Execution Engine
//! Mission: Own the order lifecycle end to end - intake, idempotency,
//! risk dispatch, simulated venue execution with retry and circuit
//! breaker, position settlement

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use parking_lot::Mutex;
use rand::Rng;
use serde::Serialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::events::{Event, EventStore, EventType};
use crate::models::{Order, OrderRequest, OrderResponse, OrderStatus};
use crate::risk::RiskEngine;

/// Attempts per order before the order is failed outright
pub const MAX_RETRY_ATTEMPTS: u32 = 3;
/// Consecutive order failures that trip the breaker
pub const CIRCUIT_BREAKER_THRESHOLD: u32 = 5;
/// Cool-down once the breaker is open
pub const CIRCUIT_BREAKER_TIMEOUT_SECS: u64 = 60;
/// Simulated venue round-trip
const VENUE_LATENCY_MS: u64 = 100;

const CIRCUIT_OPEN_REASON: &str = "Circuit breaker open";

/// Timing and resilience knobs. Production uses the defaults; tests shrink
/// the durations so retry semantics run in milliseconds.
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    pub max_retry_attempts: u32,
    pub circuit_breaker_threshold: u32,
    pub circuit_breaker_timeout: Duration,
    pub venue_latency: Duration,
    pub backoff_base: Duration,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_retry_attempts: MAX_RETRY_ATTEMPTS,
            circuit_breaker_threshold: CIRCUIT_BREAKER_THRESHOLD,
            circuit_breaker_timeout: Duration::from_secs(CIRCUIT_BREAKER_TIMEOUT_SECS),
            venue_latency: Duration::from_millis(VENUE_LATENCY_MS),
            backoff_base: Duration::from_secs(1),
        }
    }
}

/// Result of one venue attempt
#[derive(Debug, Clone)]
pub enum FillOutcome {
    Filled { price: f64 },
    Rejected { reason: String },
}

/// Seam between the engine and the venue. The retry, backoff, and breaker
/// logic upstream is driven purely by these per-attempt outcomes, so tests
/// substitute deterministic implementations.
pub trait ExecutionVenue: Send + Sync {
    fn attempt_fill(&self, order: &Order) -> FillOutcome;
}

/// Stand-in for a real venue adapter: fills with probability
/// `success_probability` at the limit price plus uniform jitter.
pub struct SimulatedVenue {
    pub success_probability: f64,
    pub price_jitter: f64,
}

impl Default for SimulatedVenue {
    fn default() -> Self {
        Self {
            success_probability: 0.9,
            price_jitter: 0.001,
        }
    }
}

impl ExecutionVenue for SimulatedVenue {
    fn attempt_fill(&self, order: &Order) -> FillOutcome {
        let mut rng = rand::thread_rng();
        if rng.gen_bool(self.success_probability) {
            let jitter = if self.price_jitter > 0.0 {
                rng.gen_range(-self.price_jitter..=self.price_jitter)
            } else {
                0.0
            };
            FillOutcome::Filled {
                price: order.price * (1.0 + jitter),
            }
        } else {
            FillOutcome::Rejected {
                reason: "Venue rejected order".to_string(),
            }
        }
    }
}

/// Trip-and-cool-down gate in front of execution
#[derive(Debug, Default)]
struct CircuitBreaker {
    failures: u32,
    open_until: Option<DateTime<Utc>>,
}

/// Breaker state as reported by the metrics endpoint
#[derive(Debug, Clone, Serialize)]
pub struct CircuitBreakerStatus {
    pub status: String,
    pub failures: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_until: Option<DateTime<Utc>>,
}

/// Rejected before any order or event is created
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    DuplicateSubmission,
}

impl std::fmt::Display for SubmitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmitError::DuplicateSubmission => {
                write!(f, "Duplicate order submission")
            }
        }
    }
}

impl std::error::Error for SubmitError {}

/// The order lifecycle owner. Holds the order table, the idempotency set,
/// and the circuit breaker; calls the risk engine for pre-trade checks and
/// settlement, and the event store for every lifecycle event.
///
/// Lock ordering across engines: execution, then risk, then events. The
/// engine's own lock is held only across order-table mutations, never
/// across an await.
pub struct ExecutionEngine {
    risk: Arc<RiskEngine>,
    events: Arc<EventStore>,
    venue: Arc<dyn ExecutionVenue>,
    config: ExecutionConfig,
    orders: Mutex<HashMap<Uuid, Order>>,
    idempotency_keys: Mutex<HashSet<String>>,
    breaker: Mutex<CircuitBreaker>,
}

impl ExecutionEngine {
    pub fn new(
        risk: Arc<RiskEngine>,
        events: Arc<EventStore>,
        venue: Arc<dyn ExecutionVenue>,
        config: ExecutionConfig,
    ) -> Self {
        Self {
            risk,
            events,
            venue,
            config,
            orders: Mutex::new(HashMap::new()),
            idempotency_keys: Mutex::new(HashSet::new()),
            breaker: Mutex::new(CircuitBreaker::default()),
        }
    }

    /// Deterministic hash of the submission's identifying fields.
    /// Symbol is normalised before hashing so case variants collide.
    fn fingerprint(user_id: &str, request: &OrderRequest) -> String {
        let key = format!(
            "{}:{}:{}:{}:{}:{}",
            user_id,
            request.symbol,
            request.side.as_str(),
            request.quantity,
            request.price,
            request.client_order_id.as_deref().unwrap_or_default(),
        );
        hex::encode(Sha256::digest(key.as_bytes()))
    }

    /// The submission pipeline. Returns the synchronous reply; approved
    /// orders are handed to a background execution task before returning.
    pub fn submit_order(
        self: &Arc<Self>,
        mut request: OrderRequest,
        user_id: &str,
    ) -> Result<OrderResponse, SubmitError> {
        request.symbol = request.symbol.to_uppercase();

        // Idempotency gate: check-and-insert before any order or event
        // exists
        let fingerprint = Self::fingerprint(user_id, &request);
        {
            let mut keys = self.idempotency_keys.lock();
            if !keys.insert(fingerprint) {
                warn!(user_id, symbol = %request.symbol, "Duplicate submission rejected");
                return Err(SubmitError::DuplicateSubmission);
            }
        }

        let order = Order {
            order_id: Uuid::new_v4(),
            correlation_id: Uuid::new_v4(),
            symbol: request.symbol.clone(),
            side: request.side,
            quantity: request.quantity,
            price: request.price,
            strategy: request.strategy.clone(),
            user_id: user_id.to_string(),
            client_order_id: request.client_order_id.clone(),
            status: OrderStatus::Pending,
            executed_quantity: 0.0,
            executed_price: None,
            rejection_reason: None,
            retry_count: 0,
            created_at: Utc::now(),
        };
        let order_id = order.order_id;
        let correlation_id = order.correlation_id;

        info!(
            %order_id,
            symbol = %order.symbol,
            side = order.side.as_str(),
            quantity = order.quantity,
            price = order.price,
            "Order created"
        );

        self.orders.lock().insert(order_id, order.clone());

        self.events.append(Event::new(
            EventType::OrderCreated,
            correlation_id,
            order_id,
            json!({
                "symbol": order.symbol,
                "side": order.side.as_str(),
                "quantity": order.quantity,
                "price": order.price,
                "strategy": order.strategy,
                "client_order_id": order.client_order_id,
            }),
            Some(order.user_id.clone()),
        ));

        // Pre-trade check; the risk engine appends RISK_CHECK_STARTED and
        // the outcome event
        let checked = self
            .transition(order_id, OrderStatus::RiskCheck)
            .unwrap_or(order);
        let decision = self.risk.check_order(&checked);

        if !decision.passed {
            self.update_order(order_id, |order| {
                order.status = OrderStatus::Rejected;
                order.rejection_reason = Some(decision.message.clone());
            });
            return Ok(OrderResponse {
                order_id,
                correlation_id,
                status: OrderStatus::Rejected,
                message: Some(decision.message),
                timestamp: Utc::now(),
            });
        }

        self.transition(order_id, OrderStatus::Approved);

        // Produce the reply before execution is scheduled; the submitter
        // never waits on the venue
        let response = OrderResponse {
            order_id,
            correlation_id,
            status: OrderStatus::Approved,
            message: None,
            timestamp: Utc::now(),
        };
        self.dispatch_execution(order_id);
        Ok(response)
    }

    /// Hand an approved order to a supervised background task. The reply
    /// to the submitter never waits on this.
    fn dispatch_execution(self: &Arc<Self>, order_id: Uuid) {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            if AssertUnwindSafe(engine.execute_order(order_id))
                .catch_unwind()
                .await
                .is_err()
            {
                error!(%order_id, "Execution task panicked; order left in last consistent state");
            }
        });
    }

    /// Background execution: breaker admission, then up to
    /// `max_retry_attempts` venue attempts with exponential backoff.
    pub async fn execute_order(&self, order_id: Uuid) {
        // Circuit breaker admission
        {
            let mut breaker = self.breaker.lock();
            if let Some(open_until) = breaker.open_until {
                if Utc::now() < open_until {
                    drop(breaker);
                    warn!(%order_id, "Execution short-circuited: circuit breaker open");
                    self.update_order(order_id, |order| {
                        order.status = OrderStatus::Failed;
                        order.rejection_reason = Some(CIRCUIT_OPEN_REASON.to_string());
                    });
                    return;
                }
                info!("Circuit breaker cool-down elapsed, resetting");
                breaker.failures = 0;
                breaker.open_until = None;
            }
        }

        let Some(order) = self.transition(order_id, OrderStatus::Executing) else {
            return;
        };
        self.events.append(Event::new(
            EventType::ExecutionStarted,
            order.correlation_id,
            order_id,
            json!({
                "symbol": order.symbol,
                "side": order.side.as_str(),
                "quantity": order.quantity,
            }),
            Some(order.user_id.clone()),
        ));

        let max_attempts = self.config.max_retry_attempts;
        let mut last_reason = String::new();

        for attempt in 0..max_attempts {
            sleep(self.config.venue_latency).await;

            let Some(snapshot) = self.get_order(order_id) else {
                return;
            };
            match self.venue.attempt_fill(&snapshot) {
                FillOutcome::Filled { price } => {
                    let Some(executed) = self.complete_order(order_id, price) else {
                        return;
                    };
                    // Settle positions before the completion event is
                    // visible to auditors
                    self.risk.update_position(&executed);
                    self.events.append(Event::new(
                        EventType::ExecutionCompleted,
                        executed.correlation_id,
                        order_id,
                        json!({
                            "executed_quantity": executed.executed_quantity,
                            "executed_price": price,
                            "retry_attempt": attempt,
                        }),
                        Some(executed.user_id.clone()),
                    ));
                    self.breaker.lock().failures = 0;
                    info!(
                        %order_id,
                        executed_price = price,
                        retry_attempt = attempt,
                        "Order executed"
                    );
                    return;
                }
                FillOutcome::Rejected { reason } => {
                    last_reason = reason;
                    self.update_order(order_id, |order| order.retry_count += 1);

                    if attempt + 1 < max_attempts {
                        sleep(self.config.backoff_base * 2u32.pow(attempt)).await;
                    }
                }
            }
        }

        // All attempts exhausted
        let reason = format!(
            "Execution failed after {max_attempts} attempts: {last_reason}"
        );
        let Some(failed) = self.update_order(order_id, |order| {
            order.status = OrderStatus::Failed;
            order.rejection_reason = Some(reason.clone());
        }) else {
            return;
        };

        {
            let mut breaker = self.breaker.lock();
            breaker.failures += 1;
            if breaker.failures >= self.config.circuit_breaker_threshold
                && breaker.open_until.is_none()
            {
                let open_until = Utc::now()
                    + chrono::Duration::from_std(self.config.circuit_breaker_timeout)
                        .unwrap_or_else(|_| chrono::Duration::seconds(60));
                breaker.open_until = Some(open_until);
                warn!(
                    failures = breaker.failures,
                    %open_until,
                    "Circuit breaker OPEN"
                );
            }
        }

        self.events.append(Event::new(
            EventType::ExecutionFailed,
            failed.correlation_id,
            order_id,
            json!({
                "reason": reason,
                "retry_attempts": max_attempts,
            }),
            Some(failed.user_id.clone()),
        ));
        warn!(%order_id, %reason, "Order failed");
    }

    /// Checked state-machine transition. Returns the updated order, or
    /// None when the transition is not admitted (the order is left
    /// untouched).
    fn transition(&self, order_id: Uuid, next: OrderStatus) -> Option<Order> {
        let mut orders = self.orders.lock();
        let order = orders.get_mut(&order_id)?;
        if !order.status.can_transition_to(next) {
            warn!(
                %order_id,
                from = order.status.as_str(),
                to = next.as_str(),
                "Illegal state transition refused"
            );
            return None;
        }
        order.status = next;
        Some(order.clone())
    }

    /// Transition to EXECUTED together with the fill fields, atomically
    fn complete_order(&self, order_id: Uuid, fill_price: f64) -> Option<Order> {
        let mut orders = self.orders.lock();
        let order = orders.get_mut(&order_id)?;
        if !order.status.can_transition_to(OrderStatus::Executed) {
            return None;
        }
        order.status = OrderStatus::Executed;
        order.executed_quantity = order.quantity;
        order.executed_price = Some(fill_price);
        Some(order.clone())
    }

    /// Mutate an order's non-status fields (or perform a checked terminal
    /// transition) under the order-table lock
    fn update_order<F: FnOnce(&mut Order)>(&self, order_id: Uuid, mutate: F) -> Option<Order> {
        let mut orders = self.orders.lock();
        let order = orders.get_mut(&order_id)?;
        let before = order.status;
        mutate(order);
        if order.status != before && !before.can_transition_to(order.status) {
            warn!(
                %order_id,
                from = before.as_str(),
                to = order.status.as_str(),
                "Illegal state transition refused"
            );
            order.status = before;
            return None;
        }
        Some(order.clone())
    }

    pub fn get_order(&self, order_id: Uuid) -> Option<Order> {
        self.orders.lock().get(&order_id).cloned()
    }

    /// All orders, newest first
    pub fn list_orders(&self) -> Vec<Order> {
        let mut orders: Vec<_> = self.orders.lock().values().cloned().collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }

    pub fn total_orders(&self) -> usize {
        self.orders.lock().len()
    }

    /// Count of orders per status; only statuses actually present appear
    pub fn order_status_breakdown(&self) -> HashMap<String, usize> {
        let orders = self.orders.lock();
        let mut breakdown: HashMap<String, usize> = HashMap::new();
        for order in orders.values() {
            *breakdown.entry(order.status.as_str().to_string()).or_default() += 1;
        }
        breakdown
    }

    pub fn circuit_breaker_status(&self) -> CircuitBreakerStatus {
        let breaker = self.breaker.lock();
        let open = breaker
            .open_until
            .is_some_and(|until| Utc::now() < until);
        CircuitBreakerStatus {
            status: if open { "OPEN" } else { "CLOSED" }.to_string(),
            failures: breaker.failures,
            open_until: breaker.open_until,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OrderSide, RiskLimitsConfig};
    use std::collections::VecDeque;

    /// Venue that replays a scripted outcome sequence, then fills forever
    struct ScriptedVenue {
        outcomes: Mutex<VecDeque<FillOutcome>>,
    }

    impl ScriptedVenue {
        fn new(outcomes: Vec<FillOutcome>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
            }
        }

        fn rejection() -> FillOutcome {
            FillOutcome::Rejected {
                reason: "Venue rejected order".to_string(),
            }
        }
    }

    impl ExecutionVenue for ScriptedVenue {
        fn attempt_fill(&self, order: &Order) -> FillOutcome {
            self.outcomes
                .lock()
                .pop_front()
                .unwrap_or(FillOutcome::Filled { price: order.price })
        }
    }

    /// Venue that never fills
    struct RejectingVenue;

    impl ExecutionVenue for RejectingVenue {
        fn attempt_fill(&self, _order: &Order) -> FillOutcome {
            ScriptedVenue::rejection()
        }
    }

    fn fast_config() -> ExecutionConfig {
        ExecutionConfig {
            max_retry_attempts: 3,
            circuit_breaker_threshold: 5,
            circuit_breaker_timeout: Duration::from_millis(80),
            venue_latency: Duration::from_millis(1),
            backoff_base: Duration::from_millis(1),
        }
    }

    fn engine_with(venue: Arc<dyn ExecutionVenue>, config: ExecutionConfig) -> Arc<ExecutionEngine> {
        let events = Arc::new(EventStore::new());
        let risk = Arc::new(RiskEngine::new(
            RiskLimitsConfig::default(),
            Arc::clone(&events),
        ));
        Arc::new(ExecutionEngine::new(risk, events, venue, config))
    }

    fn request(symbol: &str, client_order_id: Option<&str>) -> OrderRequest {
        OrderRequest {
            symbol: symbol.to_string(),
            side: OrderSide::Buy,
            quantity: 100.0,
            price: 175.50,
            strategy: "momentum".to_string(),
            client_order_id: client_order_id.map(|s| s.to_string()),
        }
    }

    async fn wait_for_terminal(engine: &ExecutionEngine, order_id: Uuid) -> Order {
        for _ in 0..1000 {
            if let Some(order) = engine.get_order(order_id) {
                if order.status.is_terminal() {
                    return order;
                }
            }
            sleep(Duration::from_millis(2)).await;
        }
        panic!("order {order_id} never reached a terminal state");
    }

    #[tokio::test]
    async fn test_happy_path_full_lifecycle() {
        let engine = engine_with(
            Arc::new(ScriptedVenue::new(vec![FillOutcome::Filled {
                price: 175.51,
            }])),
            fast_config(),
        );

        let response = engine
            .submit_order(request("aapl", None), "trader1")
            .unwrap();
        assert_eq!(response.status, OrderStatus::Approved);

        let order = wait_for_terminal(&engine, response.order_id).await;
        assert_eq!(order.status, OrderStatus::Executed);
        assert_eq!(order.symbol, "AAPL");
        assert_eq!(order.executed_quantity, 100.0);
        assert_eq!(order.executed_price, Some(175.51));
        assert_eq!(order.retry_count, 0);

        let types: Vec<EventType> = engine
            .events
            .get_by_correlation(response.correlation_id)
            .iter()
            .map(|e| e.event_type)
            .collect();
        assert_eq!(
            types,
            vec![
                EventType::OrderCreated,
                EventType::RiskCheckStarted,
                EventType::RiskCheckPassed,
                EventType::ExecutionStarted,
                EventType::ExecutionCompleted,
            ]
        );

        // Fill settled into positions
        let positions = engine.risk.positions();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].quantity, 100.0);
        assert_eq!(positions[0].average_price, 175.51);
    }

    #[tokio::test]
    async fn test_duplicate_submission_rejected_before_state() {
        let engine = engine_with(Arc::new(ScriptedVenue::new(vec![])), fast_config());

        let first = engine
            .submit_order(request("MSFT", Some("K")), "trader1")
            .unwrap();
        let second = engine.submit_order(request("MSFT", Some("K")), "trader1");

        assert_eq!(second.unwrap_err(), SubmitError::DuplicateSubmission);
        assert_eq!(engine.total_orders(), 1);

        // A different client_order_id is a different submission
        assert!(engine
            .submit_order(request("MSFT", Some("K2")), "trader1")
            .is_ok());

        wait_for_terminal(&engine, first.order_id).await;
    }

    #[tokio::test]
    async fn test_risk_rejection_schedules_no_execution() {
        let engine = engine_with(Arc::new(RejectingVenue), fast_config());
        engine.risk.set_kill_switch(true);

        let response = engine
            .submit_order(request("GOOGL", None), "trader1")
            .unwrap();
        assert_eq!(response.status, OrderStatus::Rejected);
        assert_eq!(
            response.message.as_deref(),
            Some("Kill switch is active - all trading halted")
        );

        let order = engine.get_order(response.order_id).unwrap();
        assert_eq!(order.status, OrderStatus::Rejected);

        // Give a stray task a chance to run, then verify no execution
        // events exist
        sleep(Duration::from_millis(20)).await;
        let types: Vec<EventType> = engine
            .events
            .get_by_order(response.order_id)
            .iter()
            .map(|e| e.event_type)
            .collect();
        assert_eq!(
            types,
            vec![
                EventType::OrderCreated,
                EventType::RiskCheckStarted,
                EventType::RiskCheckFailed,
            ]
        );
    }

    #[tokio::test]
    async fn test_retries_then_success() {
        let engine = engine_with(
            Arc::new(ScriptedVenue::new(vec![
                ScriptedVenue::rejection(),
                ScriptedVenue::rejection(),
                FillOutcome::Filled { price: 175.49 },
            ])),
            fast_config(),
        );

        let response = engine
            .submit_order(request("AAPL", None), "trader1")
            .unwrap();
        let order = wait_for_terminal(&engine, response.order_id).await;

        assert_eq!(order.status, OrderStatus::Executed);
        assert_eq!(order.retry_count, 2);

        let completed = engine
            .events
            .get_by_order(response.order_id)
            .into_iter()
            .find(|e| e.event_type == EventType::ExecutionCompleted)
            .unwrap();
        assert_eq!(completed.payload["retry_attempt"], 2);
    }

    #[tokio::test]
    async fn test_exhausted_retries_fail_once() {
        let engine = engine_with(Arc::new(RejectingVenue), fast_config());

        let response = engine
            .submit_order(request("AAPL", None), "trader1")
            .unwrap();
        let order = wait_for_terminal(&engine, response.order_id).await;

        assert_eq!(order.status, OrderStatus::Failed);
        assert_eq!(order.retry_count, 3);
        assert!(order
            .rejection_reason
            .as_deref()
            .unwrap()
            .contains("after 3 attempts"));

        let trail = engine.events.get_by_order(response.order_id);
        let failed: Vec<_> = trail
            .iter()
            .filter(|e| e.event_type == EventType::ExecutionFailed)
            .collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].payload["retry_attempts"], 3);
    }

    #[tokio::test]
    async fn test_circuit_breaker_opens_and_resets() {
        let engine = engine_with(Arc::new(RejectingVenue), fast_config());

        // Five consecutive final failures trip the breaker
        for i in 0..5 {
            let response = engine
                .submit_order(request("AAPL", Some(&format!("cb-{i}"))), "trader1")
                .unwrap();
            wait_for_terminal(&engine, response.order_id).await;
        }
        assert_eq!(engine.circuit_breaker_status().status, "OPEN");

        // Next execution short-circuits: FAILED with the breaker reason
        // and no EXECUTION_* events
        let blocked = engine
            .submit_order(request("AAPL", Some("cb-blocked")), "trader1")
            .unwrap();
        let order = wait_for_terminal(&engine, blocked.order_id).await;
        assert_eq!(order.status, OrderStatus::Failed);
        assert_eq!(order.rejection_reason.as_deref(), Some("Circuit breaker open"));

        let types: Vec<EventType> = engine
            .events
            .get_by_order(blocked.order_id)
            .iter()
            .map(|e| e.event_type)
            .collect();
        assert_eq!(
            types,
            vec![
                EventType::OrderCreated,
                EventType::RiskCheckStarted,
                EventType::RiskCheckPassed,
            ]
        );

        // After the cool-down, the next execution resets the breaker and
        // proceeds to the venue again
        sleep(Duration::from_millis(100)).await;
        let retried = engine
            .submit_order(request("AAPL", Some("cb-after")), "trader1")
            .unwrap();
        let order = wait_for_terminal(&engine, retried.order_id).await;
        assert_eq!(order.status, OrderStatus::Failed);
        let trail = engine.events.get_by_order(retried.order_id);
        assert!(trail
            .iter()
            .any(|e| e.event_type == EventType::ExecutionStarted));
    }

    #[tokio::test]
    async fn test_success_resets_failure_streak() {
        let engine = engine_with(
            Arc::new(ScriptedVenue::new(vec![
                // Order 1: three rejections = one final failure
                ScriptedVenue::rejection(),
                ScriptedVenue::rejection(),
                ScriptedVenue::rejection(),
                // Order 2 fills immediately
                FillOutcome::Filled { price: 175.50 },
            ])),
            fast_config(),
        );

        let failed = engine
            .submit_order(request("AAPL", Some("s1")), "trader1")
            .unwrap();
        wait_for_terminal(&engine, failed.order_id).await;
        assert_eq!(engine.circuit_breaker_status().failures, 1);

        let ok = engine
            .submit_order(request("AAPL", Some("s2")), "trader1")
            .unwrap();
        wait_for_terminal(&engine, ok.order_id).await;
        assert_eq!(engine.circuit_breaker_status().failures, 0);
    }

    #[tokio::test]
    async fn test_status_breakdown_counts_present_statuses() {
        let engine = engine_with(Arc::new(ScriptedVenue::new(vec![])), fast_config());
        engine.risk.set_kill_switch(true);
        let rejected = engine
            .submit_order(request("AAPL", Some("b1")), "trader1")
            .unwrap();
        engine.risk.set_kill_switch(false);
        let executed = engine
            .submit_order(request("AAPL", Some("b2")), "trader1")
            .unwrap();
        wait_for_terminal(&engine, executed.order_id).await;
        wait_for_terminal(&engine, rejected.order_id).await;

        let breakdown = engine.order_status_breakdown();
        assert_eq!(breakdown.get("REJECTED"), Some(&1));
        assert_eq!(breakdown.get("EXECUTED"), Some(&1));
        assert_eq!(breakdown.len(), 2);
    }

    #[test]
    fn test_fingerprint_sensitivity() {
        let base = request("AAPL", Some("K"));
        let fp = ExecutionEngine::fingerprint("trader1", &base);

        assert_eq!(fp, ExecutionEngine::fingerprint("trader1", &base));
        assert_ne!(fp, ExecutionEngine::fingerprint("trader2", &base));

        let mut other = base.clone();
        other.quantity = 101.0;
        assert_ne!(fp, ExecutionEngine::fingerprint("trader1", &other));

        let mut other = base.clone();
        other.client_order_id = None;
        assert_ne!(fp, ExecutionEngine::fingerprint("trader1", &other));
    }
}
