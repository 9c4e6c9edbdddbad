//! Event Store
//! Mission: Append-only audit log with correlation- and order-keyed lookup

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Every recordable state transition in an order's life
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    OrderCreated,
    RiskCheckStarted,
    RiskCheckPassed,
    RiskCheckFailed,
    ExecutionStarted,
    ExecutionCompleted,
    ExecutionFailed,
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            EventType::OrderCreated => "ORDER_CREATED",
            EventType::RiskCheckStarted => "RISK_CHECK_STARTED",
            EventType::RiskCheckPassed => "RISK_CHECK_PASSED",
            EventType::RiskCheckFailed => "RISK_CHECK_FAILED",
            EventType::ExecutionStarted => "EXECUTION_STARTED",
            EventType::ExecutionCompleted => "EXECUTION_COMPLETED",
            EventType::ExecutionFailed => "EXECUTION_FAILED",
        }
    }
}

/// Immutable audit record. Never mutated or deleted after append.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_id: Uuid,
    pub event_type: EventType,
    pub correlation_id: Uuid,
    pub order_id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Opaque payload, passed through to the audit API as JSON
    pub payload: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl Event {
    pub fn new(
        event_type: EventType,
        correlation_id: Uuid,
        order_id: Uuid,
        payload: Value,
        user_id: Option<String>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type,
            correlation_id,
            order_id,
            timestamp: Utc::now(),
            payload,
            user_id,
        }
    }
}

#[derive(Default)]
struct EventLog {
    events: Vec<Event>,
    by_correlation: HashMap<Uuid, Vec<usize>>,
    by_order: HashMap<Uuid, Vec<usize>>,
}

/// Append-only event log with secondary indices.
///
/// In-memory for this deployment. All operations serialise on one mutex;
/// reads hand back snapshot copies so callers iterate without the lock.
/// A durable backend would keep the same surface and surface append
/// failures, which callers must treat as fatal for the triggering
/// operation.
#[derive(Default)]
pub struct EventStore {
    log: Mutex<EventLog>,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically insert into the master log and both indices. After this
    /// returns, the event is visible to every subsequent read.
    pub fn append(&self, event: Event) {
        let mut log = self.log.lock();
        let idx = log.events.len();
        log.by_correlation
            .entry(event.correlation_id)
            .or_default()
            .push(idx);
        log.by_order.entry(event.order_id).or_default().push(idx);
        log.events.push(event);
    }

    /// Events for one correlation id, in append order
    pub fn get_by_correlation(&self, correlation_id: Uuid) -> Vec<Event> {
        let log = self.log.lock();
        log.by_correlation
            .get(&correlation_id)
            .map(|indices| indices.iter().map(|&i| log.events[i].clone()).collect())
            .unwrap_or_default()
    }

    /// Events for one order id, in append order
    pub fn get_by_order(&self, order_id: Uuid) -> Vec<Event> {
        let log = self.log.lock();
        log.by_order
            .get(&order_id)
            .map(|indices| indices.iter().map(|&i| log.events[i].clone()).collect())
            .unwrap_or_default()
    }

    /// The correlation chain projected to plain JSON: ISO-8601 timestamps,
    /// enums as their string values.
    pub fn replay(&self, correlation_id: Uuid) -> Vec<Value> {
        self.get_by_correlation(correlation_id)
            .iter()
            .map(|event| serde_json::to_value(event).unwrap_or(Value::Null))
            .collect()
    }

    /// Most recent `limit` events, oldest first
    pub fn get_recent(&self, limit: usize) -> Vec<Event> {
        let log = self.log.lock();
        let start = log.events.len().saturating_sub(limit);
        log.events[start..].to_vec()
    }

    pub fn len(&self) -> usize {
        self.log.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
