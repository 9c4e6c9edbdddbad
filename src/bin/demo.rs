//! Gateway Demo Client
//! Mission: Walk the complete order lifecycle against a running gateway -
//! auth, submission, execution, audit replay, risk controls, and RBAC.
//!
//! Start the server first (`ordergate`), then run `gateway-demo`.

use anyhow::{bail, Context, Result};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;

const BASE_URL: &str = "http://localhost:8000/api/v1";

struct GatewayClient {
    http: Client,
}

impl GatewayClient {
    fn new() -> Self {
        Self {
            http: Client::new(),
        }
    }

    async fn login(&self, username: &str, password: &str) -> Result<String> {
        let response = self
            .http
            .post(format!("{BASE_URL}/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .context("Is the gateway running on localhost:8000?")?;
        if !response.status().is_success() {
            bail!("Login failed for {username}: {}", response.status());
        }
        let body: Value = response.json().await?;
        Ok(body["access_token"]
            .as_str()
            .context("No access_token in login response")?
            .to_string())
    }

    async fn get(&self, path: &str, token: &str) -> Result<(StatusCode, Value)> {
        let response = self
            .http
            .get(format!("{BASE_URL}{path}"))
            .bearer_auth(token)
            .send()
            .await?;
        let status = response.status();
        Ok((status, response.json().await.unwrap_or(Value::Null)))
    }

    async fn post(&self, path: &str, token: &str, body: &Value) -> Result<(StatusCode, Value)> {
        let response = self
            .http
            .post(format!("{BASE_URL}{path}"))
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;
        let status = response.status();
        Ok((status, response.json().await.unwrap_or(Value::Null)))
    }

    async fn put(&self, path: &str, token: &str, body: &Value) -> Result<(StatusCode, Value)> {
        let response = self
            .http
            .put(format!("{BASE_URL}{path}"))
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;
        let status = response.status();
        Ok((status, response.json().await.unwrap_or(Value::Null)))
    }
}

fn header(title: &str) {
    println!("\n{}", "=".repeat(72));
    println!("  {title}");
    println!("{}", "=".repeat(72));
}

#[tokio::main]
async fn main() -> Result<()> {
    let client = GatewayClient::new();

    header("ORDER GATEWAY DEMO");

    // Authentication
    header("1. AUTHENTICATION");
    let trader = client.login("trader1", "trader123").await?;
    println!("trader1 authenticated");
    let risk_manager = client.login("risk1", "risk123").await?;
    println!("risk1 authenticated");
    let compliance = client.login("compliance1", "compliance123").await?;
    println!("compliance1 authenticated");

    // Risk configuration
    header("2. RISK LIMITS");
    let (_, metrics) = client.get("/risk/metrics", &trader).await?;
    println!("Net exposure:   {}", metrics["net_exposure"]);
    println!("Gross exposure: {}", metrics["gross_exposure"]);
    println!("Daily volume:   {}", metrics["daily_volume"]);
    let (_, limits) = client.get("/risk/limits", &risk_manager).await?;
    println!("Limits: {limits}");

    // Happy-path order
    header("3. ORDER SUBMISSION");
    let order_request = json!({
        "symbol": "AAPL",
        "side": "BUY",
        "quantity": 100,
        "price": 175.50,
        "strategy": "momentum",
    });
    let (_, submitted) = client.post("/orders", &trader, &order_request).await?;
    let order_id = submitted["order_id"].as_str().unwrap_or_default().to_string();
    let correlation_id = submitted["correlation_id"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    println!("Submitted: status={}, order_id={order_id}", submitted["status"]);

    // Poll until the background execution settles
    let mut order = Value::Null;
    for _ in 0..40 {
        tokio::time::sleep(Duration::from_millis(250)).await;
        let (_, current) = client.get(&format!("/orders/{order_id}"), &trader).await?;
        let status = current["status"].as_str().unwrap_or_default().to_string();
        order = current;
        if ["EXECUTED", "FAILED", "REJECTED"].contains(&status.as_str()) {
            break;
        }
    }
    println!(
        "Final: status={}, executed_quantity={}, executed_price={}",
        order["status"], order["executed_quantity"], order["executed_price"]
    );

    // Audit trail
    header("4. AUDIT TRAIL");
    let (_, chain) = client
        .get(&format!("/audit/correlation/{correlation_id}"), &compliance)
        .await?;
    println!("Events for correlation {correlation_id}:");
    if let Some(events) = chain["events"].as_array() {
        for event in events {
            println!("  -> {} at {}", event["event_type"], event["timestamp"]);
        }
    }

    // Risk rejection
    header("5. PRE-TRADE RISK CONTROLS");
    let oversized = json!({
        "symbol": "TSLA",
        "side": "BUY",
        "quantity": 50000,
        "price": 250,
    });
    let (_, rejected) = client.post("/orders", &trader, &oversized).await?;
    println!(
        "Oversized order: status={}, message={}",
        rejected["status"], rejected["message"]
    );

    // Kill switch
    header("6. KILL SWITCH");
    let (_, on) = client
        .post("/risk/kill-switch?enabled=true", &risk_manager, &Value::Null)
        .await?;
    println!("{}", on["message"]);
    let blocked_request = json!({
        "symbol": "MSFT",
        "side": "BUY",
        "quantity": 10,
        "price": 380,
    });
    let (_, blocked) = client.post("/orders", &trader, &blocked_request).await?;
    println!(
        "Order under kill switch: status={}, message={}",
        blocked["status"], blocked["message"]
    );
    let (_, off) = client
        .post("/risk/kill-switch?enabled=false", &risk_manager, &Value::Null)
        .await?;
    println!("{}", off["message"]);

    // RBAC
    header("7. ROLE-BASED ACCESS CONTROL");
    let (status, _) = client
        .put("/risk/limits", &trader, &json!({"max_position_size": 1}))
        .await?;
    println!("Trader updating limits: {status} (expected 403)");

    // Observability
    header("8. SYSTEM METRICS");
    let (_, system) = client.get("/metrics", &trader).await?;
    println!("Total orders: {}", system["total_orders"]);
    println!("Total events: {}", system["total_events"]);
    println!("Status breakdown: {}", system["order_status_breakdown"]);
    println!("Circuit breaker: {}", system["circuit_breaker"]);

    let (_, positions) = client.get("/risk/positions", &trader).await?;
    println!("Positions: {}", positions["positions"]);

    header("DEMO COMPLETE");
    Ok(())
}
