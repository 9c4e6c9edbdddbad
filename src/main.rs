//! Ordergate - Institutional Order-Submission Gateway
//! Mission: Pre-trade risk, resilient simulated execution, and a complete
//! audit trail behind one authenticated control surface

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ordergate::api::{self, AppState};
use ordergate::models::Config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;
    let state = AppState::new(&config).context("Failed to construct engines")?;
    let app = api::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("🚀 Ordergate listening on {addr}");
    axum::serve(listener, app)
        .await
        .context("Server terminated")?;

    Ok(())
}
