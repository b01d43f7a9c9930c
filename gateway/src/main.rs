// gateway/src/main.rs

//! Exporter gateway binary.
//!
//! This binary exposes the scrape engine of the `exporter` crate as a
//! set of HTTP endpoints:
//!
//! - `GET /health`
//! - `GET /metrics` (combined scrape, when enabled)
//! - `GET /metrics/general`, `/validators`, `/params`, `/proposals`,
//!   `/upgrade`
//! - `GET /metrics/validator`, `/wallet`, `/delegator`, `/oracle`
//!   (per-address, via `?address=`)
//!
//! At startup it resolves the chain id and denom scale against the node
//! once; a node that cannot answer those queries is a fatal error.

mod config;
mod routes;
mod state;

use std::sync::Arc;
use std::time::Duration;

use axum::{Router, routing::get};
use tokio::signal;

use config::GatewayConfig;
use exporter::{HttpNodeClient, NodeClient, ScrapeConfig};
use routes::{health, scrape};
use state::{AppState, SharedState};

#[tokio::main]
async fn main() {
    // Basic tracing setup.
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "gateway=info,exporter=info".to_string()),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let gateway_cfg = GatewayConfig::load()?;

    // ---------------------------
    // Upstream node client
    // ---------------------------

    let client: Arc<dyn NodeClient> = Arc::new(
        HttpNodeClient::new(
            gateway_cfg.node.lcd_url.clone(),
            Duration::from_secs(gateway_cfg.node.timeout_secs),
        )
        .map_err(|e| format!("failed to create node client: {e}"))?,
    );

    // ---------------------------
    // Configuration resolution
    // ---------------------------

    let scrape_cfg = resolve_config(gateway_cfg.scrape.clone(), &client).await?;
    tracing::info!(
        chain_id = scrape_cfg.chain_id,
        denom = scrape_cfg.denom,
        denom_coefficient = scrape_cfg.denom_coefficient,
        "resolved scrape configuration"
    );

    let single_enabled = scrape_cfg.single;

    // ---------------------------
    // Shared state
    // ---------------------------

    let app_state: SharedState = Arc::new(AppState {
        client,
        config: Arc::new(scrape_cfg),
    });

    // ---------------------------
    // HTTP router
    // ---------------------------

    let mut app = Router::new()
        .route("/health", get(health::health))
        .route("/metrics/general", get(scrape::general))
        .route("/metrics/validator", get(scrape::validator))
        .route("/metrics/validators", get(scrape::validators))
        .route("/metrics/wallet", get(scrape::wallet))
        .route("/metrics/delegator", get(scrape::delegator))
        .route("/metrics/params", get(scrape::params))
        .route("/metrics/proposals", get(scrape::proposals))
        .route("/metrics/upgrade", get(scrape::upgrade))
        .route("/metrics/oracle", get(scrape::oracle));
    if single_enabled {
        app = app.route("/metrics", get(scrape::single));
    }
    let app = app.with_state(app_state);

    // ---------------------------
    // axum 0.8 server (hyper 1 / tokio 1.48 style)
    // ---------------------------

    tracing::info!("exporter listening on http://{}", gateway_cfg.listen_addr);

    let listener = tokio::net::TcpListener::bind(gateway_cfg.listen_addr)
        .await
        .map_err(|e| format!("failed to bind {}: {e}", gateway_cfg.listen_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("HTTP server error: {e}"))?;

    Ok(())
}

/// Resolves the parts of the scrape configuration that come from the
/// node: the chain id used as a const label, and the denom scale when
/// the operator did not pin one.
async fn resolve_config(
    mut scrape_cfg: ScrapeConfig,
    client: &Arc<dyn NodeClient>,
) -> Result<ScrapeConfig, String> {
    scrape_cfg.derive_prefixes();

    if scrape_cfg.chain_id.is_empty() {
        let info = client
            .node_info()
            .await
            .map_err(|e| format!("failed to query node info: {e}"))?;
        scrape_cfg.chain_id = info.network;
    }

    let user_supplied = scrape_cfg
        .apply_user_denom()
        .map_err(|e| format!("invalid denom configuration: {e}"))?;
    if !user_supplied {
        let metadatas = client
            .denoms_metadata()
            .await
            .map_err(|e| format!("failed to query denom metadata: {e}"))?;
        scrape_cfg
            .resolve_denom(&metadatas)
            .map_err(|e| format!("failed to resolve denom: {e}"))?;
    }

    Ok(scrape_cfg)
}

/// Waits for Ctrl-C and returns, used for graceful shutdown.
async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
