//! Watts HTTP Server Binary
//!
//! Serves the thermal model of the configured facility and its monitoring
//! session (simulated probes + ridge regression).
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin watts-server
//!
//! # With an explicit configuration file
//! WATTS_CONFIG=/etc/watts.toml cargo run --bin watts-server
//! ```
//!
//! # Environment Variables
//!
//! - `WATTS_CONFIG`: Configuration file (default: first `watts.toml` found)
//! - `HOST`: Server host (default: 0.0.0.0)
//! - `PORT`: Server port (default: 3030)
//! - `RUST_LOG`: Log level (default: info)

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use watts_rust::config::WattsConfig;
use watts_rust::http::{create_router, AppState};
use watts_rust::monitoring::MonitoringSession;
use watts_rust::regression::RidgeRegressionService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(
            env::var("RUST_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Level::INFO),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting Watts HTTP Server");

    let config = WattsConfig::load()?;
    let facility = Arc::new(config.build_facility()?);
    info!(
        "Monitoring facility '{}' with {} heat sources",
        facility.name(),
        facility.heat_sources().len()
    );

    let service = RidgeRegressionService::new(config.regression.ridge_alpha)?;
    let session = MonitoringSession::new(Arc::new(service), config.regression.request_timeout());

    let state = AppState::new(facility, session.clone(), config.sampling.clone());
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    info!("Server listening on http://{}", addr);
    info!("Start sampling: POST http://{}/v1/sampling/start", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
        })
        .await?;

    session.stop().await;
    Ok(())
}
