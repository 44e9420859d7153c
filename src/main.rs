//! Rainfall service entrypoint.
//! Loads configuration, installs logging and serves the axum router.

use std::sync::Arc;

use anyhow::{Context, Result};
use pluvmon_service::{
    api,
    config::AppConfig,
    logging::{self, DataSource},
    pipeline::RainfallService,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    dotenv::dotenv().ok();

    let cfg = AppConfig::load()?;
    logging::init_logging(&cfg.logging);

    let service = Arc::new(RainfallService::from_config(&cfg)?);
    let app = if cfg.server.cors {
        api::router_with_cors(service)
    } else {
        api::router(service)
    };

    let listener = tokio::net::TcpListener::bind(&cfg.server.bind_addr)
        .await
        .with_context(|| format!("binding {}", cfg.server.bind_addr))?;

    tracing::info!(
        source = %DataSource::System,
        addr = %cfg.server.bind_addr,
        upstream = %cfg.source.url,
        validity_ms = cfg.cache.validity_ms,
        "rainfall service listening"
    );

    axum::serve(listener, app).await.context("HTTP server error")?;
    Ok(())
}
