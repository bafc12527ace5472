use std::net::SocketAddr;

use anyhow::Result;
use tariff_service::{
    config::AppConfig,
    http::{self, AppState},
    metrics_server, observability,
};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    // Load configuration
    let cfg = AppConfig::load()?;

    // Start metrics server if configured
    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    let addr: SocketAddr = cfg
        .server
        .bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid server.bind_addr: {e}"))?;

    tracing::info!(
        %addr,
        default_layout = %cfg.default_layout,
        delivery = ?cfg.chart.delivery,
        "starting tariff report server"
    );

    let app = http::router(AppState::new(cfg));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
