use anyhow::Context;
use claims_service::{build_router, init_store, AppState, ClaimsConfig};
use std::net::{IpAddr, SocketAddr};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ClaimsConfig::from_env().context("Failed to load configuration")?;

    let store = init_store(&config.store).await;
    info!(storage_type = %store.kind(), environment = %config.environment, "Storage backend selected");

    let ip: IpAddr = config
        .host
        .parse()
        .with_context(|| format!("HOST '{}' is not an IP address", config.host))?;
    let addr = SocketAddr::from((ip, config.port));

    let state = AppState::new(store.into_shared(), config)?;
    let app = build_router(state);

    info!(%addr, "starting claims-service");
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
