use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use reservasi::config::DashboardConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    let config = DashboardConfig::from_env().expect("Failed to load dashboard configuration");

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(&config.log_level)
        }))
        .init();

    tracing::info!(backend = %config.backend_url, "Starting clinic dashboard");

    let addr = SocketAddr::new(config.host, config.port);
    let app = reservasi::dashboard::build_dashboard(config)?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(reservasi::shutdown_signal())
        .await?;

    Ok(())
}
