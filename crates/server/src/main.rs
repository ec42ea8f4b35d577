use std::sync::Arc;

use anyhow::Context;
use checkmp_server::config::Config;
use checkmp_upstream::MoviePilotClient;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::load().context("failed to load configuration")?;
    info!(
        base_url = %config.base_url,
        timeout_secs = config.timeout.as_secs(),
        verify_tls = config.verify_tls,
        "MoviePilot upstream configured"
    );

    let client = MoviePilotClient::new(&config.client_config())
        .context("failed to build MoviePilot client")?;
    let app_state = checkmp_server::state::AppState::new(Arc::new(client));

    let app = checkmp_server::routes::build_router(app_state);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .context("failed to bind")?;
    info!(addr = %bind_addr, "server listening");

    axum::serve(listener, app).await?;
    Ok(())
}
