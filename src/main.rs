use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use agenda::config::AppConfig;
use agenda::routes::create_router;
use agenda::services::backend::http::HttpBackend;
use agenda::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let backend = HttpBackend::new(
        &config.backend_url,
        config.backend_token.clone(),
        config.backend_timeout_secs,
    )?;
    tracing::info!(
        "using backend {} (timezone: {}, slot: {} min)",
        config.backend_url,
        config.timezone,
        config.slot_duration_minutes
    );

    let state = Arc::new(AppState {
        config: config.clone(),
        backend: Box::new(backend),
    });

    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
