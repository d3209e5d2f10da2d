use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{router, AppState};
use booking_core::{BookingConfig, SystemClock};

/// Main entry point for the booking proxy
///
/// Resolves configuration once, starts the rate-limit sweeper and serves the REST API
/// until interrupted.
///
/// # Environment Variables
/// - `BOOKING_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `HARMONY_CLIENT_ID`, `HARMONY_CLIENT_KEY`, `HARMONY_BASE_URL`: EHR credentials
/// - `ALLOWED_ORIGINS`, `APP_ENV`/`NODE_ENV`, `FACILITY_TIMEZONE`, `HARMONY_TIMEOUT_SECS`,
///   `RATE_LIMIT_MAX_REQUESTS`, `RATE_LIMIT_WINDOW_SECS`: see `BookingConfig::from_env`
///
/// # Returns
/// * `Ok(())` - If the server shuts down cleanly
/// * `Err(anyhow::Error)` - If configuration is invalid, or binding or serving fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fibroid_booking=info".parse()?)
                .add_directive("api_rest=info".parse()?)
                .add_directive("api_shared=info".parse()?)
                .add_directive("booking_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("BOOKING_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let config = BookingConfig::from_env()?;
    if config.credentials().is_none() {
        tracing::warn!("EHR credentials are not configured; booking endpoints will return CONFIG_ERROR");
    }
    tracing::info!(
        environment = ?config.environment(),
        facility_timezone = %config.facility_timezone(),
        "++ Starting booking proxy REST on {}",
        rest_addr
    );

    let state = AppState::new(config, Arc::new(SystemClock))?;
    let sweeper = state.limiter.clone().spawn_sweeper();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    tracing::info!("-- Booking proxy stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
