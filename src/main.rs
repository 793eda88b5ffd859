//! CityTwin - a city ecosystem dashboard.
//!
//! Serves the landing page and per-city dashboards, relaying analysis and
//! chat requests to the backend configured by `CITYTWIN_BACKEND_URL`.
//!
//! # Endpoints
//!
//! - `GET /` - Landing page
//! - `GET /dashboard/:id` - Dashboard for a session
//! - `/api/sessions/...` - Session snapshots and chat
//! - `GET /health` - Health check

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use citytwin::api::{AppState, router};
use citytwin::client::HttpBackend;
use citytwin::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Chat bodies are logged by length only, at any level
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("citytwin=info".parse()?))
        .init();

    let config = Config::from_env();

    info!(port = config.port, backend_url = %config.backend_url, "Starting CityTwin");

    let backend = HttpBackend::with_base_url(&config.backend_url);
    let state = AppState::new(Arc::new(backend), config.map);
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;

    info!(%addr, "CityTwin is listening");

    axum::serve(listener, app).await?;

    Ok(())
}
