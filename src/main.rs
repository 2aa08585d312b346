// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use crate::application::chart_renderer::ChartRenderer;
use crate::application::pipeline::TrendDashboard;
use crate::application::scheduler;
use crate::application::trend_service::TrendService;
use crate::infrastructure::config::load_dashboard_config;
use crate::infrastructure::http_trend_client::HttpTrendClient;
use crate::infrastructure::svg_surface::{FrameStore, SvgBackend};
use crate::presentation::app_state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_dashboard_config().context("Failed to load dashboard configuration")?;
    let zone = config.trends.zone()?;

    // Backend client (infrastructure layer)
    let client = Arc::new(HttpTrendClient::new(
        config.backend.base_url.clone(),
        config.backend.trends_path.clone(),
        config.backend.timeout(),
    )?);

    // Pipeline (application layer)
    let frames = FrameStore::default();
    let renderer = ChartRenderer::new(
        Arc::new(SvgBackend::new(frames.clone())),
        zone,
        config.chart_styles(),
    );
    let service = TrendService::new(client, config.trends.max_points);
    let dashboard = TrendDashboard::new(service, renderer, config.trends.default_range);
    let (handle, scheduler_task) = scheduler::spawn(dashboard, scheduler::system_clock());

    // Create application state
    let state = Arc::new(AppState {
        dashboard: handle,
        frames: frames.clone(),
    });

    // Build router (presentation layer)
    let router = presentation::router(state);

    // Start server
    let addr: SocketAddr = config
        .server
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid server.listen_addr '{}'", config.server.listen_addr))?;
    tracing::info!(
        %addr,
        backend = %config.backend.base_url,
        range = %config.trends.default_range,
        zone = %zone,
        "Starting station-trends service"
    );

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    // Router (and its handles) dropped: the scheduler releases its charts and exits.
    scheduler_task.await.context("Dashboard scheduler panicked")?;
    tracing::info!(live_surfaces = frames.live_surfaces(), "Dashboard stopped");
    Ok(())
}
