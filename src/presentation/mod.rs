// Presentation layer - HTTP routes over the dashboard
pub mod app_state;
pub mod error;
pub mod handlers;

use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    change_range, chart_svg, get_trends, health_check, pan, reset_zoom, tooltip, zoom,
};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/trends", get(get_trends))
        .route("/trends/range/:token", post(change_range))
        .route("/trends/zoom/reset", post(reset_zoom))
        .route("/trends/:metric/zoom", post(zoom))
        .route("/trends/:metric/pan", post(pan))
        .route("/trends/:metric/chart.svg", get(chart_svg))
        .route("/trends/:metric/tooltip", get(tooltip))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
