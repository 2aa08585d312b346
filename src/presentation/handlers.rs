// HTTP request handlers
use crate::application::pipeline::DashboardSnapshot;
use crate::domain::chart::Tooltip;
use crate::domain::trends::{Metric, RangeToken};
use crate::presentation::app_state::AppState;
use crate::presentation::error::{ApiError, ApiResult};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct ZoomQuery {
    pub factor: f64,
    pub center: i64,
}

#[derive(Deserialize)]
pub struct PanQuery {
    pub delta_ms: i64,
}

#[derive(Deserialize)]
pub struct TooltipQuery {
    pub x: f64,
}

fn unavailable(e: anyhow::Error) -> ApiError {
    ApiError::ServiceUnavailable(format!("{e:#}"))
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Current range, loading flag and per-chart summary
pub async fn get_trends(State(state): State<Arc<AppState>>) -> ApiResult<Json<DashboardSnapshot>> {
    let snapshot = state.dashboard.snapshot().await.map_err(unavailable)?;
    Ok(Json(snapshot))
}

/// Switch range; the new charts appear once the fetch completes.
pub async fn change_range(
    Path(token): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<StatusCode> {
    let token: RangeToken = token.parse()?;
    state.dashboard.change_range(token).await.map_err(unavailable)?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn reset_zoom(State(state): State<Arc<AppState>>) -> ApiResult<StatusCode> {
    state.dashboard.reset_all_zoom().await.map_err(unavailable)?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn zoom(
    Path(metric): Path<String>,
    Query(query): Query<ZoomQuery>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<StatusCode> {
    let metric: Metric = metric.parse()?;
    if !query.factor.is_finite() || query.factor <= 0.0 {
        return Err(ApiError::BadRequest(format!(
            "zoom factor must be a positive number, got {}",
            query.factor
        )));
    }
    state
        .dashboard
        .zoom(metric, query.factor, query.center)
        .await
        .map_err(ApiError::Dashboard)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn pan(
    Path(metric): Path<String>,
    Query(query): Query<PanQuery>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<StatusCode> {
    let metric: Metric = metric.parse()?;
    state
        .dashboard
        .pan(metric, query.delta_ms)
        .await
        .map_err(ApiError::Dashboard)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Latest frame drawn for one chart
pub async fn chart_svg(
    Path(metric): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    let metric: Metric = metric.parse()?;
    let svg = state
        .frames
        .frame(metric)
        .ok_or_else(|| ApiError::NotFound(format!("no {metric} chart drawn yet")))?;
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg))
}

pub async fn tooltip(
    Path(metric): Path<String>,
    Query(query): Query<TooltipQuery>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Tooltip>> {
    let metric: Metric = metric.parse()?;
    state
        .dashboard
        .tooltip(metric, query.x)
        .await
        .map_err(unavailable)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no {metric} point to describe")))
}

#[cfg(test)]
mod tests {
    use crate::application::chart_renderer::ChartRenderer;
    use crate::application::pipeline::TrendDashboard;
    use crate::application::scheduler::{self, DashboardHandle};
    use crate::application::trend_client::TrendDataClient;
    use crate::application::trend_service::TrendService;
    use crate::domain::telemetry::RawSample;
    use crate::domain::time_range::DisplayZone;
    use crate::domain::trends::{RangeToken, TrendWindow};
    use crate::infrastructure::svg_surface::{FrameStore, SvgBackend};
    use crate::presentation::app_state::AppState;
    use crate::presentation::router;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use reqwest::StatusCode;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    struct FixedClient;

    #[async_trait]
    impl TrendDataClient for FixedClient {
        async fn get_range(&self, from: &str, to: &str) -> anyhow::Result<TrendWindow> {
            let mut window = TrendWindow {
                bucket_seconds: Some(300.0),
                from: from.to_string(),
                to: to.to_string(),
                ..TrendWindow::default()
            };
            let end = now().timestamp_millis();
            window.series.temperature = (0..12)
                .map(|i| RawSample::at_millis(end - i * 300_000, 20.0 + i as f64 * 0.5))
                .collect();
            Ok(window)
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    async fn serve() -> (String, DashboardHandle, FrameStore) {
        let frames = FrameStore::default();
        let renderer = ChartRenderer::new(
            Arc::new(SvgBackend::new(frames.clone())),
            DisplayZone::utc(),
            HashMap::new(),
        );
        let dashboard = TrendDashboard::new(
            TrendService::new(Arc::new(FixedClient), 1000),
            renderer,
            RangeToken::Day,
        );
        let (handle, _task) = scheduler::spawn(dashboard, Arc::new(now));

        let mut status = handle.subscribe();
        tokio::time::timeout(
            Duration::from_secs(5),
            status.wait_for(|s| s.rendered_generation == Some(1)),
        )
        .await
        .unwrap()
        .unwrap();

        let state = Arc::new(AppState {
            dashboard: handle.clone(),
            frames: frames.clone(),
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        (format!("http://{addr}"), handle, frames)
    }

    #[tokio::test]
    async fn test_snapshot_and_chart_frame() {
        let (base, _handle, frames) = serve().await;
        let client = reqwest::Client::new();

        let health = client.get(format!("{base}/healthz")).send().await.unwrap();
        assert_eq!(health.text().await.unwrap(), "ok");

        let snapshot: serde_json::Value = client
            .get(format!("{base}/trends"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(snapshot["range"], "24h");
        assert_eq!(snapshot["loading"], false);
        assert_eq!(snapshot["charts"].as_array().unwrap().len(), 4);
        assert_eq!(snapshot["charts"][0]["metric"], "temperature");
        assert_eq!(snapshot["charts"][0]["drawn_points"], 12);

        let svg = client
            .get(format!("{base}/trends/temperature/chart.svg"))
            .send()
            .await
            .unwrap();
        assert_eq!(svg.headers()["content-type"], "image/svg+xml");
        assert!(svg.text().await.unwrap().contains("<polyline"));
        assert_eq!(frames.live_surfaces(), 4);

        let missing = client
            .get(format!("{base}/trends/wind/chart.svg"))
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_range_change_validates_token() {
        let (base, handle, _frames) = serve().await;
        let client = reqwest::Client::new();

        let bad = client.post(format!("{base}/trends/range/1y")).send().await.unwrap();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let ok = client.post(format!("{base}/trends/range/7d")).send().await.unwrap();
        assert_eq!(ok.status(), StatusCode::ACCEPTED);

        let mut status = handle.subscribe();
        tokio::time::timeout(
            Duration::from_secs(5),
            status.wait_for(|s| s.rendered_generation == Some(2)),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(handle.status().range, RangeToken::Week);
    }

    #[tokio::test]
    async fn test_zoom_pan_reset_and_tooltip() {
        let (base, handle, _frames) = serve().await;
        let client = reqwest::Client::new();
        let end = now().timestamp_millis();

        let zoomed = client
            .post(format!("{base}/trends/temperature/zoom?factor=4&center={end}"))
            .send()
            .await
            .unwrap();
        assert_eq!(zoomed.status(), StatusCode::NO_CONTENT);

        let panned = client
            .post(format!("{base}/trends/temperature/pan?delta_ms=-60000"))
            .send()
            .await
            .unwrap();
        assert_eq!(panned.status(), StatusCode::NO_CONTENT);

        let snapshot = handle.snapshot().await.unwrap();
        let viewport = snapshot.charts[0].viewport;
        assert_eq!(viewport.span_ms(), 6 * 3_600_000);
        assert_eq!(viewport.max_ms, end - 60_000);

        let bad = client
            .post(format!("{base}/trends/temperature/zoom?factor=0&center={end}"))
            .send()
            .await
            .unwrap();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let reset = client.post(format!("{base}/trends/zoom/reset")).send().await.unwrap();
        assert_eq!(reset.status(), StatusCode::ACCEPTED);
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.charts[0].viewport.span_ms(), 24 * 3_600_000);

        let tooltip: serde_json::Value = client
            .get(format!("{base}/trends/temperature/tooltip?x={}", end - 290_000))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(tooltip["title"], "11:55");
        assert_eq!(tooltip["label"], "20.5 °C");

        let empty = client
            .get(format!("{base}/trends/humidity/tooltip?x={end}"))
            .send()
            .await
            .unwrap();
        assert_eq!(empty.status(), StatusCode::NOT_FOUND);
    }
}
