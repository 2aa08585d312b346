// Trend dashboard pipeline - range switching, staleness and chart lifecycle
use crate::application::chart_renderer::{ChartHandle, ChartRenderer};
use crate::application::trend_service::{ProcessedSeries, TrendService};
use crate::application::viewport;
use crate::domain::chart::{Tooltip, Viewport};
use crate::domain::time_range::TimeWindow;
use crate::domain::trends::{Granularity, Metric, RangeToken, TrendWindow};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Identifies one dispatched fetch. Completions carrying an older
/// generation than the dashboard's current one are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub generation: u64,
    pub token: RangeToken,
    pub window: TimeWindow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Rendered { charts: usize },
    Discarded,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartSummary {
    pub metric: Metric,
    pub title: String,
    pub unit: &'static str,
    pub granularity: Granularity,
    pub raw_points: usize,
    pub normalized_points: usize,
    pub drawn_points: usize,
    pub dropped: usize,
    pub duplicates: usize,
    pub gaps: usize,
    pub viewport: Viewport,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub range: RangeToken,
    pub loading: bool,
    pub generation: u64,
    pub rendered_generation: Option<u64>,
    pub discarded: u64,
    pub from: Option<String>,
    pub to: Option<String>,
    pub charts: Vec<ChartSummary>,
}

/// Compact progress marker, published after every scheduler turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineStatus {
    pub range: RangeToken,
    pub generation: u64,
    pub rendered_generation: Option<u64>,
    pub discarded: u64,
    pub loading: bool,
}

struct RenderedRun {
    generation: u64,
    window: TimeWindow,
    processed: Vec<ProcessedSeries>,
}

/// Owns the active range and the one live set of chart handles.
pub struct TrendDashboard {
    service: TrendService,
    renderer: ChartRenderer,
    active: RangeToken,
    generation: u64,
    loading: bool,
    discarded: u64,
    charts: Vec<ChartHandle>,
    rendered: Option<RenderedRun>,
}

impl TrendDashboard {
    pub fn new(service: TrendService, renderer: ChartRenderer, initial: RangeToken) -> Self {
        Self {
            service,
            renderer,
            active: initial,
            generation: 0,
            loading: false,
            discarded: 0,
            charts: Vec::new(),
            rendered: None,
        }
    }

    pub fn service(&self) -> &TrendService {
        &self.service
    }

    /// First load for the initial range.
    pub fn start(&mut self, now: DateTime<Utc>) -> FetchTicket {
        self.dispatch(self.active, now)
    }

    /// Switch range. Selecting the range already active does nothing.
    pub fn change_range(&mut self, token: RangeToken, now: DateTime<Utc>) -> Option<FetchTicket> {
        if token == self.active && self.generation > 0 {
            tracing::debug!(range = %token, "Range already active, not refetching");
            return None;
        }
        tracing::info!(from = %self.active, to = %token, "Switching trend range");
        self.active = token;
        Some(self.dispatch(token, now))
    }

    fn dispatch(&mut self, token: RangeToken, now: DateTime<Utc>) -> FetchTicket {
        self.generation += 1;
        self.loading = true;
        FetchTicket {
            generation: self.generation,
            token,
            window: self.renderer.zone().resolve(token, now),
        }
    }

    /// Accept a finished fetch; render it unless a newer request superseded it.
    pub fn complete(&mut self, ticket: &FetchTicket, window: TrendWindow) -> Completion {
        if ticket.generation != self.generation {
            self.discarded += 1;
            tracing::debug!(
                stale = ticket.generation,
                current = self.generation,
                range = %ticket.token,
                "Discarding stale trend response"
            );
            return Completion::Discarded;
        }

        let charts = self.render(ticket, &window);
        self.loading = false;
        Completion::Rendered { charts }
    }

    fn render(&mut self, ticket: &FetchTicket, window: &TrendWindow) -> usize {
        self.release_charts();

        let granularity = ticket.token.granularity();
        let viewport = Viewport::new(ticket.window.from_ms(), ticket.window.to_ms());
        let processed = self.service.process(window);

        for series in &processed {
            let metric = series.metric;
            let handle = self
                .renderer
                .render_series(series, granularity, viewport)
                .or_else(|e| {
                    tracing::error!(metric = %metric, "Chart render failed, drawing it empty: {e:#}");
                    self.renderer.render(
                        metric,
                        Vec::new(),
                        metric.unit(),
                        granularity,
                        &series.annotation,
                        viewport,
                    )
                });
            match handle {
                Ok(handle) => self.charts.push(handle),
                Err(e) => tracing::error!(metric = %metric, "Chart unavailable: {e:#}"),
            }
        }

        self.rendered = Some(RenderedRun {
            generation: ticket.generation,
            window: ticket.window,
            processed,
        });
        self.charts.len()
    }

    fn release_charts(&mut self) {
        for handle in self.charts.drain(..) {
            handle.release();
        }
    }

    pub fn chart(&self, metric: Metric) -> Option<&ChartHandle> {
        self.charts.iter().find(|c| c.metric() == metric)
    }

    fn chart_mut(&mut self, metric: Metric) -> anyhow::Result<&mut ChartHandle> {
        self.charts
            .iter_mut()
            .find(|c| c.metric() == metric)
            .ok_or_else(|| anyhow::anyhow!("No {metric} chart is rendered"))
    }

    pub fn reset_all_zoom(&mut self) -> usize {
        viewport::reset_all(self.charts.iter_mut())
    }

    pub fn zoom(&mut self, metric: Metric, factor: f64, center_ms: i64) -> anyhow::Result<()> {
        viewport::zoom(self.chart_mut(metric)?, factor, center_ms)
    }

    pub fn pan(&mut self, metric: Metric, delta_ms: i64) -> anyhow::Result<()> {
        viewport::pan(self.chart_mut(metric)?, delta_ms)
    }

    pub fn tooltip(&self, metric: Metric, x_ms: f64) -> Option<Tooltip> {
        self.chart(metric)?.spec().tooltip_at(x_ms)
    }

    pub fn status(&self) -> PipelineStatus {
        PipelineStatus {
            range: self.active,
            generation: self.generation,
            rendered_generation: self.rendered.as_ref().map(|r| r.generation),
            discarded: self.discarded,
            loading: self.loading,
        }
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        let charts = self
            .charts
            .iter()
            .map(|handle| {
                let spec = handle.spec();
                let processed = self
                    .rendered
                    .as_ref()
                    .and_then(|r| r.processed.iter().find(|p| p.metric == spec.metric));
                ChartSummary {
                    metric: spec.metric,
                    title: spec.style.title.clone(),
                    unit: spec.unit,
                    granularity: spec.axis.granularity,
                    raw_points: processed.map_or(0, |p| p.raw_count),
                    normalized_points: processed.map_or(0, |p| p.normalized_count),
                    drawn_points: spec.points.len(),
                    dropped: processed.map_or(0, |p| p.dropped),
                    duplicates: processed.map_or(0, |p| p.duplicates),
                    gaps: spec.annotation.gaps.len(),
                    viewport: handle.viewport(),
                }
            })
            .collect();

        DashboardSnapshot {
            range: self.active,
            loading: self.loading,
            generation: self.generation,
            rendered_generation: self.rendered.as_ref().map(|r| r.generation),
            discarded: self.discarded,
            from: self.rendered.as_ref().map(|r| r.window.from_iso()),
            to: self.rendered.as_ref().map(|r| r.window.to_iso()),
            charts,
        }
    }

    /// Release every live chart.
    pub fn shutdown(&mut self) {
        self.release_charts();
    }
}
