// Chart renderer - builds chart specs and owns their drawing surfaces
use crate::application::gaps::GapAnnotation;
use crate::application::trend_service::ProcessedSeries;
use crate::domain::chart::{AxisFormat, ChartStyle, RenderedPoint, Tooltip, Viewport};
use crate::domain::time_range::DisplayZone;
use crate::domain::trends::{Granularity, Metric};
use anyhow::Context;
use std::collections::HashMap;
use std::sync::Arc;

/// Keeps axis labels readable on long ranges (30 daily ticks -> 10).
const MAX_TICKS: usize = 12;

/// Everything a surface needs to draw one chart.
#[derive(Debug, Clone)]
pub struct ChartSpec {
    pub metric: Metric,
    pub style: ChartStyle,
    pub unit: &'static str,
    pub points: Vec<RenderedPoint>,
    /// Line segments longer than this may break; see `line_runs`.
    pub span_gaps_ms: i64,
    pub annotation: GapAnnotation,
    pub axis: AxisFormat,
    pub zone: DisplayZone,
}

impl ChartSpec {
    /// Split the points into connected runs.
    ///
    /// A segment breaks when it is longer than the span-gaps threshold and a
    /// gap flagged on the full series lies under it. Decimation can stretch
    /// ordinary segments past the threshold; those still draw connected.
    pub fn line_runs(&self) -> Vec<&[RenderedPoint]> {
        let mut runs = Vec::new();
        let mut start = 0;
        for i in 1..self.points.len() {
            let (a, b) = (self.points[i - 1], self.points[i]);
            let long = (b.x - a.x) > self.span_gaps_ms as f64;
            if long && self.annotation.breaks_between(a.x as i64, b.x as i64) {
                runs.push(&self.points[start..i]);
                start = i;
            }
        }
        if start < self.points.len() {
            runs.push(&self.points[start..]);
        }
        runs
    }

    /// Tick positions and labels inside `viewport`, aligned to local hours or days.
    ///
    /// Empty when the viewport sits at the edge of the representable range.
    pub fn ticks(&self, viewport: Viewport) -> Vec<(i64, String)> {
        self.tick_positions(viewport)
            .unwrap_or_default()
            .into_iter()
            .map(|ms| (ms, self.zone.format_ms(ms, self.axis.tick_pattern)))
            .collect()
    }

    fn tick_positions(&self, viewport: Viewport) -> Option<Vec<i64>> {
        let step = self.axis.tick_step_ms;
        let offset = self.zone.offset_ms(viewport.min_ms);
        let local_min = viewport.min_ms.checked_add(offset)?;
        let mut first_local = local_min.div_euclid(step).checked_mul(step)?;
        if first_local < local_min {
            first_local = first_local.checked_add(step)?;
        }
        let first = first_local.checked_sub(offset)?;

        let count = if first > viewport.max_ms {
            0
        } else {
            (viewport.max_ms.checked_sub(first)? / step + 1) as usize
        };
        let stride = count.div_ceil(MAX_TICKS).max(1);

        (0..count)
            .step_by(stride)
            .map(|i| (i as i64).checked_mul(step).and_then(|d| first.checked_add(d)))
            .collect()
    }

    pub fn format_value(&self, value: f64) -> String {
        let text = format!("{value:.3}");
        let text = text.trim_end_matches('0').trim_end_matches('.');
        format!("{text} {}", self.unit)
    }

    /// Tooltip for the point nearest to `x_ms` along the time axis.
    pub fn tooltip_at(&self, x_ms: f64) -> Option<Tooltip> {
        let idx = self.points.partition_point(|p| p.x < x_ms);
        let nearest = [idx.checked_sub(1), Some(idx)]
            .into_iter()
            .flatten()
            .filter_map(|i| self.points.get(i))
            .min_by(|a, b| (a.x - x_ms).abs().total_cmp(&(b.x - x_ms).abs()))?;

        Some(Tooltip {
            title: self.zone.format_ms(nearest.x as i64, self.axis.tooltip_pattern),
            label: self.format_value(nearest.y),
        })
    }
}

/// Creates drawing surfaces, one per chart.
pub trait ChartBackend: Send + Sync {
    fn create_surface(&self, metric: Metric) -> anyhow::Result<Box<dyn ChartSurface>>;
}

pub trait ChartSurface: Send {
    fn draw(&mut self, spec: &ChartSpec, viewport: Viewport) -> anyhow::Result<()>;

    /// Free the surface's resources.
    fn release(self: Box<Self>) -> anyhow::Result<()>;
}

/// One live chart: its spec, its viewport and the surface it draws on.
///
/// Must be released with [`ChartHandle::release`] before a replacement for
/// the same metric is created.
pub struct ChartHandle {
    spec: ChartSpec,
    initial: Viewport,
    viewport: Viewport,
    surface: Box<dyn ChartSurface>,
}

impl ChartHandle {
    pub fn metric(&self) -> Metric {
        self.spec.metric
    }

    pub fn spec(&self) -> &ChartSpec {
        &self.spec
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn initial_viewport(&self) -> Viewport {
        self.initial
    }

    pub(crate) fn set_viewport(&mut self, viewport: Viewport) -> anyhow::Result<()> {
        self.viewport = viewport;
        self.surface
            .draw(&self.spec, viewport)
            .with_context(|| format!("Failed to redraw {} chart", self.spec.metric))
    }

    /// Best effort: a failing release is logged and otherwise ignored.
    pub fn release(self) {
        let metric = self.spec.metric;
        if let Err(e) = self.surface.release() {
            tracing::warn!(metric = %metric, "Chart surface release failed: {e:#}");
        }
    }
}

#[derive(Clone)]
pub struct ChartRenderer {
    backend: Arc<dyn ChartBackend>,
    zone: DisplayZone,
    styles: HashMap<Metric, ChartStyle>,
}

impl ChartRenderer {
    pub fn new(backend: Arc<dyn ChartBackend>, zone: DisplayZone, styles: HashMap<Metric, ChartStyle>) -> Self {
        Self { backend, zone, styles }
    }

    pub fn zone(&self) -> DisplayZone {
        self.zone
    }

    fn style(&self, metric: Metric) -> ChartStyle {
        self.styles
            .get(&metric)
            .cloned()
            .unwrap_or_else(|| ChartStyle::default_for(metric))
    }

    /// Draw one metric and hand back the handle that owns the surface.
    pub fn render(
        &self,
        metric: Metric,
        points: Vec<RenderedPoint>,
        unit: &'static str,
        granularity: Granularity,
        annotation: &GapAnnotation,
        viewport: Viewport,
    ) -> anyhow::Result<ChartHandle> {
        let spec = ChartSpec {
            metric,
            style: self.style(metric),
            unit,
            points,
            span_gaps_ms: annotation.threshold_ms,
            annotation: annotation.clone(),
            axis: AxisFormat::for_granularity(granularity),
            zone: self.zone,
        };

        let mut surface = self
            .backend
            .create_surface(metric)
            .with_context(|| format!("Failed to create surface for {metric} chart"))?;
        if let Err(e) = surface.draw(&spec, viewport) {
            if let Err(release_err) = surface.release() {
                tracing::warn!(metric = %metric, "Chart surface release failed: {release_err:#}");
            }
            return Err(e.context(format!("Failed to draw {metric} chart")));
        }

        Ok(ChartHandle {
            spec,
            initial: viewport,
            viewport,
            surface,
        })
    }

    pub fn render_series(
        &self,
        processed: &ProcessedSeries,
        granularity: Granularity,
        viewport: Viewport,
    ) -> anyhow::Result<ChartHandle> {
        let points = processed.series.iter().map(RenderedPoint::from).collect();
        self.render(
            processed.metric,
            points,
            processed.metric.unit(),
            granularity,
            &processed.annotation,
            viewport,
        )
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// In-memory backend that records surface lifecycle for assertions.
    #[derive(Default)]
    pub struct RecordingBackend {
        pub state: Arc<Mutex<Recorded>>,
        pub fail_create: Option<Metric>,
        pub fail_release: bool,
    }

    #[derive(Default, Debug)]
    pub struct Recorded {
        pub created: usize,
        pub released: usize,
        pub draws: Vec<(Metric, Viewport, usize)>,
    }

    impl Recorded {
        pub fn live(&self) -> usize {
            self.created - self.released
        }
    }

    struct RecordingSurface {
        metric: Metric,
        state: Arc<Mutex<Recorded>>,
        fail_release: bool,
    }

    impl ChartBackend for RecordingBackend {
        fn create_surface(&self, metric: Metric) -> anyhow::Result<Box<dyn ChartSurface>> {
            if self.fail_create == Some(metric) {
                anyhow::bail!("no canvas for {metric}");
            }
            self.state.lock().unwrap().created += 1;
            Ok(Box::new(RecordingSurface {
                metric,
                state: self.state.clone(),
                fail_release: self.fail_release,
            }))
        }
    }

    impl ChartSurface for RecordingSurface {
        fn draw(&mut self, spec: &ChartSpec, viewport: Viewport) -> anyhow::Result<()> {
            self.state
                .lock()
                .unwrap()
                .draws
                .push((self.metric, viewport, spec.points.len()));
            Ok(())
        }

        fn release(self: Box<Self>) -> anyhow::Result<()> {
            self.state.lock().unwrap().released += 1;
            if self.fail_release {
                anyhow::bail!("context lost");
            }
            Ok(())
        }
    }
}
