// Chart domain models
use super::telemetry::Sample;
use super::trends::{Granularity, Metric};
use serde::Serialize;

const HOUR_MS: i64 = 3_600_000;
const DAY_MS: i64 = 24 * HOUR_MS;

/// Smallest visible x span a zoom may reach.
pub const MIN_VIEWPORT_SPAN_MS: i64 = 60_000;

/// Renderer-facing projection of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RenderedPoint {
    pub x: f64,
    pub y: f64,
}

impl From<&Sample> for RenderedPoint {
    fn from(sample: &Sample) -> Self {
        Self {
            x: sample.time_ms as f64,
            y: sample.value,
        }
    }
}

/// Tick spacing and label patterns for one granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisFormat {
    pub granularity: Granularity,
    pub tick_step_ms: i64,
    pub tick_pattern: &'static str,
    pub tooltip_pattern: &'static str,
}

impl AxisFormat {
    pub fn for_granularity(granularity: Granularity) -> Self {
        match granularity {
            Granularity::Hourly => Self {
                granularity,
                tick_step_ms: HOUR_MS,
                tick_pattern: "%H:%M",
                tooltip_pattern: "%H:%M",
            },
            Granularity::Daily => Self {
                granularity,
                tick_step_ms: DAY_MS,
                tick_pattern: "%d.%m",
                tooltip_pattern: "%Y-%m-%d %H:%M",
            },
        }
    }
}

/// Largest |epoch millis| a viewport may reach, inside chrono's range.
pub const MAX_VIEWPORT_EPOCH_MS: i64 = 8_000_000_000_000_000;

/// Visible x range of one chart, in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Viewport {
    pub min_ms: i64,
    pub max_ms: i64,
}

impl Viewport {
    /// Both edges are kept within `±MAX_VIEWPORT_EPOCH_MS`.
    pub fn new(min_ms: i64, max_ms: i64) -> Self {
        let min_ms = min_ms.clamp(
            -MAX_VIEWPORT_EPOCH_MS,
            MAX_VIEWPORT_EPOCH_MS - MIN_VIEWPORT_SPAN_MS,
        );
        let max_ms = if max_ms > min_ms {
            max_ms.min(MAX_VIEWPORT_EPOCH_MS)
        } else {
            min_ms + MIN_VIEWPORT_SPAN_MS
        };
        Self { min_ms, max_ms }
    }

    pub fn span_ms(&self) -> i64 {
        self.max_ms.saturating_sub(self.min_ms)
    }

    pub fn contains(&self, x_ms: f64) -> bool {
        x_ms >= self.min_ms as f64 && x_ms <= self.max_ms as f64
    }

    /// Scale the span around `center_ms`. Factors above 1 zoom in.
    pub fn zoomed(&self, factor: f64, center_ms: i64) -> Self {
        if !factor.is_finite() || factor <= 0.0 {
            return *self;
        }
        let bound = MAX_VIEWPORT_EPOCH_MS as f64;
        let center = center_ms.clamp(self.min_ms, self.max_ms) as f64;
        let span = (self.span_ms() as f64 / factor).clamp(MIN_VIEWPORT_SPAN_MS as f64, 2.0 * bound);
        let left_share = (center - self.min_ms as f64) / self.span_ms() as f64;
        let min = (center - span * left_share).clamp(-bound, bound - span);
        let min_ms = min.round() as i64;
        Self::new(min_ms, min_ms.saturating_add(span.round() as i64))
    }

    /// Shift along the time axis; stops at the representable edge.
    pub fn panned(&self, delta_ms: i64) -> Self {
        let lowest = (-MAX_VIEWPORT_EPOCH_MS).saturating_sub(self.min_ms);
        let highest = MAX_VIEWPORT_EPOCH_MS.saturating_sub(self.max_ms);
        let delta = delta_ms.max(lowest).min(highest);
        Self::new(
            self.min_ms.saturating_add(delta),
            self.max_ms.saturating_add(delta),
        )
    }
}

/// Colours and suggested y range of one chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartStyle {
    pub title: String,
    pub color: String,
    pub fill_color: String,
    pub y_min: Option<f64>,
    pub y_max: Option<f64>,
}

impl ChartStyle {
    pub fn default_for(metric: Metric) -> Self {
        let (color, fill_color, y_min, y_max) = match metric {
            Metric::Temperature => ("rgba(255,185,120,0.95)", "rgba(255,185,120,0.35)", Some(-10.0), Some(40.0)),
            Metric::Humidity => ("rgba(138,180,248,0.95)", "rgba(138,180,248,0.25)", None, None),
            Metric::Pressure => ("rgba(180,140,255,0.95)", "rgba(180,140,255,0.25)", None, None),
            Metric::GasResistance => ("rgba(90,210,200,0.95)", "rgba(90,210,200,0.25)", None, None),
        };
        Self {
            title: metric.label().to_string(),
            color: color.to_string(),
            fill_color: fill_color.to_string(),
            y_min,
            y_max,
        }
    }
}

/// Title and value line shown when hovering a point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tooltip {
    pub title: String,
    pub label: String,
}
