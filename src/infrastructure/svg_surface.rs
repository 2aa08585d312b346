// SVG chart surfaces drawn with plotters into a shared frame store
use crate::application::chart_renderer::{ChartBackend, ChartSpec, ChartSurface};
use crate::domain::chart::{RenderedPoint, Viewport};
use crate::domain::trends::Metric;
use anyhow::Context;
use plotters::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

const WIDTH: u32 = 720;
const HEIGHT: u32 = 240;
const BACKGROUND: RGBColor = RGBColor(24, 26, 32);
const TEXT: RGBAColor = RGBAColor(231, 233, 238, 0.85);
const GRID: RGBAColor = RGBAColor(255, 255, 255, 0.08);
const FALLBACK: RGBAColor = RGBAColor(160, 160, 160, 0.9);

/// Latest drawn frame per metric.
#[derive(Clone, Default)]
pub struct FrameStore {
    frames: Arc<RwLock<HashMap<Metric, String>>>,
    live: Arc<AtomicUsize>,
}

impl FrameStore {
    pub fn frame(&self, metric: Metric) -> Option<String> {
        self.frames.read().ok()?.get(&metric).cloned()
    }

    /// Surfaces created and not yet released.
    pub fn live_surfaces(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Default)]
pub struct SvgBackend {
    store: FrameStore,
}

impl SvgBackend {
    pub fn new(store: FrameStore) -> Self {
        Self { store }
    }
}

impl ChartBackend for SvgBackend {
    fn create_surface(&self, metric: Metric) -> anyhow::Result<Box<dyn ChartSurface>> {
        self.store.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SvgSurface {
            metric,
            store: self.store.clone(),
        }))
    }
}

struct SvgSurface {
    metric: Metric,
    store: FrameStore,
}

impl ChartSurface for SvgSurface {
    fn draw(&mut self, spec: &ChartSpec, viewport: Viewport) -> anyhow::Result<()> {
        let svg = render_svg(spec, viewport)?;
        self.store
            .frames
            .write()
            .map_err(|_| anyhow::anyhow!("Frame store lock poisoned"))?
            .insert(self.metric, svg);
        Ok(())
    }

    fn release(self: Box<Self>) -> anyhow::Result<()> {
        self.store.live.fetch_sub(1, Ordering::SeqCst);
        self.store
            .frames
            .write()
            .map_err(|_| anyhow::anyhow!("Frame store lock poisoned"))?
            .remove(&self.metric);
        Ok(())
    }
}

/// Y range: data extent widened to the suggested bounds, never zero-height.
fn y_range(spec: &ChartSpec, visible: &[RenderedPoint]) -> (f64, f64) {
    let (mut lo, mut hi) = visible
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| (lo.min(p.y), hi.max(p.y)));
    if let Some(min) = spec.style.y_min {
        lo = lo.min(min);
    }
    if let Some(max) = spec.style.y_max {
        hi = hi.max(max);
    }
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    if (hi - lo).abs() < 1e-9 {
        return (lo - 1.0, hi + 1.0);
    }
    (lo, hi)
}

fn render_svg(spec: &ChartSpec, viewport: Viewport) -> anyhow::Result<String> {
    let visible: Vec<RenderedPoint> = spec
        .points
        .iter()
        .copied()
        .filter(|p| viewport.contains(p.x))
        .collect();
    let (y_lo, y_hi) = y_range(spec, &visible);

    let line_style = ShapeStyle::from(&parse_color(&spec.style.color)).stroke_width(2);
    let fill = parse_color(&spec.style.fill_color);

    // Grid lines and labels sit on the local hour or day boundaries.
    let ticks: Vec<i64> = spec.ticks(viewport).into_iter().map(|(ms, _)| ms).collect();
    let x_axis = (viewport.min_ms..viewport.max_ms).with_key_points(ticks);
    let format_x = |x: &i64| spec.zone.format_ms(*x, spec.axis.tick_pattern);

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&BACKGROUND).context("Failed to fill chart background")?;

        let mut chart = ChartBuilder::on(&root)
            .margin(8)
            .caption(format!("{} ({})", spec.style.title, spec.unit), ("sans-serif", 13, &TEXT))
            .x_label_area_size(22)
            .y_label_area_size(48)
            .build_cartesian_2d(x_axis, y_lo..y_hi)
            .context("Failed to lay out chart")?;

        chart
            .configure_mesh()
            .bold_line_style(GRID)
            .light_line_style(TRANSPARENT)
            .y_labels(5)
            .axis_style(GRID)
            .label_style(("sans-serif", 10, &TEXT))
            .x_label_formatter(&format_x)
            .y_label_formatter(&|y| fmt_axis(*y))
            .draw()
            .context("Failed to draw chart axes")?;

        for run in spec.line_runs() {
            let coords: Vec<(i64, f64)> = run
                .iter()
                .filter(|p| viewport.contains(p.x))
                .map(|p| (p.x as i64, p.y))
                .collect();
            if coords.is_empty() {
                continue;
            }
            chart
                .draw_series(AreaSeries::new(coords.iter().copied(), y_lo, fill))
                .context("Failed to draw chart area")?;
            chart
                .draw_series(LineSeries::new(coords.iter().copied(), line_style))
                .context("Failed to draw chart line")?;
        }

        root.present().context("Failed to finish chart frame")?;
    }
    Ok(svg)
}

fn fmt_axis(value: f64) -> String {
    let text = format!("{value:.1}");
    text.strip_suffix(".0").map(str::to_string).unwrap_or(text)
}

/// `#rrggbb`, `#rrggbbaa`, `rgb(r,g,b)` or `rgba(r,g,b,a)`. Anything else draws grey.
fn parse_color(text: &str) -> RGBAColor {
    parse_hex(text).or_else(|| parse_rgb(text)).unwrap_or_else(|| {
        tracing::warn!(color = text, "Unrecognised chart colour, drawing grey");
        FALLBACK
    })
}

fn parse_hex(text: &str) -> Option<RGBAColor> {
    let hex = text.trim().strip_prefix('#')?;
    if !matches!(hex.len(), 6 | 8) {
        return None;
    }
    let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    let alpha = if hex.len() == 8 { f64::from(byte(6)?) / 255.0 } else { 1.0 };
    Some(RGBAColor(byte(0)?, byte(2)?, byte(4)?, alpha))
}

fn parse_rgb(text: &str) -> Option<RGBAColor> {
    let text = text.trim();
    let inner = text
        .strip_prefix("rgba(")
        .or_else(|| text.strip_prefix("rgb("))?
        .strip_suffix(')')?;
    let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
    let channel = |i: usize| parts.get(i)?.parse::<u8>().ok();
    let alpha = match parts.len() {
        3 => 1.0,
        4 => parts[3].parse::<f64>().ok().filter(|a| (0.0..=1.0).contains(a))?,
        _ => return None,
    };
    Some(RGBAColor(channel(0)?, channel(1)?, channel(2)?, alpha))
}
