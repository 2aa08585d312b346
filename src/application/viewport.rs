// Viewport control - time-axis zoom/pan per chart, reset across all charts
use crate::application::chart_renderer::ChartHandle;

/// Restore every chart to its full-range viewport. Returns how many charts
/// were redrawn successfully.
pub fn reset_all<'a>(handles: impl IntoIterator<Item = &'a mut ChartHandle>) -> usize {
    let mut redrawn = 0;
    for handle in handles {
        let initial = handle.initial_viewport();
        match handle.set_viewport(initial) {
            Ok(()) => redrawn += 1,
            Err(e) => tracing::warn!("Viewport reset failed: {e:#}"),
        }
    }
    redrawn
}

/// Zoom one chart around `center_ms`; other charts are untouched.
pub fn zoom(handle: &mut ChartHandle, factor: f64, center_ms: i64) -> anyhow::Result<()> {
    let next = handle.viewport().zoomed(factor, center_ms);
    handle.set_viewport(next)
}

/// Pan one chart along the time axis.
pub fn pan(handle: &mut ChartHandle, delta_ms: i64) -> anyhow::Result<()> {
    let next = handle.viewport().panned(delta_ms);
    handle.set_viewport(next)
}
