// Trend service - fetch a window and turn raw series into drawable ones
use crate::application::decimator::decimate;
use crate::application::gaps::{annotate, gap_threshold, GapAnnotation, GapThreshold};
use crate::application::normalizer::normalize;
use crate::application::trend_client::TrendDataClient;
use crate::domain::telemetry::{NormalizedSeries, RawSample};
use crate::domain::time_range::TimeWindow;
use crate::domain::trends::{Metric, TrendWindow};
use std::sync::Arc;

/// One metric after normalize -> annotate -> decimate.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedSeries {
    pub metric: Metric,
    pub series: NormalizedSeries,
    pub annotation: GapAnnotation,
    pub raw_count: usize,
    pub normalized_count: usize,
    pub dropped: usize,
    pub duplicates: usize,
}

/// Gaps are flagged on the full normalized series, then decimation keeps
/// every gap's endpoints.
pub fn process_series(
    metric: Metric,
    raw: &[RawSample],
    threshold: GapThreshold,
    max_points: usize,
) -> ProcessedSeries {
    let normalized = normalize(raw);
    let normalized_count = normalized.series.len();
    let annotation = annotate(&normalized.series, threshold);
    let series = decimate(normalized.series, max_points, &annotation);

    tracing::debug!(
        metric = %metric,
        raw = raw.len(),
        kept = normalized_count,
        dropped = normalized.dropped,
        duplicates = normalized.duplicates,
        gaps = annotation.gaps.len(),
        drawn = series.len(),
        "Processed series"
    );

    ProcessedSeries {
        metric,
        series,
        annotation,
        raw_count: raw.len(),
        normalized_count,
        dropped: normalized.dropped,
        duplicates: normalized.duplicates,
    }
}

#[derive(Clone)]
pub struct TrendService {
    client: Arc<dyn TrendDataClient>,
    max_points: usize,
}

impl TrendService {
    pub fn new(client: Arc<dyn TrendDataClient>, max_points: usize) -> Self {
        Self { client, max_points }
    }

    /// Fetch a window; any failure becomes the empty fallback window.
    pub async fn fetch_window(&self, range: &TimeWindow) -> TrendWindow {
        let from_iso = range.from_iso();
        let to_iso = range.to_iso();

        match self.client.get_range(&from_iso, &to_iso).await {
            Ok(window) => {
                tracing::info!(
                    from = %from_iso,
                    to = %to_iso,
                    bucket_seconds = ?window.bucket_seconds,
                    temperature = window.series.temperature.len(),
                    humidity = window.series.humidity.len(),
                    pressure = window.series.pressure.len(),
                    gas_resistance = window.series.gas_resistance.len(),
                    "Fetched trend window"
                );
                window
            }
            Err(e) => {
                tracing::warn!(from = %from_iso, to = %to_iso, "Trend fetch failed, rendering empty charts: {e:#}");
                TrendWindow::empty()
            }
        }
    }

    pub fn process(&self, window: &TrendWindow) -> Vec<ProcessedSeries> {
        let threshold = gap_threshold(window.bucket_seconds);
        Metric::ALL
            .iter()
            .map(|metric| process_series(*metric, window.series.get(*metric), threshold, self.max_points))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    struct FailingClient;

    #[async_trait]
    impl TrendDataClient for FailingClient {
        async fn get_range(&self, _from: &str, _to: &str) -> anyhow::Result<TrendWindow> {
            anyhow::bail!("connection refused")
        }
    }

    struct FixedClient(TrendWindow);

    #[async_trait]
    impl TrendDataClient for FixedClient {
        async fn get_range(&self, _from: &str, _to: &str) -> anyhow::Result<TrendWindow> {
            Ok(self.0.clone())
        }
    }

    fn range() -> TimeWindow {
        TimeWindow {
            from: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
            to: Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_fetch_failure_yields_empty_window() {
        let service = TrendService::new(Arc::new(FailingClient), 1000);
        let window = service.fetch_window(&range()).await;

        assert_eq!(window.bucket_seconds, Some(0.0));
        assert_eq!(window.total_samples(), 0);

        let processed = service.process(&window);
        assert_eq!(processed.len(), 4);
        assert!(processed.iter().all(|p| p.series.is_empty()));
    }

    #[tokio::test]
    async fn test_process_each_metric_independently() {
        let mut window = TrendWindow {
            bucket_seconds: Some(300.0),
            ..TrendWindow::default()
        };
        window.series.temperature = vec![
            RawSample::at_millis(600_000, 21.0),
            RawSample::at_millis(0, 20.0),
            RawSample::at_millis(3_000_000, 22.0),
        ];
        window.series.humidity = vec![RawSample::new("garbage", 1.0)];

        let service = TrendService::new(Arc::new(FixedClient(window)), 1000);
        let fetched = service.fetch_window(&range()).await;
        let processed = service.process(&fetched);

        let temperature = &processed[0];
        assert_eq!(temperature.metric, Metric::Temperature);
        assert_eq!(temperature.series.len(), 3);
        assert_eq!(temperature.annotation.threshold_ms, 600_000);
        assert_eq!(temperature.annotation.gaps.len(), 1);

        let humidity = &processed[1];
        assert!(humidity.series.is_empty());
        assert_eq!(humidity.dropped, 1);

        assert!(processed[2].series.is_empty());
        assert!(processed[3].series.is_empty());
    }

    #[test]
    fn test_process_series_decimates_to_budget() {
        let raw: Vec<_> = (0..5_000)
            .map(|i| RawSample::at_millis(i * 60_000, (i % 17) as f64))
            .collect();
        let processed = process_series(Metric::Pressure, &raw, gap_threshold(Some(60.0)), 500);

        assert_eq!(processed.raw_count, 5_000);
        assert_eq!(processed.normalized_count, 5_000);
        assert_eq!(processed.series.len(), 500);
        assert!(processed.annotation.gaps.is_empty());
    }
}
