// Gap annotator - decides where the line must break
use crate::domain::telemetry::NormalizedSeries;
use std::ops::Range;

/// Bucket width assumed when the backend reports none (or a non-positive one).
pub const DEFAULT_BUCKET_SECONDS: f64 = 300.0;

/// Largest delta between consecutive samples that still draws as a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapThreshold {
    pub millis: i64,
}

impl GapThreshold {
    /// True when the delta between two samples is a data outage.
    pub fn is_gap(&self, delta_ms: i64) -> bool {
        delta_ms > self.millis
    }
}

/// Twice the bucket width, in the millisecond unit samples use.
pub fn gap_threshold(bucket_seconds: Option<f64>) -> GapThreshold {
    let bucket = match bucket_seconds {
        Some(seconds) if seconds.is_finite() && seconds > 0.0 => seconds,
        _ => DEFAULT_BUCKET_SECONDS,
    };
    GapThreshold {
        millis: (2.0 * bucket * 1000.0).round() as i64,
    }
}

/// A flagged outage between two consecutive normalized samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gap {
    pub start_ms: i64,
    pub end_ms: i64,
}

/// Gaps found on a normalized series, before any decimation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GapAnnotation {
    pub threshold_ms: i64,
    pub gaps: Vec<Gap>,
    /// Index ranges of the gap-free runs, covering the whole series.
    pub runs: Vec<Range<usize>>,
}

impl GapAnnotation {
    /// Whether a flagged gap lies entirely inside `[a_ms, b_ms]`.
    pub fn breaks_between(&self, a_ms: i64, b_ms: i64) -> bool {
        let idx = self.gaps.partition_point(|g| g.start_ms < a_ms);
        self.gaps
            .get(idx)
            .is_some_and(|g| g.end_ms <= b_ms)
    }
}

pub fn annotate(series: &NormalizedSeries, threshold: GapThreshold) -> GapAnnotation {
    let samples = series.as_slice();
    let mut gaps = Vec::new();
    let mut runs = Vec::new();
    let mut run_start = 0;

    for (i, pair) in samples.windows(2).enumerate() {
        if threshold.is_gap(pair[1].time_ms.saturating_sub(pair[0].time_ms)) {
            gaps.push(Gap {
                start_ms: pair[0].time_ms,
                end_ms: pair[1].time_ms,
            });
            runs.push(run_start..i + 1);
            run_start = i + 1;
        }
    }
    if !samples.is_empty() {
        runs.push(run_start..samples.len());
    }

    GapAnnotation {
        threshold_ms: threshold.millis,
        gaps,
        runs,
    }
}
