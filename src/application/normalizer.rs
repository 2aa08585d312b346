// Series normalizer - validate, sort and deduplicate raw samples
use crate::domain::telemetry::{NormalizedSeries, Sample, SampleSource};

/// Result of one normalization pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    pub series: NormalizedSeries,
    /// Samples rejected for an unparsable timestamp or a non-finite value.
    pub dropped: usize,
    /// Earlier samples overwritten by a later one with the same timestamp.
    pub duplicates: usize,
}

/// Parse, sort ascending and deduplicate (last write wins).
pub fn normalize<S: SampleSource>(raw: &[S]) -> Normalized {
    let mut dropped = 0;
    let mut samples: Vec<Sample> = Vec::with_capacity(raw.len());

    for entry in raw {
        match (entry.instant_ms(), entry.reading()) {
            (Some(time_ms), Some(value)) if value.is_finite() => {
                samples.push(Sample::new(time_ms, value));
            }
            _ => dropped += 1,
        }
    }

    // Stable sort keeps equal timestamps in arrival order.
    samples.sort_by_key(|s| s.time_ms);

    let mut unique: Vec<Sample> = Vec::with_capacity(samples.len());
    let mut duplicates = 0;
    for sample in samples {
        match unique.last_mut() {
            Some(last) if last.time_ms == sample.time_ms => {
                *last = sample;
                duplicates += 1;
            }
            _ => unique.push(sample),
        }
    }

    Normalized {
        series: NormalizedSeries::from_sorted(unique),
        dropped,
        duplicates,
    }
}
