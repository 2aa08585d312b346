// Telemetry sample domain models
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

/// A validated sample: epoch milliseconds and a finite value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub time_ms: i64,
    pub value: f64,
}

impl Sample {
    pub fn new(time_ms: i64, value: f64) -> Self {
        Self { time_ms, value }
    }
}

/// Timestamp as sent by the backend. Strings are RFC 3339 or SQLite's
/// `YYYY-MM-DD HH:MM:SS` (UTC); numbers are epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawTime {
    Millis(f64),
    Text(String),
}

impl RawTime {
    /// Epoch milliseconds, or `None` when unparsable or outside what a
    /// `DateTime<Utc>` can hold.
    pub fn to_millis(&self) -> Option<i64> {
        let ms = match self {
            RawTime::Millis(ms) if ms.is_finite() && ms.abs() < i64::MAX as f64 => ms.round() as i64,
            RawTime::Millis(_) => return None,
            RawTime::Text(text) => parse_timestamp(text)?,
        };
        DateTime::<Utc>::from_timestamp_millis(ms).map(|_| ms)
    }
}

fn parse_timestamp(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(time) = DateTime::parse_from_rfc3339(text) {
        return Some(time.timestamp_millis());
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }
    text.parse::<i64>().ok()
}

/// One `{ "t": ..., "v": ... }` entry of a raw backend series.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawSample {
    pub t: RawTime,
    #[serde(default)]
    pub v: Option<f64>,
}

impl RawSample {
    pub fn new(t: impl Into<String>, v: f64) -> Self {
        Self {
            t: RawTime::Text(t.into()),
            v: Some(v),
        }
    }

    pub fn at_millis(time_ms: i64, v: f64) -> Self {
        Self {
            t: RawTime::Millis(time_ms as f64),
            v: Some(v),
        }
    }
}

/// A raw series as received: order and uniqueness are not guaranteed.
pub type RawSeries = Vec<RawSample>;

/// Anything the normalizer can read a timestamp and value from.
pub trait SampleSource {
    fn instant_ms(&self) -> Option<i64>;
    fn reading(&self) -> Option<f64>;
}

impl SampleSource for RawSample {
    fn instant_ms(&self) -> Option<i64> {
        self.t.to_millis()
    }

    fn reading(&self) -> Option<f64> {
        self.v
    }
}

impl SampleSource for Sample {
    fn instant_ms(&self) -> Option<i64> {
        Some(self.time_ms)
    }

    fn reading(&self) -> Option<f64> {
        Some(self.value)
    }
}

/// Strictly ascending, unique timestamps, finite values.
///
/// Only the normalizer and the decimator construct this type, which is what
/// keeps the ordering invariant intact.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedSeries(Vec<Sample>);

impl NormalizedSeries {
    pub(crate) fn from_sorted(samples: Vec<Sample>) -> Self {
        debug_assert!(samples.windows(2).all(|w| w[0].time_ms < w[1].time_ms));
        Self(samples)
    }

    pub fn as_slice(&self) -> &[Sample] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<&Sample> {
        self.0.first()
    }

    pub fn last(&self) -> Option<&Sample> {
        self.0.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.0.iter()
    }
}
