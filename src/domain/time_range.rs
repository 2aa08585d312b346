// Range resolution: token + "now" -> concrete [from, to]
use super::trends::RangeToken;
use chrono::{DateTime, Days, FixedOffset, Local, Offset, SecondsFormat, TimeZone, Utc};
use std::fmt;
use std::str::FromStr;

/// A concrete query window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeWindow {
    pub fn from_iso(&self) -> String {
        self.from.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn to_iso(&self) -> String {
        self.to.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn from_ms(&self) -> i64 {
        self.from.timestamp_millis()
    }

    pub fn to_ms(&self) -> i64 {
        self.to.timestamp_millis()
    }
}

/// Resolve a range token against `now`.
///
/// `from` is `now` minus N calendar days in `now`'s own time zone, so a 7d
/// window across a DST change is not exactly 7 × 24 h. If the shifted local
/// time does not exist, falls back to a fixed 24 h multiple.
pub fn resolve<Tz: TimeZone>(token: RangeToken, now: &DateTime<Tz>) -> TimeWindow {
    let days = token.days();
    let from = now
        .clone()
        .checked_sub_days(Days::new(days))
        .unwrap_or_else(|| now.clone() - chrono::Duration::days(days as i64));

    TimeWindow {
        from: from.with_timezone(&Utc),
        to: now.with_timezone(&Utc),
    }
}

/// Calendar used for range arithmetic and axis labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayZone {
    #[default]
    Local,
    Fixed(FixedOffset),
}

impl DisplayZone {
    pub fn utc() -> Self {
        DisplayZone::Fixed(Utc.fix())
    }

    pub fn resolve(&self, token: RangeToken, now: DateTime<Utc>) -> TimeWindow {
        match self {
            DisplayZone::Local => resolve(token, &now.with_timezone(&Local)),
            DisplayZone::Fixed(offset) => resolve(token, &now.with_timezone(offset)),
        }
    }

    /// Format epoch milliseconds with a strftime pattern in this zone.
    pub fn format_ms(&self, time_ms: i64, pattern: &str) -> String {
        let Some(utc) = DateTime::<Utc>::from_timestamp_millis(time_ms) else {
            return String::new();
        };
        match self {
            DisplayZone::Local => utc.with_timezone(&Local).format(pattern).to_string(),
            DisplayZone::Fixed(offset) => utc.with_timezone(offset).format(pattern).to_string(),
        }
    }

    /// Offset from UTC in effect at `time_ms`, in milliseconds.
    pub fn offset_ms(&self, time_ms: i64) -> i64 {
        let Some(utc) = DateTime::<Utc>::from_timestamp_millis(time_ms) else {
            return 0;
        };
        let seconds = match self {
            DisplayZone::Local => utc.with_timezone(&Local).offset().local_minus_utc(),
            DisplayZone::Fixed(offset) => offset.local_minus_utc(),
        };
        seconds as i64 * 1000
    }
}

impl fmt::Display for DisplayZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayZone::Local => f.write_str("local"),
            DisplayZone::Fixed(offset) => write!(f, "{offset}"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid time zone '{0}', expected 'local', 'utc' or an offset like '+02:00'")]
pub struct ParseZoneError(String);

impl FromStr for DisplayZone {
    type Err = ParseZoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(DisplayZone::Local),
            "utc" | "z" => Ok(DisplayZone::utc()),
            other => other
                .parse::<FixedOffset>()
                .map(DisplayZone::Fixed)
                .map_err(|_| ParseZoneError(s.to_string())),
        }
    }
}
