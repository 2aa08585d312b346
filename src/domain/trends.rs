// Trend window domain models
use super::telemetry::RawSeries;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The four station metrics charted on the trends page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Temperature,
    Humidity,
    Pressure,
    GasResistance,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Temperature,
        Metric::Humidity,
        Metric::Pressure,
        Metric::GasResistance,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Metric::Temperature => "temperature",
            Metric::Humidity => "humidity",
            Metric::Pressure => "pressure",
            Metric::GasResistance => "gas_resistance",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Metric::Temperature => "°C",
            Metric::Humidity => "%",
            Metric::Pressure => "hPa",
            Metric::GasResistance => "Ω",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Metric::Temperature => "Temperature",
            Metric::Humidity => "Humidity",
            Metric::Pressure => "Pressure",
            Metric::GasResistance => "Gas resistance",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown metric '{0}'")]
pub struct ParseMetricError(String);

impl FromStr for Metric {
    type Err = ParseMetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .into_iter()
            .find(|m| m.key() == s)
            .ok_or_else(|| ParseMetricError(s.to_string()))
    }
}

/// Coarse window selector. Picks a width, never an absolute time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RangeToken {
    #[default]
    #[serde(rename = "24h")]
    Day,
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
}

impl RangeToken {
    pub fn as_str(&self) -> &'static str {
        match self {
            RangeToken::Day => "24h",
            RangeToken::Week => "7d",
            RangeToken::Month => "30d",
        }
    }

    /// Calendar days covered by the window.
    pub fn days(&self) -> u64 {
        match self {
            RangeToken::Day => 1,
            RangeToken::Week => 7,
            RangeToken::Month => 30,
        }
    }

    pub fn granularity(&self) -> Granularity {
        match self {
            RangeToken::Day => Granularity::Hourly,
            RangeToken::Week | RangeToken::Month => Granularity::Daily,
        }
    }
}

impl fmt::Display for RangeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown range '{0}', expected one of 24h, 7d, 30d")]
pub struct ParseRangeError(String);

impl FromStr for RangeToken {
    type Err = ParseRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "24h" => Ok(RangeToken::Day),
            "7d" => Ok(RangeToken::Week),
            "30d" => Ok(RangeToken::Month),
            other => Err(ParseRangeError(other.to_string())),
        }
    }
}

/// Axis granularity, driven only by the active range token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Hourly,
    Daily,
}

/// Raw series per metric. Metrics missing from the body come back empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrendSeries {
    #[serde(default)]
    pub temperature: RawSeries,
    #[serde(default)]
    pub humidity: RawSeries,
    #[serde(default)]
    pub pressure: RawSeries,
    #[serde(default)]
    pub gas_resistance: RawSeries,
}

impl TrendSeries {
    pub fn get(&self, metric: Metric) -> &RawSeries {
        match metric {
            Metric::Temperature => &self.temperature,
            Metric::Humidity => &self.humidity,
            Metric::Pressure => &self.pressure,
            Metric::GasResistance => &self.gas_resistance,
        }
    }

    #[cfg(test)]
    pub fn get_mut(&mut self, metric: Metric) -> &mut RawSeries {
        match metric {
            Metric::Temperature => &mut self.temperature,
            Metric::Humidity => &mut self.humidity,
            Metric::Pressure => &mut self.pressure,
            Metric::GasResistance => &mut self.gas_resistance,
        }
    }
}

/// One backend response. Consumed by a single pipeline run.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrendWindow {
    /// Missing or `null` in the body reads as `None`.
    #[serde(default)]
    pub bucket_seconds: Option<f64>,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub series: TrendSeries,
}

impl TrendWindow {
    /// The fallback used whenever a fetch fails.
    pub fn empty() -> Self {
        Self {
            bucket_seconds: Some(0.0),
            ..Self::default()
        }
    }

    pub fn total_samples(&self) -> usize {
        Metric::ALL.iter().map(|m| self.series.get(*m).len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_token_round_trip() {
        for token in [RangeToken::Day, RangeToken::Week, RangeToken::Month] {
            assert_eq!(token.as_str().parse::<RangeToken>().unwrap(), token);
        }
        assert!("1y".parse::<RangeToken>().is_err());
        assert_eq!(RangeToken::default(), RangeToken::Day);
    }

    #[test]
    fn test_granularity_follows_token() {
        assert_eq!(RangeToken::Day.granularity(), Granularity::Hourly);
        assert_eq!(RangeToken::Week.granularity(), Granularity::Daily);
        assert_eq!(RangeToken::Month.granularity(), Granularity::Daily);
    }

    #[test]
    fn test_metric_units() {
        let units: Vec<_> = Metric::ALL.iter().map(|m| m.unit()).collect();
        assert_eq!(units, vec!["°C", "%", "hPa", "Ω"]);
        assert_eq!("gas_resistance".parse::<Metric>().unwrap(), Metric::GasResistance);
        assert!("wind".parse::<Metric>().is_err());
    }

    #[test]
    fn test_window_deserialize_with_missing_series() {
        let json = r#"{
            "bucket_seconds": 300,
            "from": "2024-05-01T00:00:00Z",
            "to": "2024-05-02T00:00:00Z",
            "series": {
                "temperature": [{"t": "2024-05-01T00:00:00Z", "v": 20.1}],
                "pressure": []
            }
        }"#;
        let window: TrendWindow = serde_json::from_str(json).unwrap();

        assert_eq!(window.bucket_seconds, Some(300.0));
        assert_eq!(window.series.get(Metric::Temperature).len(), 1);
        assert!(window.series.get(Metric::Humidity).is_empty());
        assert!(window.series.get(Metric::GasResistance).is_empty());
        assert_eq!(window.total_samples(), 1);
    }

    #[test]
    fn test_empty_window_is_well_formed() {
        let window = TrendWindow::empty();
        assert_eq!(window.bucket_seconds, Some(0.0));
        assert!(window.from.is_empty());
        assert_eq!(window.total_samples(), 0);
    }
}
