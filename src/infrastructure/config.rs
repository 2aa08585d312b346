// Dashboard configuration - file and environment settings
use crate::domain::chart::ChartStyle;
use crate::domain::time_range::DisplayZone;
use crate::domain::trends::{Metric, RangeToken};
use anyhow::Context;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub backend: BackendSettings,
    #[serde(default)]
    pub trends: TrendsSettings,
    #[serde(default)]
    pub charts: Vec<ChartConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_trends_path")]
    pub trends_path: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl BackendSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            trends_path: default_trends_path(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TrendsSettings {
    #[serde(default)]
    pub default_range: RangeToken,
    #[serde(default = "default_max_points")]
    pub max_points: usize,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl TrendsSettings {
    pub fn zone(&self) -> anyhow::Result<DisplayZone> {
        self.timezone
            .parse()
            .with_context(|| format!("Invalid trends.timezone '{}'", self.timezone))
    }
}

impl Default for TrendsSettings {
    fn default() -> Self {
        Self {
            default_range: RangeToken::default(),
            max_points: default_max_points(),
            timezone: default_timezone(),
        }
    }
}

/// Optional per-metric style override.
#[derive(Debug, Deserialize, Clone)]
pub struct ChartConfig {
    pub metric: Metric,
    pub title: Option<String>,
    pub color: Option<String>,
    pub fill_color: Option<String>,
    pub y_min: Option<f64>,
    pub y_max: Option<f64>,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_trends_path() -> String {
    "/trends".to_string()
}

fn default_timeout_seconds() -> u64 {
    10
}

fn default_max_points() -> usize {
    crate::application::decimator::DEFAULT_TARGET_POINTS
}

fn default_timezone() -> String {
    "local".to_string()
}

impl DashboardConfig {
    /// Built-in styles with any configured overrides applied on top.
    pub fn chart_styles(&self) -> HashMap<Metric, ChartStyle> {
        let mut styles: HashMap<Metric, ChartStyle> = Metric::ALL
            .iter()
            .map(|m| (*m, ChartStyle::default_for(*m)))
            .collect();

        for chart in &self.charts {
            let style = styles
                .entry(chart.metric)
                .or_insert_with(|| ChartStyle::default_for(chart.metric));
            if let Some(title) = &chart.title {
                style.title = title.clone();
            }
            if let Some(color) = &chart.color {
                style.color = color.clone();
            }
            if let Some(fill) = &chart.fill_color {
                style.fill_color = fill.clone();
            }
            if chart.y_min.is_some() {
                style.y_min = chart.y_min;
            }
            if chart.y_max.is_some() {
                style.y_max = chart.y_max;
            }
        }
        styles
    }
}

/// `config/dashboard.*` (optional) overlaid with `TRENDS__SECTION__KEY` variables.
pub fn load_dashboard_config() -> anyhow::Result<DashboardConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/dashboard").required(false))
        .add_source(config::Environment::with_prefix("TRENDS").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}
