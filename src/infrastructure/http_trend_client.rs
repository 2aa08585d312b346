// HTTP client for the station backend's trends endpoint
use crate::application::trend_client::TrendDataClient;
use crate::domain::trends::TrendWindow;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpTrendClient {
    client: reqwest::Client,
    base_url: String,
    trends_path: String,
}

impl HttpTrendClient {
    pub fn new(base_url: String, trends_path: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            trends_path: format!("/{}", trends_path.trim_start_matches('/')),
        })
    }

    fn build_range_url(&self, from_iso: &str, to_iso: &str) -> String {
        format!(
            "{}{}?from={}&to={}",
            self.base_url,
            self.trends_path,
            urlencoding::encode(from_iso),
            urlencoding::encode(to_iso)
        )
    }
}

#[async_trait]
impl TrendDataClient for HttpTrendClient {
    async fn get_range(&self, from_iso: &str, to_iso: &str) -> Result<TrendWindow> {
        let url = self.build_range_url(from_iso, to_iso);
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to send request to trends backend")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Trends query failed with status {}: {}", status, body);
        }

        let window = response
            .json::<TrendWindow>()
            .await
            .context("Failed to parse trends response")?;

        tracing::debug!(
            bucket_seconds = ?window.bucket_seconds,
            samples = window.total_samples(),
            "Trends response received"
        );
        Ok(window)
    }
}
