// Client trait for the backend trends query
use crate::domain::trends::TrendWindow;
use async_trait::async_trait;

#[async_trait]
pub trait TrendDataClient: Send + Sync {
    /// Fetch raw bucketed series for `[from_iso, to_iso]`.
    async fn get_range(&self, from_iso: &str, to_iso: &str) -> anyhow::Result<TrendWindow>;
}
