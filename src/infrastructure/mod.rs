// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod http_trend_client;
pub mod svg_surface;
