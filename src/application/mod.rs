// Application layer - trend pipeline and its scheduling
pub mod chart_renderer;
pub mod decimator;
pub mod gaps;
pub mod normalizer;
pub mod pipeline;
pub mod scheduler;
pub mod trend_client;
pub mod trend_service;
pub mod viewport;
