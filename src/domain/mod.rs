// Domain layer - Pure data types for trend charts
pub mod chart;
pub mod telemetry;
pub mod time_range;
pub mod trends;
