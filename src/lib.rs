pub mod api;
pub mod config;
pub mod error;
pub mod gemini;
pub mod metrics;
pub mod models;
pub mod store;
pub mod telemetry;
