//! Axum HTTP API server for the motion studio.
//!
//! This crate provides:
//! - REST endpoints for seed upload, generation, upscaling and exports
//! - Playback control over REST and a WebSocket state stream
//! - Security headers, rate limiting on model routes
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod ws;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
