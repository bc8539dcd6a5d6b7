// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod aggregate;
pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod menu;
pub mod metrics;
pub mod nutrition;
pub mod sampler;
pub mod upstream;

pub use crate::aggregate::{DistrictAverage, DistrictAverageResult, DistrictAverager};
pub use crate::api::{app, router, AppState};
pub use crate::config::Config;
pub use crate::error::{ApiError, UpstreamError};
