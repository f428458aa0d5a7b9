//! Configuration module.
//!
//! Provides CLI argument parsing and per-request settings.

#[allow(clippy::module_inception)]
mod config;
mod request;

pub use config::AppConfig;
pub use request::{DEFAULT_SPEAKER, Job, JobInput, RequestConfig};
