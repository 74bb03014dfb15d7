//! HTTP exposition surface.
//!
//! The listener itself is only built with the `server` feature. Address
//! parsing and the request reporter are framework agnostic and always
//! available.

mod addr;
mod reporter;
#[cfg(feature = "server")]
mod server;

pub use addr::{ListenAddr, DEFAULT_PORT};
pub use reporter::{
    Report, ReportRequest, ReportResponse, Reporter, ReporterOptions, RequestMetrics,
    REQUEST_DURATION_METRIC,
};
#[cfg(feature = "server")]
pub use server::{MetricsServer, MetricsServerConfig, UNMATCHED_PATH};

use thiserror::Error;

/// Errors raised while parsing a listen address or serving metrics.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind to address: {0}")]
    Bind(#[from] std::io::Error),

    #[error("server error: {0}")]
    Server(String),

    #[error("invalid listen address {0:?}")]
    InvalidAddress(String),
}
