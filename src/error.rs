//! Error taxonomy for metric construction, mutation and collection.
//!
//! Every failure is synchronous and local to the call that caused it.
//! Nothing is retried and nothing is swallowed during collection.

use thiserror::Error;

/// Errors raised by templates, bound instances and collectors.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("metric name {0:?} does not match [a-zA-Z_:][a-zA-Z0-9_:]*")]
    InvalidMetricName(String),

    #[error("label name {0:?} does not match [a-zA-Z_:][a-zA-Z0-9_:]*")]
    InvalidLabelName(String),

    #[error("label name {0:?} uses the reserved `__` prefix")]
    ReservedLabelName(String),

    #[error("unknown label {label:?} for metric {metric}")]
    UnknownLabel { metric: String, label: String },

    #[error("unset labels on metric {metric}: {}", labels.join(", "))]
    UnsetLabels { metric: String, labels: Vec<String> },

    #[error("counter {metric} cannot be decremented from {current} to {requested}")]
    CounterDecrement {
        metric: String,
        current: f64,
        requested: f64,
    },

    #[error("illegal step value: {0}")]
    IllegalStep(f64),

    #[error("quantile {0} is outside [0, 1]")]
    IllegalQuantile(f64),

    #[error("summary max age must be greater than zero")]
    IllegalMaxAge,

    #[error("histogram buckets must be ascending numbers: {0:?}")]
    IllegalBuckets(Vec<f64>),

    #[error("collection failed: {0}")]
    Collection(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl MetricsError {
    /// Wraps an arbitrary source error raised while collecting.
    pub fn collection<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Collection(err.into())
    }

    /// Returns true for the naming family of errors.
    pub fn is_naming(&self) -> bool {
        matches!(
            self,
            Self::InvalidMetricName(_) | Self::InvalidLabelName(_) | Self::ReservedLabelName(_)
        )
    }

    /// Returns true for the label validation family of errors.
    pub fn is_label_validation(&self) -> bool {
        matches!(self, Self::UnknownLabel { .. } | Self::UnsetLabels { .. })
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = MetricsError> = std::result::Result<T, E>;
