//! Metric and label naming rules.

use crate::error::{MetricsError, Result};
use regex::Regex;
use std::sync::LazyLock;

static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z_:][a-zA-Z0-9_:]*$").expect("static pattern compiles")
});

/// Joins namespace, subsystem and name with underscores, skipping empty parts.
pub fn fully_qualified_name(namespace: Option<&str>, subsystem: Option<&str>, name: &str) -> String {
    [namespace.unwrap_or(""), subsystem.unwrap_or(""), name]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("_")
}

pub fn validate_metric_name(name: &str) -> Result<()> {
    if NAME_PATTERN.is_match(name) {
        Ok(())
    } else {
        Err(MetricsError::InvalidMetricName(name.to_string()))
    }
}

/// Label names follow the metric pattern and must not start with `__`.
pub fn validate_label_name(label: &str) -> Result<()> {
    if !NAME_PATTERN.is_match(label) {
        return Err(MetricsError::InvalidLabelName(label.to_string()));
    }
    if label.starts_with("__") {
        return Err(MetricsError::ReservedLabelName(label.to_string()));
    }
    Ok(())
}
