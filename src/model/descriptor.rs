//! Metric descriptors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The four supported metric kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    Counter,
    Gauge,
    Histogram,
    Summary,
}

impl MetricType {
    /// The lowercase name used in `# TYPE` lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::Gauge => "gauge",
            Self::Histogram => "histogram",
            Self::Summary => "summary",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name, help text and kind of a collected metric.
///
/// For hierarchical kinds `name` is the series name, i.e. the template's
/// fully qualified name with the sub-series suffix appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricDescriptor {
    pub name: String,
    pub help: String,
    #[serde(rename = "type")]
    pub metric_type: MetricType,
}

impl MetricDescriptor {
    pub fn new(name: impl Into<String>, help: impl Into<String>, metric_type: MetricType) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            metric_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(MetricType::Counter.to_string(), "counter");
        assert_eq!(MetricType::Summary.as_str(), "summary");
    }

    #[test]
    fn test_type_deserializes_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            kind: MetricType,
        }
        let w: Wrapper = toml::from_str("kind = \"histogram\"").unwrap();
        assert_eq!(w.kind, MetricType::Histogram);
    }
}
