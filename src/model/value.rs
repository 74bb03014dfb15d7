//! Scalar and hierarchical metric values.

use super::{MetricDescriptor, MetricType};
use indexmap::IndexMap;

/// Label name to label value, in declaration order.
pub type Labels = IndexMap<String, String>;

/// Renders a sample value or bucket bound the way the text format expects.
///
/// Non-finite values use `+Inf`, `-Inf` and `NaN`. Finite values use the
/// shortest decimal that round-trips (`1`, `0.5`, `7.5`), switching to
/// exponent notation (`1e21`, `1.5e-7`) at magnitudes of `1e21` and above
/// or below `1e-6`.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        let magnitude = value.abs();
        if magnitude >= 1e21 || (magnitude != 0.0 && magnitude < 1e-6) {
            format!("{value:e}")
        } else {
            value.to_string()
        }
    }
}

/// One exported series point.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricValue {
    pub labels: Labels,
    pub value: f64,
}

impl MetricValue {
    pub fn new(labels: Labels, value: f64) -> Self {
        Self { labels, value }
    }
}

/// One sub-series of a hierarchical value.
///
/// `name` is the suffix appended to the template name (`bucket`, `count`,
/// `sum`), empty for series exported under the bare name. `labels` are
/// merged over the parent's labels.
#[derive(Debug, Clone, PartialEq)]
pub struct SubSeries {
    pub name: &'static str,
    pub labels: Labels,
    pub value: f64,
}

impl SubSeries {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            labels: Labels::new(),
            value: 0.0,
        }
    }

    /// A sub-series carrying a single extra label.
    pub fn labeled(name: &'static str, label: &str, value: String) -> Self {
        let mut labels = Labels::new();
        labels.insert(label.to_string(), value);
        Self {
            name,
            labels,
            value: 0.0,
        }
    }
}

/// A label-bound instance that emits several wire series.
#[derive(Debug, Clone, PartialEq)]
pub struct HierarchicalMetricValue {
    pub labels: Labels,
    pub values: Vec<SubSeries>,
}

/// The stored shape of one realised label set.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportedSeries {
    Scalar(MetricValue),
    Hierarchical(HierarchicalMetricValue),
}

/// A stored series shape that flattens into wire-level metrics.
pub trait Series {
    fn labels(&self) -> &Labels;

    /// Appends one [`CollectedMetric`] per wire line to `out`.
    fn flatten_into(
        &self,
        name: &str,
        help: &str,
        metric_type: MetricType,
        out: &mut Vec<CollectedMetric>,
    );
}

impl Series for MetricValue {
    fn labels(&self) -> &Labels {
        &self.labels
    }

    fn flatten_into(
        &self,
        name: &str,
        help: &str,
        metric_type: MetricType,
        out: &mut Vec<CollectedMetric>,
    ) {
        out.push(CollectedMetric {
            descriptor: MetricDescriptor::new(name, help, metric_type),
            value: self.clone(),
        });
    }
}

impl Series for HierarchicalMetricValue {
    fn labels(&self) -> &Labels {
        &self.labels
    }

    fn flatten_into(
        &self,
        name: &str,
        help: &str,
        metric_type: MetricType,
        out: &mut Vec<CollectedMetric>,
    ) {
        for sub in &self.values {
            let series_name = if sub.name.is_empty() {
                name.to_string()
            } else {
                format!("{name}_{}", sub.name)
            };
            let mut labels = self.labels.clone();
            labels.extend(sub.labels.iter().map(|(k, v)| (k.clone(), v.clone())));
            out.push(CollectedMetric {
                descriptor: MetricDescriptor::new(series_name, help, metric_type),
                value: MetricValue::new(labels, sub.value),
            });
        }
    }
}

impl Series for ExportedSeries {
    fn labels(&self) -> &Labels {
        match self {
            Self::Scalar(v) => v.labels(),
            Self::Hierarchical(h) => h.labels(),
        }
    }

    fn flatten_into(
        &self,
        name: &str,
        help: &str,
        metric_type: MetricType,
        out: &mut Vec<CollectedMetric>,
    ) {
        match self {
            Self::Scalar(v) => v.flatten_into(name, help, metric_type, out),
            Self::Hierarchical(h) => h.flatten_into(name, help, metric_type, out),
        }
    }
}

impl From<MetricValue> for ExportedSeries {
    fn from(value: MetricValue) -> Self {
        Self::Scalar(value)
    }
}

impl From<HierarchicalMetricValue> for ExportedSeries {
    fn from(value: HierarchicalMetricValue) -> Self {
        Self::Hierarchical(value)
    }
}

/// The unit yielded by every collector.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedMetric {
    pub descriptor: MetricDescriptor,
    pub value: MetricValue,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> Labels {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(1.0), "1");
        assert_eq!(format_float(7.5), "7.5");
        assert_eq!(format_float(0.005), "0.005");
        assert_eq!(format_float(-3.0), "-3");
        assert_eq!(format_float(f64::INFINITY), "+Inf");
        assert_eq!(format_float(f64::NEG_INFINITY), "-Inf");
        assert_eq!(format_float(f64::NAN), "NaN");
    }

    #[test]
    fn test_format_float_extreme_magnitudes() {
        assert_eq!(format_float(1e21), "1e21");
        assert_eq!(format_float(-2.5e22), "-2.5e22");
        assert_eq!(format_float(1.5e-7), "1.5e-7");
        assert_eq!(format_float(123456789012.0), "123456789012");
        assert_eq!(format_float(0.000001), "0.000001");
        assert_eq!(format_float(0.0), "0");
    }

    #[test]
    fn test_scalar_flattens_to_one_metric() {
        let series = ExportedSeries::Scalar(MetricValue::new(labels(&[("method", "GET")]), 3.0));
        let mut out = Vec::new();
        series.flatten_into("requests", "Requests", MetricType::Counter, &mut out);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].descriptor.name, "requests");
        assert_eq!(out[0].value.value, 3.0);
    }

    #[test]
    fn test_hierarchical_appends_suffix_and_merges_labels() {
        let mut bucket = SubSeries::labeled("bucket", "le", "1".into());
        bucket.value = 2.0;
        let series = ExportedSeries::Hierarchical(HierarchicalMetricValue {
            labels: labels(&[("path", "/")]),
            values: vec![bucket, SubSeries::new("count"), SubSeries::new("")],
        });
        let mut out = Vec::new();
        series.flatten_into("latency", "", MetricType::Histogram, &mut out);

        let names: Vec<_> = out.iter().map(|m| m.descriptor.name.as_str()).collect();
        assert_eq!(names, ["latency_bucket", "latency_count", "latency"]);
        assert_eq!(out[0].value.labels, labels(&[("path", "/"), ("le", "1")]));
        assert_eq!(out[1].value.labels, labels(&[("path", "/")]));
    }
}
