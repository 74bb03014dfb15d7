//! Passive data shapes shared by templates, collectors and the formatter.
//!
//! A template stores one [`Series`] per realised label set: a scalar
//! [`MetricValue`] for counters and gauges, a [`HierarchicalMetricValue`] for
//! histograms and summaries. [`ExportedSeries`] is the sum of both shapes. At
//! collection time every series is flattened into [`CollectedMetric`]s, one
//! per wire line.

mod descriptor;
mod value;

pub use descriptor::{MetricDescriptor, MetricType};
pub use value::{
    format_float, CollectedMetric, ExportedSeries, HierarchicalMetricValue, Labels, MetricValue, Series,
    SubSeries,
};
