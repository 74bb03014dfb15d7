//! Cumulative-bucket histograms.
//!
//! Every bucket counts the observations less than or equal to its bound.
//! When at least one bound is declared an implicit `+Inf` bucket follows.
//! Each instance exports its buckets, then `count`, then `sum`.

use super::template::{BoundMetric, KindSlot, MetricKind, MetricTemplate, Slot};
use crate::error::{MetricsError, Result};
use crate::model::{
    format_float, HierarchicalMetricValue, Labels, MetricType, SubSeries,
};

/// Bucket bounds used when none are configured explicitly.
pub const DEFAULT_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Histogram kind holding the ascending bucket bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramKind {
    buckets: Vec<f64>,
}

impl HistogramKind {
    pub fn new(buckets: impl Into<Vec<f64>>) -> Self {
        Self {
            buckets: buckets.into(),
        }
    }

    pub fn buckets(&self) -> &[f64] {
        &self.buckets
    }

    /// Index of the `count` sub-series; `sum` follows it.
    fn count_index(&self) -> usize {
        match self.buckets.len() {
            0 => 0,
            n => n + 1,
        }
    }
}

impl Default for HistogramKind {
    fn default() -> Self {
        Self::new(DEFAULT_BUCKETS)
    }
}

impl MetricKind for HistogramKind {
    type Series = HierarchicalMetricValue;
    type State = ();
    const TYPE: MetricType = MetricType::Histogram;

    fn validate(&self) -> Result<()> {
        let ascending = self.buckets.windows(2).all(|pair| pair[0] < pair[1]);
        if !ascending || self.buckets.iter().any(|bound| bound.is_nan()) {
            return Err(MetricsError::IllegalBuckets(self.buckets.clone()));
        }
        Ok(())
    }

    fn new_slot(&self, labels: Labels) -> KindSlot<Self> {
        let mut values: Vec<SubSeries> = self
            .buckets
            .iter()
            .map(|&bound| SubSeries::labeled("bucket", "le", format_float(bound)))
            .collect();
        if !self.buckets.is_empty() {
            values.push(SubSeries::labeled("bucket", "le", "+Inf".to_string()));
        }
        values.push(SubSeries::new("count"));
        values.push(SubSeries::new("sum"));

        Slot::new(
            HierarchicalMetricValue { labels, values },
            (),
        )
    }
}

/// Histogram template.
pub type HistogramVec = MetricTemplate<HistogramKind>;

/// Histogram bound to one label set.
pub type Histogram = BoundMetric<HistogramKind>;

impl BoundMetric<HistogramKind> {
    /// Records one observation.
    pub fn observe(&self, value: f64) -> Result<()> {
        self.with_slot(|kind, slot| {
            let count = kind.count_index();
            let series = &mut slot.series.values;
            for (bucket, &bound) in series.iter_mut().zip(kind.buckets()) {
                if value <= bound {
                    bucket.value += 1.0;
                }
            }
            if !kind.buckets().is_empty() {
                series[count - 1].value += 1.0;
            }
            series[count].value += 1.0;
            series[count + 1].value += value;
            Ok(())
        })
    }
}

impl MetricTemplate<HistogramKind> {
    /// [`Histogram::observe`] on the default-label instance.
    pub fn observe(&self, value: f64) -> Result<()> {
        self.with().observe(value)
    }
}
