//! Windowed-quantile summaries.
//!
//! Observations are appended to a per-instance sample window in O(1). The
//! quantile estimates are recomputed only when a window changed since the
//! last collection: the window is trimmed to the newest `max_samples`
//! samples and to those younger than `max_age`, sorted, and each target
//! quantile `q` is exported as the fraction of samples whose normalised rank
//! `(value - min) / (max - min)` is at most `q`.
//!
//! `count` and `sum` cover every observation ever made, independent of the
//! retention window.

use super::template::{BoundMetric, KindSlot, MetricKind, MetricTemplate, Slot};
use crate::error::{MetricsError, Result};
use crate::model::{
    format_float, HierarchicalMetricValue, Labels, MetricType, SubSeries,
};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Summary kind holding target quantiles and the retention window.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryKind {
    quantiles: Vec<f64>,
    max_age: Option<Duration>,
    max_samples: Option<usize>,
}

impl SummaryKind {
    pub fn new(quantiles: impl Into<Vec<f64>>) -> Self {
        Self {
            quantiles: quantiles.into(),
            max_age: None,
            max_samples: None,
        }
    }

    /// Only samples younger than `max_age` feed the estimate.
    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Only the newest `max_samples` samples feed the estimate.
    pub fn max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = Some(max_samples);
        self
    }

    pub fn quantiles(&self) -> &[f64] {
        &self.quantiles
    }

    fn count_index(&self) -> usize {
        self.quantiles.len()
    }
}

/// A single timestamped observation.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Sample {
    at: Instant,
    value: f64,
}

/// Retained samples of one instance.
#[derive(Debug, Default)]
pub struct SampleWindow {
    samples: VecDeque<Sample>,
    dirty: bool,
}

impl SampleWindow {
    fn push(&mut self, at: Instant, value: f64) {
        self.samples.push_back(Sample { at, value });
        self.dirty = true;
    }

    /// Drops samples that fell out of the retention window.
    ///
    /// Samples are stored in observation order, so both limits trim from the
    /// front.
    fn trim(&mut self, kind: &SummaryKind, now: Instant) {
        if let Some(max_samples) = kind.max_samples {
            while self.samples.len() > max_samples {
                self.samples.pop_front();
            }
        }
        if let Some(max_age) = kind.max_age {
            while self
                .samples
                .front()
                .is_some_and(|sample| now.saturating_duration_since(sample.at) > max_age)
            {
                self.samples.pop_front();
            }
        }
    }

    fn sorted_values(&self) -> Vec<f64> {
        let mut values: Vec<f64> = self.samples.iter().map(|sample| sample.value).collect();
        values.sort_by(f64::total_cmp);
        values
    }
}

/// Fraction of `sorted` samples whose normalised rank is at most each quantile.
///
/// When every retained sample has the same value, including a window of one
/// sample, every rank is `0 / 0 = NaN`, no sample qualifies and each quantile
/// is `0`. An empty window yields `NaN` for every quantile.
pub fn rank_fractions(sorted: &[f64], quantiles: &[f64]) -> Vec<f64> {
    let (Some(&low), Some(&high)) = (sorted.first(), sorted.last()) else {
        return vec![f64::NAN; quantiles.len()];
    };
    let range = high - low;
    let mut counts = vec![0usize; quantiles.len()];
    for &value in sorted {
        let rank = (value - low) / range;
        for (count, &q) in counts.iter_mut().zip(quantiles) {
            if rank <= q {
                *count += 1;
            }
        }
    }
    counts
        .into_iter()
        .map(|count| count as f64 / sorted.len() as f64)
        .collect()
}

impl MetricKind for SummaryKind {
    type Series = HierarchicalMetricValue;
    type State = SampleWindow;
    const TYPE: MetricType = MetricType::Summary;

    fn validate(&self) -> Result<()> {
        if let Some(&q) = self.quantiles.iter().find(|q| !(0.0..=1.0).contains(*q)) {
            return Err(MetricsError::IllegalQuantile(q));
        }
        if self.max_age.is_some_and(|age| age.is_zero()) {
            return Err(MetricsError::IllegalMaxAge);
        }
        Ok(())
    }

    fn new_slot(&self, labels: Labels) -> KindSlot<Self> {
        let mut values: Vec<SubSeries> = self
            .quantiles
            .iter()
            .map(|&q| SubSeries::labeled("", "le", format_float(q)))
            .collect();
        values.push(SubSeries::new("count"));
        values.push(SubSeries::new("sum"));

        Slot::new(
            HierarchicalMetricValue { labels, values },
            SampleWindow::default(),
        )
    }

    fn prepare(&self, slots: &mut [KindSlot<Self>], now: Instant) {
        for slot in slots.iter_mut().filter(|slot| slot.state.dirty) {
            slot.state.trim(self, now);
            let fractions = rank_fractions(&slot.state.sorted_values(), &self.quantiles);
            for (series, fraction) in slot.series.values.iter_mut().zip(fractions) {
                series.value = fraction;
            }
            slot.state.dirty = false;
            tracing::trace!(retained = slot.state.samples.len(), "recomputed summary window");
        }
    }
}

/// Summary template.
pub type SummaryVec = MetricTemplate<SummaryKind>;

/// Summary bound to one label set.
pub type Summary = BoundMetric<SummaryKind>;

impl BoundMetric<SummaryKind> {
    /// Records one observation.
    pub fn observe(&self, value: f64) -> Result<()> {
        self.with_slot(|kind, slot| {
            slot.state.push(Instant::now(), value);
            let count = kind.count_index();
            let series = &mut slot.series.values;
            series[count].value += 1.0;
            series[count + 1].value += value;
            Ok(())
        })
    }
}

impl MetricTemplate<SummaryKind> {
    /// [`Summary::observe`] on the default-label instance.
    pub fn observe(&self, value: f64) -> Result<()> {
        self.with().observe(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::LabelSpec;

    fn summary(kind: SummaryKind) -> SummaryVec {
        SummaryVec::new("rtt_seconds", "Round trips", LabelSpec::default(), kind).unwrap()
    }

    fn window(base: Instant, points: &[(u64, f64)]) -> SampleWindow {
        let mut window = SampleWindow::default();
        for &(offset, value) in points {
            window.push(base + Duration::from_secs(offset), value);
        }
        window
    }

    #[test]
    fn test_rank_fraction_of_three_samples() {
        let fractions = rank_fractions(&[1.0, 2.0, 3.0], &[0.0, 0.5, 1.0]);
        assert_eq!(fractions, vec![1.0 / 3.0, 2.0 / 3.0, 1.0]);
    }

    #[test]
    fn test_rank_fraction_degenerate_windows() {
        assert_eq!(rank_fractions(&[4.0, 4.0], &[0.5, 1.0]), vec![0.0, 0.0]);
        assert_eq!(rank_fractions(&[7.0], &[0.0]), vec![0.0]);
        assert!(rank_fractions(&[], &[0.5])[0].is_nan());
    }

    #[test]
    fn test_observe_and_collect() {
        let summary = summary(SummaryKind::new([0.5]));
        for value in [1.0, 2.0, 3.0] {
            summary.observe(value).unwrap();
        }

        let collected = summary.snapshot();
        let names: Vec<_> = collected.iter().map(|m| m.descriptor.name.as_str()).collect();
        assert_eq!(names, ["rtt_seconds", "rtt_seconds_count", "rtt_seconds_sum"]);
        assert_eq!(collected[0].value.labels["le"], "0.5");
        assert_eq!(collected[0].value.value, 2.0 / 3.0);
        assert_eq!(collected[1].value.value, 3.0);
        assert_eq!(collected[2].value.value, 6.0);
    }

    #[test]
    fn test_single_observation_exports_zero_quantile() {
        let summary = summary(SummaryKind::new([0.5]));
        summary.observe(3.0).unwrap();

        let collected = summary.snapshot();
        assert_eq!(collected[0].value.value, 0.0);
        assert_eq!(collected[1].value.value, 1.0);
        assert_eq!(collected[2].value.value, 3.0);
    }

    #[test]
    fn test_max_samples_keeps_newest() {
        let kind = SummaryKind::new([0.5]).max_samples(2);
        let base = Instant::now();
        let mut window = window(base, &[(0, 100.0), (1, 1.0), (2, 2.0)]);

        window.trim(&kind, base + Duration::from_secs(3));
        assert_eq!(window.sorted_values(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_max_age_drops_old_samples() {
        let kind = SummaryKind::new([0.5]).max_age(Duration::from_secs(5));
        let base = Instant::now();
        let mut window = window(base, &[(0, 9.0), (8, 3.0), (9, 1.0)]);

        window.trim(&kind, base + Duration::from_secs(10));
        assert_eq!(window.sorted_values(), vec![1.0, 3.0]);
    }

    #[test]
    fn test_count_and_sum_ignore_window() {
        let summary = summary(SummaryKind::new([0.5]).max_samples(1));
        for value in [1.0, 2.0, 3.0] {
            summary.observe(value).unwrap();
        }

        let collected = summary.snapshot();
        assert_eq!(collected[0].value.value, 0.0);
        assert_eq!(collected[1].value.value, 3.0);
        assert_eq!(collected[2].value.value, 6.0);
    }

    #[test]
    fn test_collect_twice_is_stable() {
        let summary = summary(SummaryKind::new([0.25, 0.75]));
        for value in [5.0, 1.0, 9.0, 3.0] {
            summary.observe(value).unwrap();
        }
        assert_eq!(summary.snapshot(), summary.snapshot());
    }

    #[test]
    fn test_invalid_configuration_rejected() {
        let err = SummaryVec::new("s", "", LabelSpec::default(), SummaryKind::new([0.5, 1.5]))
            .unwrap_err();
        assert!(matches!(err, MetricsError::IllegalQuantile(q) if q == 1.5));

        let err = SummaryVec::new(
            "s",
            "",
            LabelSpec::default(),
            SummaryKind::new([0.5]).max_age(Duration::ZERO),
        )
        .unwrap_err();
        assert!(matches!(err, MetricsError::IllegalMaxAge));
    }
}
