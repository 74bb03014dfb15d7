//! Monotonic counters.

use super::template::{BoundMetric, KindSlot, MetricKind, MetricTemplate, Slot};
use crate::error::{MetricsError, Result};
use crate::model::{Labels, MetricType, MetricValue};

/// Counter kind: one non-negative accumulating value per instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterKind;

impl MetricKind for CounterKind {
    type Series = MetricValue;
    type State = ();
    const TYPE: MetricType = MetricType::Counter;

    fn new_slot(&self, labels: Labels) -> KindSlot<Self> {
        Slot::new(MetricValue::new(labels, 0.0), ())
    }
}

/// The single write path of a counter slot.
fn set_in_slot(metric: &str, slot: &mut KindSlot<CounterKind>, value: f64) -> Result<()> {
    let current = slot.series.value;
    if value != 0.0 && value < current {
        return Err(MetricsError::CounterDecrement {
            metric: metric.to_string(),
            current,
            requested: value,
        });
    }
    slot.series.value = value;
    Ok(())
}

/// Counter template.
pub type CounterVec = MetricTemplate<CounterKind>;

/// Counter bound to one label set.
pub type Counter = BoundMetric<CounterKind>;

impl BoundMetric<CounterKind> {
    /// Overwrites the counter value.
    ///
    /// Setting a nonzero value below the current one fails with
    /// [`MetricsError::CounterDecrement`]. Setting `0` is an explicit reset
    /// and always succeeds.
    pub fn set(&self, value: f64) -> Result<()> {
        let metric = self.metric_name();
        self.with_slot(|_, slot| set_in_slot(metric, slot, value))
    }

    /// Resets the counter to `0`.
    pub fn zero(&self) -> Result<()> {
        self.set(0.0)
    }

    pub fn inc(&self) -> Result<()> {
        self.inc_by(1.0)
    }

    /// Adds a non-negative step.
    ///
    /// The new value is written through the same check as [`Counter::set`],
    /// under a single lock.
    pub fn inc_by(&self, step: f64) -> Result<()> {
        if step.is_nan() || step < 0.0 {
            return Err(MetricsError::IllegalStep(step));
        }
        let metric = self.metric_name();
        self.with_slot(|_, slot| {
            let next = slot.series.value + step;
            set_in_slot(metric, slot, next)
        })
    }

    pub fn get(&self) -> Result<f64> {
        self.with_slot(|_, slot| Ok(slot.series.value))
    }
}

impl MetricTemplate<CounterKind> {
    /// [`Counter::set`] on the default-label instance.
    pub fn set(&self, value: f64) -> Result<()> {
        self.with().set(value)
    }

    pub fn zero(&self) -> Result<()> {
        self.with().zero()
    }

    pub fn inc(&self) -> Result<()> {
        self.with().inc()
    }

    pub fn inc_by(&self, step: f64) -> Result<()> {
        self.with().inc_by(step)
    }

    pub fn get(&self) -> Result<f64> {
        self.with().get()
    }
}
