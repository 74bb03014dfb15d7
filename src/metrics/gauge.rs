//! Gauges.

use super::template::{BoundMetric, KindSlot, MetricKind, MetricTemplate, Slot};
use crate::error::{MetricsError, Result};
use crate::model::{Labels, MetricType, MetricValue};

/// Gauge kind: an unrestricted value per instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GaugeKind;

impl MetricKind for GaugeKind {
    type Series = MetricValue;
    type State = ();
    const TYPE: MetricType = MetricType::Gauge;

    fn new_slot(&self, labels: Labels) -> KindSlot<Self> {
        Slot::new(MetricValue::new(labels, 0.0), ())
    }
}

/// Gauge template.
pub type GaugeVec = MetricTemplate<GaugeKind>;

/// Gauge bound to one label set.
pub type Gauge = BoundMetric<GaugeKind>;

impl BoundMetric<GaugeKind> {
    pub fn set(&self, value: f64) -> Result<()> {
        self.with_slot(|_, slot| {
            slot.series.value = value;
            Ok(())
        })
    }

    pub fn inc(&self) -> Result<()> {
        self.inc_by(1.0)
    }

    /// Adds a non-negative step. The resulting value is unrestricted.
    pub fn inc_by(&self, step: f64) -> Result<()> {
        self.add(step, 1.0)
    }

    pub fn dec(&self) -> Result<()> {
        self.dec_by(1.0)
    }

    /// Subtracts a non-negative step. The resulting value may go below zero.
    pub fn dec_by(&self, step: f64) -> Result<()> {
        self.add(step, -1.0)
    }

    pub fn get(&self) -> Result<f64> {
        self.with_slot(|_, slot| Ok(slot.series.value))
    }

    fn add(&self, step: f64, sign: f64) -> Result<()> {
        if step < 0.0 {
            return Err(MetricsError::IllegalStep(step));
        }
        self.with_slot(|_, slot| {
            slot.series.value += sign * step;
            Ok(())
        })
    }
}

impl MetricTemplate<GaugeKind> {
    pub fn set(&self, value: f64) -> Result<()> {
        self.with().set(value)
    }

    pub fn inc(&self) -> Result<()> {
        self.with().inc()
    }

    pub fn inc_by(&self, step: f64) -> Result<()> {
        self.with().inc_by(step)
    }

    pub fn dec(&self) -> Result<()> {
        self.with().dec()
    }

    pub fn dec_by(&self, step: f64) -> Result<()> {
        self.with().dec_by(step)
    }

    pub fn get(&self) -> Result<f64> {
        self.with().get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gauge() -> GaugeVec {
        GaugeVec::new("queue_depth", "", ["queue"], GaugeKind).unwrap()
    }

    #[test]
    fn test_negative_step_rejected() {
        let gauge = gauge().with_label("queue", "email").unwrap();
        assert!(matches!(gauge.inc_by(-1.0), Err(MetricsError::IllegalStep(_))));
        assert!(matches!(gauge.dec_by(-0.5), Err(MetricsError::IllegalStep(_))));
    }

    #[test]
    fn test_set_negative_value() {
        let gauge = gauge().with_label("queue", "email").unwrap();
        gauge.set(-10.0).unwrap();
        assert_eq!(gauge.get().unwrap(), -10.0);
    }

    #[test]
    fn test_dec_below_zero() {
        let gauge = gauge().with_label("queue", "sms").unwrap();
        gauge.inc_by(2.0).unwrap();
        gauge.dec_by(5.0).unwrap();
        gauge.dec().unwrap();
        assert_eq!(gauge.get().unwrap(), -4.0);
    }
}
