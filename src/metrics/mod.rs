//! Metric templates and the four metric kinds.
//!
//! A template declares a fully qualified name, help text and a label set.
//! Calling `with…` on it yields a bound instance for one label-value
//! assignment; the instance's backing series is created on first use and
//! kept for the life of the template.
//!
//! # Kinds
//!
//! - [`CounterVec`] / [`Counter`]: monotonic, resettable to zero
//! - [`GaugeVec`] / [`Gauge`]: unrestricted value
//! - [`HistogramVec`] / [`Histogram`]: cumulative `le` buckets, `count`, `sum`
//! - [`SummaryVec`] / [`Summary`]: windowed rank estimate, `count`, `sum`
//!
//! # Example
//!
//! ```
//! use promvec::metrics::{create_histogram, MetricOpts, MetricType, Registration};
//! use promvec::registry::Registry;
//!
//! let registry = Registry::new();
//! let opts = MetricOpts::new(MetricType::Histogram, "request_duration_seconds")
//!     .namespace("api")
//!     .help("Request latency")
//!     .labels(["method"])
//!     .buckets([0.1, 0.5, 1.0]);
//! let latency = create_histogram(&opts, &Registration::to(&registry)).unwrap();
//!
//! latency.with_label("method", "GET").unwrap().observe(0.27).unwrap();
//! ```

mod counter;
mod factory;
mod gauge;
mod histogram;
mod naming;
mod summary;
mod template;

pub use crate::model::MetricType;
pub use counter::{Counter, CounterKind, CounterVec};
pub use factory::{
    create_counter, create_gauge, create_histogram, create_metric, create_summary, AnyMetric,
    MetricOpts, Registration,
};
pub use gauge::{Gauge, GaugeKind, GaugeVec};
pub use histogram::{Histogram, HistogramKind, HistogramVec, DEFAULT_BUCKETS};
pub use naming::{fully_qualified_name, validate_label_name, validate_metric_name};
pub use summary::{rank_fractions, SampleWindow, Summary, SummaryKind, SummaryVec};
pub use template::{BoundMetric, KindSlot, LabelSpec, MetricKind, MetricTemplate, Slot};
