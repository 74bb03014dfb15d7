//! Labeled in-process metrics with Prometheus text exposition.
//!
//! Applications declare metric templates (counters, gauges, histograms and
//! summaries) with an ordered set of label names, bind them to concrete
//! label values at the call site, and expose everything through composable
//! registries rendered in the plaintext exposition format.
//!
//! # Architecture
//!
//! ```text
//! metrics (templates) → registry (collectors) → exposition (text) → http
//!        ↑
//!      model (collected series)
//! ```
//!
//! # Example
//!
//! ```
//! use promvec::metrics::{create_counter, MetricOpts, MetricType, Registration};
//! use promvec::registry::Registry;
//!
//! let registry = Registry::new();
//! let opts = MetricOpts::new(MetricType::Counter, "requests_total")
//!     .namespace("api")
//!     .help("Requests served")
//!     .labels(["method"]);
//! let requests = create_counter(&opts, &Registration::detached().also(&registry)).unwrap();
//!
//! requests.with_label("method", "GET").unwrap().inc().unwrap();
//!
//! let text = futures::executor::block_on(promvec::render(&registry)).unwrap();
//! assert!(text.contains("api_requests_total{method=\"GET\"} 1\n"));
//! ```

#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod exposition;
pub mod http;
pub mod metrics;
pub mod model;
pub mod registry;

// Re-export commonly used types at crate root
pub use config::{ConfigError, FileConfig};
pub use error::{MetricsError, Result};
pub use exposition::render;
pub use metrics::{
    create_metric, AnyMetric, Counter, CounterVec, Gauge, GaugeVec, Histogram, HistogramVec,
    MetricOpts, MetricType, Registration, Summary, SummaryVec,
};
pub use registry::{default_registry, Collector, Registry};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
