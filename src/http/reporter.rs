//! Request duration reporting for host web frameworks.
//!
//! A [`RequestMetrics`] owns the `http_request_duration_seconds` histogram.
//! Framework glue creates one [`Reporter`] when a request arrives and calls
//! [`Reporter::report`] once the response is ready.

use crate::error::Result;
use crate::metrics::{create_histogram, HistogramVec, MetricOpts, MetricType, Registration};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Name of the request duration histogram.
pub const REQUEST_DURATION_METRIC: &str = "http_request_duration_seconds";

/// Configuration of the request duration histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReporterOptions {
    /// Set to false to skip creating the histogram.
    pub enabled: bool,
    /// Bucket boundaries in seconds.
    pub buckets: Vec<f64>,
    /// Extra labels and their default values.
    pub labels: IndexMap<String, String>,
}

impl Default for ReporterOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            buckets: vec![0.5, 1.0, 2.0, 3.0, 5.0],
            labels: IndexMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub method: String,
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportResponse {
    pub status: u16,
}

/// One finished request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub request: ReportRequest,
    pub response: ReportResponse,
}

impl Report {
    pub fn new(method: impl Into<String>, path: impl Into<String>, status: u16) -> Self {
        Self {
            request: ReportRequest {
                method: method.into(),
                path: path.into(),
            },
            response: ReportResponse { status },
        }
    }
}

/// Shared request metrics. Cheap to clone.
///
/// When the options disable reporting no histogram exists and every report
/// is a no-op.
#[derive(Debug, Clone)]
pub struct RequestMetrics {
    durations: Option<HistogramVec>,
}

impl RequestMetrics {
    pub fn new(options: &ReporterOptions, registration: &Registration) -> Result<Self> {
        if !options.enabled {
            return Ok(Self { durations: None });
        }

        let mut labels: IndexMap<String, Option<String>> = IndexMap::new();
        labels.insert("method".to_string(), None);
        labels.insert("path".to_string(), None);
        for (name, value) in &options.labels {
            labels.insert(name.clone(), Some(value.clone()));
        }

        let opts = MetricOpts::new(MetricType::Histogram, REQUEST_DURATION_METRIC)
            .help("request duration histogram")
            .labels(labels)
            .buckets(options.buckets.clone());
        let durations = create_histogram(&opts, registration)?;
        Ok(Self {
            durations: Some(durations),
        })
    }

    /// The underlying histogram, if reporting is enabled.
    pub fn histogram(&self) -> Option<&HistogramVec> {
        self.durations.as_ref()
    }

    /// Starts timing one request.
    pub fn reporter(&self) -> Reporter {
        Reporter {
            durations: self.durations.clone(),
            start: Instant::now(),
        }
    }
}

/// Times a single request from its creation.
#[derive(Debug)]
pub struct Reporter {
    durations: Option<HistogramVec>,
    start: Instant,
}

impl Reporter {
    /// Observes the elapsed seconds labeled by request method and path.
    ///
    /// The response status is accepted but not used as a label.
    pub fn report(&self, report: &Report) -> Result<()> {
        let Some(durations) = &self.durations else {
            return Ok(());
        };
        durations
            .with_labels([
                ("method", report.request.method.as_str()),
                ("path", report.request.path.as_str()),
            ])?
            .observe(self.start.elapsed().as_secs_f64())
    }
}
