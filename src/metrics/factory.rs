//! Metric creation from declarative options.
//!
//! [`MetricOpts`] is the creation contract: kind, naming parts, help text,
//! labels and the kind-specific settings. It deserializes from the
//! `[[metrics]]` tables of the configuration file. [`Registration`] decides
//! which registries receive the new template.

use super::histogram::DEFAULT_BUCKETS;
use super::naming::fully_qualified_name;
use super::template::{LabelSpec, MetricKind, MetricTemplate};
use super::{
    CounterKind, CounterVec, GaugeKind, GaugeVec, HistogramKind, HistogramVec, SummaryKind,
    SummaryVec,
};
use crate::error::{MetricsError, Result};
use crate::model::MetricType;
use crate::registry::{default_registry, Collector, MetricStream, Registry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Declarative description of one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricOpts {
    #[serde(rename = "type")]
    pub metric_type: MetricType,
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub subsystem: Option<String>,
    #[serde(default)]
    pub help: String,
    #[serde(default)]
    pub labels: LabelSpec,
    /// Histogram bucket bounds; [`DEFAULT_BUCKETS`] when absent.
    #[serde(default)]
    pub buckets: Option<Vec<f64>>,
    /// Summary target quantiles.
    #[serde(default)]
    pub quantiles: Vec<f64>,
    /// Summary retention window in seconds.
    #[serde(default)]
    pub max_age_secs: Option<f64>,
    /// Summary retention window in samples.
    #[serde(default)]
    pub max_samples: Option<usize>,
}

impl MetricOpts {
    pub fn new(metric_type: MetricType, name: impl Into<String>) -> Self {
        Self {
            metric_type,
            name: name.into(),
            namespace: None,
            subsystem: None,
            help: String::new(),
            labels: LabelSpec::default(),
            buckets: None,
            quantiles: Vec::new(),
            max_age_secs: None,
            max_samples: None,
        }
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn subsystem(mut self, subsystem: impl Into<String>) -> Self {
        self.subsystem = Some(subsystem.into());
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    pub fn labels(mut self, labels: impl Into<LabelSpec>) -> Self {
        self.labels = labels.into();
        self
    }

    pub fn buckets(mut self, buckets: impl Into<Vec<f64>>) -> Self {
        self.buckets = Some(buckets.into());
        self
    }

    pub fn quantiles(mut self, quantiles: impl Into<Vec<f64>>) -> Self {
        self.quantiles = quantiles.into();
        self
    }

    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age_secs = Some(max_age.as_secs_f64());
        self
    }

    pub fn max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = Some(max_samples);
        self
    }

    /// `namespace_subsystem_name`, skipping empty parts.
    pub fn fully_qualified_name(&self) -> String {
        fully_qualified_name(
            self.namespace.as_deref(),
            self.subsystem.as_deref(),
            &self.name,
        )
    }

    fn histogram_kind(&self) -> HistogramKind {
        match &self.buckets {
            Some(buckets) => HistogramKind::new(buckets.clone()),
            None => HistogramKind::new(DEFAULT_BUCKETS),
        }
    }

    fn summary_kind(&self) -> Result<SummaryKind> {
        let mut kind = SummaryKind::new(self.quantiles.clone());
        if let Some(secs) = self.max_age_secs {
            let max_age =
                Duration::try_from_secs_f64(secs).map_err(|_| MetricsError::IllegalMaxAge)?;
            kind = kind.max_age(max_age);
        }
        if let Some(max_samples) = self.max_samples {
            kind = kind.max_samples(max_samples);
        }
        Ok(kind)
    }
}

#[derive(Debug, Clone, Default)]
enum Target {
    #[default]
    Unspecified,
    Explicit(Registry),
    Detached,
}

/// Where a newly created template is registered.
///
/// - [`Registration::default`]: the process-wide default registry.
/// - [`Registration::to`]: the given registry and the default registry.
/// - [`Registration::detached`]: not the default registry.
///
/// Registries added with [`Registration::also`] receive the template in
/// every case. A registry never receives the same template twice.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    target: Target,
    registries: Vec<Registry>,
}

impl Registration {
    pub fn to(registry: &Registry) -> Self {
        Self {
            target: Target::Explicit(registry.clone()),
            registries: Vec::new(),
        }
    }

    pub fn detached() -> Self {
        Self {
            target: Target::Detached,
            registries: Vec::new(),
        }
    }

    /// Adds another registry to receive the template.
    pub fn also(mut self, registry: &Registry) -> Self {
        self.registries.push(registry.clone());
        self
    }

    fn apply(&self, collector: Arc<dyn Collector>) {
        let mut targets: Vec<&Registry> = Vec::new();
        if let Target::Explicit(registry) = &self.target {
            targets.push(registry);
        }
        targets.extend(self.registries.iter());
        if !matches!(self.target, Target::Detached) {
            targets.push(default_registry());
        }

        let mut registered: Vec<&Registry> = Vec::with_capacity(targets.len());
        for registry in targets {
            if registered.iter().any(|seen| seen.ptr_eq(registry)) {
                continue;
            }
            registry.register_arc(Arc::clone(&collector));
            registered.push(registry);
        }
    }
}

fn build<K: MetricKind>(
    opts: &MetricOpts,
    kind: K,
    registration: &Registration,
) -> Result<MetricTemplate<K>> {
    let template = MetricTemplate::new(
        opts.fully_qualified_name(),
        opts.help.clone(),
        opts.labels.clone(),
        kind,
    )?;
    registration.apply(Arc::new(template.clone()));
    Ok(template)
}

/// Creates a counter template, ignoring `opts.metric_type`.
pub fn create_counter(opts: &MetricOpts, registration: &Registration) -> Result<CounterVec> {
    build(opts, CounterKind, registration)
}

/// Creates a gauge template, ignoring `opts.metric_type`.
pub fn create_gauge(opts: &MetricOpts, registration: &Registration) -> Result<GaugeVec> {
    build(opts, GaugeKind, registration)
}

/// Creates a histogram template, ignoring `opts.metric_type`.
pub fn create_histogram(opts: &MetricOpts, registration: &Registration) -> Result<HistogramVec> {
    build(opts, opts.histogram_kind(), registration)
}

/// Creates a summary template, ignoring `opts.metric_type`.
pub fn create_summary(opts: &MetricOpts, registration: &Registration) -> Result<SummaryVec> {
    build(opts, opts.summary_kind()?, registration)
}

/// A template of any kind.
#[derive(Debug, Clone)]
pub enum AnyMetric {
    Counter(CounterVec),
    Gauge(GaugeVec),
    Histogram(HistogramVec),
    Summary(SummaryVec),
}

impl AnyMetric {
    pub fn name(&self) -> &str {
        match self {
            Self::Counter(m) => m.name(),
            Self::Gauge(m) => m.name(),
            Self::Histogram(m) => m.name(),
            Self::Summary(m) => m.name(),
        }
    }

    pub fn metric_type(&self) -> MetricType {
        match self {
            Self::Counter(_) => MetricType::Counter,
            Self::Gauge(_) => MetricType::Gauge,
            Self::Histogram(_) => MetricType::Histogram,
            Self::Summary(_) => MetricType::Summary,
        }
    }

    pub fn as_counter(&self) -> Option<&CounterVec> {
        match self {
            Self::Counter(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_gauge(&self) -> Option<&GaugeVec> {
        match self {
            Self::Gauge(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_histogram(&self) -> Option<&HistogramVec> {
        match self {
            Self::Histogram(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_summary(&self) -> Option<&SummaryVec> {
        match self {
            Self::Summary(m) => Some(m),
            _ => None,
        }
    }
}

impl Collector for AnyMetric {
    fn collect(&self) -> MetricStream {
        match self {
            Self::Counter(m) => m.collect(),
            Self::Gauge(m) => m.collect(),
            Self::Histogram(m) => m.collect(),
            Self::Summary(m) => m.collect(),
        }
    }
}

/// Creates a template of the kind named by `opts.metric_type`.
pub fn create_metric(opts: &MetricOpts, registration: &Registration) -> Result<AnyMetric> {
    Ok(match opts.metric_type {
        MetricType::Counter => AnyMetric::Counter(create_counter(opts, registration)?),
        MetricType::Gauge => AnyMetric::Gauge(create_gauge(opts, registration)?),
        MetricType::Histogram => AnyMetric::Histogram(create_histogram(opts, registration)?),
        MetricType::Summary => AnyMetric::Summary(create_summary(opts, registration)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::collect_all;
    use futures::executor::block_on;

    fn series_names(registry: &Registry) -> Vec<String> {
        block_on(collect_all(registry))
            .unwrap()
            .into_iter()
            .map(|m| m.descriptor.name)
            .collect()
    }

    #[test]
    fn test_fully_qualified_name_from_parts() {
        let opts = MetricOpts::new(MetricType::Counter, "requests_total")
            .namespace("app")
            .subsystem("http");
        let registry = Registry::new();
        let metric = create_metric(&opts, &Registration::detached().also(&registry)).unwrap();

        assert_eq!(metric.name(), "app_http_requests_total");
        assert_eq!(metric.metric_type(), MetricType::Counter);
        assert!(metric.as_counter().is_some());
        assert!(metric.as_gauge().is_none());
    }

    #[test]
    fn test_invalid_name_produces_no_template() {
        let registry = Registry::new();
        let opts = MetricOpts::new(MetricType::Gauge, "bad name");
        let err = create_metric(&opts, &Registration::to(&registry)).unwrap_err();

        assert!(matches!(err, MetricsError::InvalidMetricName(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_explicit_registry_also_registers_default() {
        let registry = Registry::new();
        let before = default_registry().len();
        let opts = MetricOpts::new(MetricType::Gauge, "factory_explicit_gauge");
        create_gauge(&opts, &Registration::to(&registry)).unwrap();

        assert_eq!(registry.len(), 1);
        assert!(default_registry().len() > before);
    }

    #[test]
    fn test_detached_skips_default_and_dedupes() {
        let a = Registry::new();
        let b = Registry::new();
        let opts = MetricOpts::new(MetricType::Counter, "factory_detached_total");
        let counter = create_counter(
            &opts,
            &Registration::detached().also(&a).also(&b).also(&a),
        )
        .unwrap();
        counter.inc().unwrap();

        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
        assert_eq!(series_names(&a), ["factory_detached_total"]);
    }

    #[test]
    fn test_summary_options() {
        let registry = Registry::new();
        let opts = MetricOpts::new(MetricType::Summary, "rtt")
            .quantiles([0.5, 0.9])
            .max_age(Duration::from_secs(60))
            .max_samples(100);
        let summary = create_summary(&opts, &Registration::detached().also(&registry)).unwrap();
        assert_eq!(summary.kind().quantiles(), [0.5, 0.9]);

        let negative = MetricOpts {
            max_age_secs: Some(-1.0),
            ..opts
        };
        assert!(matches!(
            create_summary(&negative, &Registration::detached()),
            Err(MetricsError::IllegalMaxAge)
        ));
    }

    #[test]
    fn test_histogram_default_buckets() {
        let opts = MetricOpts::new(MetricType::Histogram, "latency_seconds");
        let histogram = create_histogram(&opts, &Registration::detached()).unwrap();
        assert_eq!(histogram.kind().buckets(), DEFAULT_BUCKETS);
    }

    #[test]
    fn test_opts_from_toml() {
        let opts: MetricOpts = toml::from_str(
            r#"
            type = "histogram"
            name = "duration_seconds"
            namespace = "jobs"
            help = "Job duration"
            labels = { queue = "default", worker = "" }
            buckets = [0.1, 1.0, 10.0]
            "#,
        )
        .unwrap();

        assert_eq!(opts.metric_type, MetricType::Histogram);
        assert_eq!(opts.fully_qualified_name(), "jobs_duration_seconds");
        assert!(matches!(opts.labels, LabelSpec::Defaults(ref d) if d["queue"].as_deref() == Some("default")));

        let listed: MetricOpts =
            toml::from_str("type = \"counter\"\nname = \"c\"\nlabels = [\"a\", \"b\"]").unwrap();
        assert_eq!(listed.labels, LabelSpec::from(["a", "b"]));
    }
}
