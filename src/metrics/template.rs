//! Metric templates ("vectors") and their label-bound instances.
//!
//! A [`MetricTemplate`] owns the declared label set and a store of realised
//! instances, one per distinct label-value combination. Instances are looked
//! up through a canonical key built from the sorted label names, and kept in
//! insertion order for export. The store never evicts: label cardinality is
//! the caller's responsibility.

use super::naming::{validate_label_name, validate_metric_name};
use crate::error::{MetricsError, Result};
use crate::model::{CollectedMetric, Labels, MetricType, Series};
use crate::registry::{Collector, MetricStream};
use futures::stream::{self, StreamExt};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Declared labels of a template.
///
/// Either a plain list of names, or a table of names to optional default
/// values applied whenever an instance does not override them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabelSpec {
    Names(Vec<String>),
    Defaults(IndexMap<String, Option<String>>),
}

impl Default for LabelSpec {
    fn default() -> Self {
        Self::Names(Vec::new())
    }
}

impl LabelSpec {
    fn into_defaults(self) -> IndexMap<String, Option<String>> {
        match self {
            Self::Names(names) => names.into_iter().map(|name| (name, None)).collect(),
            Self::Defaults(defaults) => defaults,
        }
    }
}

impl<S: Into<String>> From<Vec<S>> for LabelSpec {
    fn from(names: Vec<S>) -> Self {
        Self::Names(names.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for LabelSpec {
    fn from(names: [S; N]) -> Self {
        Self::Names(names.into_iter().map(Into::into).collect())
    }
}

impl From<IndexMap<String, Option<String>>> for LabelSpec {
    fn from(defaults: IndexMap<String, Option<String>>) -> Self {
        Self::Defaults(defaults)
    }
}

mod sealed {
    pub trait Sealed {}

    impl Sealed for crate::metrics::CounterKind {}
    impl Sealed for crate::metrics::GaugeKind {}
    impl Sealed for crate::metrics::HistogramKind {}
    impl Sealed for crate::metrics::SummaryKind {}
}

/// The per-kind algorithm plugged into a template.
///
/// Implemented only by the four kinds in this crate.
pub trait MetricKind: sealed::Sealed + Sized + fmt::Debug + Send + Sync + 'static {
    /// The stored shape of one instance: a scalar `MetricValue` or a
    /// `HierarchicalMetricValue`.
    type Series: Series + Send + 'static;

    /// Per-instance bookkeeping kept next to the exported series.
    type State: Send + 'static;

    const TYPE: MetricType;

    /// Rejects kind configuration that can never produce valid series.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Builds the zero-valued slot for a newly realised label set.
    fn new_slot(&self, labels: Labels) -> KindSlot<Self>;

    /// Refreshes derived values right before the store is exported.
    fn prepare(&self, _slots: &mut [KindSlot<Self>], _now: Instant) {}
}

/// The slot type a kind stores per instance.
pub type KindSlot<K> = Slot<<K as MetricKind>::Series, <K as MetricKind>::State>;

/// One realised instance inside a template's store.
#[derive(Debug)]
pub struct Slot<V, S> {
    pub(crate) series: V,
    pub(crate) state: S,
}

impl<V, S> Slot<V, S> {
    pub(crate) fn new(series: V, state: S) -> Self {
        Self { series, state }
    }
}

struct Store<K: MetricKind> {
    slots: Vec<KindSlot<K>>,
    index: HashMap<String, usize>,
}

struct TemplateInner<K: MetricKind> {
    name: String,
    help: String,
    defaults: IndexMap<String, Option<String>>,
    kind: K,
    store: Mutex<Store<K>>,
}

/// A named, labeled metric declaration that produces bound instances.
///
/// Cloning is cheap and clones share the same store.
pub struct MetricTemplate<K: MetricKind> {
    inner: Arc<TemplateInner<K>>,
}

impl<K: MetricKind> Clone for MetricTemplate<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K: MetricKind> fmt::Debug for MetricTemplate<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricTemplate")
            .field("name", &self.inner.name)
            .field("type", &K::TYPE)
            .field("labels", &self.inner.defaults)
            .field("kind", &self.inner.kind)
            .field("cardinality", &self.cardinality())
            .finish()
    }
}

impl<K: MetricKind> MetricTemplate<K> {
    /// Creates a template from a fully qualified name.
    ///
    /// Fails without producing a template if the name, any label name or the
    /// kind configuration is invalid.
    pub fn new(
        name: impl Into<String>,
        help: impl Into<String>,
        labels: impl Into<LabelSpec>,
        kind: K,
    ) -> Result<Self> {
        let name = name.into();
        validate_metric_name(&name)?;
        let defaults = labels.into().into_defaults();
        for label in defaults.keys() {
            validate_label_name(label)?;
        }
        kind.validate()?;

        tracing::debug!(
            metric = %name,
            kind = %K::TYPE,
            labels = defaults.len(),
            "created metric template"
        );

        Ok(Self {
            inner: Arc::new(TemplateInner {
                name,
                help: help.into(),
                defaults,
                kind,
                store: Mutex::new(Store {
                    slots: Vec::new(),
                    index: HashMap::new(),
                }),
            }),
        })
    }

    /// The fully qualified metric name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn help(&self) -> &str {
        &self.inner.help
    }

    pub fn metric_type(&self) -> MetricType {
        K::TYPE
    }

    pub fn kind(&self) -> &K {
        &self.inner.kind
    }

    /// Declared label names in declaration order.
    pub fn label_names(&self) -> impl Iterator<Item = &str> {
        self.inner.defaults.keys().map(String::as_str)
    }

    /// Number of realised label-value combinations.
    pub fn cardinality(&self) -> usize {
        self.lock().slots.len()
    }

    /// The instance bound to the declared default label values.
    pub fn with(&self) -> BoundMetric<K> {
        BoundMetric {
            template: self.clone(),
            labels: self.inner.defaults.clone(),
        }
    }

    /// The instance with a single label overridden.
    pub fn with_label(&self, label: &str, value: impl Into<String>) -> Result<BoundMetric<K>> {
        self.with_labels([(label, value)])
    }

    /// The instance with a group of labels overridden.
    ///
    /// Overrides are merged over the declared defaults. Every supplied key
    /// must be a declared label.
    pub fn with_labels<I, N, V>(&self, labels: I) -> Result<BoundMetric<K>>
    where
        I: IntoIterator<Item = (N, V)>,
        N: AsRef<str>,
        V: Into<String>,
    {
        let mut merged = self.inner.defaults.clone();
        for (label, value) in labels {
            let label = label.as_ref();
            match merged.get_mut(label) {
                Some(slot) => *slot = Some(value.into()),
                None => {
                    return Err(MetricsError::UnknownLabel {
                        metric: self.inner.name.clone(),
                        label: label.to_string(),
                    })
                }
            }
        }
        Ok(BoundMetric {
            template: self.clone(),
            labels: merged,
        })
    }

    /// Flattens the whole store into wire-level metrics.
    pub fn snapshot(&self) -> Vec<CollectedMetric> {
        let mut store = self.lock();
        self.inner.kind.prepare(&mut store.slots, Instant::now());

        let mut out = Vec::with_capacity(store.slots.len());
        for slot in &store.slots {
            slot.series
                .flatten_into(&self.inner.name, &self.inner.help, K::TYPE, &mut out);
        }
        out
    }

    fn lock(&self) -> MutexGuard<'_, Store<K>> {
        self.inner
            .store
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` against the slot for `labels`, realising it on first use.
    fn with_slot<R>(
        &self,
        labels: &IndexMap<String, Option<String>>,
        f: impl FnOnce(&K, &mut KindSlot<K>) -> Result<R>,
    ) -> Result<R> {
        let resolved = self.resolve(labels)?;
        let key = canonical_key(&resolved);

        let mut store = self.lock();
        let index = match store.index.get(&key) {
            Some(&index) => index,
            None => {
                let index = store.slots.len();
                store.slots.push(self.inner.kind.new_slot(resolved));
                store.index.insert(key, index);
                tracing::debug!(
                    metric = %self.inner.name,
                    cardinality = index + 1,
                    "realised metric instance"
                );
                index
            }
        };
        f(&self.inner.kind, &mut store.slots[index])
    }

    fn resolve(&self, labels: &IndexMap<String, Option<String>>) -> Result<Labels> {
        let unset: Vec<String> = labels
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(label, _)| label.clone())
            .collect();
        if !unset.is_empty() {
            return Err(MetricsError::UnsetLabels {
                metric: self.inner.name.clone(),
                labels: unset,
            });
        }
        Ok(labels
            .iter()
            .filter_map(|(label, value)| value.clone().map(|value| (label.clone(), value)))
            .collect())
    }
}

impl<K: MetricKind> Collector for MetricTemplate<K> {
    fn collect(&self) -> MetricStream {
        let template = self.clone();
        stream::once(async move { template.snapshot() })
            .flat_map(|metrics| stream::iter(metrics.into_iter().map(Ok)))
            .boxed()
    }
}

/// Sorted `name=value` pairs, newline separated. Newlines and backslashes
/// in values are escaped so distinct label sets never share a key.
fn canonical_key(labels: &Labels) -> String {
    let mut pairs: Vec<_> = labels.iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));
    pairs
        .into_iter()
        .map(|(label, value)| {
            let value = value.replace('\\', "\\\\").replace('\n', "\\n");
            format!("{label}={value}\n")
        })
        .collect()
}

/// A template realised against one label-value assignment.
///
/// The backing slot is created lazily on the first operation. Operating on
/// an instance with an unset label fails with
/// [`MetricsError::UnsetLabels`].
pub struct BoundMetric<K: MetricKind> {
    template: MetricTemplate<K>,
    labels: IndexMap<String, Option<String>>,
}

impl<K: MetricKind> Clone for BoundMetric<K> {
    fn clone(&self) -> Self {
        Self {
            template: self.template.clone(),
            labels: self.labels.clone(),
        }
    }
}

impl<K: MetricKind> fmt::Debug for BoundMetric<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundMetric")
            .field("name", &self.template.name())
            .field("labels", &self.labels)
            .finish()
    }
}

impl<K: MetricKind> BoundMetric<K> {
    pub fn template(&self) -> &MetricTemplate<K> {
        &self.template
    }

    /// Label values of this instance; `None` marks an unset label.
    pub fn labels(&self) -> &IndexMap<String, Option<String>> {
        &self.labels
    }

    /// Re-derives an instance from the template with other overrides.
    pub fn with_labels<I, N, V>(&self, labels: I) -> Result<BoundMetric<K>>
    where
        I: IntoIterator<Item = (N, V)>,
        N: AsRef<str>,
        V: Into<String>,
    {
        self.template.with_labels(labels)
    }

    pub fn with_label(&self, label: &str, value: impl Into<String>) -> Result<BoundMetric<K>> {
        self.template.with_label(label, value)
    }

    pub(crate) fn with_slot<R>(
        &self,
        f: impl FnOnce(&K, &mut KindSlot<K>) -> Result<R>,
    ) -> Result<R> {
        self.template.with_slot(&self.labels, f)
    }

    pub(crate) fn metric_name(&self) -> &str {
        self.template.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{CounterKind, CounterVec, GaugeKind};
    use futures::executor::block_on;
    use futures::TryStreamExt;

    fn defaults(pairs: &[(&str, Option<&str>)]) -> IndexMap<String, Option<String>> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
            .collect()
    }

    #[test]
    fn test_invalid_label_aborts_construction() {
        let err = CounterVec::new("requests", "", ["ok", "bad-label"], CounterKind).unwrap_err();
        assert!(matches!(err, MetricsError::InvalidLabelName(label) if label == "bad-label"));
    }

    #[test]
    fn test_unknown_label_rejected() {
        let counter = CounterVec::new("requests", "", ["method"], CounterKind).unwrap();
        let err = counter.with_label("status", "200").unwrap_err();
        assert!(matches!(err, MetricsError::UnknownLabel { label, .. } if label == "status"));
    }

    #[test]
    fn test_unset_label_fails_on_use() {
        let counter = CounterVec::new("requests", "", ["method", "path"], CounterKind).unwrap();
        let partial = counter.with_label("method", "GET").unwrap();

        let err = partial.inc().unwrap_err();
        assert!(matches!(err, MetricsError::UnsetLabels { labels, .. } if labels == ["path"]));
        assert_eq!(counter.cardinality(), 0);
    }

    #[test]
    fn test_defaults_fill_missing_labels() {
        let counter = CounterVec::new(
            "requests",
            "",
            defaults(&[("method", None), ("region", Some("eu"))]),
            CounterKind,
        )
        .unwrap();
        counter.with_label("method", "GET").unwrap().inc().unwrap();

        let metrics = counter.snapshot();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].value.labels["region"], "eu");
        assert_eq!(metrics[0].value.labels["method"], "GET");
    }

    #[test]
    fn test_same_labels_share_one_instance() {
        let counter = CounterVec::new("requests", "", ["a", "b"], CounterKind).unwrap();
        counter
            .with_labels([("a", "1"), ("b", "2")])
            .unwrap()
            .inc()
            .unwrap();
        counter
            .with_labels([("b", "2"), ("a", "1")])
            .unwrap()
            .inc()
            .unwrap();

        assert_eq!(counter.cardinality(), 1);
        assert_eq!(counter.snapshot()[0].value.value, 2.0);
    }

    #[test]
    fn test_collect_preserves_insertion_order() {
        let gauge = crate::metrics::GaugeVec::new("temp", "t", ["room"], GaugeKind).unwrap();
        for room in ["kitchen", "attic", "basement"] {
            gauge.with_label("room", room).unwrap().set(1.0).unwrap();
        }

        let collected: Vec<_> = block_on(gauge.collect().try_collect::<Vec<_>>()).unwrap();
        let rooms: Vec<_> = collected
            .iter()
            .map(|m| m.value.labels["room"].as_str())
            .collect();
        assert_eq!(rooms, ["kitchen", "attic", "basement"]);
    }

    #[test]
    fn test_bound_instance_rederives_from_template_defaults() {
        let counter = CounterVec::new("requests", "", ["a", "b"], CounterKind).unwrap();
        let first = counter.with_label("a", "1").unwrap();
        let second = first.with_label("b", "2").unwrap();

        assert_eq!(second.labels()["a"], None);
        assert_eq!(second.labels()["b"].as_deref(), Some("2"));
    }

    #[test]
    fn test_canonical_key_ignores_order() {
        let a: Labels = [("x", "1"), ("y", "2")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let b: Labels = [("y", "2"), ("x", "1")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(canonical_key(&a), canonical_key(&b));
        assert_eq!(canonical_key(&a), "x=1\ny=2\n");
    }
}
