//! Registries: composable collectors.
//!
//! A [`Registry`] holds an ordered list of child collectors (templates,
//! other registries, ad hoc collectors) and re-yields everything they
//! produce, depth first, in registration order. There is no
//! de-duplication, relabeling or cycle detection.
//!
//! # Example
//!
//! ```
//! use promvec::metrics::{CounterKind, CounterVec, LabelSpec};
//! use promvec::registry::{collect_all, Registry};
//!
//! let registry = Registry::new();
//! let jobs = CounterVec::new("jobs_total", "Jobs run", LabelSpec::default(), CounterKind).unwrap();
//! registry.register(jobs.clone());
//!
//! jobs.inc().unwrap();
//! let collected = futures::executor::block_on(collect_all(&registry)).unwrap();
//! assert_eq!(collected[0].value.value, 1.0);
//! ```

mod collector;
mod process;

pub use collector::{collect_all, collector_fn, Collector, FnCollector, MetricStream};
pub use process::process_collector;

use futures::stream::{self, StreamExt};
use std::fmt;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

static DEFAULT_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// The process-wide default registry.
///
/// Templates created through [`crate::metrics::create_metric`] register here
/// unless detached.
pub fn default_registry() -> &'static Registry {
    &DEFAULT_REGISTRY
}

/// An ordered list of collectors that is itself a collector.
///
/// Cloning yields a handle to the same list.
#[derive(Clone, Default)]
pub struct Registry {
    collectors: Arc<RwLock<Vec<Arc<dyn Collector>>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a collector.
    pub fn register<C>(&self, collector: C)
    where
        C: Collector + 'static,
    {
        self.register_arc(Arc::new(collector));
    }

    /// Appends an already shared collector.
    pub fn register_arc(&self, collector: Arc<dyn Collector>) {
        let mut collectors = self
            .collectors
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        collectors.push(collector);
        tracing::debug!(collectors = collectors.len(), "registered collector");
    }

    /// Number of directly registered collectors.
    pub fn len(&self) -> usize {
        self.collectors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether both handles point at the same registry.
    pub fn ptr_eq(&self, other: &Registry) -> bool {
        Arc::ptr_eq(&self.collectors, &other.collectors)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("collectors", &self.len())
            .finish()
    }
}

impl Collector for Registry {
    /// Walks the children registered at the time of the call, sequentially.
    fn collect(&self) -> MetricStream {
        let children = self
            .collectors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        stream::iter(children)
            .flat_map(|child| child.collect())
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{CounterKind, CounterVec, GaugeKind, GaugeVec};
    use futures::executor::block_on;

    fn names(registry: &Registry) -> Vec<String> {
        block_on(collect_all(registry))
            .unwrap()
            .into_iter()
            .map(|m| format!("{}{:?}", m.descriptor.name, m.value.labels.values().collect::<Vec<_>>()))
            .collect()
    }

    #[test]
    fn test_registration_order() {
        let registry = Registry::new();
        let a = CounterVec::new("a_total", "", ["k"], CounterKind).unwrap();
        let b = GaugeVec::new("b", "", ["k"], GaugeKind).unwrap();
        registry.register(a.clone());
        registry.register(b.clone());

        b.with_label("k", "1").unwrap().set(1.0).unwrap();
        a.with_label("k", "2").unwrap().inc().unwrap();
        a.with_label("k", "1").unwrap().inc().unwrap();

        assert_eq!(names(&registry), ["a_total[\"2\"]", "a_total[\"1\"]", "b[\"1\"]"]);
    }

    #[test]
    fn test_nested_registries_depth_first() {
        let root = Registry::new();
        let child = Registry::new();
        let first = GaugeVec::new("first", "", Vec::<String>::new(), GaugeKind).unwrap();
        let nested = GaugeVec::new("nested", "", Vec::<String>::new(), GaugeKind).unwrap();
        let last = GaugeVec::new("last", "", Vec::<String>::new(), GaugeKind).unwrap();
        for gauge in [&first, &nested, &last] {
            gauge.set(1.0).unwrap();
        }

        root.register(first);
        child.register(nested);
        root.register(child.clone());
        root.register(last);

        assert_eq!(names(&root), ["first[]", "nested[]", "last[]"]);
        assert_eq!(root.len(), 3);
    }

    #[test]
    fn test_no_deduplication() {
        let registry = Registry::new();
        let gauge = GaugeVec::new("twice", "", Vec::<String>::new(), GaugeKind).unwrap();
        gauge.set(2.0).unwrap();
        registry.register(gauge.clone());
        registry.register(gauge);

        assert_eq!(names(&registry).len(), 2);
    }

    #[test]
    fn test_ptr_eq() {
        let registry = Registry::new();
        assert!(registry.ptr_eq(&registry.clone()));
        assert!(!registry.ptr_eq(&Registry::new()));
        assert!(default_registry().ptr_eq(default_registry()));
    }
}
