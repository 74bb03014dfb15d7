//! The collector abstraction and ad hoc collectors.

use crate::error::MetricsError;
use crate::model::CollectedMetric;
use futures::stream::BoxStream;
use futures::TryStreamExt;
use std::fmt;
use std::sync::Arc;

/// A lazy, finite stream of collected metrics.
///
/// The first error aborts the collection pass that produced it.
pub type MetricStream = BoxStream<'static, Result<CollectedMetric, MetricsError>>;

/// Anything that can yield collected metrics on demand.
///
/// Each call starts a fresh pass over the collector's current state.
pub trait Collector: Send + Sync {
    fn collect(&self) -> MetricStream;
}

impl<C: Collector + ?Sized> Collector for Arc<C> {
    fn collect(&self) -> MetricStream {
        (**self).collect()
    }
}

impl<C: Collector + ?Sized> Collector for Box<C> {
    fn collect(&self) -> MetricStream {
        (**self).collect()
    }
}

/// A collector backed by a closure producing a fresh stream per pass.
///
/// Useful for collectors that consult an external source before yielding,
/// such as [`process_collector`](super::process_collector).
pub struct FnCollector<F> {
    f: F,
}

impl<F> fmt::Debug for FnCollector<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCollector").finish_non_exhaustive()
    }
}

impl<F> Collector for FnCollector<F>
where
    F: Fn() -> MetricStream + Send + Sync,
{
    fn collect(&self) -> MetricStream {
        (self.f)()
    }
}

/// Wraps a closure as a [`Collector`].
pub fn collector_fn<F>(f: F) -> FnCollector<F>
where
    F: Fn() -> MetricStream + Send + Sync,
{
    FnCollector { f }
}

/// Drains one full collection pass into a vector.
pub async fn collect_all<C>(collector: &C) -> Result<Vec<CollectedMetric>, MetricsError>
where
    C: Collector + ?Sized,
{
    collector.collect().try_collect().await
}
