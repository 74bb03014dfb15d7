//! Process statistics collector.
//!
//! Refreshes a handful of gauges from the running process every time it is
//! collected, then yields them from a private registry.

use super::{collector_fn, Collector, MetricStream, Registry};
use crate::error::{MetricsError, Result};
use crate::metrics::{create_gauge, GaugeVec, MetricOpts, Registration};
use crate::model::MetricType;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use std::time::Instant;

struct ProcessGauges {
    started: Instant,
    uptime: GaugeVec,
    resident: GaugeVec,
    virtual_memory: GaugeVec,
}

impl ProcessGauges {
    fn refresh(&self) -> Result<()> {
        self.uptime.set(self.started.elapsed().as_secs_f64())?;
        if cfg!(target_os = "linux") {
            let status =
                std::fs::read_to_string("/proc/self/status").map_err(MetricsError::collection)?;
            if let Some(bytes) = status_kb(&status, "VmRSS") {
                self.resident.set(bytes)?;
            }
            if let Some(bytes) = status_kb(&status, "VmSize") {
                self.virtual_memory.set(bytes)?;
            }
        }
        Ok(())
    }
}

/// Extracts a `Field:   123 kB` line from `/proc/<pid>/status`, in bytes.
fn status_kb(status: &str, field: &str) -> Option<f64> {
    status.lines().find_map(|line| {
        let rest = line.strip_prefix(field)?.strip_prefix(':')?;
        let kb: f64 = rest.split_whitespace().next()?.parse().ok()?;
        Some(kb * 1024.0)
    })
}

fn gauge(registry: &Registry, name: &str, help: &str) -> Result<GaugeVec> {
    let opts = MetricOpts::new(MetricType::Gauge, name)
        .namespace("process")
        .help(help);
    create_gauge(&opts, &Registration::detached().also(registry))
}

/// A collector exporting `process_*` gauges for the current process.
///
/// On Linux the memory gauges are read from `/proc/self/status`; a failed
/// read aborts the collection pass.
pub fn process_collector() -> Result<impl Collector> {
    let registry = Registry::new();

    let start_time = gauge(
        &registry,
        "start_time_seconds",
        "Start time of the process since unix epoch in seconds",
    )?;
    start_time.set(chrono::Utc::now().timestamp_millis() as f64 / 1000.0)?;

    let gauges = Arc::new(ProcessGauges {
        started: Instant::now(),
        uptime: gauge(&registry, "uptime_seconds", "Time since the process started in seconds")?,
        resident: gauge(&registry, "resident_memory_bytes", "Resident memory size in bytes")?,
        virtual_memory: gauge(&registry, "virtual_memory_bytes", "Virtual memory size in bytes")?,
    });

    Ok(collector_fn(move || -> MetricStream {
        let gauges = Arc::clone(&gauges);
        let registry = registry.clone();
        stream::once(async move { gauges.refresh().map(|()| registry.collect()) })
            .try_flatten()
            .boxed()
    }))
}
