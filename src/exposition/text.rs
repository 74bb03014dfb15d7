//! Text format encoder.

use crate::error::Result;
use crate::model::{format_float, CollectedMetric, Labels, MetricType};
use crate::registry::Collector;
use futures::TryStreamExt;
use indexmap::IndexMap;
use std::fmt::Write;

/// Content type of the exposition payload.
pub const CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Runs one collection pass and renders it.
///
/// Any collector error aborts the pass; no partial payload is produced.
pub async fn render<C>(collector: &C) -> Result<String>
where
    C: Collector + ?Sized,
{
    let metrics: Vec<CollectedMetric> = collector.collect().try_collect().await?;
    Ok(encode(metrics))
}

/// Renders already collected metrics.
pub fn encode(metrics: impl IntoIterator<Item = CollectedMetric>) -> String {
    let mut groups: IndexMap<String, Vec<CollectedMetric>> = IndexMap::new();
    for metric in metrics {
        let group = group_name(&metric, &groups);
        groups.entry(group).or_default().push(metric);
    }

    let stanzas: Vec<String> = groups
        .iter()
        .map(|(name, members)| stanza(name, members))
        .collect();
    stanzas.join("\n")
}

/// The stanza a series belongs to.
///
/// Histogram `_bucket`, `_count` and `_sum` series regroup under the
/// histogram's declared name. Summary `_count` and `_sum` series join the
/// summary stanza opened by its quantile series.
fn group_name(metric: &CollectedMetric, groups: &IndexMap<String, Vec<CollectedMetric>>) -> String {
    let name = metric.descriptor.name.as_str();
    match metric.descriptor.metric_type {
        MetricType::Histogram => strip_suffix(name, &["_bucket", "_count", "_sum"])
            .unwrap_or(name)
            .to_string(),
        MetricType::Summary => strip_suffix(name, &["_count", "_sum"])
            .filter(|base| {
                groups
                    .get(*base)
                    .and_then(|members| members.first())
                    .is_some_and(|first| first.descriptor.metric_type == MetricType::Summary)
            })
            .unwrap_or(name)
            .to_string(),
        MetricType::Counter | MetricType::Gauge => name.to_string(),
    }
}

fn strip_suffix<'a>(name: &'a str, suffixes: &[&str]) -> Option<&'a str> {
    suffixes.iter().find_map(|suffix| name.strip_suffix(suffix))
}

fn stanza(name: &str, members: &[CollectedMetric]) -> String {
    let mut out = String::new();
    if let Some(first) = members.first() {
        let _ = writeln!(out, "# HELP {name} {}", escape_help(&first.descriptor.help));
        let _ = writeln!(out, "# TYPE {name} {}", first.descriptor.metric_type);
    }
    for metric in members {
        let _ = writeln!(
            out,
            "{}{} {}",
            metric.descriptor.name,
            label_block(&metric.value.labels),
            format_float(metric.value.value)
        );
    }
    out
}

fn label_block(labels: &Labels) -> String {
    if labels.is_empty() {
        return String::new();
    }
    let pairs: Vec<String> = labels
        .iter()
        .map(|(name, value)| format!("{name}=\"{}\"", escape_label_value(value)))
        .collect();
    format!("{{{}}}", pairs.join(","))
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}
