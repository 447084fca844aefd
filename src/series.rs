//! Metric series shared by extraction, merging and aggregation.
//!
//! A series is an ordered run of samples for one (graph, tool, kind) triple.
//! Order is the order the tool reported them in: coarsening level for
//! per-level logs, repetition order for multi-run logs. It is never sorted.

use serde::Serialize;
use std::collections::BTreeMap;

/// What a series measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Edge weight sum remaining after each coarsening level.
    EdgeCut,
    /// Wall time of each coarsening level, in milliseconds.
    PhaseTime,
    /// Edge-cut of each initial-partitioning run.
    InitialCut,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::EdgeCut => "edge_cut",
            MetricKind::PhaseTime => "phase_time",
            MetricKind::InitialCut => "initial_cut",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single numeric sample. Counts stay integral so the JSON dump keeps
/// them as integers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Sample {
    Int(u64),
    Float(f64),
}

impl Sample {
    pub fn as_f64(self) -> f64 {
        match self {
            Sample::Int(v) => v as f64,
            Sample::Float(v) => v,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSeries {
    pub kind: MetricKind,
    pub samples: Vec<Sample>,
}

impl MetricSeries {
    pub fn new(kind: MetricKind, samples: Vec<Sample>) -> Self {
        Self { kind, samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.as_f64()).collect()
    }

    /// The first `n` samples (or all of them when the series is shorter).
    pub fn prefix(&self, n: usize) -> MetricSeries {
        MetricSeries {
            kind: self.kind,
            samples: self.samples.iter().take(n).copied().collect(),
        }
    }
}

/// Completed series of one log, keyed by graph identifier.
pub type SeriesMap = BTreeMap<String, MetricSeries>;

/// Everything extracted from one tool log.
#[derive(Debug, Clone)]
pub struct ToolSeries {
    pub tool: String,
    pub kind: MetricKind,
    pub series: SeriesMap,
}

impl ToolSeries {
    /// Label used in diagnostics and the run summary, e.g. `jet:edge_cut`.
    pub fn source_label(&self) -> String {
        format!("{}:{}", self.tool, self.kind)
    }
}
