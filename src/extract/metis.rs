//! METIS initial-partitioning logs.
//!
//! Blocks open with `filename=<path>/<name>.graph`, followed by one
//! `edgecut=<n>` line per run. Only the first runs are kept so METIS is
//! compared on the same number of repetitions regardless of how many it ran.
use super::hunyuan::RUN_TAG;
use super::{LogGrammar, LogKind};
use crate::series::MetricKind;
use crate::tokenizer::{PatternSet, SampleShape};
use std::sync::LazyLock;

/// Runs retained per graph.
pub const RETAINED_RUNS: usize = 5;

static INITIAL_EDGECUT: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(
        r"filename=\s*(?P<path>.+?)\.graph",
        r"edgecut=(?P<value>\d+)",
        MetricKind::InitialCut,
        SampleShape::Count,
    )
    .unwrap()
    .with_suffix(RUN_TAG)
    .unwrap()
});

pub fn grammar(kind: LogKind) -> Option<LogGrammar> {
    match kind {
        LogKind::InitialEdgecut => Some(LogGrammar::capped(&INITIAL_EDGECUT, RETAINED_RUNS)),
        LogKind::CoarsenEdgecut | LogKind::CoarsenTime => None,
    }
}
