//! Hunyuan partitioner logs.
//!
//! Graph blocks open with `graph: <path>/<name>.graph` (the keyword case
//! varies between builds). Within a block:
//!
//! - coarsening edge weight: `level 3: nvtxs ... adjwgtsum 81234`
//! - coarsening time: `level= 3 time= 1.25 ms`
//! - initial partitioning (sampling): one `edgecut= 5120` line per run
use super::{LogGrammar, LogKind};
use crate::series::MetricKind;
use crate::tokenizer::{PatternSet, SampleShape};
use std::sync::LazyLock;

const MARKER: &str = r"(?i:graph):\s*(?P<path>.+?)\.graph";

/// Trailing device/partition tag on initial-partitioning graph names.
pub(super) const RUN_TAG: &str = r"_(?:gpu|cpu)_\d+$";

static COARSEN_EDGECUT: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(
        MARKER,
        r"level\s+(?P<level>\d+):.*adjwgtsum\s+(?P<value>\d+)",
        MetricKind::EdgeCut,
        SampleShape::Count,
    )
    .unwrap()
});

static COARSEN_TIME: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(
        MARKER,
        r"level=\s*(?P<level>\d+)\s+time=\s*(?P<value>[\d.]+)\s*ms",
        MetricKind::PhaseTime,
        SampleShape::LevelMillis,
    )
    .unwrap()
});

/// Per-run edge-cut blocks. The exhaustive search tool writes the same format.
pub(super) static INITIAL_EDGECUT: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(
        MARKER,
        r"edgecut=\s*(?P<value>\d+)",
        MetricKind::InitialCut,
        SampleShape::Count,
    )
    .unwrap()
    .with_suffix(RUN_TAG)
    .unwrap()
});

pub fn grammar(kind: LogKind) -> Option<LogGrammar> {
    Some(match kind {
        LogKind::CoarsenEdgecut => LogGrammar::uncapped(&COARSEN_EDGECUT),
        LogKind::CoarsenTime => LogGrammar::uncapped(&COARSEN_TIME),
        LogKind::InitialEdgecut => LogGrammar::uncapped(&INITIAL_EDGECUT),
    })
}
