//! Jet partitioner logs.
//!
//! Jet announces each input with `Reading ... <path>/<name>.graph`. Its
//! per-level lines use `key=value` pairs:
//!
//! - `level=2 nvtxs=51234 ... adjwgt_sum=912345`
//! - `level= 2 time= 0.84` (milliseconds, no unit suffix)
use super::{LogGrammar, LogKind};
use crate::series::MetricKind;
use crate::tokenizer::{PatternSet, SampleShape};
use std::sync::LazyLock;

const MARKER: &str = r"Reading.*?(?P<path>\S+?)\.graph";

static COARSEN_EDGECUT: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(
        MARKER,
        r"level=(?P<level>\d+)\s+nvtxs=.*?adjwgt_sum=(?P<value>\d+)",
        MetricKind::EdgeCut,
        SampleShape::Count,
    )
    .unwrap()
});

static COARSEN_TIME: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(
        MARKER,
        r"level=\s+(?P<level>\d+)\s+time=\s+(?P<value>[\d.]+)",
        MetricKind::PhaseTime,
        SampleShape::LevelMillis,
    )
    .unwrap()
});

pub fn grammar(kind: LogKind) -> Option<LogGrammar> {
    match kind {
        LogKind::CoarsenEdgecut => Some(LogGrammar::uncapped(&COARSEN_EDGECUT)),
        LogKind::CoarsenTime => Some(LogGrammar::uncapped(&COARSEN_TIME)),
        LogKind::InitialEdgecut => None,
    }
}
