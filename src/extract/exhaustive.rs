//! Exhaustive GPU initial-partitioning search.
//!
//! Emits the same `graph:` / `edgecut=` block format as Hunyuan's sampling
//! initial partitioner.
use super::{hunyuan, LogGrammar, LogKind};

pub fn grammar(kind: LogKind) -> Option<LogGrammar> {
    match kind {
        LogKind::InitialEdgecut => Some(LogGrammar::uncapped(&hunyuan::INITIAL_EDGECUT)),
        LogKind::CoarsenEdgecut | LogKind::CoarsenTime => None,
    }
}
