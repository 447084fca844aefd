//! Cross-tool joins.
//!
//! Log extractions join on graph identifier by strict intersection: a graph
//! one source never reported is dropped, never defaulted, since a missing
//! series means the tool did not run on it. Pre-aggregated tables join the
//! same way on their row label, but cells missing after alignment read as 0.

use crate::series::{MetricKind, MetricSeries, ToolSeries};
use crate::table::MetricTable;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Every series each tool reported for one graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerGraphRecord {
    pub graph: String,
    pub tools: BTreeMap<String, BTreeMap<MetricKind, MetricSeries>>,
}

impl PerGraphRecord {
    pub fn series(&self, tool: &str, kind: MetricKind) -> Option<&MetricSeries> {
        self.tools.get(tool)?.get(&kind)
    }

    /// Shortest length among this record's series of the given kinds.
    ///
    /// Comparisons across tools only look at this many leading samples.
    /// Zero when the record holds no series of those kinds.
    pub fn aligned_len(&self, kinds: &[MetricKind]) -> usize {
        self.tools
            .values()
            .flat_map(|by_kind| by_kind.values())
            .filter(|s| kinds.contains(&s.kind))
            .map(MetricSeries::len)
            .min()
            .unwrap_or(0)
    }

    /// Copy with every series cut to the shortest length among its kind.
    pub fn aligned(&self) -> PerGraphRecord {
        let mut lens: BTreeMap<MetricKind, usize> = BTreeMap::new();
        for s in self.tools.values().flat_map(|by_kind| by_kind.values()) {
            let len = lens.entry(s.kind).or_insert(s.len());
            *len = (*len).min(s.len());
        }
        let tools = self
            .tools
            .iter()
            .map(|(tool, by_kind)| {
                let cut = by_kind
                    .iter()
                    .map(|(kind, s)| (*kind, s.prefix(lens[kind])))
                    .collect();
                (tool.clone(), cut)
            })
            .collect();
        PerGraphRecord {
            graph: self.graph.clone(),
            tools,
        }
    }
}

/// A requested graph that did not survive a join.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroppedGraph {
    pub graph: String,
    pub missing_from: Vec<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct MergeOutcome {
    pub records: Vec<PerGraphRecord>,
    pub dropped: Vec<DroppedGraph>,
}

/// Graphs to report: the caller's list without repeats, or every candidate
/// in sorted order when the list is empty.
fn requested<'a>(graphs_of_interest: &'a [String], candidates: &'a BTreeSet<&'a str>) -> Vec<&'a str> {
    if graphs_of_interest.is_empty() {
        return candidates.iter().copied().collect();
    }
    let mut seen = HashSet::new();
    graphs_of_interest
        .iter()
        .map(String::as_str)
        .filter(|g| seen.insert(*g))
        .collect()
}

/// Join extractions on graph identifier.
///
/// Every source is required. The output holds, in request order, the graphs
/// present in all of them; the rest are listed as dropped with the sources
/// that lacked them.
pub fn merge_series(sources: &[ToolSeries], graphs_of_interest: &[String]) -> MergeOutcome {
    if sources.is_empty() {
        return MergeOutcome::default();
    }

    let union: BTreeSet<&str> = sources
        .iter()
        .flat_map(|s| s.series.keys().map(String::as_str))
        .collect();

    let mut outcome = MergeOutcome::default();
    for graph in requested(graphs_of_interest, &union) {
        let missing_from: Vec<String> = sources
            .iter()
            .filter(|s| !s.series.contains_key(graph))
            .map(ToolSeries::source_label)
            .collect();
        if !missing_from.is_empty() {
            tracing::warn!(graph, missing = ?missing_from, "graph missing from some logs, dropped");
            outcome.dropped.push(DroppedGraph {
                graph: graph.to_string(),
                missing_from,
            });
            continue;
        }

        let mut tools: BTreeMap<String, BTreeMap<MetricKind, MetricSeries>> = BTreeMap::new();
        for source in sources {
            tools
                .entry(source.tool.clone())
                .or_default()
                .insert(source.kind, source.series[graph].clone());
        }
        outcome.records.push(PerGraphRecord {
            graph: graph.to_string(),
            tools,
        });
    }

    if outcome.records.is_empty() {
        tracing::warn!(sources = sources.len(), "no graph is present in every log");
    }
    outcome
}

/// One graph's row of a tool's aligned table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedRow {
    pub graph: String,
    pub values: Vec<f64>,
}

/// Tables of several tools reindexed onto the same rows and labels.
#[derive(Debug, Default, Serialize)]
pub struct TableMerge {
    pub labels: Vec<String>,
    pub graphs: Vec<String>,
    pub tools: BTreeMap<String, Vec<AlignedRow>>,
    pub dropped: Vec<DroppedGraph>,
}

impl TableMerge {
    pub fn value(&self, tool: &str, graph: &str, label: &str) -> Option<f64> {
        let col = self.labels.iter().position(|l| l == label)?;
        self.tools
            .get(tool)?
            .iter()
            .find(|r| r.graph == graph)
            .map(|r| r.values[col])
    }
}

/// Join tables on row label.
///
/// Each table is deduplicated first (first row and column occurrence wins).
/// Rows present in every table survive; each is reindexed onto `labels` with
/// missing cells read as 0. A `unit_baseline` tool, if given, is added with
/// every cell 1.0: it is the tool the tabulated speedups are relative to.
pub fn merge_tables(
    sources: &[(String, MetricTable)],
    labels: &[String],
    graphs_of_interest: &[String],
    unit_baseline: Option<&str>,
) -> TableMerge {
    let tables: Vec<(&str, MetricTable)> = sources
        .iter()
        .map(|(tool, t)| (tool.as_str(), t.deduplicated()))
        .collect();
    if tables.is_empty() {
        return TableMerge {
            labels: labels.to_vec(),
            ..Default::default()
        };
    }

    let union: BTreeSet<&str> = tables
        .iter()
        .flat_map(|(_, t)| t.rows.iter().map(|r| r.label.as_str()))
        .collect();

    let mut merged = TableMerge {
        labels: labels.to_vec(),
        ..Default::default()
    };
    for graph in requested(graphs_of_interest, &union) {
        let missing_from: Vec<String> = tables
            .iter()
            .filter(|(_, t)| t.row(graph).is_none())
            .map(|(tool, _)| tool.to_string())
            .collect();
        if missing_from.is_empty() {
            merged.graphs.push(graph.to_string());
        } else {
            tracing::warn!(graph, missing = ?missing_from, "graph missing from some tables, dropped");
            merged.dropped.push(DroppedGraph {
                graph: graph.to_string(),
                missing_from,
            });
        }
    }

    for (tool, table) in &tables {
        let rows = merged
            .graphs
            .iter()
            .map(|graph| AlignedRow {
                graph: graph.clone(),
                values: labels
                    .iter()
                    .map(|label| table.get(graph, label).unwrap_or(0.0))
                    .collect(),
            })
            .collect();
        merged.tools.insert(tool.to_string(), rows);
    }

    if let Some(baseline) = unit_baseline {
        let rows = merged
            .graphs
            .iter()
            .map(|graph| AlignedRow {
                graph: graph.clone(),
                values: vec![1.0; labels.len()],
            })
            .collect();
        merged.tools.insert(baseline.to_string(), rows);
    }

    if merged.graphs.is_empty() {
        tracing::warn!(tables = tables.len(), "no graph is present in every table");
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::{Sample, SeriesMap};

    fn source(tool: &str, kind: MetricKind, entries: &[(&str, &[u64])]) -> ToolSeries {
        let series: SeriesMap = entries
            .iter()
            .map(|(g, vals)| {
                (
                    g.to_string(),
                    MetricSeries::new(kind, vals.iter().map(|v| Sample::Int(*v)).collect()),
                )
            })
            .collect();
        ToolSeries {
            tool: tool.to_string(),
            kind,
            series,
        }
    }

    fn keys(outcome: &MergeOutcome) -> Vec<&str> {
        outcome.records.iter().map(|r| r.graph.as_str()).collect()
    }

    #[test]
    fn merge_keeps_only_intersection() {
        let a = source("A", MetricKind::EdgeCut, &[("foo", &[1, 2]), ("bar", &[3])]);
        let b = source("B", MetricKind::EdgeCut, &[("foo", &[9]), ("baz", &[4])]);
        let out = merge_series(&[a, b], &[]);
        assert_eq!(keys(&out), vec!["foo"]);
        let dropped: Vec<&str> = out.dropped.iter().map(|d| d.graph.as_str()).collect();
        assert_eq!(dropped, vec!["bar", "baz"]);
    }

    #[test]
    fn key_missing_from_one_of_three_sources_is_dropped() {
        let a = source("A", MetricKind::EdgeCut, &[("g1", &[1]), ("g2", &[1])]);
        let b = source("B", MetricKind::EdgeCut, &[("g1", &[1]), ("g2", &[1])]);
        let c = source("C", MetricKind::EdgeCut, &[("g1", &[1])]);
        let out = merge_series(&[a, b, c], &[]);
        assert_eq!(keys(&out), vec!["g1"]);
        assert_eq!(out.dropped[0].missing_from, vec!["C:edge_cut"]);
    }

    #[test]
    fn merge_follows_requested_order_and_ignores_repeats() {
        let a = source("A", MetricKind::EdgeCut, &[("x", &[1]), ("y", &[2]), ("z", &[3])]);
        let wanted = vec!["z".to_string(), "x".to_string(), "z".to_string(), "nope".to_string()];
        let out = merge_series(&[a], &wanted);
        assert_eq!(keys(&out), vec!["z", "x"]);
        assert_eq!(out.dropped.len(), 1);
        assert_eq!(out.dropped[0].graph, "nope");
    }

    #[test]
    fn same_tool_different_kinds_share_a_record() {
        let cut = source("jet", MetricKind::EdgeCut, &[("g", &[10, 8, 6])]);
        let time = source("jet", MetricKind::PhaseTime, &[("g", &[1, 1])]);
        let out = merge_series(&[cut, time], &[]);
        let rec = &out.records[0];
        assert_eq!(rec.tools.len(), 1);
        assert_eq!(rec.series("jet", MetricKind::EdgeCut).unwrap().len(), 3);
        assert_eq!(rec.series("jet", MetricKind::PhaseTime).unwrap().len(), 2);
    }

    #[test]
    fn aligned_truncates_to_shortest_of_each_kind() {
        let a = source("A", MetricKind::EdgeCut, &[("g", &[5, 4, 3, 2])]);
        let b = source("B", MetricKind::EdgeCut, &[("g", &[9, 8])]);
        let t = source("A", MetricKind::PhaseTime, &[("g", &[1, 1, 1])]);
        let rec = merge_series(&[a, b, t], &[]).records.remove(0);
        assert_eq!(rec.aligned_len(&[MetricKind::EdgeCut]), 2);
        assert_eq!(rec.aligned_len(&[MetricKind::EdgeCut, MetricKind::PhaseTime]), 2);
        assert_eq!(rec.aligned_len(&[MetricKind::InitialCut]), 0);

        let aligned = rec.aligned();
        assert_eq!(aligned.series("A", MetricKind::EdgeCut).unwrap().values(), vec![5.0, 4.0]);
        assert_eq!(aligned.series("A", MetricKind::PhaseTime).unwrap().len(), 3);
    }

    #[test]
    fn merge_of_nothing_is_empty() {
        let out = merge_series(&[], &["g".to_string()]);
        assert!(out.records.is_empty());
        assert!(out.dropped.is_empty());
    }

    fn table(csv: &str) -> MetricTable {
        MetricTable::from_reader("t", csv.as_bytes()).unwrap()
    }

    fn labels() -> Vec<String> {
        vec!["8-part".into(), "32-part".into()]
    }

    #[test]
    fn tables_join_on_row_label_and_zero_fill() {
        let jet = table("Graph Name,8-part,32-part\nwb-edu,2,3\ncage15,4,\nroad_usa,1,1\n");
        let hy = table("Graph Name,8-part\nwb-edu,5\ncage15,6\n");
        let m = merge_tables(&[("Jet".into(), jet), ("Hunyuan".into(), hy)], &labels(), &[], None);
        assert_eq!(m.graphs, vec!["cage15", "wb-edu"]);
        assert_eq!(m.value("Jet", "cage15", "32-part"), Some(0.0));
        assert_eq!(m.value("Hunyuan", "wb-edu", "32-part"), Some(0.0));
        assert_eq!(m.value("Hunyuan", "wb-edu", "8-part"), Some(5.0));
        assert_eq!(m.dropped.len(), 1);
        assert_eq!(m.dropped[0].missing_from, vec!["Hunyuan"]);
    }

    #[test]
    fn tables_drop_duplicates_before_joining() {
        let jet = table("Graph Name,8-part,8-part\nx,1,7\nx,2,2\n");
        let m = merge_tables(&[("Jet".into(), jet)], &labels(), &[], None);
        assert_eq!(m.value("Jet", "x", "8-part"), Some(1.0));
    }

    #[test]
    fn unit_baseline_reads_one_everywhere() {
        let jet = table("Graph Name,8-part,32-part\nx,2,3\n");
        let m = merge_tables(&[("Jet".into(), jet)], &labels(), &[], Some("Metis"));
        assert_eq!(m.value("Metis", "x", "8-part"), Some(1.0));
        assert_eq!(m.value("Metis", "x", "32-part"), Some(1.0));
    }
}
