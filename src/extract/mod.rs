pub mod exhaustive;
pub mod hunyuan;
pub mod jet;
pub mod metis;

use crate::series::{MetricKind, MetricSeries, Sample, SeriesMap, ToolSeries};
use crate::tokenizer::{tokenize, PatternSet, Token};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which measurement a log file carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogKind {
    /// Edge weight sum per coarsening level.
    CoarsenEdgecut,
    /// Wall time per coarsening level.
    CoarsenTime,
    /// Edge-cut per initial-partitioning run.
    InitialEdgecut,
}

impl LogKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogKind::CoarsenEdgecut => "coarsen-edgecut",
            LogKind::CoarsenTime => "coarsen-time",
            LogKind::InitialEdgecut => "initial-edgecut",
        }
    }

    /// The comparison this log takes part in. Logs are only joined with
    /// logs of the same group.
    pub fn join_group(&self) -> JoinGroup {
        match self {
            LogKind::CoarsenEdgecut | LogKind::CoarsenTime => JoinGroup::Coarsening,
            LogKind::InitialEdgecut => JoinGroup::InitialPartition,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinGroup {
    Coarsening,
    InitialPartition,
}

/// The closed set of partitioner log formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolFormat {
    Hunyuan,
    Jet,
    Metis,
    Exhaustive,
}

impl ToolFormat {
    pub fn name(&self) -> &'static str {
        match self {
            ToolFormat::Hunyuan => "hunyuan",
            ToolFormat::Jet => "jet",
            ToolFormat::Metis => "metis",
            ToolFormat::Exhaustive => "exhaustive",
        }
    }

    /// Match a tool display name (case-insensitive) to its format.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "hunyuan" => Some(ToolFormat::Hunyuan),
            "jet" => Some(ToolFormat::Jet),
            "metis" => Some(ToolFormat::Metis),
            "exhaustive" => Some(ToolFormat::Exhaustive),
            _ => None,
        }
    }

    /// Grammar for this tool's `kind` log, if the tool emits one.
    pub fn grammar(&self, kind: LogKind) -> Option<LogGrammar> {
        match self {
            ToolFormat::Hunyuan => hunyuan::grammar(kind),
            ToolFormat::Jet => jet::grammar(kind),
            ToolFormat::Metis => metis::grammar(kind),
            ToolFormat::Exhaustive => exhaustive::grammar(kind),
        }
    }
}

/// Patterns plus the retention policy for one (tool, log kind) pair.
#[derive(Debug, Clone, Copy)]
pub struct LogGrammar {
    pub patterns: &'static PatternSet,
    /// Keep only the first `cap` samples of each completed series.
    pub cap: Option<usize>,
}

impl LogGrammar {
    pub fn uncapped(patterns: &'static PatternSet) -> Self {
        Self {
            patterns,
            cap: None,
        }
    }

    pub fn capped(patterns: &'static PatternSet, cap: usize) -> Self {
        Self {
            patterns,
            cap: Some(cap),
        }
    }
}

/// Errors produced while extracting a log.
#[derive(Debug)]
pub enum ExtractError {
    Io(std::io::Error),
    Unsupported { tool: ToolFormat, kind: LogKind },
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::Io(e) => write!(f, "I/O error: {e}"),
            ExtractError::Unsupported { tool, kind } => {
                write!(f, "{} does not emit {} logs", tool.name(), kind.as_str())
            }
        }
    }
}

impl std::error::Error for ExtractError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExtractError::Io(e) => Some(e),
            ExtractError::Unsupported { .. } => None,
        }
    }
}

impl From<std::io::Error> for ExtractError {
    fn from(e: std::io::Error) -> Self {
        ExtractError::Io(e)
    }
}

/// Extraction state while walking a log.
enum State {
    NoCurrentGraph,
    Accumulating { graph: String, buffer: Vec<Sample> },
}

/// Turn the lines of one log into completed per-graph series.
///
/// Samples before the first marker are dropped. A marker with no samples
/// before the next marker (or end of input) yields no entry at all. If the
/// same graph appears in several blocks, the last non-empty block wins.
pub fn extract_lines<'a, I>(lines: I, grammar: &LogGrammar) -> SeriesMap
where
    I: IntoIterator<Item = &'a str>,
{
    let kind = grammar.patterns.kind();
    let mut out = SeriesMap::new();
    let mut state = State::NoCurrentGraph;

    for line in lines {
        let sample = match tokenize(line, grammar.patterns) {
            Token::GraphMarker(graph) => {
                let previous = std::mem::replace(
                    &mut state,
                    State::Accumulating {
                        graph,
                        buffer: Vec::new(),
                    },
                );
                flush(previous, kind, grammar.cap, &mut out);
                continue;
            }
            Token::MetricSample { value, .. } => value,
            Token::PhaseTimeSample { millis, .. } => Sample::Float(millis),
            Token::NoMatch => continue,
        };
        if let State::Accumulating { buffer, .. } = &mut state {
            buffer.push(sample);
        }
    }

    flush(state, kind, grammar.cap, &mut out);
    out
}

fn flush(state: State, kind: MetricKind, cap: Option<usize>, out: &mut SeriesMap) {
    let State::Accumulating { graph, mut buffer } = state else {
        return;
    };
    if buffer.is_empty() {
        return;
    }
    if let Some(cap) = cap {
        buffer.truncate(cap);
    }
    out.insert(graph, MetricSeries::new(kind, buffer));
}

/// Read one log file in full and extract it with the tool's grammar.
///
/// Invalid UTF-8 is replaced rather than rejected; such lines simply fail
/// to match.
pub fn extract_file(
    path: &Path,
    tool: &str,
    format: ToolFormat,
    kind: LogKind,
) -> Result<ToolSeries, ExtractError> {
    let grammar = format
        .grammar(kind)
        .ok_or(ExtractError::Unsupported { tool: format, kind })?;
    let bytes = std::fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    let series = extract_lines(text.lines(), &grammar);

    tracing::debug!(
        tool,
        kind = kind.as_str(),
        path = %path.display(),
        graphs = series.len(),
        "extracted log"
    );

    Ok(ToolSeries {
        tool: tool.to_string(),
        kind: grammar.patterns.kind(),
        series,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn ints(series: &SeriesMap, graph: &str) -> Vec<u64> {
        series[graph]
            .samples
            .iter()
            .map(|s| match s {
                Sample::Int(v) => *v,
                Sample::Float(v) => *v as u64,
            })
            .collect()
    }

    #[test]
    fn two_graph_blocks() {
        let log = "\
graph: /data/foo.graph
level 0: nvtxs 10 adjwgtsum 100
level 1: nvtxs 6 adjwgtsum 80
graph: /data/bar.graph
level 0: nvtxs 4 adjwgtsum 50
";
        let grammar = ToolFormat::Hunyuan
            .grammar(LogKind::CoarsenEdgecut)
            .unwrap();
        let out = extract_lines(log.lines(), &grammar);
        assert_eq!(out.len(), 2);
        assert_eq!(ints(&out, "foo"), vec![100, 80]);
        assert_eq!(ints(&out, "bar"), vec![50]);
    }

    #[test]
    fn marker_followed_by_marker_yields_no_entry() {
        let log = "\
graph: /data/empty.graph
graph: /data/full.graph
level 0: adjwgtsum 7
graph: /data/trailing.graph
";
        let grammar = ToolFormat::Hunyuan
            .grammar(LogKind::CoarsenEdgecut)
            .unwrap();
        let out = extract_lines(log.lines(), &grammar);
        assert_eq!(out.keys().collect::<Vec<_>>(), vec!["full"]);
    }

    #[test]
    fn series_count_matches_markers_with_samples() {
        let log = "\
noise before anything
level 0: adjwgtsum 999
graph: /a.graph
level 0: adjwgtsum 1
graph: /b.graph
banner
graph: /c.graph
level 0: adjwgtsum 3
level 1: adjwgtsum 2
";
        let grammar = ToolFormat::Hunyuan
            .grammar(LogKind::CoarsenEdgecut)
            .unwrap();
        let out = extract_lines(log.lines(), &grammar);
        assert_eq!(out.len(), 2);
        assert_eq!(ints(&out, "a"), vec![1]);
        assert_eq!(ints(&out, "c"), vec![3, 2]);
    }

    #[test]
    fn repeated_graph_keeps_last_non_empty_block() {
        let log = "\
graph: /x.graph
level 0: adjwgtsum 1
graph: /x.graph
level 0: adjwgtsum 2
graph: /x.graph
";
        let grammar = ToolFormat::Hunyuan
            .grammar(LogKind::CoarsenEdgecut)
            .unwrap();
        let out = extract_lines(log.lines(), &grammar);
        assert_eq!(ints(&out, "x"), vec![2]);
    }

    #[test]
    fn cap_is_applied_after_collection() {
        let mut log = String::from("filename=/g/road_usa_cpu_1024.graph\n");
        for i in 0..9 {
            log.push_str(&format!("run {i} edgecut={}\n", 100 + i));
        }
        let grammar = ToolFormat::Metis.grammar(LogKind::InitialEdgecut).unwrap();
        let out = extract_lines(log.lines(), &grammar);
        assert_eq!(ints(&out, "road_usa"), vec![100, 101, 102, 103, 104]);
    }

    #[test]
    fn extract_file_reads_and_labels() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("jet_time.txt");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "Reading graph from /bench/cage15.graph").unwrap();
        writeln!(f, "level= 0 time= 1.5").unwrap();
        writeln!(f, "level= 1 time= 0.75").unwrap();
        drop(f);

        let out = extract_file(&path, "Jet", ToolFormat::Jet, LogKind::CoarsenTime).unwrap();
        assert_eq!(out.tool, "Jet");
        assert_eq!(out.kind, MetricKind::PhaseTime);
        assert_eq!(out.series["cage15"].values(), vec![1.5, 0.75]);
    }

    #[test]
    fn extract_file_missing_is_io_error() {
        let result = extract_file(
            Path::new("/nonexistent/log.txt"),
            "jet",
            ToolFormat::Jet,
            LogKind::CoarsenTime,
        );
        assert!(matches!(result, Err(ExtractError::Io(_))));
    }

    #[test]
    fn unsupported_pair_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.txt");
        std::fs::write(&path, "").unwrap();
        let result = extract_file(&path, "metis", ToolFormat::Metis, LogKind::CoarsenTime);
        assert!(matches!(result, Err(ExtractError::Unsupported { .. })));
    }

    #[test]
    fn format_from_name_ignores_case() {
        assert_eq!(ToolFormat::from_name("Jet"), Some(ToolFormat::Jet));
        assert_eq!(ToolFormat::from_name(" HUNYUAN "), Some(ToolFormat::Hunyuan));
        assert_eq!(ToolFormat::from_name("kaminpar"), None);
    }
}
