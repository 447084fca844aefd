//! Batch pipeline: read every input once, extract, join, aggregate, and
//! write one JSON report.
//!
//! A missing input is a diagnostic, not a failure: the tool it belonged to
//! simply drops out of the joins. The run only aborts when every input of a
//! required category is missing, when a grammar is unknown, or when a table's
//! labels no longer match what the aggregation expects.

use crate::aggregate::{
    self, AggregateError, GeomeanSummary, PhaseBreakdown, PhaseTimes,
};
use crate::config::{ConfigError, PartlogConfig};
use crate::extract::{self, ExtractError, JoinGroup};
use crate::merge::{self, DroppedGraph, PerGraphRecord, TableMerge};
use crate::series::{MetricKind, ToolSeries};
use crate::table::{self, MetricTable, TableError};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

#[derive(Debug)]
pub enum PipelineError {
    Config(ConfigError),
    Extract(ExtractError),
    Table(TableError),
    Aggregate(AggregateError),
    /// Every input of a category was missing.
    NoSources(&'static str),
    Json(serde_json::Error),
    Io(std::io::Error),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Config(e) => write!(f, "config: {e}"),
            PipelineError::Extract(e) => write!(f, "extract: {e}"),
            PipelineError::Table(e) => write!(f, "table: {e}"),
            PipelineError::Aggregate(e) => write!(f, "aggregate: {e}"),
            PipelineError::NoSources(what) => write!(f, "every configured {what} input is missing"),
            PipelineError::Json(e) => write!(f, "JSON error: {e}"),
            PipelineError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Config(e) => Some(e),
            PipelineError::Extract(e) => Some(e),
            PipelineError::Table(e) => Some(e),
            PipelineError::Aggregate(e) => Some(e),
            PipelineError::Json(e) => Some(e),
            PipelineError::Io(e) => Some(e),
            PipelineError::NoSources(_) => None,
        }
    }
}

impl From<ConfigError> for PipelineError {
    fn from(e: ConfigError) -> Self {
        PipelineError::Config(e)
    }
}

impl From<ExtractError> for PipelineError {
    fn from(e: ExtractError) -> Self {
        PipelineError::Extract(e)
    }
}

impl From<TableError> for PipelineError {
    fn from(e: TableError) -> Self {
        PipelineError::Table(e)
    }
}

impl From<AggregateError> for PipelineError {
    fn from(e: AggregateError) -> Self {
        PipelineError::Aggregate(e)
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(e: serde_json::Error) -> Self {
        PipelineError::Json(e)
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(e: std::io::Error) -> Self {
        PipelineError::Io(e)
    }
}

/// (level time ms, edge weight) points of one tool's coarsening on one graph.
#[derive(Debug, Serialize)]
pub struct Trajectory {
    pub graph: String,
    pub tool: String,
    pub points: Vec<(f64, f64)>,
}

/// Initial-partition cuts of one tool on one graph, on a log10 scale.
#[derive(Debug, Serialize)]
pub struct InitialCutDistribution {
    pub graph: String,
    pub tool: String,
    pub log10_cuts: Vec<f64>,
}

#[derive(Debug, Serialize)]
pub struct ToolPhases {
    pub tool: String,
    pub times: PhaseTimes,
    pub total: f64,
    pub breakdown: PhaseBreakdown,
    /// Relative to the baseline tool; absent when the baseline has no phases.
    pub speedup: Option<f64>,
    pub segments: Option<PhaseTimes>,
}

#[derive(Debug, Serialize)]
pub struct GraphPhases {
    pub graph: String,
    pub tools: Vec<ToolPhases>,
}

/// What one log contributed.
#[derive(Debug, Serialize)]
pub struct SourceStatus {
    pub source: String,
    pub path: String,
    pub graphs: usize,
}

#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    pub logs: Vec<SourceStatus>,
    pub missing_inputs: Vec<String>,
}

impl RunSummary {
    fn missing(&mut self, what: &str, path: &Path, err: &dyn std::fmt::Display) {
        tracing::warn!(input = what, path = %path.display(), error = %err, "input missing, skipped");
        self.missing_inputs.push(path.display().to_string());
    }
}

/// The join of every log in one comparison group.
#[derive(Debug, Serialize)]
pub struct LogJoin {
    pub group: JoinGroup,
    /// Full series as extracted, for replay.
    pub graphs: Vec<PerGraphRecord>,
    /// The same records cut to the prefix every tool shares, per kind.
    pub aligned: Vec<PerGraphRecord>,
    pub dropped_graphs: Vec<DroppedGraph>,
}

/// Everything a run produces, in a stable order.
#[derive(Debug, Default, Serialize)]
pub struct Report {
    pub joins: Vec<LogJoin>,
    pub trajectories: Vec<Trajectory>,
    pub initial_cuts: Vec<InitialCutDistribution>,
    pub tables: Option<TableMerge>,
    pub pivots: Vec<MetricTable>,
    pub phases: Vec<GraphPhases>,
    pub geomeans: Option<GeomeanSummary>,
    pub summary: RunSummary,
}

/// Run the whole pipeline over the configured inputs.
pub fn run(config: &PartlogConfig) -> Result<Report, PipelineError> {
    let mut report = Report::default();

    for (group, extractions) in load_logs(config, &mut report.summary)? {
        let merged = merge::merge_series(&extractions, &config.pipeline.graphs);
        report.trajectories.extend(trajectories(&merged.records));
        report.initial_cuts.extend(initial_cuts(&merged.records));
        report.joins.push(LogJoin {
            group,
            aligned: merged.records.iter().map(PerGraphRecord::aligned).collect(),
            graphs: merged.records,
            dropped_graphs: merged.dropped,
        });
    }

    report.tables = merged_tables(config, &mut report.summary)?;
    report.pivots = pivots(config, &mut report.summary)?;
    report.phases = phases(config, &mut report.summary)?;
    report.geomeans = geomeans(config, &mut report.summary)?;

    tracing::info!(
        joins = report.joins.len(),
        graphs = report.joins.iter().map(|j| j.graphs.len()).sum::<usize>(),
        dropped = report.joins.iter().map(|j| j.dropped_graphs.len()).sum::<usize>(),
        missing_inputs = report.summary.missing_inputs.len(),
        "pipeline finished"
    );
    Ok(report)
}

/// Serialize the report, replacing any previous one.
pub fn write_report(report: &Report, path: &Path) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)?;
    tracing::info!(path = %path.display(), "report written");
    Ok(())
}

/// Extract every readable log, grouped by the comparison it belongs to.
fn load_logs(
    config: &PartlogConfig,
    summary: &mut RunSummary,
) -> Result<BTreeMap<JoinGroup, Vec<ToolSeries>>, PipelineError> {
    let mut extractions: BTreeMap<JoinGroup, Vec<ToolSeries>> = BTreeMap::new();
    for log in &config.logs {
        let format = log.resolved_format().ok_or(ConfigError::UnknownGrammar {
            tool: log.tool.clone(),
            kind: log.kind,
        })?;
        match extract::extract_file(&log.path, &log.tool, format, log.kind) {
            Ok(series) => {
                summary.logs.push(SourceStatus {
                    source: series.source_label(),
                    path: log.path.display().to_string(),
                    graphs: series.series.len(),
                });
                extractions
                    .entry(log.kind.join_group())
                    .or_default()
                    .push(series);
            }
            Err(ExtractError::Io(e)) => summary.missing("log", &log.path, &e),
            Err(e) => return Err(e.into()),
        }
    }
    if !config.logs.is_empty() && extractions.is_empty() {
        return Err(PipelineError::NoSources("log"));
    }
    Ok(extractions)
}

fn trajectories(records: &[PerGraphRecord]) -> Vec<Trajectory> {
    let mut out = Vec::new();
    for record in records {
        for tool in record.tools.keys() {
            let has_both = record.series(tool, MetricKind::PhaseTime).is_some()
                && record.series(tool, MetricKind::EdgeCut).is_some();
            if !has_both {
                continue;
            }
            match aggregate::coarsening_trajectory(record, tool) {
                Some(points) => out.push(Trajectory {
                    graph: record.graph.clone(),
                    tool: tool.clone(),
                    points,
                }),
                None => tracing::warn!(graph = %record.graph, tool = %tool, "no aligned coarsening levels"),
            }
        }
    }
    out
}

fn initial_cuts(records: &[PerGraphRecord]) -> Vec<InitialCutDistribution> {
    records
        .iter()
        .flat_map(|record| {
            record.tools.iter().filter_map(|(tool, by_kind)| {
                let series = by_kind.get(&MetricKind::InitialCut)?;
                Some(InitialCutDistribution {
                    graph: record.graph.clone(),
                    tool: tool.clone(),
                    log10_cuts: aggregate::log10_clamped(&series.values()),
                })
            })
        })
        .collect()
}

/// Read a table, treating an unreadable file as missing.
fn read_table(
    what: &str,
    path: &Path,
    summary: &mut RunSummary,
) -> Result<Option<MetricTable>, PipelineError> {
    match MetricTable::read(path) {
        Ok(t) => Ok(Some(t)),
        Err(TableError::Io(e)) => {
            summary.missing(what, path, &e);
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn merged_tables(
    config: &PartlogConfig,
    summary: &mut RunSummary,
) -> Result<Option<TableMerge>, PipelineError> {
    if config.tables.is_empty() {
        return Ok(None);
    }
    let mut sources = Vec::new();
    for source in &config.tables {
        if let Some(t) = read_table("table", &source.path, summary)? {
            sources.push((source.tool.clone(), t));
        }
    }
    if sources.is_empty() {
        return Err(PipelineError::NoSources("table"));
    }
    Ok(Some(merge::merge_tables(
        &sources,
        &config.table_labels.labels,
        &config.pipeline.graphs,
        config.table_labels.unit_baseline.as_deref(),
    )))
}

fn pivots(
    config: &PartlogConfig,
    summary: &mut RunSummary,
) -> Result<Vec<MetricTable>, PipelineError> {
    let mut out = Vec::new();
    for pivot in &config.pivots {
        let mut sources = Vec::new();
        for source in &pivot.sources {
            if let Some(t) = read_table("pivot source", &source.path, summary)? {
                sources.push((source.parts, t));
            }
        }
        let order: Vec<String> = if config.pipeline.graphs.is_empty() {
            sources
                .iter()
                .flat_map(|(_, t)| t.rows.iter().map(|r| r.label.clone()))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        } else {
            config.pipeline.graphs.clone()
        };
        let parts: Vec<u32> = pivot.sources.iter().map(|s| s.parts).collect();
        out.push(table::pivot_partition_counts(
            &pivot.tool,
            &parts,
            &sources,
            &pivot.value_column,
            &order,
        )?);
    }
    Ok(out)
}

fn phases(
    config: &PartlogConfig,
    summary: &mut RunSummary,
) -> Result<Vec<GraphPhases>, PipelineError> {
    if config.phases.is_empty() {
        return Ok(Vec::new());
    }
    let labels = config.phase_labels.as_labels();
    let label_refs: Vec<&str> = labels.iter().map(String::as_str).collect();

    let mut sources = Vec::new();
    let mut tools: Vec<String> = Vec::new();
    for source in &config.phases {
        let Some(t) = read_table("phase table", &source.path, summary)? else {
            continue;
        };
        if let Err(TableError::MissingColumn { .. }) = t.require_columns(&label_refs) {
            return Err(AggregateError::LabelMismatch {
                source: t.name.clone(),
                expected: labels.clone(),
                found: t.columns.clone(),
            }
            .into());
        }
        if !tools.contains(&source.tool) {
            tools.push(source.tool.clone());
        }
        sources.push((source.tool.clone(), t));
    }
    if sources.is_empty() {
        return Err(PipelineError::NoSources("phase table"));
    }

    let merged = merge::merge_tables(&sources, &labels, &config.pipeline.graphs, None);
    let baseline = config.pipeline.baseline.as_str();
    if !tools.iter().any(|t| t == baseline) {
        tracing::warn!(baseline, "baseline tool has no phase table, speedups omitted");
    }

    let mut out = Vec::new();
    for graph in &merged.graphs {
        let times: Vec<(&str, PhaseTimes)> = tools
            .iter()
            .map(|tool| {
                let at = |label: &str| merged.value(tool, graph, label).unwrap_or(0.0);
                (
                    tool.as_str(),
                    PhaseTimes {
                        coarsen: at(labels[0].as_str()),
                        initial: at(labels[1].as_str()),
                        uncoarsen: at(labels[2].as_str()),
                    },
                )
            })
            .collect();
        let totals: BTreeMap<String, f64> = times
            .iter()
            .map(|(tool, t)| (tool.to_string(), t.total()))
            .collect();
        let speedups = aggregate::baseline_speedups(&totals, baseline);

        let per_tool = times
            .into_iter()
            .map(|(tool, times)| {
                let breakdown = aggregate::phase_breakdown(&times);
                let speedup = speedups.as_ref().map(|s| s[tool]);
                ToolPhases {
                    tool: tool.to_string(),
                    total: times.total(),
                    times,
                    breakdown,
                    speedup,
                    segments: speedup.map(|s| aggregate::stacked_segments(s, &breakdown)),
                }
            })
            .collect();
        out.push(GraphPhases {
            graph: graph.clone(),
            tools: per_tool,
        });
    }
    Ok(out)
}

fn geomeans(
    config: &PartlogConfig,
    summary: &mut RunSummary,
) -> Result<Option<GeomeanSummary>, PipelineError> {
    let classes = config.geomean_classes()?;
    if classes.is_empty() {
        return Ok(None);
    }
    let mut tables = Vec::new();
    for class in classes {
        if let Some(t) = read_table("class table", &class.path, summary)? {
            tables.push((class.name, t));
        }
    }
    Ok(Some(aggregate::class_geomeans(
        &tables,
        &config.geomean.row_label,
    )?))
}
