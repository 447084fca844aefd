//! Derived values for comparison charts.
//!
//! Everything here is a pure function of merged records or tables. Nothing
//! mutates the underlying series.

use crate::merge::PerGraphRecord;
use crate::series::MetricKind;
use crate::table::MetricTable;
use serde::Serialize;
use std::collections::BTreeMap;

/// Stand-in for a baseline total of exactly zero.
pub const ZERO_BASELINE_EPSILON: f64 = 0.001;

/// Floor applied before taking `log10` of a sample.
pub const LOG_FLOOR: f64 = 1e-10;

#[derive(Debug)]
pub enum AggregateError {
    /// A source carries a different label set than the others; columns
    /// cannot be aligned safely.
    LabelMismatch {
        source: String,
        expected: Vec<String>,
        found: Vec<String>,
    },
}

impl std::fmt::Display for AggregateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregateError::LabelMismatch {
                source,
                expected,
                found,
            } => write!(
                f,
                "{source}: expected {} labels {expected:?}, found {} {found:?}",
                expected.len(),
                found.len()
            ),
        }
    }
}

impl std::error::Error for AggregateError {}

/// Time spent in each phase of a multilevel partitioner run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhaseTimes {
    pub coarsen: f64,
    pub initial: f64,
    pub uncoarsen: f64,
}

impl PhaseTimes {
    pub fn total(&self) -> f64 {
        self.coarsen + self.initial + self.uncoarsen
    }
}

/// Share of the total, in percent, per phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhaseBreakdown {
    pub coarsen_pct: f64,
    pub initial_pct: f64,
    pub uncoarsen_pct: f64,
}

/// Percentages of each phase. A zero total gives 0% for every phase.
pub fn phase_breakdown(times: &PhaseTimes) -> PhaseBreakdown {
    let total = times.total();
    let pct = |v: f64| if total > 0.0 { v / total * 100.0 } else { 0.0 };
    PhaseBreakdown {
        coarsen_pct: pct(times.coarsen),
        initial_pct: pct(times.initial),
        uncoarsen_pct: pct(times.uncoarsen),
    }
}

/// Speedup of every tool relative to `baseline`: `baseline_total / total`.
///
/// The baseline reads 1.0 and faster tools read above it. A baseline total
/// of zero is replaced by `ZERO_BASELINE_EPSILON`; a tool total of zero reads
/// 0 rather than infinity. Returns `None` when the baseline has no total.
pub fn baseline_speedups(
    totals: &BTreeMap<String, f64>,
    baseline: &str,
) -> Option<BTreeMap<String, f64>> {
    let mut reference = *totals.get(baseline)?;
    if reference == 0.0 {
        reference = ZERO_BASELINE_EPSILON;
    }
    Some(
        totals
            .iter()
            .map(|(tool, &t)| {
                let v = if t > 0.0 { reference / t } else { 0.0 };
                (tool.clone(), v)
            })
            .collect(),
    )
}

/// Heights of the three stacked phase segments for a normalized total.
pub fn stacked_segments(speedup: f64, breakdown: &PhaseBreakdown) -> PhaseTimes {
    PhaseTimes {
        coarsen: speedup * breakdown.coarsen_pct / 100.0,
        initial: speedup * breakdown.initial_pct / 100.0,
        uncoarsen: speedup * breakdown.uncoarsen_pct / 100.0,
    }
}

/// `log10` of each value, with non-positive values floored at `LOG_FLOOR`.
pub fn log10_clamped(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .map(|&v| {
            let v = if v > 0.0 { v } else { LOG_FLOOR };
            v.log10()
        })
        .collect()
}

/// Coarsening progress for one tool: (level time ms, edge weight) points.
///
/// Uses the prefix all time and edge series in the record share, with an
/// origin point `(0, first edge weight)` in front. `None` when the tool
/// lacks either series or the shared prefix is empty.
pub fn coarsening_trajectory(record: &PerGraphRecord, tool: &str) -> Option<Vec<(f64, f64)>> {
    let n = record.aligned_len(&[MetricKind::PhaseTime, MetricKind::EdgeCut]);
    let times = record.series(tool, MetricKind::PhaseTime)?.values();
    let cuts = record.series(tool, MetricKind::EdgeCut)?.values();
    if n == 0 {
        return None;
    }
    let mut points = Vec::with_capacity(n + 1);
    points.push((0.0, cuts[0]));
    points.extend(times.into_iter().zip(cuts).take(n));
    Some(points)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassGeomean {
    pub class: String,
    pub values: Vec<f64>,
}

/// Geometric-mean rows of every graph class, sharing one label set.
#[derive(Debug, Default, Serialize)]
pub struct GeomeanSummary {
    pub labels: Vec<String>,
    pub classes: Vec<ClassGeomean>,
    /// Classes whose table had no geometric-mean row.
    pub skipped: Vec<String>,
}

/// Collect the pre-aggregated geometric-mean row of each class table.
///
/// A class without a `row_label` row is skipped with a diagnostic. Every
/// class that does have one must carry the same labels as the first such
/// class, otherwise the result is a `LabelMismatch`. Empty cells read as 0.
pub fn class_geomeans(
    classes: &[(String, MetricTable)],
    row_label: &str,
) -> Result<GeomeanSummary, AggregateError> {
    let mut summary = GeomeanSummary::default();
    let mut labels: Option<&[String]> = None;

    for (class, table) in classes {
        let Some(row) = table.row(row_label) else {
            tracing::warn!(class = %class, row = row_label, "geometric-mean row not found, class skipped");
            summary.skipped.push(class.clone());
            continue;
        };
        match labels {
            None => labels = Some(table.columns.as_slice()),
            Some(expected) if expected != table.columns.as_slice() => {
                return Err(AggregateError::LabelMismatch {
                    source: class.clone(),
                    expected: expected.to_vec(),
                    found: table.columns.clone(),
                });
            }
            Some(_) => {}
        }
        summary.classes.push(ClassGeomean {
            class: class.clone(),
            values: row.cells.iter().map(|c| c.unwrap_or(0.0)).collect(),
        });
    }

    summary.labels = labels.map(<[String]>::to_vec).unwrap_or_default();
    Ok(summary)
}
