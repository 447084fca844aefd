//! Pre-aggregated CSV tables.
//!
//! Tables have a header row, a graph-name index in the first column and one
//! numeric column per label (`8-part`, `32-part`, ...). Labels are matched
//! verbatim. Cells that are empty or not numbers read as missing.

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

#[derive(Debug)]
pub enum TableError {
    Io(std::io::Error),
    Csv(csv::Error),
    /// The header row has no index column.
    MissingIndex(String),
    /// A column the caller needs is not in the header.
    MissingColumn { table: String, column: String },
}

impl std::fmt::Display for TableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableError::Io(e) => write!(f, "I/O error: {e}"),
            TableError::Csv(e) => write!(f, "CSV error: {e}"),
            TableError::MissingIndex(table) => write!(f, "{table}: header has no index column"),
            TableError::MissingColumn { table, column } => {
                write!(f, "{table}: no column labelled {column:?}")
            }
        }
    }
}

impl std::error::Error for TableError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TableError::Io(e) => Some(e),
            TableError::Csv(e) => Some(e),
            TableError::MissingIndex(_) | TableError::MissingColumn { .. } => None,
        }
    }
}

impl From<std::io::Error> for TableError {
    fn from(e: std::io::Error) -> Self {
        TableError::Io(e)
    }
}

impl From<csv::Error> for TableError {
    fn from(e: csv::Error) -> Self {
        TableError::Csv(e)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub label: String,
    pub cells: Vec<Option<f64>>,
}

/// A numeric table indexed by row label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricTable {
    /// Where the table came from, for diagnostics.
    pub name: String,
    pub index_name: String,
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
}

impl MetricTable {
    pub fn from_reader<R: std::io::Read>(name: &str, reader: R) -> Result<Self, TableError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let mut header_iter = headers.iter();
        let index_name = header_iter
            .next()
            .ok_or_else(|| TableError::MissingIndex(name.to_string()))?
            .to_string();
        let columns: Vec<String> = header_iter.map(str::to_string).collect();

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            let Some(label) = record.get(0) else {
                continue;
            };
            if label.is_empty() {
                continue;
            }
            let cells = (1..=columns.len())
                .map(|i| record.get(i).and_then(parse_cell))
                .collect();
            rows.push(TableRow {
                label: label.to_string(),
                cells,
            });
        }

        Ok(Self {
            name: name.to_string(),
            index_name,
            columns,
            rows,
        })
    }

    /// Read a table file in full.
    pub fn read(path: &Path) -> Result<Self, TableError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(&path.display().to_string(), file)
    }

    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == label)
    }

    /// Position of each requested column, failing on the first one absent.
    pub fn require_columns(&self, labels: &[&str]) -> Result<Vec<usize>, TableError> {
        labels
            .iter()
            .map(|label| {
                self.column_index(label)
                    .ok_or_else(|| TableError::MissingColumn {
                        table: self.name.clone(),
                        column: label.to_string(),
                    })
            })
            .collect()
    }

    pub fn row(&self, label: &str) -> Option<&TableRow> {
        self.rows.iter().find(|r| r.label == label)
    }

    pub fn get(&self, row: &str, column: &str) -> Option<f64> {
        let col = self.column_index(column)?;
        self.row(row)?.cells.get(col).copied().flatten()
    }

    /// Drop repeated row and column labels; the first occurrence wins.
    pub fn deduplicated(&self) -> MetricTable {
        let mut seen_cols = HashSet::new();
        let keep_cols: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| seen_cols.insert(c.as_str()))
            .map(|(i, _)| i)
            .collect();

        let mut seen_rows = HashSet::new();
        let rows = self
            .rows
            .iter()
            .filter(|r| seen_rows.insert(r.label.as_str()))
            .map(|r| TableRow {
                label: r.label.clone(),
                cells: keep_cols.iter().map(|&i| r.cells[i]).collect(),
            })
            .collect();

        MetricTable {
            name: self.name.clone(),
            index_name: self.index_name.clone(),
            columns: keep_cols.iter().map(|&i| self.columns[i].clone()).collect(),
            rows,
        }
    }
}

fn parse_cell(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Position of the `<k>-part` column, appending it when new.
fn part_column(k: u32, columns: &mut Vec<String>) -> usize {
    let label = format!("{k}-part");
    match columns.iter().position(|c| *c == label) {
        Some(i) => i,
        None => {
            columns.push(label);
            columns.len() - 1
        }
    }
}

/// Pivot per-partition-count summaries into one `<k>-part` column table.
///
/// `parts` fixes the columns, one per partition count, whether or not a
/// table for it could be read. Each source holds one run at partition count
/// `k`; `value_column` is read from every source. Rows follow `order`: a
/// graph no source reports reads as a row of zeros, as does any missing cell.
/// When a source lists a graph more than once, its last row wins.
pub fn pivot_partition_counts(
    name: &str,
    parts: &[u32],
    sources: &[(u32, MetricTable)],
    value_column: &str,
    order: &[String],
) -> Result<MetricTable, TableError> {
    let mut columns: Vec<String> = Vec::new();
    for &k in parts {
        part_column(k, &mut columns);
    }

    let mut values: BTreeMap<(String, usize), f64> = BTreeMap::new();
    for (k, table) in sources {
        let col = part_column(*k, &mut columns);
        let idx = table.require_columns(&[value_column])?[0];
        for row in &table.rows {
            if let Some(v) = row.cells[idx] {
                values.insert((row.label.clone(), col), v);
            }
        }
    }

    let rows = order
        .iter()
        .map(|graph| TableRow {
            label: graph.clone(),
            cells: (0..columns.len())
                .map(|col| Some(values.get(&(graph.clone(), col)).copied().unwrap_or(0.0)))
                .collect(),
        })
        .collect();

    Ok(MetricTable {
        name: name.to_string(),
        index_name: "Graph Name".to_string(),
        columns,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(csv: &str) -> MetricTable {
        MetricTable::from_reader("test", csv.as_bytes()).unwrap()
    }

    #[test]
    fn reads_header_and_index() {
        let t = table("Graph Name,8-part,32-part\nwb-edu,1.5,2.5\ncage15,3,\n");
        assert_eq!(t.index_name, "Graph Name");
        assert_eq!(t.columns, vec!["8-part", "32-part"]);
        assert_eq!(t.get("wb-edu", "32-part"), Some(2.5));
        assert_eq!(t.get("cage15", "32-part"), None);
        assert_eq!(t.get("road_usa", "8-part"), None);
    }

    #[test]
    fn short_rows_read_as_missing() {
        let t = table("Graph Name,a,b\nx,1\n");
        assert_eq!(t.rows[0].cells, vec![Some(1.0), None]);
    }

    #[test]
    fn dedup_keeps_first_row_and_column() {
        let t = table("Graph Name,8-part,8-part,32-part\nx,1,2,3\nx,9,9,9\ny,4,5,6\n");
        let d = t.deduplicated();
        assert_eq!(d.columns, vec!["8-part", "32-part"]);
        assert_eq!(d.rows.len(), 2);
        assert_eq!(d.get("x", "8-part"), Some(1.0));
        assert_eq!(d.get("x", "32-part"), Some(3.0));
        assert_eq!(d.get("y", "32-part"), Some(6.0));
    }

    #[test]
    fn require_columns_reports_missing_label() {
        let t = table("Graph Name,Coarsen,Initial\nx,1,2\n");
        assert_eq!(t.require_columns(&["Initial"]).unwrap(), vec![1]);
        let err = t.require_columns(&["Coarsen", "Uncoarsen"]).unwrap_err();
        assert!(matches!(err, TableError::MissingColumn { column, .. } if column == "Uncoarsen"));
    }

    #[test]
    fn read_missing_file_is_io_error() {
        let err = MetricTable::read(Path::new("/nonexistent/table.csv")).unwrap_err();
        assert!(matches!(err, TableError::Io(_)));
    }

    #[test]
    fn pivot_builds_part_columns_in_order() {
        let k8 = table("Graph Name,Coarsen Time\nwb-edu,10\ncage15,20\ncage15,21\n");
        let k32 = table("Graph Name,Coarsen Time\nwb-edu,30\n");
        let order = vec!["cage15".to_string(), "wb-edu".to_string(), "road_usa".to_string()];
        let p = pivot_partition_counts(
            "hunyuan",
            &[8, 32],
            &[(8, k8), (32, k32)],
            "Coarsen Time",
            &order,
        )
        .unwrap();
        assert_eq!(p.columns, vec!["8-part", "32-part"]);
        let labels: Vec<&str> = p.rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["cage15", "wb-edu", "road_usa"]);
        assert_eq!(p.get("cage15", "8-part"), Some(21.0));
        assert_eq!(p.get("cage15", "32-part"), Some(0.0));
        assert_eq!(p.get("wb-edu", "32-part"), Some(30.0));
        assert_eq!(p.get("road_usa", "8-part"), Some(0.0));
    }

    #[test]
    fn pivot_keeps_columns_of_unread_sources() {
        let k8 = table("Graph Name,Coarsen Time\nwb-edu,10\n");
        let order = vec!["wb-edu".to_string()];
        let p = pivot_partition_counts("jet", &[8, 32, 128], &[(8, k8)], "Coarsen Time", &order)
            .unwrap();
        assert_eq!(p.columns, vec!["8-part", "32-part", "128-part"]);
        assert_eq!(p.get("wb-edu", "32-part"), Some(0.0));
        assert_eq!(p.get("wb-edu", "128-part"), Some(0.0));

        let empty = pivot_partition_counts("jet", &[8, 32], &[], "Coarsen Time", &order).unwrap();
        assert_eq!(empty.columns, vec!["8-part", "32-part"]);
        assert_eq!(empty.rows[0].cells, vec![Some(0.0), Some(0.0)]);
    }

    #[test]
    fn pivot_requires_value_column() {
        let k8 = table("Graph Name,Init Time\nwb-edu,10\n");
        let err = pivot_partition_counts("x", &[8], &[(8, k8)], "Coarsen Time", &[]).unwrap_err();
        assert!(matches!(err, TableError::MissingColumn { .. }));
    }
}
