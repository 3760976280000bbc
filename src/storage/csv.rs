//! CSV export for statistics tables.
//!
//! Every table is a flat list of rows with a deterministic column order.
//! Absent values are written as empty cells, never as zero.

use std::io::Write;
use std::path::Path;

use crate::BenchError;
use crate::stats::{CodeSizeTable, GraphShape, RuntimeTable};

/// Column headers of the code-size table.
pub const CODESIZE_HEADERS: &[&str] = &[
    "step",
    "asm_lines",
    "spills",
    "reloads",
    "size_ratio",
    "spill_delta",
    "reload_delta",
    "residual_nodes",
    "revealed_nodes",
];

/// Column headers of the graph-shape table.
pub const GRAPH_HEADERS: &[&str] = &[
    "unit",
    "nodes",
    "edges",
    "isolated",
    "components",
    "largest_component",
    "mean_density",
];

/// Anything that can be laid out as a header plus rows.
pub trait CsvTable {
    fn headers(&self) -> Vec<String>;
    fn rows(&self) -> Vec<Vec<String>>;
}

fn cell<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn cell_f(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.6}")).unwrap_or_default()
}

impl CsvTable for RuntimeTable {
    fn headers(&self) -> Vec<String> {
        let (mean, dev) = if self.normalized {
            ("speedup", "rel_stddev")
        } else {
            ("mean_ms", "stddev_ms")
        };
        let mut headers = vec!["binary".to_string()];
        headers.extend((0..self.step_count).map(|i| format!("{mean}_{i}")));
        headers.extend((0..self.step_count).map(|i| format!("{dev}_{i}")));
        headers
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                let mut out = vec![row.label.clone()];
                out.extend(row.means.iter().map(|m| cell_f(*m)));
                out.extend(row.stddevs.iter().map(|s| cell_f(*s)));
                out
            })
            .collect()
    }
}

impl CsvTable for CodeSizeTable {
    fn headers(&self) -> Vec<String> {
        CODESIZE_HEADERS.iter().map(|h| h.to_string()).collect()
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|r| {
                vec![
                    r.step.to_string(),
                    cell(r.asm_lines),
                    cell(r.spills),
                    cell(r.reloads),
                    cell_f(r.size_ratio),
                    cell(r.spill_delta),
                    cell(r.reload_delta),
                    cell(r.residual_nodes),
                    cell(r.revealed_nodes),
                ]
            })
            .collect()
    }
}

impl CsvTable for [GraphShape] {
    fn headers(&self) -> Vec<String> {
        GRAPH_HEADERS.iter().map(|h| h.to_string()).collect()
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.iter()
            .map(|s| {
                vec![
                    s.unit.clone(),
                    s.nodes.to_string(),
                    s.edges.to_string(),
                    s.isolated.to_string(),
                    s.components.to_string(),
                    s.largest_component.to_string(),
                    cell_f(s.mean_density()),
                ]
            })
            .collect()
    }
}

/// CSV exporter for statistics tables.
#[derive(Debug, Clone, Default)]
pub struct CsvExporter;

impl CsvExporter {
    pub fn new() -> Self {
        CsvExporter
    }

    /// Export a table to a CSV file, creating parent directories.
    pub fn export<T: CsvTable + ?Sized>(&self, table: &T, output: &Path) -> Result<(), BenchError> {
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| BenchError::Message(format!("failed to create directory: {e}")))?;
            }
        }

        let file = std::fs::File::create(output)
            .map_err(|e| BenchError::Message(format!("failed to create file: {e}")))?;

        self.export_to_writer(table, file)
    }

    /// Export a table to any writer implementing Write.
    pub fn export_to_writer<T: CsvTable + ?Sized, W: Write>(&self, table: &T, writer: W) -> Result<(), BenchError> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer
            .write_record(table.headers())
            .map_err(|e| BenchError::Message(format!("failed to write CSV headers: {e}")))?;

        for row in table.rows() {
            csv_writer
                .write_record(&row)
                .map_err(|e| BenchError::Message(format!("failed to write CSV row: {e}")))?;
        }

        csv_writer
            .flush()
            .map_err(|e| BenchError::Message(format!("failed to flush CSV writer: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CodeSizeRecord, InterferenceGraph, RuntimeRecord};

    fn render<T: CsvTable + ?Sized>(table: &T) -> String {
        let mut buf = Vec::new();
        CsvExporter::new().export_to_writer(table, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_runtime_csv_absent_cells_are_empty() {
        let records = vec![
            RuntimeRecord::new("harris", "", 0, 10.0, 1.0),
            RuntimeRecord::new("harris", "", 2, 8.0, 0.5),
        ];
        let table = RuntimeTable::build(&records, 3).unwrap();
        let csv = render(&table);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "binary,mean_ms_0,mean_ms_1,mean_ms_2,stddev_ms_0,stddev_ms_1,stddev_ms_2"
        );
        assert_eq!(
            lines.next().unwrap(),
            "harris,10.000000,,8.000000,1.000000,,0.500000"
        );
    }

    #[test]
    fn test_normalized_headers() {
        let records = vec![RuntimeRecord::new("harris", "", 0, 10.0, 1.0)];
        let table = RuntimeTable::build(&records, 2).unwrap().normalized();
        assert_eq!(table.headers()[1], "speedup_0");
        assert_eq!(table.headers()[3], "rel_stddev_0");
    }

    #[test]
    fn test_codesize_csv() {
        let records = vec![CodeSizeRecord {
            unit: "main".into(),
            step: 0,
            asm_lines: 40,
            spills: 3,
            reloads: 2,
        }];
        let table = CodeSizeTable::build(&records, 2, None).unwrap();
        let csv = render(&table);
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines[0], CODESIZE_HEADERS.join(","));
        assert_eq!(lines[1], "0,40,3,2,1.000000,0,0,,");
        assert_eq!(lines[2], "1,,,,,,,,");
    }

    #[test]
    fn test_graph_csv() {
        let graph = InterferenceGraph::from_edges([1, 2, 3], [(1, 2)]).unwrap();
        let shapes = vec![GraphShape::of("main.ll.0", &graph)];
        let csv = render(shapes.as_slice());
        assert!(csv.lines().nth(1).unwrap().starts_with("main.ll.0,3,1,1,1,2,1.000000"));
    }

    #[test]
    fn test_export_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("runtime.csv");
        let records = vec![RuntimeRecord::new("harris", "", 0, 10.0, 1.0)];
        let table = RuntimeTable::build(&records, 1).unwrap();
        CsvExporter::new().export(&table, &path).unwrap();
        assert!(path.exists());
    }
}
