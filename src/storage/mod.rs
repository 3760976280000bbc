//! Storage layer for statistics tables.

pub mod csv;

// Re-export key types
pub use csv::{CODESIZE_HEADERS, CsvExporter, CsvTable, GRAPH_HEADERS};
