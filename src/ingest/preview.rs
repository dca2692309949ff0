// src/ingest/preview.rs

use super::{Column, ParsedTable};
use serde_json::Value;

/// What the upload step shows: typed column headers and the first few rows
/// rendered as text.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewTable {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<String>>,
    /// Row count of the whole file, not just the shown prefix.
    pub total_rows: usize,
}

impl PreviewTable {
    pub fn build(table: &ParsedTable, limit: usize) -> Self {
        let keys = table.columns();
        let rows = table
            .records()
            .iter()
            .take(limit)
            .map(|record| {
                keys.iter()
                    .map(|k| record.get(k).map(cell_text).unwrap_or_default())
                    .collect()
            })
            .collect();

        Self {
            columns: keys.into_iter().map(Column::new).collect(),
            rows,
            total_rows: table.len(),
        }
    }

    pub fn is_truncated(&self) -> bool {
        self.rows.len() < self.total_rows
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
