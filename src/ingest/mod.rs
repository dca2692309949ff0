// src/ingest/mod.rs

mod columns;
mod preview;
mod tokenizer;

pub use columns::{Column, ColumnType, classify};
pub use preview::PreviewTable;
pub use tokenizer::{COMMA, split_fields};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Number, Value};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// One row of uploaded data. Key order follows the header (or the JSON
/// object order of the source), which `serde_json`'s `preserve_order`
/// feature keeps intact.
pub type Record = Map<String, Value>;

/// "optional minus, digits, optional fraction". ASCII digits only.
static NUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?[0-9]+(?:\.[0-9]+)?$").expect("numeric pattern is valid"));

/// A selected file's text and display name. Lives for one parse.
#[derive(Debug, Clone)]
pub struct RawFile {
    pub name: String,
    pub text: String,
}

impl RawFile {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    /// Read a file from disk as UTF-8 text.
    pub async fn load(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        info!(file = %name, bytes = text.len(), "Loaded input file");
        Ok(Self { name, text })
    }
}

/// Errors surfaced by the strict view over a parse result.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum IngestError {
    #[error("Input is neither a JSON array of objects nor delimited text with a header line")]
    UnparsableInput,

    #[error("Input has a header but no data rows")]
    NoDataRows,
}

/// Result of interpreting one file. The variant is decided once per input.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedTable {
    /// JSON array of objects, values kept as decoded.
    Structured(Vec<Record>),
    /// Delimited text. `columns` is the header (empty when the file had no
    /// non-blank line at all).
    Tabular {
        columns: Vec<String>,
        records: Vec<Record>,
    },
}

impl ParsedTable {
    pub fn records(&self) -> &[Record] {
        match self {
            ParsedTable::Structured(records) => records,
            ParsedTable::Tabular { records, .. } => records,
        }
    }

    pub fn into_records(self) -> Vec<Record> {
        match self {
            ParsedTable::Structured(records) => records,
            ParsedTable::Tabular { records, .. } => records,
        }
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    /// Column keys in display order. For JSON input these are the keys of
    /// the first record.
    pub fn columns(&self) -> Vec<String> {
        match self {
            ParsedTable::Structured(records) => records
                .first()
                .map(|r| r.keys().cloned().collect())
                .unwrap_or_default(),
            ParsedTable::Tabular { columns, .. } => columns.clone(),
        }
    }

    pub fn format(&self) -> &'static str {
        match self {
            ParsedTable::Structured(_) => "json",
            ParsedTable::Tabular { .. } => "delimited",
        }
    }

    /// Strict view: tells "nothing parseable" apart from "header, no rows".
    pub fn into_rows(self) -> Result<Vec<Record>, IngestError> {
        match self {
            ParsedTable::Tabular { columns, .. } if columns.is_empty() => {
                Err(IngestError::UnparsableInput)
            }
            table if table.is_empty() => Err(IngestError::NoDataRows),
            table => Ok(table.into_records()),
        }
    }
}

/// Interpret file text as a JSON array of objects, falling back to
/// comma-delimited text. Never fails; see [`ParsedTable::into_rows`].
pub fn parse_table(text: &str) -> ParsedTable {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    if let Some(records) = parse_structured(text) {
        info!(rows = records.len(), "Parsed input as JSON array");
        return ParsedTable::Structured(records);
    }

    let table = parse_delimited(text, COMMA);
    info!(
        rows = table.len(),
        columns = table.columns().len(),
        "Parsed input as delimited text"
    );
    table
}

fn parse_structured(text: &str) -> Option<Vec<Record>> {
    let value: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            debug!(error = %e, "Not JSON, trying delimited text");
            return None;
        }
    };

    let Value::Array(items) = value else {
        debug!("JSON input is not an array, trying delimited text");
        return None;
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect()
}

/// Parse delimited text with a header row.
pub fn parse_delimited(text: &str, delimiter: char) -> ParsedTable {
    let mut lines = text
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .filter(|l| !l.trim().is_empty());

    let Some(header_line) = lines.next() else {
        return ParsedTable::Tabular {
            columns: Vec::new(),
            records: Vec::new(),
        };
    };

    let header: Vec<String> = split_fields(header_line, delimiter)
        .into_iter()
        .enumerate()
        .map(|(i, cell)| {
            let cell = cell.trim();
            if cell.is_empty() {
                format!("col_{i}")
            } else {
                cell.to_string()
            }
        })
        .collect();

    let records: Vec<Record> = lines
        .map(|line| {
            let fields = split_fields(line, delimiter);
            let mut record = Record::new();
            for (i, key) in header.iter().enumerate() {
                let value = fields
                    .get(i)
                    .map(|f| coerce_value(f))
                    .unwrap_or_else(|| Value::String(String::new()));
                // Repeated header keys keep their first position, last value wins
                record.insert(key.clone(), value);
            }
            record
        })
        .collect();

    let mut columns: Vec<String> = Vec::with_capacity(header.len());
    for key in header {
        if !columns.contains(&key) {
            columns.push(key);
        }
    }

    ParsedTable::Tabular { columns, records }
}

/// Turn a numeric-looking field into a JSON number; anything else stays
/// the input string unchanged. `-0` becomes the integer `0`.
pub fn coerce_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    if NUMERIC.is_match(trimmed) {
        if let Ok(n) = trimmed.parse::<i64>() {
            return Value::from(n);
        }
        if let Some(n) = trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
            return Value::Number(n);
        }
    }
    Value::String(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keys(record: &Record) -> Vec<&str> {
        record.keys().map(|k| k.as_str()).collect()
    }

    #[test]
    fn test_json_array_is_returned_unchanged() {
        let text = r#"[{"id":"INV-1","total":10.5,"paid":true},{"id":"INV-2","total":3,"paid":false}]"#;
        let table = parse_table(text);

        let expected: Value = serde_json::from_str(text).unwrap();
        let Value::Array(expected) = expected else {
            panic!("fixture must be an array");
        };
        let expected: Vec<Record> = expected
            .into_iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect();

        assert_eq!(table, ParsedTable::Structured(expected));
        assert_eq!(table.format(), "json");
    }

    #[test]
    fn test_json_values_not_coerced() {
        let table = parse_table(r#"[{"amount":"12.50"}]"#);
        assert_eq!(table.records()[0]["amount"], json!("12.50"));
    }

    #[test]
    fn test_json_key_order_preserved() {
        let table = parse_table(r#"[{"zeta":1,"alpha":2,"mid":3}]"#);
        assert_eq!(keys(&table.records()[0]), vec!["zeta", "alpha", "mid"]);
        assert_eq!(table.columns(), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_json_array_with_scalar_falls_through() {
        let table = parse_table(r#"[{"a":1}, 2]"#);
        assert!(matches!(table, ParsedTable::Tabular { .. }));
    }

    #[test]
    fn test_json_object_falls_through() {
        let table = parse_table(r#"{"a":1}"#);
        assert!(matches!(table, ParsedTable::Tabular { .. }));
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_csv_rows_follow_header() {
        let text = "inv_no,issued_on,curr,grandTotal\nINV-1,2025-01-01,AED,105.00\nINV-2,2025-01-02,USD,42\n";
        let table = parse_table(text);

        assert_eq!(table.len(), 2);
        for record in table.records() {
            assert_eq!(keys(record), vec!["inv_no", "issued_on", "curr", "grandTotal"]);
        }
        assert_eq!(table.records()[0]["grandTotal"], json!(105.0));
        assert_eq!(table.records()[1]["grandTotal"], json!(42));
        assert_eq!(table.records()[0]["issued_on"], json!("2025-01-01"));
        assert_eq!(table.format(), "delimited");
    }

    #[test]
    fn test_crlf_and_blank_lines() {
        let text = "a,b\r\n\r\n   \r\n1,2\r\n\n3,4";
        let table = parse_table(text);
        assert_eq!(table.len(), 2);
        assert_eq!(table.records()[1]["a"], json!(3));
        assert_eq!(table.records()[1]["b"], json!(4));
    }

    #[test]
    fn test_header_trimmed_and_empty_cells_synthesized() {
        let table = parse_table(" id ,,name,\n1,x,y,z");
        assert_eq!(table.columns(), vec!["id", "col_1", "name", "col_3"]);
        assert_eq!(table.records()[0]["col_1"], json!("x"));
        assert_eq!(table.records()[0]["col_3"], json!("z"));
    }

    #[test]
    fn test_short_and_long_rows() {
        let table = parse_table("a,b,c\n1\n1,2,3,4,5");
        let short = &table.records()[0];
        assert_eq!(keys(short), vec!["a", "b", "c"]);
        assert_eq!(short["b"], json!(""));
        assert_eq!(short["c"], json!(""));

        let long = &table.records()[1];
        assert_eq!(keys(long), vec!["a", "b", "c"]);
        assert_eq!(long["c"], json!(3));
    }

    #[test]
    fn test_quoted_fields_in_rows() {
        let table = parse_table("name,note\n\"Acme, Inc\",\"say \"\"hi\"\"\"");
        assert_eq!(table.records()[0]["name"], json!("Acme, Inc"));
        assert_eq!(table.records()[0]["note"], json!("say \"hi\""));
    }

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(coerce_value("12.50"), json!(12.5));
        assert_eq!(coerce_value("-3"), json!(-3));
        assert_eq!(coerce_value(" 7 "), json!(7));
        assert_eq!(coerce_value("12a"), json!("12a"));
        assert_eq!(coerce_value("1e5"), json!("1e5"));
        assert_eq!(coerce_value(".5"), json!(".5"));
        assert_eq!(coerce_value("5."), json!("5."));
        assert_eq!(coerce_value("+5"), json!("+5"));
        assert_eq!(coerce_value(""), json!(""));
        // Negative zero collapses to the integer 0
        assert_eq!(coerce_value("-0"), json!(0));
        assert!(coerce_value("-0").is_i64());
    }

    #[test]
    fn test_huge_integer_becomes_float() {
        let value = coerce_value("123456789012345678901234");
        assert!(value.is_f64());
    }

    #[test]
    fn test_empty_text_is_empty_sequence() {
        let table = parse_table("");
        assert!(table.is_empty());
        assert!(table.columns().is_empty());

        let table = parse_table("\n  \r\n\t\n");
        assert!(table.is_empty());
    }

    #[test]
    fn test_strict_view_distinguishes_empty_from_header_only() {
        assert_eq!(parse_table("").into_rows(), Err(IngestError::UnparsableInput));

        let header_only = parse_table("inv_no,total\n");
        assert_eq!(header_only.columns(), vec!["inv_no", "total"]);
        assert_eq!(header_only.into_rows(), Err(IngestError::NoDataRows));

        assert_eq!(parse_table("[]").into_rows(), Err(IngestError::NoDataRows));

        let rows = parse_table("a\n1").into_rows().unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_duplicate_header_keys() {
        let table = parse_table("a,b,a\n1,2,3");
        assert_eq!(table.columns(), vec!["a", "b"]);
        assert_eq!(keys(&table.records()[0]), vec!["a", "b"]);
        assert_eq!(table.records()[0]["a"], json!(3));
    }

    #[test]
    fn test_byte_order_mark_stripped() {
        let table = parse_table("\u{feff}id,total\nINV-1,5");
        assert_eq!(table.columns(), vec!["id", "total"]);

        let table = parse_table("\u{feff}[{\"id\":1}]");
        assert!(matches!(table, ParsedTable::Structured(_)));
    }

    #[tokio::test]
    async fn test_load_raw_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invoices.csv");
        std::fs::write(&path, "id\n1\n").unwrap();

        let file = RawFile::load(&path).await.unwrap();
        assert_eq!(file.name, "invoices.csv");
        assert_eq!(parse_table(&file.text).len(), 1);
    }
}
