// src/ingest/columns.rs

use serde::Serialize;
use std::fmt;

/// Presentation hint for a preview column. Never used for parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Date,
    Number,
    Text,
}

impl ColumnType {
    pub fn as_str(self) -> &'static str {
        match self {
            ColumnType::Date => "date",
            ColumnType::Number => "number",
            ColumnType::Text => "text",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A column key together with its inferred presentation type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub key: String,
    pub kind: ColumnType,
}

impl Column {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        let kind = classify(&key);
        Self { key, kind }
    }
}

/// Classify a column by substring match on its key (case-sensitive).
pub fn classify(key: &str) -> ColumnType {
    if key.contains("date") {
        ColumnType::Date
    } else if key.contains("amount") || key.contains("total") {
        ColumnType::Number
    } else {
        ColumnType::Text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_invoice_headers() {
        let cases = vec![
            ("invoice_date", ColumnType::Date),
            ("total_amount", ColumnType::Number),
            ("grandTotal", ColumnType::Text),
            ("lineTotal", ColumnType::Text),
            ("total", ColumnType::Number),
            ("vat_amount", ColumnType::Number),
            ("vendor_name", ColumnType::Text),
            ("Date", ColumnType::Text),
        ];

        for (key, expected) in cases {
            assert_eq!(classify(key), expected, "Failed for {}", key);
        }
    }

    #[test]
    fn test_date_wins_over_amount() {
        assert_eq!(classify("amount_date"), ColumnType::Date);
    }

    #[test]
    fn test_column_labels() {
        let col = Column::new("issue_date");
        assert_eq!(col.key, "issue_date");
        assert_eq!(col.kind.to_string(), "date");
        assert_eq!(ColumnType::Number.as_str(), "number");
    }
}
