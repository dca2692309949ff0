// src/ingest/tokenizer.rs

/// Default field separator for delimited invoice exports.
pub const COMMA: char = ',';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Normal,
    InQuotes,
}

/// Split one line of delimited text into its raw fields.
///
/// Quotes toggle quoting and are never emitted, except `""` inside a quoted
/// section which yields a single literal `"`. The delimiter only separates
/// fields outside quotes. There is no error state: an unterminated quote is
/// closed by the end of the line.
pub fn split_fields(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut state = ScanState::Normal;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match (state, ch) {
            (ScanState::Normal, '"') => state = ScanState::InQuotes,
            (ScanState::InQuotes, '"') => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    state = ScanState::Normal;
                }
            }
            (ScanState::Normal, c) if c == delimiter => {
                fields.push(std::mem::take(&mut current));
            }
            (_, c) => current.push(c),
        }
    }

    // Last field is flushed even when empty ("a," has two fields)
    fields.push(current);
    fields
}
