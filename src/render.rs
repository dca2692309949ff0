// src/render.rs

use crate::ingest::PreviewTable;
use crate::report::CanonicalReport;

/// Cells wider than this are cut with an ellipsis.
const MAX_CELL_WIDTH: usize = 28;

pub fn preview_text(preview: &PreviewTable) -> String {
    if preview.columns.is_empty() || preview.total_rows == 0 {
        return "No preview available\n".to_string();
    }

    let headers: Vec<String> = preview
        .columns
        .iter()
        .map(|c| format!("{} ({})", c.key, c.kind))
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| display_width(h)).collect();
    for row in &preview.rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(display_width(cell));
            }
        }
    }

    let mut out = String::new();
    push_row(&mut out, &headers, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_row(&mut out, &rule, &widths);
    for row in &preview.rows {
        push_row(&mut out, row, &widths);
    }

    if preview.is_truncated() {
        let note = format!(
            "... showing {} of {} rows",
            preview.rows.len(),
            preview.total_rows
        );
        push_line(&mut out, &note);
    }
    out
}

fn display_width(text: &str) -> usize {
    text.chars().count().min(MAX_CELL_WIDTH)
}

fn clip(text: &str) -> String {
    if text.chars().count() <= MAX_CELL_WIDTH {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(MAX_CELL_WIDTH - 1).collect();
    clipped.push('…');
    clipped
}

fn push_row(out: &mut String, cells: &[String], widths: &[usize]) {
    let line: Vec<String> = widths
        .iter()
        .enumerate()
        .map(|(i, &w)| {
            let cell = cells.get(i).map(|c| clip(c)).unwrap_or_default();
            format!("{cell:<w$}")
        })
        .collect();
    push_line(out, line.join(" | ").trim_end());
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}

/// Scores print without a trailing `.0`.
pub fn format_score(score: f64) -> String {
    if score.fract() == 0.0 {
        format!("{score:.0}")
    } else {
        format!("{score:.1}")
    }
}

pub fn report_text(report: &CanonicalReport) -> String {
    let mut out = String::new();

    push_line(
        &mut out,
        &format!(
            "Overall readiness score: {}/100",
            format_score(report.overall_score)
        ),
    );
    for sub in &report.sub_scores {
        push_line(
            &mut out,
            &format!("  {:<20} {}%", sub.label, format_score(sub.score)),
        );
    }

    let coverage = &report.field_coverage;
    push_line(&mut out, "\nField coverage");
    push_line(
        &mut out,
        &format!("  Matched:       {}", list_or_none(&coverage.matched)),
    );
    let close: Vec<String> = coverage
        .close_matches
        .iter()
        .map(|m| format!("{} -> {}", m.from, m.to))
        .collect();
    push_line(&mut out, &format!("  Close matches: {}", list_or_none(&close)));
    push_line(
        &mut out,
        &format!("  Missing:       {}", list_or_none(&coverage.missing)),
    );

    let (passed, total) = report.rule_tally();
    push_line(&mut out, &format!("\nRule findings ({passed}/{total} passed)"));
    for finding in &report.rule_findings {
        let mark = if finding.passed { "PASS" } else { "FAIL" };
        let line = match &finding.detail {
            Some(detail) => format!("  [{mark}] {}: {detail}", finding.name),
            None => format!("  [{mark}] {}", finding.name),
        };
        push_line(&mut out, &line);
    }
    out
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::parse_table;
    use crate::report::normalize_report;
    use serde_json::json;

    #[test]
    fn test_preview_text_layout() {
        let table = parse_table("invoice_date,total_amount\n2025-01-01,10\n2025-01-02,12.5\n");
        let text = preview_text(&PreviewTable::build(&table, 1));
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "invoice_date (date) | total_amount (number)");
        assert!(lines[1].starts_with("-------------------"));
        assert_eq!(lines[2], "2025-01-01          | 10");
        assert_eq!(lines[3], "... showing 1 of 2 rows");
    }

    #[test]
    fn test_preview_text_empty() {
        let text = preview_text(&PreviewTable::build(&parse_table("id\n"), 20));
        assert_eq!(text, "No preview available\n");
    }

    #[test]
    fn test_long_cells_are_clipped() {
        let long = "x".repeat(40);
        let clipped = clip(&long);
        assert_eq!(clipped.chars().count(), MAX_CELL_WIDTH);
        assert!(clipped.ends_with('…'));
    }

    #[test]
    fn test_format_score() {
        assert_eq!(format_score(71.0), "71");
        assert_eq!(format_score(66.67), "66.7");
        assert_eq!(format_score(0.0), "0");
    }

    #[test]
    fn test_empty_report_text() {
        let text = report_text(&CanonicalReport::default());
        assert_eq!(
            text,
            "Overall readiness score: 0/100\n\
             \n\
             Field coverage\n\
             \x20 Matched:       none\n\
             \x20 Close matches: none\n\
             \x20 Missing:       none\n\
             \n\
             Rule findings (0/0 passed)\n"
        );
    }

    #[test]
    fn test_report_text() {
        let report = normalize_report(&json!({
            "scores": { "overall": 71, "coverage": 33, "data": 100, "rules": 80, "posture": 67 },
            "coverage": { "matched": ["invoice.id"], "close": [], "missing": ["...and more"] },
            "ruleFindings": [
                { "rule": "TOTALS_BALANCE", "ok": true },
                { "rule": "CURRENCY_ALLOWED", "ok": false, "detail": "EUR" }
            ]
        }))
        .unwrap();

        let text = report_text(&report);
        assert!(text.starts_with("Overall readiness score: 71/100\n"));
        assert!(text.contains("  Coverage             33%\n"));
        assert!(text.contains("  API Posture          67%\n"));
        assert!(text.contains("  Matched:       invoice.id\n"));
        assert!(text.contains("  Close matches: none\n"));
        assert!(text.contains("Rule findings (1/2 passed)"));
        assert!(text.contains("  [FAIL] CURRENCY_ALLOWED: EUR\n"));
        assert!(text.contains("  [PASS] TOTALS_BALANCE\n"));
    }
}
