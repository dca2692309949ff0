// src/report/normalize.rs

use super::{CanonicalReport, CloseMatch, FieldCoverage, ReportError, RuleFinding, SubScore};
use serde_json::{Map, Value, json};
use std::borrow::Cow;
use tracing::{debug, warn};

type Object = Map<String, Value>;

/// One place a canonical field may be read from.
enum Source {
    /// Nested key path from the response root.
    Path(&'static [&'static str]),
    /// Built from another part of the response.
    Derived(fn(&Object) -> Option<Value>),
}

use Source::{Derived, Path};

// ---------------------------------------------------------------------------
// Alias chains, tried in order. The first present, non-null candidate wins.
// ---------------------------------------------------------------------------

const OVERALL_SCORE: &[Source] = &[
    Path(&["overallScore"]),
    Path(&["overall_score"]),
    Path(&["scores", "overall"]),
];

const SUB_SCORES: &[Source] = &[
    Path(&["subScores"]),
    Path(&["sub_scores"]),
    Derived(sub_scores_from_breakdown),
];

const FIELD_COVERAGE: &[Source] = &[
    Path(&["fieldCoverage"]),
    Path(&["field_coverage"]),
    Derived(coverage_from_legacy),
];

const RULE_FINDINGS: &[Source] = &[Path(&["ruleFindings"]), Path(&["rule_findings"])];

const RULE_NAME: &[Source] = &[Path(&["rule"]), Path(&["name"])];

const RULE_PASSED: &[Source] = &[Path(&["ok"]), Path(&["passed"])];

const REPORT_ID: &[Source] = &[Path(&["reportId"]), Path(&["report_id"])];

/// Labels synthesized from a `scores` object, in display order.
const SCORE_BREAKDOWN: [(&str, &str); 4] = [
    ("Coverage", "coverage"),
    ("Data Quality", "data"),
    ("Rules Compliance", "rules"),
    ("API Posture", "posture"),
];

/// Map a decoded analysis response onto the canonical report.
///
/// Missing or renamed fields are absorbed by the alias chains above; only a
/// non-object input is an error.
pub fn normalize_report(response: &Value) -> Result<CanonicalReport, ReportError> {
    let Value::Object(root) = response else {
        return Err(ReportError::MalformedResponseShape {
            found: json_kind(response),
        });
    };

    let report = CanonicalReport {
        overall_score: field(root, "overallScore", OVERALL_SCORE, |v| {
            decode_score(v).map(clamp_score)
        }),
        sub_scores: field(root, "subScores", SUB_SCORES, decode_sub_scores),
        field_coverage: field(root, "fieldCoverage", FIELD_COVERAGE, decode_coverage),
        rule_findings: field(root, "ruleFindings", RULE_FINDINGS, decode_rule_findings),
    };

    debug!(
        overall = report.overall_score,
        sub_scores = report.sub_scores.len(),
        findings = report.rule_findings.len(),
        "Normalized analysis response"
    );
    Ok(report)
}

/// Parse response text and normalize it.
pub fn normalize_str(text: &str) -> Result<CanonicalReport, ReportError> {
    let value: Value = serde_json::from_str(text)?;
    normalize_report(&value)
}

/// Identifier of a stored report, if the response carries one.
pub fn report_id(response: &Value) -> Option<String> {
    let root = response.as_object()?;
    resolve(root, REPORT_ID).and_then(|v| as_text(&v))
}

fn resolve<'a>(root: &'a Object, sources: &[Source]) -> Option<Cow<'a, Value>> {
    sources.iter().find_map(|source| match source {
        Path(path) => lookup(root, path).map(Cow::Borrowed),
        Derived(build) => build(root).map(Cow::Owned),
    })
}

fn lookup<'a>(root: &'a Object, path: &[&str]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let mut current = root.get(*first)?;
    for key in rest {
        current = current.as_object()?.get(*key)?;
    }
    (!current.is_null()).then_some(current)
}

/// Resolve one canonical field, falling back to its default when nothing
/// matches or the match has an unusable shape.
fn field<T: Default>(
    root: &Object,
    name: &'static str,
    sources: &[Source],
    decode: impl Fn(&Value) -> Option<T>,
) -> T {
    let Some(value) = resolve(root, sources) else {
        return T::default();
    };
    decode(&*value).unwrap_or_else(|| {
        warn!(
            field = name,
            kind = json_kind(&value),
            "Unexpected shape in analysis response, using default"
        );
        T::default()
    })
}

// ---------------------------------------------------------------------------
// Derived sources
// ---------------------------------------------------------------------------

fn sub_scores_from_breakdown(root: &Object) -> Option<Value> {
    let scores = root.get("scores")?.as_object()?;
    let entries: Vec<Value> = SCORE_BREAKDOWN
        .iter()
        .map(|(label, key)| {
            let score = scores
                .get(*key)
                .filter(|v| !v.is_null())
                .cloned()
                .unwrap_or(json!(0));
            json!({ "label": label, "score": score })
        })
        .collect();
    Some(Value::Array(entries))
}

fn coverage_from_legacy(root: &Object) -> Option<Value> {
    let coverage = root.get("coverage")?.as_object()?;
    let member = |key: &str| {
        coverage
            .get(key)
            .filter(|v| !v.is_null())
            .cloned()
            .unwrap_or(json!([]))
    };
    Some(json!({
        "matched": member("matched"),
        "closeMatches": member("close"),
        "missing": member("missing"),
    }))
}

// ---------------------------------------------------------------------------
// Decoders
// ---------------------------------------------------------------------------

fn decode_score(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn clamp_score(score: f64) -> f64 {
    score.clamp(0.0, 100.0)
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn decode_sub_scores(value: &Value) -> Option<Vec<SubScore>> {
    let items = value.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|item| {
                let obj = item.as_object()?;
                let Some(label) = obj.get("label").and_then(as_text) else {
                    warn!("Dropping sub-score without a label");
                    return None;
                };
                let score = obj
                    .get("score")
                    .and_then(decode_score)
                    .map(clamp_score)
                    .unwrap_or(0.0);
                Some(SubScore { label, score })
            })
            .collect(),
    )
}

fn decode_coverage(value: &Value) -> Option<FieldCoverage> {
    let obj = value.as_object()?;

    let strings = |key: &str| -> Vec<String> {
        obj.get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(as_text).collect())
            .unwrap_or_default()
    };

    let close_matches = obj
        .get("closeMatches")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let pair = item.as_object()?;
                    Some(CloseMatch {
                        from: pair.get("from").and_then(as_text)?,
                        to: pair.get("to").and_then(as_text)?,
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Some(FieldCoverage {
        matched: strings("matched"),
        close_matches,
        missing: strings("missing"),
    })
}

fn decode_rule_findings(value: &Value) -> Option<Vec<RuleFinding>> {
    let items = value.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|item| {
                let obj = item.as_object()?;
                let Some(name) = resolve(obj, RULE_NAME).and_then(|v| as_text(&v)) else {
                    warn!("Dropping rule finding without a rule name");
                    return None;
                };
                let passed = resolve(obj, RULE_PASSED)
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false);
                let detail = obj
                    .get("detail")
                    .filter(|v| !v.is_null())
                    .and_then(as_text);
                Some(RuleFinding {
                    name,
                    passed,
                    detail,
                })
            })
            .collect(),
    )
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
