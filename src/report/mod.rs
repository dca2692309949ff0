// src/report/mod.rs

mod normalize;

pub use normalize::{normalize_report, normalize_str, report_id};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One entry of the score breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubScore {
    pub label: String,
    pub score: f64,
}

/// A source column that nearly matched a required field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseMatch {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldCoverage {
    pub matched: Vec<String>,
    pub close_matches: Vec<CloseMatch>,
    pub missing: Vec<String>,
}

/// Outcome of one compliance rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleFinding {
    pub name: String,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// The single report shape handed to rendering. Every field is always
/// populated, falling back to zero or empty lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalReport {
    /// 0 to 100.
    pub overall_score: f64,
    pub sub_scores: Vec<SubScore>,
    pub field_coverage: FieldCoverage,
    pub rule_findings: Vec<RuleFinding>,
}

impl CanonicalReport {
    /// (passed, total) over the rule findings.
    pub fn rule_tally(&self) -> (usize, usize) {
        let passed = self.rule_findings.iter().filter(|r| r.passed).count();
        (passed, self.rule_findings.len())
    }
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Analysis response must be a JSON object, got {found}")]
    MalformedResponseShape { found: &'static str },

    #[error("Analysis response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}
