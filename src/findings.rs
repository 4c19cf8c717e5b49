//! Candidate findings: the normalized shape the match engine consumes,
//! plus the loaders that produce it from recovered model output and from
//! analyzed-result files on disk.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::{info, warn};
use walkdir::WalkDir;

/// Model-reported confidence tag. Ordered by strength so deduplication
/// can keep the strongest tag with a plain comparison; an absent tag
/// (`None`) sorts below all of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// A normalized candidate finding attributed to one artifact and category.
///
/// `line_number` is 1-based; records that fail positive-integer coercion
/// never construct a `Finding`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub artifact: String,
    pub category: String,
    pub line_number: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
    #[serde(default)]
    pub code_snippet: String,
}

/// One analyzed-result file: the envelope written per evaluated artifact,
/// with its loosely-typed finding records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzedArtifact {
    #[serde(default)]
    pub contract: String,
    #[serde(default)]
    pub bug_type: String,
    #[serde(default)]
    pub findings: Vec<Value>,
}

/// Coerce a line value to a strictly positive 1-based line number.
///
/// Accepts integers, floats, and numeric strings ("42", "42.0"); anything
/// else, and anything ≤ 0, is `None`.
pub fn coerce_line_number(value: &Value) -> Option<usize> {
    let as_int = match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i)
            } else {
                n.as_f64().map(|f| f as i64)
            }
        }
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            s.parse::<f64>().ok().map(|f| f as i64)
        }
        _ => None,
    };
    as_int.filter(|&i| i > 0).map(|i| i as usize)
}

fn parse_confidence(value: Option<&Value>) -> Option<Confidence> {
    match value?.as_str()?.trim().to_lowercase().as_str() {
        "high" => Some(Confidence::High),
        "medium" => Some(Confidence::Medium),
        "low" => Some(Confidence::Low),
        _ => None,
    }
}

/// Normalize raw finding records recovered from model output.
///
/// Records without a usable line number are dropped. A per-record
/// `bug_type` overrides the envelope category when present; confidence
/// and snippet default when missing. Input order is preserved — the match
/// engine's first-fit policy is order-sensitive.
pub fn normalize(artifact: &str, category: &str, raw_records: &[Value]) -> Vec<Finding> {
    let mut findings = Vec::with_capacity(raw_records.len());

    for record in raw_records {
        let Value::Object(obj) = record else {
            continue;
        };
        let Some(line_number) = obj.get("line_number").and_then(coerce_line_number) else {
            continue;
        };

        let category = obj
            .get("bug_type")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(category);
        let code_snippet = obj
            .get("code_snippet")
            .and_then(Value::as_str)
            .unwrap_or("")
            .trim()
            .to_string();

        findings.push(Finding {
            artifact: artifact.trim().to_string(),
            category: category.to_string(),
            line_number,
            confidence: parse_confidence(obj.get("confidence")),
            code_snippet,
        });
    }

    findings
}

/// Collapse duplicate findings on the same (artifact, category, line),
/// keeping the record with the strongest confidence tag. The first
/// occurrence keeps its position in the list.
pub fn dedup_by_line(findings: Vec<Finding>) -> Vec<Finding> {
    let mut out: Vec<Finding> = Vec::with_capacity(findings.len());

    for finding in findings {
        let existing = out.iter_mut().find(|e| {
            e.artifact == finding.artifact
                && e.category == finding.category
                && e.line_number == finding.line_number
        });
        match existing {
            Some(e) => {
                if finding.confidence > e.confidence {
                    *e = finding;
                }
            }
            None => out.push(finding),
        }
    }

    out
}

/// Walk a results directory and collect normalized findings from every
/// result file matching `extension`.
///
/// Files are visited in sorted order so repeated loads are stable.
/// Unreadable or unparseable files, and envelopes missing an artifact or
/// category, are skipped with a warning — they contribute zero findings.
pub fn load_findings_dir(dir: &Path, extension: &str) -> Vec<Finding> {
    let mut findings = Vec::new();
    let mut files = 0usize;

    for entry in WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !entry.file_type().is_file()
            || !path.to_string_lossy().ends_with(extension)
        {
            continue;
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "could not read result file, skipping");
                continue;
            }
        };
        let artifact: AnalyzedArtifact = match serde_json::from_str(&content) {
            Ok(a) => a,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "could not parse result file, skipping");
                continue;
            }
        };

        if artifact.contract.trim().is_empty() || artifact.bug_type.trim().is_empty() {
            warn!(file = %path.display(), "result file missing contract or bug_type, skipping");
            continue;
        }

        files += 1;
        findings.extend(normalize(
            &artifact.contract,
            &artifact.bug_type,
            &artifact.findings,
        ));
    }

    info!(
        files,
        findings = findings.len(),
        dir = %dir.display(),
        "loaded analyzed results"
    );
    findings
}
