//! Candidate-to-truth correlation with a line-tolerance window.
//!
//! Truth entries are bucketed by (artifact, category) in input order and
//! consumed at most once. Candidates are processed in input order; a
//! candidate either consumes one in-tolerance truth entry (true positive)
//! or becomes a false positive. Truth entries left unconsumed become
//! false negatives. All bookkeeping lives inside one `compare` call, so
//! concurrent comparisons share nothing.

use crate::findings::Finding;
use crate::ground_truth::GroundTruthEntry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How a candidate picks among several unconsumed in-tolerance truth
/// entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchPolicy {
    /// First entry in bucket (truth) order wins, even when a later entry
    /// is a closer line match. Historical behavior; changing the default
    /// would silently alter long-standing metrics.
    #[default]
    FirstFit,
    /// Closest entry wins; bucket order breaks distance ties.
    Nearest,
}

impl std::fmt::Display for MatchPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FirstFit => write!(f, "first-fit"),
            Self::Nearest => write!(f, "nearest"),
        }
    }
}

/// A candidate that matched a truth entry within tolerance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TruePositive {
    pub artifact: String,
    pub category: String,
    pub found_line: usize,
    pub truth_line: usize,
    /// found_line - truth_line
    pub offset: i64,
}

/// An unmatched candidate (false positive) or truth entry (false
/// negative).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unmatched {
    pub artifact: String,
    pub category: String,
    pub line_number: usize,
}

/// The three disjoint partitions of one comparison run. Serialized field
/// names match the summary format consumed by downstream tooling.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Comparison {
    #[serde(rename = "TP")]
    pub true_positives: Vec<TruePositive>,
    #[serde(rename = "FP")]
    pub false_positives: Vec<Unmatched>,
    #[serde(rename = "FN")]
    pub false_negatives: Vec<Unmatched>,
}

/// Correlate candidates against ground truth with the historical
/// first-fit policy.
pub fn compare(candidates: &[Finding], truth: &[GroundTruthEntry], tolerance: u32) -> Comparison {
    compare_with_policy(candidates, truth, tolerance, MatchPolicy::FirstFit)
}

/// Correlate candidates against ground truth.
///
/// A truth entry matches at most one candidate and a candidate at most
/// one truth entry; matching never crosses (artifact, category) keys,
/// which compare by exact string equality.
pub fn compare_with_policy(
    candidates: &[Finding],
    truth: &[GroundTruthEntry],
    tolerance: u32,
    policy: MatchPolicy,
) -> Comparison {
    // buckets hold indices into `truth`, preserving truth order
    let mut buckets: HashMap<(&str, &str), Vec<usize>> = HashMap::new();
    for (i, entry) in truth.iter().enumerate() {
        buckets
            .entry((entry.artifact.as_str(), entry.category.as_str()))
            .or_default()
            .push(i);
    }
    let mut consumed = vec![false; truth.len()];
    let mut result = Comparison::default();

    for candidate in candidates {
        let key = (candidate.artifact.as_str(), candidate.category.as_str());
        let matched = buckets.get(&key).and_then(|bucket| {
            let in_window = |&i: &usize| {
                !consumed[i]
                    && line_distance(candidate.line_number, truth[i].line_number)
                        <= u64::from(tolerance)
            };
            match policy {
                MatchPolicy::FirstFit => bucket.iter().copied().find(|i| in_window(i)),
                MatchPolicy::Nearest => bucket
                    .iter()
                    .copied()
                    .filter(in_window)
                    .min_by_key(|&i| line_distance(candidate.line_number, truth[i].line_number)),
            }
        });

        match matched {
            Some(i) => {
                consumed[i] = true;
                result.true_positives.push(TruePositive {
                    artifact: candidate.artifact.clone(),
                    category: candidate.category.clone(),
                    found_line: candidate.line_number,
                    truth_line: truth[i].line_number,
                    offset: candidate.line_number as i64 - truth[i].line_number as i64,
                });
            }
            None => result.false_positives.push(Unmatched {
                artifact: candidate.artifact.clone(),
                category: candidate.category.clone(),
                line_number: candidate.line_number,
            }),
        }
    }

    for (i, entry) in truth.iter().enumerate() {
        if !consumed[i] {
            result.false_negatives.push(Unmatched {
                artifact: entry.artifact.clone(),
                category: entry.category.clone(),
                line_number: entry.line_number,
            });
        }
    }

    result
}

fn line_distance(a: usize, b: usize) -> u64 {
    (a as i64 - b as i64).unsigned_abs()
}
