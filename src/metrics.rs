//! Precision / recall / F1 over comparison partitions.

use crate::matching::Comparison;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Standard detection metrics, each in [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub precision: f64,
    pub recall: f64,
    #[serde(rename = "f1_score")]
    pub f1: f64,
}

impl Scores {
    /// Round to 4 decimals for serialized output.
    pub fn rounded(self) -> Self {
        Self {
            precision: round4(self.precision),
            recall: round4(self.recall),
            f1: round4(self.f1),
        }
    }
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// Compute detection metrics from partition counts. Degenerate
/// denominators yield 0.0 rather than an error.
pub fn score(tp: usize, fp: usize, fn_count: usize) -> Scores {
    let precision = if tp + fp > 0 {
        tp as f64 / (tp + fp) as f64
    } else {
        0.0
    };
    let recall = if tp + fn_count > 0 {
        tp as f64 / (tp + fn_count) as f64
    } else {
        0.0
    };
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };
    Scores {
        precision,
        recall,
        f1,
    }
}

/// Per-category partition counts with derived scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryScores {
    pub category: String,
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    #[serde(flatten)]
    pub scores: Scores,
}

/// Name of the synthetic row summing counts across all categories.
pub const OVERALL: &str = "Overall";

/// Group partitions by category (sorted) and score each group, then
/// append an `Overall` row computed from the summed counts — not an
/// average of the per-category scores.
pub fn by_category(comparison: &Comparison) -> Vec<CategoryScores> {
    let mut counts: BTreeMap<&str, (usize, usize, usize)> = BTreeMap::new();
    for tp in &comparison.true_positives {
        counts.entry(tp.category.as_str()).or_default().0 += 1;
    }
    for fp in &comparison.false_positives {
        counts.entry(fp.category.as_str()).or_default().1 += 1;
    }
    for fn_entry in &comparison.false_negatives {
        counts.entry(fn_entry.category.as_str()).or_default().2 += 1;
    }

    let mut rows: Vec<CategoryScores> = counts
        .iter()
        .map(|(category, &(tp, fp, fn_count))| CategoryScores {
            category: (*category).to_string(),
            true_positives: tp,
            false_positives: fp,
            false_negatives: fn_count,
            scores: score(tp, fp, fn_count),
        })
        .collect();

    let total_tp: usize = rows.iter().map(|r| r.true_positives).sum();
    let total_fp: usize = rows.iter().map(|r| r.false_positives).sum();
    let total_fn: usize = rows.iter().map(|r| r.false_negatives).sum();
    rows.push(CategoryScores {
        category: OVERALL.to_string(),
        true_positives: total_tp,
        false_positives: total_fp,
        false_negatives: total_fn,
        scores: score(total_tp, total_fp, total_fn),
    });

    rows
}
