//! Comparison reporting: the JSON summary consumed by downstream tooling
//! and the human-readable console tables. Everything renders to a
//! `String` for stdout; nothing here touches the filesystem.

use crate::error::{Error, Result};
use crate::matching::{Comparison, MatchPolicy};
use crate::metrics::{self, CategoryScores, Scores};
use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfiguration {
    pub findings_dir: String,
    pub ground_truth: String,
    pub line_tolerance: u32,
    #[serde(default)]
    pub match_policy: MatchPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryCounts {
    pub total_findings: usize,
    pub total_ground_truth: usize,
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

/// The full result of one comparison run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub generated_at: String,
    pub configuration: SummaryConfiguration,
    pub counts: SummaryCounts,
    pub metrics: Scores,
    pub details: Comparison,
}

impl Summary {
    pub fn new(
        configuration: SummaryConfiguration,
        total_findings: usize,
        total_ground_truth: usize,
        details: Comparison,
    ) -> Self {
        let counts = SummaryCounts {
            total_findings,
            total_ground_truth,
            true_positives: details.true_positives.len(),
            false_positives: details.false_positives.len(),
            false_negatives: details.false_negatives.len(),
        };
        let metrics = metrics::score(
            counts.true_positives,
            counts.false_positives,
            counts.false_negatives,
        )
        .rounded();
        Self {
            generated_at: Utc::now().format("%Y-%m-%d %H:%M UTC").to_string(),
            configuration,
            counts,
            metrics,
            details,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::parse(format!("serialize summary: {e}")))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::parse(format!("parse summary: {e}")))
    }
}

const BANNER: &str = "============================================================";

/// Console banner summary, mirroring the layout downstream scripts grep.
pub fn render_summary(summary: &Summary) -> String {
    let mut out = String::new();
    out.push_str(BANNER);
    out.push_str("\nCOMPARISON SUMMARY\n");
    out.push_str(BANNER);
    out.push('\n');
    out.push_str(&format!(
        "Total Findings:        {}\n",
        summary.counts.total_findings
    ));
    out.push_str(&format!(
        "Total Ground Truth:    {}\n",
        summary.counts.total_ground_truth
    ));
    out.push_str(&format!(
        "\nTrue Positives (TP):   {}\n",
        summary.counts.true_positives
    ));
    out.push_str(&format!(
        "False Positives (FP):  {}\n",
        summary.counts.false_positives
    ));
    out.push_str(&format!(
        "False Negatives (FN):  {}\n",
        summary.counts.false_negatives
    ));
    out.push_str(&format!(
        "\nPrecision:             {:.2}%\n",
        summary.metrics.precision * 100.0
    ));
    out.push_str(&format!(
        "Recall:                {:.2}%\n",
        summary.metrics.recall * 100.0
    ));
    out.push_str(&format!(
        "F1 Score:              {:.4}\n",
        summary.metrics.f1
    ));
    out.push_str(BANNER);
    out
}

/// Per-category metrics table, `Overall` row last.
pub fn render_category_table(rows: &[CategoryScores]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<25} {:>5} {:>5} {:>5} {:>10} {:>8} {:>9}\n",
        "Category", "TP", "FP", "FN", "Precision", "Recall", "F1"
    ));
    out.push_str(&format!("{}\n", "-".repeat(71)));
    for row in rows {
        let scores = row.scores.rounded();
        out.push_str(&format!(
            "{:<25} {:>5} {:>5} {:>5} {:>10.4} {:>8.4} {:>9.4}\n",
            row.category,
            row.true_positives,
            row.false_positives,
            row.false_negatives,
            scores.precision,
            scores.recall,
            scores.f1,
        ));
    }
    out
}

/// How many FP/FN rows the verbose detail lists print before eliding.
const DETAIL_LIMIT: usize = 10;

/// Verbose FP/FN detail lists, capped at [`DETAIL_LIMIT`] rows each.
pub fn render_details(comparison: &Comparison) -> String {
    let mut out = String::new();
    let divider = "-".repeat(60);

    out.push_str(&format!(
        "{divider}\nFALSE POSITIVES (detected, but not in ground truth):\n{divider}\n"
    ));
    for fp in comparison.false_positives.iter().take(DETAIL_LIMIT) {
        out.push_str(&format!(
            "  {:<20} | {:<20} | Line {}\n",
            fp.artifact, fp.category, fp.line_number
        ));
    }
    if comparison.false_positives.len() > DETAIL_LIMIT {
        out.push_str(&format!(
            "  ... and {} more\n",
            comparison.false_positives.len() - DETAIL_LIMIT
        ));
    }

    out.push_str(&format!(
        "\n{divider}\nFALSE NEGATIVES (ground truth that was missed):\n{divider}\n"
    ));
    for fn_entry in comparison.false_negatives.iter().take(DETAIL_LIMIT) {
        out.push_str(&format!(
            "  {:<20} | {:<20} | Line {}\n",
            fn_entry.artifact, fn_entry.category, fn_entry.line_number
        ));
    }
    if comparison.false_negatives.len() > DETAIL_LIMIT {
        out.push_str(&format!(
            "  ... and {} more\n",
            comparison.false_negatives.len() - DETAIL_LIMIT
        ));
    }

    out
}
