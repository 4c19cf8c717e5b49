//! Ground-truth loading: one CSV row per injected bug.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

/// A known defect: artifact + category + 1-based line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroundTruthEntry {
    pub artifact: String,
    pub category: String,
    pub line_number: usize,
}

/// Raw CSV row. Column names follow the injection logs
/// (`bug_id,contract,line,bug_type,approach`); extra columns are ignored
/// and every field is optional so row-level problems stay row-level.
#[derive(Debug, Deserialize)]
struct GroundTruthRow {
    #[serde(default)]
    contract: String,
    #[serde(default)]
    bug_type: String,
    #[serde(default)]
    line: String,
}

/// Load ground truth from a CSV file.
///
/// Rows with a missing artifact or category, or a non-positive or
/// unparseable line, are skipped with a warning — never errored.
/// Duplicate (artifact, category, line) tuples collapse to the first
/// occurrence, so the result is a set with a stable iteration order.
pub fn load(path: &Path) -> Result<Vec<GroundTruthEntry>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut entries: Vec<GroundTruthEntry> = Vec::new();
    let mut seen: HashSet<GroundTruthEntry> = HashSet::new();
    let mut skipped = 0usize;

    for (i, row) in reader.deserialize::<GroundTruthRow>().enumerate() {
        // +2: header row plus 1-based numbering
        let row_number = i + 2;
        let row = match row {
            Ok(r) => r,
            Err(e) => {
                warn!(row = row_number, error = %e, "skipping malformed ground truth row");
                skipped += 1;
                continue;
            }
        };

        let contract = row.contract.trim();
        // some injection logs carry UTF-7 artifacts in the category name
        let bug_type = row.bug_type.trim().replace("+AC0-", "-");
        let line = row.line.trim().parse::<i64>().unwrap_or(0);

        if contract.is_empty() || bug_type.is_empty() || line <= 0 {
            warn!(row = row_number, "skipping ground truth row with missing fields");
            skipped += 1;
            continue;
        }

        let entry = GroundTruthEntry {
            artifact: contract.to_string(),
            category: bug_type,
            line_number: line as usize,
        };
        if seen.insert(entry.clone()) {
            entries.push(entry);
        }
    }

    info!(
        entries = entries.len(),
        skipped,
        path = %path.display(),
        "ground truth loaded"
    );
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn load_csv(content: &str) -> Vec<GroundTruthEntry> {
        let dir = std::env::temp_dir().join(format!(
            "solscore-gt-{}-{:p}",
            std::process::id(),
            content.as_ptr()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("ground_truth.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        let entries = load(&path).unwrap();
        std::fs::remove_dir_all(&dir).ok();
        entries
    }

    #[test]
    fn loads_well_formed_rows() {
        let entries = load_csv(
            "bug_id,contract,line,bug_type,approach\n\
             1,buggy_1.sol,10,Re-entrancy,code snippet injection\n\
             2,buggy_2.sol,31,TOD,code snippet injection\n",
        );
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].artifact, "buggy_1.sol");
        assert_eq!(entries[0].category, "Re-entrancy");
        assert_eq!(entries[0].line_number, 10);
    }

    #[test]
    fn skips_rows_with_missing_fields() {
        let entries = load_csv(
            "bug_id,contract,line,bug_type\n\
             1,,10,Re-entrancy\n\
             2,buggy_1.sol,10,\n\
             3,buggy_1.sol,,Re-entrancy\n\
             4,buggy_1.sol,12,TOD\n",
        );
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].line_number, 12);
    }

    #[test]
    fn skips_non_positive_and_unparseable_lines() {
        let entries = load_csv(
            "bug_id,contract,line,bug_type\n\
             1,c.sol,0,TOD\n\
             2,c.sol,-4,TOD\n\
             3,c.sol,twelve,TOD\n\
             4,c.sol,9,TOD\n",
        );
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].line_number, 9);
    }

    #[test]
    fn duplicates_collapse_to_first_occurrence() {
        let entries = load_csv(
            "bug_id,contract,line,bug_type\n\
             1,c.sol,9,TOD\n\
             2,c.sol,9,TOD\n\
             3,c.sol,11,TOD\n",
        );
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].line_number, 9);
        assert_eq!(entries[1].line_number, 11);
    }

    #[test]
    fn encoding_artifacts_are_normalized() {
        let entries = load_csv(
            "bug_id,contract,line,bug_type\n\
             1,c.sol,5,Re+AC0-entrancy\n",
        );
        assert_eq!(entries[0].category, "Re-entrancy");
    }

    #[test]
    fn trims_whitespace() {
        let entries = load_csv(
            "bug_id,contract,line,bug_type\n\
             1,  c.sol ,  7 , TOD \n",
        );
        assert_eq!(entries[0].artifact, "c.sol");
        assert_eq!(entries[0].category, "TOD");
        assert_eq!(entries[0].line_number, 7);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load(Path::new("/nonexistent/ground_truth.csv")).is_err());
    }
}
