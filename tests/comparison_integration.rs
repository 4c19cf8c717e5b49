use solscore::matching::{self, MatchPolicy};
use solscore::metrics;
use solscore::report::{Summary, SummaryConfiguration};
use solscore::{findings, ground_truth};
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

#[test]
fn ground_truth_fixture_loads_as_ordered_set() {
    let truth = ground_truth::load(&fixture("ground_truth.csv")).unwrap();

    // 8 rows: one missing the contract, one with line 0, one duplicate
    assert_eq!(truth.len(), 5, "expected 5 usable unique entries");
    assert_eq!(truth[0].artifact, "buggy_1.sol");
    assert_eq!(truth[0].category, "Re-entrancy");
    assert_eq!(truth[0].line_number, 10);
    assert_eq!(truth[4].artifact, "buggy_3.sol");
    assert_eq!(truth[4].category, "Unchecked-Send");
}

#[test]
fn results_dir_fixture_loads_and_skips_bad_files() {
    let candidates = findings::load_findings_dir(&fixture("results"), ".sol.json");

    // buggy_1: 2 findings; buggy_2: 2 usable + 1 uncoercible line;
    // broken.sol.json and no_bug_type.sol.json contribute nothing
    assert_eq!(candidates.len(), 4);

    let lines: Vec<(&str, usize)> = candidates
        .iter()
        .map(|f| (f.artifact.as_str(), f.line_number))
        .collect();
    assert_eq!(
        lines,
        vec![
            ("buggy_1.sol", 11),
            ("buggy_1.sol", 55),
            ("buggy_2.sol", 31),
            ("buggy_2.sol", 33),
        ]
    );
}

#[test]
fn end_to_end_comparison_scores_the_fixture_corpus() {
    let truth = ground_truth::load(&fixture("ground_truth.csv")).unwrap();
    let candidates = findings::load_findings_dir(&fixture("results"), ".sol.json");

    let comparison = matching::compare(&candidates, &truth, 2);

    assert_eq!(comparison.true_positives.len(), 3);
    assert_eq!(comparison.false_positives.len(), 1);
    assert_eq!(comparison.false_negatives.len(), 2);

    // buggy_1 line 11 matched truth line 10 with offset +1
    let reentrancy_tp = comparison
        .true_positives
        .iter()
        .find(|tp| tp.artifact == "buggy_1.sol")
        .unwrap();
    assert_eq!(reentrancy_tp.truth_line, 10);
    assert_eq!(reentrancy_tp.offset, 1);

    // buggy_1 line 55 is far from every truth entry
    assert_eq!(comparison.false_positives[0].line_number, 55);

    // truth entries left over: buggy_1 Re-entrancy 24, buggy_3 Unchecked-Send 18
    let fn_lines: Vec<usize> = comparison
        .false_negatives
        .iter()
        .map(|u| u.line_number)
        .collect();
    assert_eq!(fn_lines, vec![24, 18]);

    // every candidate landed in exactly one partition, every truth entry too
    assert_eq!(
        comparison.true_positives.len() + comparison.false_positives.len(),
        candidates.len()
    );
    assert_eq!(
        comparison.true_positives.len() + comparison.false_negatives.len(),
        truth.len()
    );
}

#[test]
fn summary_metrics_and_breakdown_for_the_fixture_corpus() {
    let truth = ground_truth::load(&fixture("ground_truth.csv")).unwrap();
    let candidates = findings::load_findings_dir(&fixture("results"), ".sol.json");
    let comparison = matching::compare(&candidates, &truth, 2);

    let summary = Summary::new(
        SummaryConfiguration {
            findings_dir: "tests/fixtures/results".into(),
            ground_truth: "tests/fixtures/ground_truth.csv".into(),
            line_tolerance: 2,
            match_policy: MatchPolicy::FirstFit,
        },
        candidates.len(),
        truth.len(),
        comparison,
    );

    assert_eq!(summary.counts.total_findings, 4);
    assert_eq!(summary.counts.total_ground_truth, 5);
    assert_eq!(summary.metrics.precision, 0.75);
    assert_eq!(summary.metrics.recall, 0.6);
    assert_eq!(summary.metrics.f1, 0.6667);

    let rows = metrics::by_category(&summary.details);
    let names: Vec<&str> = rows.iter().map(|r| r.category.as_str()).collect();
    assert_eq!(names, vec!["Re-entrancy", "TOD", "Unchecked-Send", "Overall"]);

    let tod = &rows[1];
    assert_eq!(tod.true_positives, 2);
    assert_eq!(tod.false_positives, 0);
    assert_eq!(tod.false_negatives, 0);
    assert_eq!(tod.scores.f1, 1.0);

    let overall = rows.last().unwrap();
    assert_eq!(overall.true_positives, 3);
    assert_eq!(overall.false_positives, 1);
    assert_eq!(overall.false_negatives, 2);

    // the summary survives a JSON round trip unchanged
    let parsed = Summary::from_json(&summary.to_json().unwrap()).unwrap();
    assert_eq!(parsed.counts.true_positives, 3);
    assert_eq!(parsed.details.false_negatives.len(), 2);
}

#[test]
fn nearest_policy_changes_cluster_attribution_only() {
    let truth = ground_truth::load(&fixture("ground_truth.csv")).unwrap();
    let candidates = findings::load_findings_dir(&fixture("results"), ".sol.json");

    let first_fit = matching::compare_with_policy(&candidates, &truth, 2, MatchPolicy::FirstFit);
    let nearest = matching::compare_with_policy(&candidates, &truth, 2, MatchPolicy::Nearest);

    // on this corpus the policies agree on counts; the TOD cluster
    // (truth 31 and 32, candidates 31 and 33) pairs up either way
    assert_eq!(
        first_fit.true_positives.len(),
        nearest.true_positives.len()
    );
    assert_eq!(
        first_fit.false_negatives.len(),
        nearest.false_negatives.len()
    );
}
