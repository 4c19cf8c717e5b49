use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use solscore::config::Config;
use solscore::matching::{self, MatchPolicy};
use solscore::report::{self, Summary, SummaryConfiguration};
use solscore::{findings, ground_truth, metrics, recovery};

#[derive(Parser)]
#[command(
    name = "solscore",
    about = "Benchmark scoring for LLM vulnerability detection — finding recovery + ground-truth comparison"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Compare analyzed-result files against a ground-truth CSV and print
    /// the scored summary
    Compare {
        /// Ground truth CSV path (columns: contract, line, bug_type)
        #[arg(long)]
        ground_truth: PathBuf,

        /// Directory of analyzed-result JSON files
        #[arg(long, default_value = "tool_results/LLM/analyzed_buggy_contracts")]
        findings_dir: PathBuf,

        /// Line tolerance for matching (overrides config)
        #[arg(short, long)]
        tolerance: Option<u32>,

        /// Match policy override: first-fit, nearest
        #[arg(long)]
        policy: Option<String>,

        /// Collapse duplicate findings per line, keeping the strongest
        /// confidence, before matching
        #[arg(long)]
        dedup: bool,

        /// Print the full summary as JSON instead of the console report
        #[arg(long)]
        json: bool,

        /// Print FP/FN detail lists
        #[arg(short, long)]
        verbose: bool,

        /// Path to config file
        #[arg(short, long, default_value = "solscore.toml")]
        config: PathBuf,
    },

    /// Run the recovery parser over a raw model-output file and print the
    /// recovered object
    Recover {
        /// Path to the raw model output
        path: PathBuf,
    },

    /// Print the per-category metrics table for a previously captured
    /// summary JSON
    Breakdown {
        /// Path to a summary produced by `compare --json`
        path: PathBuf,
    },
}

fn parse_policy(raw: &str) -> MatchPolicy {
    match raw {
        "nearest" => MatchPolicy::Nearest,
        _ => MatchPolicy::FirstFit,
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "solscore=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Compare {
            ground_truth: ground_truth_path,
            findings_dir,
            tolerance,
            policy,
            dedup,
            json,
            verbose,
            config,
        } => {
            let cfg = Config::load(&config).unwrap_or_default();
            let tolerance = tolerance.unwrap_or(cfg.comparison.line_tolerance);
            let policy = policy
                .as_deref()
                .map(parse_policy)
                .unwrap_or(cfg.comparison.match_policy);

            let truth = ground_truth::load(&ground_truth_path)?;
            let mut candidates =
                findings::load_findings_dir(&findings_dir, &cfg.results.extension);
            if dedup {
                candidates = findings::dedup_by_line(candidates);
            }

            let comparison =
                matching::compare_with_policy(&candidates, &truth, tolerance, policy);
            let summary = Summary::new(
                SummaryConfiguration {
                    findings_dir: findings_dir.display().to_string(),
                    ground_truth: ground_truth_path.display().to_string(),
                    line_tolerance: tolerance,
                    match_policy: policy,
                },
                candidates.len(),
                truth.len(),
                comparison,
            );

            if json {
                println!("{}", summary.to_json()?);
            } else {
                println!("{}", report::render_summary(&summary));
                println!();
                println!(
                    "{}",
                    report::render_category_table(&metrics::by_category(&summary.details))
                );
                if verbose {
                    println!("{}", report::render_details(&summary.details));
                }
            }
            Ok(())
        }
        Command::Recover { path } => {
            let text = std::fs::read_to_string(&path)?;
            let recovered = recovery::recover(&text);
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::Value::Object(recovered))?
            );
            Ok(())
        }
        Command::Breakdown { path } => {
            let summary = Summary::from_json(&std::fs::read_to_string(&path)?)?;
            println!(
                "{}",
                report::render_category_table(&metrics::by_category(&summary.details))
            );
            Ok(())
        }
    }
}
