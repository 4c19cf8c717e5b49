use crate::error::{Error, Result};
use crate::matching::MatchPolicy;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub comparison: ComparisonConfig,
    #[serde(default)]
    pub results: ResultsConfig,
}

/// Caller-supplied comparison settings. The tolerance default mirrors the
/// historical CLI default; the engine itself always takes tolerance as a
/// parameter.
#[derive(Debug, Deserialize)]
pub struct ComparisonConfig {
    #[serde(default = "default_line_tolerance")]
    pub line_tolerance: u32,
    #[serde(default)]
    pub match_policy: MatchPolicy,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            line_tolerance: default_line_tolerance(),
            match_policy: MatchPolicy::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ResultsConfig {
    /// Suffix of analyzed-result files inside the results directory.
    #[serde(default = "default_extension")]
    pub extension: String,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            extension: default_extension(),
        }
    }
}

// Defaults
fn default_line_tolerance() -> u32 {
    2
}
fn default_extension() -> String {
    ".sol.json".into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            comparison: ComparisonConfig::default(),
            results: ResultsConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Failed to read config {}: {e}", path.display())))?;
        toml::from_str(&content).map_err(|e| Error::config(format!("Failed to parse config: {e}")))
    }
}
