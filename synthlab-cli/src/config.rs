//! Serializable run configuration for the CLI.
//!
//! A TOML file carries the data request and model settings for repeated
//! runs; command-line flags override individual values.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Complete run configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    pub data: DataSection,

    #[serde(default)]
    pub model: ModelSection,
}

/// `[data]` — what to fetch or load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataSection {
    #[serde(default)]
    pub tickers: Vec<String>,

    /// Start date, YYYY-MM-DD.
    pub start: Option<String>,

    /// End date, YYYY-MM-DD.
    pub end: Option<String>,

    /// Resampling frequency: business, weekly, or monthly.
    pub freq: Option<String>,

    /// CSV cache file; when set, data is served from it.
    pub cache: Option<PathBuf>,
}

/// `[model]` — VAR settings for `simulate`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelSection {
    #[serde(default = "default_order")]
    pub order: usize,

    #[serde(default)]
    pub seed: u64,
}

fn default_order() -> usize {
    2
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            order: default_order(),
            seed: 0,
        }
    }
}

impl RunConfig {
    /// Load a run config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("read config file: {e}"))?;
        Self::from_toml(&content)
    }

    /// Parse a run config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("parse run config TOML: {e}"))
    }
}
