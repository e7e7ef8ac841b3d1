//! Configuration loading for dockeval.
//! Reads dockeval.toml from an explicit path, the path in DOCKEVAL_CONFIG, or
//! the current directory. Every field has a default, so a missing file is fine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_ENV: &str = "DOCKEVAL_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "dockeval.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub docking: DockingConfig,
    #[serde(default)]
    pub pocket: PocketConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_input")]
    pub input: PathBuf,
    #[serde(default = "default_predictions")]
    pub predictions: PathBuf,
    #[serde(default = "default_results")]
    pub results: PathBuf,
}

fn default_input()       -> PathBuf { PathBuf::from("input") }
fn default_predictions() -> PathBuf { PathBuf::from("diffdock/results") }
fn default_results()     -> PathBuf { PathBuf::from("results") }

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input: default_input(),
            predictions: default_predictions(),
            results: default_results(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockingConfig {
    #[serde(default = "default_engine")]
    pub executable: PathBuf,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_exhaustiveness")]
    pub exhaustiveness: u32,
    #[serde(default = "default_cnn_scoring")]
    pub cnn_scoring: String,
    #[serde(default = "default_num_modes")]
    pub num_modes: u32,
    #[serde(default = "default_verbosity")]
    pub verbosity: u32,
    #[serde(default)]
    pub cpus: Option<u32>,
}

fn default_engine()         -> PathBuf { PathBuf::from("gnina") }
fn default_seed()           -> u64     { 666 }
fn default_exhaustiveness() -> u32     { 32 }
fn default_cnn_scoring()    -> String  { "rescore".to_string() }
fn default_num_modes()      -> u32     { 9 }
fn default_verbosity()      -> u32     { 1 }

impl Default for DockingConfig {
    fn default() -> Self {
        Self {
            executable: default_engine(),
            seed: default_seed(),
            exhaustiveness: default_exhaustiveness(),
            cnn_scoring: default_cnn_scoring(),
            num_modes: default_num_modes(),
            verbosity: default_verbosity(),
            cpus: None,
        }
    }
}

/// Which search box the docking engine receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PocketPolicy {
    #[default]
    Padded,
    Fixed,
    Capped,
    GroundTruth,
    WholeProtein,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PocketConfig {
    #[serde(default)]
    pub policy: PocketPolicy,
    #[serde(default = "default_fixed_size")]
    pub fixed_size: f64,
    #[serde(default = "default_padding")]
    pub padding: f64,
    #[serde(default = "default_max_size")]
    pub max_size: f64,
}

fn default_fixed_size() -> f64 { 30.0 }
fn default_padding()    -> f64 { 5.0 }
fn default_max_size()   -> f64 { 60.0 }

impl Default for PocketConfig {
    fn default() -> Self {
        Self {
            policy: PocketPolicy::default(),
            fixed_size: default_fixed_size(),
            padding: default_padding(),
            max_size: default_max_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_comparator")]
    pub comparator: PathBuf,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_failure_sentinel")]
    pub failure_sentinel: u32,
}

fn default_comparator()       -> PathBuf { PathBuf::from("obrms") }
fn default_top_n()            -> usize   { 5 }
fn default_failure_sentinel() -> u32     { 999 }

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            comparator: default_comparator(),
            top_n: default_top_n(),
            failure_sentinel: default_failure_sentinel(),
        }
    }
}


impl Config {
    /// Load configuration.
    /// An explicit path must exist. Otherwise DOCKEVAL_CONFIG is checked, then
    /// ./dockeval.toml; if neither exists the defaults are returned.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => {
                let candidate = std::env::var(CONFIG_ENV)
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
                if !candidate.exists() {
                    return Ok(Self::default());
                }
                candidate
            }
        };
        Self::from_file(&path)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.docking.cnn_scoring.as_str(), "rescore" | "none") {
            return Err(ConfigError::Invalid {
                field: "docking.cnn_scoring",
                reason: format!("{:?} is not one of rescore, none", self.docking.cnn_scoring),
            });
        }
        for (field, value) in [
            ("pocket.fixed_size", self.pocket.fixed_size),
            ("pocket.max_size", self.pocket.max_size),
        ] {
            if !(value > 0.0) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("{value} must be positive"),
                });
            }
        }
        if self.pocket.padding < 0.0 {
            return Err(ConfigError::Invalid {
                field: "pocket.padding",
                reason: format!("{} must not be negative", self.pocket.padding),
            });
        }
        if self.scoring.top_n == 0 {
            return Err(ConfigError::Invalid {
                field: "scoring.top_n",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
