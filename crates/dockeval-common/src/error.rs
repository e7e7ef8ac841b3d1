use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DockEvalError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed header in {path}: {reason}")]
    MalformedHeader { path: PathBuf, reason: String },

    #[error("{path} declares {declared} atoms but only {found} atom lines are present")]
    TruncatedAtomBlock {
        path: PathBuf,
        declared: usize,
        found: usize,
    },

    #[error("Point cloud is empty: {0}")]
    EmptyPointCloud(String),

    #[error("External tool error: {0}")]
    ExternalTool(String),

    #[error("Unparseable comparator output token: {0:?}")]
    ComparatorOutput(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl DockEvalError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, DockEvalError>;
