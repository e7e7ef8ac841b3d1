//! Symmetry-aware pose comparison.
//!
//! The comparison itself is delegated to an external tool that knows how to
//! permute chemically equivalent atoms (OpenBabel's `obrms`). The trait keeps
//! the backend swappable and lets the pipeline run against a mock in tests.

use async_trait::async_trait;
use dockeval_common::error::{DockEvalError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// Compares every pose in a (possibly multi-model) file against a reference.
#[async_trait]
pub trait PoseComparator: Send + Sync {
    /// One deviation per model in `poses`, in file order.
    async fn compare(&self, poses: &Path, reference: &Path) -> Result<Vec<f64>>;
}

/// Parse whitespace/newline separated deviation values. `nan` and `inf` are rejected.
pub fn parse_deviations(text: &str) -> Result<Vec<f64>> {
    text.split_whitespace()
        .map(|token| {
            token
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(|| DockEvalError::ComparatorOutput(token.to_string()))
        })
        .collect()
}

/// Runs an `obrms`-compatible executable: `<exe> <poses> <reference>`.
pub struct ObrmsComparator {
    executable_path: PathBuf,
}

impl ObrmsComparator {
    pub fn new<P: AsRef<Path>>(executable_path: P) -> Self {
        Self {
            executable_path: executable_path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl PoseComparator for ObrmsComparator {
    async fn compare(&self, poses: &Path, reference: &Path) -> Result<Vec<f64>> {
        debug!("Running {:?} on {:?} vs {:?}", self.executable_path, poses, reference);

        let output = Command::new(&self.executable_path)
            .arg(poses)
            .arg(reference)
            .output()
            .await
            .map_err(|e| {
                DockEvalError::ExternalTool(format!(
                    "failed to launch {}: {}",
                    self.executable_path.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DockEvalError::ExternalTool(format!(
                "{} exited with {}: {}",
                self.executable_path.display(),
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!("comparator output: {}", stdout.trim());
        parse_deviations(&stdout)
    }
}

// ── Mock Implementation for Testing ────────────────────────────────────────

/// Comparator returning canned deviations keyed by the poses path.
pub struct MockComparator {
    results: HashMap<PathBuf, Vec<f64>>,
}

impl MockComparator {
    pub fn new() -> Self {
        Self {
            results: HashMap::new(),
        }
    }

    /// Register the deviations returned for `poses`.
    pub fn with<P: AsRef<Path>>(mut self, poses: P, deviations: Vec<f64>) -> Self {
        self.results.insert(poses.as_ref().to_path_buf(), deviations);
        self
    }
}

impl Default for MockComparator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PoseComparator for MockComparator {
    async fn compare(&self, poses: &Path, _reference: &Path) -> Result<Vec<f64>> {
        self.results.get(poses).cloned().ok_or_else(|| {
            DockEvalError::ExternalTool(format!("no canned result for {}", poses.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_deviations_mixed_whitespace() {
        let values = parse_deviations("1.25\n0.5  3\n\t7.75\n").unwrap();
        assert_eq!(values, vec![1.25, 0.5, 3.0, 7.75]);
        assert!(parse_deviations("   \n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_deviations_rejects_text() {
        let err = parse_deviations("1.0 RMSD 2.0").unwrap_err();
        assert!(matches!(err, DockEvalError::ComparatorOutput(ref t) if t == "RMSD"));
    }

    #[test]
    fn test_parse_deviations_rejects_non_finite() {
        for text in ["1.0 nan", "inf 2.0", "0.5\n-inf"] {
            let err = parse_deviations(text).unwrap_err();
            assert!(matches!(err, DockEvalError::ComparatorOutput(_)), "{text:?}");
        }
    }

    #[tokio::test]
    async fn test_mock_comparator() {
        let mock = MockComparator::new().with("out/1abc_ligand_out.sdf", vec![2.0, 1.0]);
        let values = mock
            .compare(Path::new("out/1abc_ligand_out.sdf"), Path::new("ref.sdf"))
            .await
            .unwrap();
        assert_eq!(values, vec![2.0, 1.0]);
        assert!(mock
            .compare(Path::new("missing.sdf"), Path::new("ref.sdf"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_obrms_missing_executable_is_error() {
        let cmp = ObrmsComparator::new("/nonexistent/obrms");
        let err = cmp
            .compare(Path::new("a.sdf"), Path::new("b.sdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, DockEvalError::ExternalTool(_)));
    }
}
