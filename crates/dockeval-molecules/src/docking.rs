//! Molecular docking using GNINA (or a Vina-compatible engine reading `--config`).

use anyhow::Result;
use dockeval_common::SearchRegion;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::process::Command;
use tracing::{debug, info};

/// CNN rescoring mode passed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CnnScoring {
    #[default]
    Rescore,
    None,
}

impl CnnScoring {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rescore => "rescore",
            Self::None => "none",
        }
    }

    /// Name of the scoring function the mode amounts to, used in run names.
    pub fn scoring_function(&self) -> &'static str {
        match self {
            Self::Rescore => "gnina",
            Self::None => "vina",
        }
    }
}

impl FromStr for CnnScoring {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rescore" => Ok(Self::Rescore),
            "none" => Ok(Self::None),
            other => anyhow::bail!("unknown cnn_scoring mode {other:?} (expected rescore or none)"),
        }
    }
}

/// Where the engine should search.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchSpace {
    Region(SearchRegion),
    /// Let the engine box the atoms of this file.
    Autobox(PathBuf),
}

/// Configuration for a docking run.
#[derive(Debug, Clone)]
pub struct DockingConfig {
    pub search_space: SearchSpace,
    pub cnn_scoring: CnnScoring,
    pub exhaustiveness: u32,
    pub receptor: PathBuf,
    pub ligand: PathBuf,
    pub out: PathBuf,
    pub seed: u64,
    pub num_modes: u32,
    pub verbosity: u32,
    pub cpus: Option<u32>,
}

impl DockingConfig {
    /// Render as a `key = value` config file.
    pub fn render(&self) -> String {
        let mut s = String::new();
        match &self.search_space {
            SearchSpace::Autobox(anchor) => {
                let _ = writeln!(s, "autobox_ligand = {}", anchor.display());
            }
            SearchSpace::Region(region) => {
                let [cx, cy, cz] = region.center;
                let [sx, sy, sz] = region.size;
                let _ = writeln!(s, "center_x = {cx}\ncenter_y = {cy}\ncenter_z = {cz}");
                let _ = writeln!(s, "size_x = {sx}\nsize_y = {sy}\nsize_z = {sz}");
            }
        }
        let _ = writeln!(s, "cnn_scoring = {}", self.cnn_scoring.as_str());
        let _ = writeln!(s, "exhaustiveness = {}", self.exhaustiveness);
        let _ = writeln!(s, "receptor = {}", self.receptor.display());
        let _ = writeln!(s, "ligand = {}", self.ligand.display());
        let _ = writeln!(s, "out = {}", self.out.display());
        let _ = writeln!(s, "seed = {}", self.seed);
        let _ = writeln!(s, "num_modes = {}", self.num_modes);
        let _ = writeln!(s, "verbosity = {}", self.verbosity);
        if let Some(cpus) = self.cpus {
            let _ = writeln!(s, "cpu = {cpus}");
        }
        s
    }

    /// Write the rendered config to `path`.
    pub async fn write(&self, path: &Path) -> Result<()> {
        tokio::fs::write(path, self.render()).await?;
        debug!("Docking config written to {:?}", path);
        Ok(())
    }
}

/// Wrapper for GNINA execution.
pub struct GninaRunner {
    executable_path: PathBuf,
}

impl GninaRunner {
    /// Create a new GninaRunner.
    pub fn new<P: AsRef<Path>>(executable_path: P) -> Self {
        Self {
            executable_path: executable_path.as_ref().to_path_buf(),
        }
    }

    /// Run the engine on an already written config file.
    pub async fn run(&self, config_path: &Path) -> Result<()> {
        info!("Running {:?} with {:?}", self.executable_path, config_path);

        let output = Command::new(&self.executable_path)
            .arg("--config")
            .arg(config_path)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("{} failed: {}", self.executable_path.display(), stderr.trim());
        }

        debug!("Docking completed successfully for {:?}", config_path);
        Ok(())
    }
}
