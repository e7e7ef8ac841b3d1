//! Merge of `dockeval.toml` values with command-line overrides.

use anyhow::Result;
use clap::Args;
use dockeval_config::{Config, PocketPolicy};
use dockeval_molecules::docking::CnnScoring;
use dockeval_molecules::pipeline::{DockingParams, EvaluationSettings};
use dockeval_molecules::pocket::BoxPolicy;
use std::path::PathBuf;

/// Search box selection. At most one flag may be given; without any the
/// `[pocket]` section of the config decides.
#[derive(Args, Debug, Clone, Default)]
#[group(multiple = false)]
pub struct PocketArgs {
    /// Dock in a fixed cube of this edge length (Å) centred on the predicted pose
    #[arg(long, value_name = "EDGE")]
    pub pocket_size: Option<f64>,

    /// Use the predicted pose's own bounding box, padded and capped per axis
    #[arg(long)]
    pub ori_pocket: bool,

    /// Use the predicted pose's bounding box plus padding
    #[arg(long)]
    pub padded: bool,

    /// Let the engine box the reference ligand
    #[arg(long)]
    pub gt_pocket: bool,

    /// Let the engine box the whole receptor
    #[arg(long)]
    pub whole_protein: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct EvaluateArgs {
    /// Folder with `<id>/<id>_protein.pdbqt` and `<id>_ligand.{pdbqt,sdf}`
    #[arg(long, value_name = "DIR")]
    pub input_path: Option<PathBuf>,

    /// Folder with one `<...-id-...>/rank1.sdf` per predicted structure
    #[arg(long, value_name = "DIR")]
    pub predictions_path: Option<PathBuf>,

    /// Folder for docked poses, configs and the RMSD CSV
    #[arg(long, value_name = "DIR")]
    pub results_path: Option<PathBuf>,

    /// Docking engine executable
    #[arg(long, value_name = "PATH")]
    pub gnina: Option<PathBuf>,

    /// Pose comparator executable
    #[arg(long, value_name = "PATH")]
    pub obrms: Option<PathBuf>,

    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long)]
    pub exhaustiveness: Option<u32>,

    /// CNN rescoring mode: rescore or none
    #[arg(long, value_parser = ["rescore", "none"])]
    pub cnn_scoring: Option<String>,

    #[arg(long)]
    pub num_modes: Option<u32>,

    /// CPUs for the engine; it detects them when unset
    #[arg(long)]
    pub cpus: Option<u32>,

    /// Number of ranked poses the best-of-N column considers
    #[arg(long)]
    pub top_n: Option<usize>,

    /// Evaluate only the prediction at this index (for cluster fan-out)
    #[arg(long)]
    pub lig_num: Option<usize>,

    #[command(flatten)]
    pub pocket: PocketArgs,
}

/// Everything the evaluate command needs to build a pipeline.
#[derive(Debug, Clone)]
pub struct ResolvedRun {
    pub settings: EvaluationSettings,
    pub engine: PathBuf,
    pub comparator: PathBuf,
}

impl PocketArgs {
    fn policy(&self, config: &Config) -> BoxPolicy {
        let pocket = &config.pocket;
        if let Some(edge) = self.pocket_size {
            return BoxPolicy::Fixed { edge };
        }
        let policy = if self.ori_pocket {
            PocketPolicy::Capped
        } else if self.padded {
            PocketPolicy::Padded
        } else if self.gt_pocket {
            PocketPolicy::GroundTruth
        } else if self.whole_protein {
            PocketPolicy::WholeProtein
        } else {
            pocket.policy
        };
        match policy {
            PocketPolicy::Padded => BoxPolicy::Padded { padding: pocket.padding },
            PocketPolicy::Fixed => BoxPolicy::Fixed { edge: pocket.fixed_size },
            PocketPolicy::Capped => BoxPolicy::Capped {
                padding: pocket.padding,
                max_edge: pocket.max_size,
            },
            PocketPolicy::GroundTruth => BoxPolicy::GroundTruthPocket,
            PocketPolicy::WholeProtein => BoxPolicy::WholeProtein,
        }
    }
}

impl EvaluateArgs {
    pub fn resolve(&self, config: &Config) -> Result<ResolvedRun> {
        if let Some(edge) = self.pocket.pocket_size {
            if !(edge > 0.0) {
                anyhow::bail!("--pocket-size must be positive, got {edge}");
            }
        }
        if self.top_n == Some(0) {
            anyhow::bail!("--top-n must be at least 1");
        }

        let cnn_scoring: CnnScoring = self
            .cnn_scoring
            .as_deref()
            .unwrap_or(&config.docking.cnn_scoring)
            .parse()?;

        let docking = DockingParams {
            cnn_scoring,
            exhaustiveness: self.exhaustiveness.unwrap_or(config.docking.exhaustiveness),
            seed: self.seed.unwrap_or(config.docking.seed),
            num_modes: self.num_modes.unwrap_or(config.docking.num_modes),
            verbosity: config.docking.verbosity,
            cpus: self.cpus.or(config.docking.cpus),
        };

        let settings = EvaluationSettings {
            input_dir: self.input_path.clone().unwrap_or_else(|| config.paths.input.clone()),
            predictions_dir: self
                .predictions_path
                .clone()
                .unwrap_or_else(|| config.paths.predictions.clone()),
            results_dir: self
                .results_path
                .clone()
                .unwrap_or_else(|| config.paths.results.clone()),
            policy: self.pocket.policy(config),
            docking,
            top_n: self.top_n.unwrap_or(config.scoring.top_n),
            failure_sentinel: config.scoring.failure_sentinel,
            lig_num: self.lig_num,
        };

        Ok(ResolvedRun {
            settings,
            engine: self.gnina.clone().unwrap_or_else(|| config.docking.executable.clone()),
            comparator: self.obrms.clone().unwrap_or_else(|| config.scoring.comparator.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: EvaluateArgs,
    }

    fn parse(argv: &[&str]) -> EvaluateArgs {
        let mut full = vec!["dockeval"];
        full.extend_from_slice(argv);
        TestCli::try_parse_from(full).unwrap().args
    }

    #[test]
    fn test_defaults_come_from_config() {
        let run = parse(&[]).resolve(&Config::default()).unwrap();
        assert_eq!(run.settings.policy, BoxPolicy::Padded { padding: 5.0 });
        assert_eq!(run.settings.docking.seed, 666);
        assert_eq!(run.settings.docking.cnn_scoring, CnnScoring::Rescore);
        assert_eq!(run.settings.top_n, 5);
        assert_eq!(run.settings.predictions_dir, PathBuf::from("diffdock/results"));
        assert_eq!(run.engine, PathBuf::from("gnina"));
        assert_eq!(run.comparator, PathBuf::from("obrms"));
    }

    #[test]
    fn test_flags_override_config() {
        let mut config = Config::default();
        config.docking.seed = 1;
        config.pocket.policy = PocketPolicy::WholeProtein;

        let run = parse(&["--seed", "42", "--cnn-scoring", "none", "--pocket-size", "20", "--lig-num", "3"])
            .resolve(&config)
            .unwrap();
        assert_eq!(run.settings.docking.seed, 42);
        assert_eq!(run.settings.docking.cnn_scoring, CnnScoring::None);
        assert_eq!(run.settings.policy, BoxPolicy::Fixed { edge: 20.0 });
        assert_eq!(run.settings.lig_num, Some(3));
    }

    #[test]
    fn test_policy_flags() {
        let config = Config::default();
        let policy = |flag: &str| parse(&[flag]).resolve(&config).unwrap().settings.policy;
        assert_eq!(policy("--ori-pocket"), BoxPolicy::Capped { padding: 5.0, max_edge: 60.0 });
        assert_eq!(policy("--gt-pocket"), BoxPolicy::GroundTruthPocket);
        assert_eq!(policy("--whole-protein"), BoxPolicy::WholeProtein);
        assert_eq!(policy("--padded"), BoxPolicy::Padded { padding: 5.0 });
    }

    #[test]
    fn test_config_policy_used_without_flags() {
        let mut config = Config::default();
        config.pocket.policy = PocketPolicy::Fixed;
        config.pocket.fixed_size = 25.0;
        let run = parse(&[]).resolve(&config).unwrap();
        assert_eq!(run.settings.policy, BoxPolicy::Fixed { edge: 25.0 });
    }

    #[test]
    fn test_policy_flags_are_exclusive() {
        assert!(TestCli::try_parse_from(["dockeval", "--gt-pocket", "--whole-protein"]).is_err());
        assert!(TestCli::try_parse_from(["dockeval", "--pocket-size", "30", "--ori-pocket"]).is_err());
    }

    #[test]
    fn test_bad_pocket_size_rejected() {
        assert!(parse(&["--pocket-size", "0"]).resolve(&Config::default()).is_err());
    }
}
