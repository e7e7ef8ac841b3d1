//! Orchestrator for the pose evaluation batch.
//!
//! For each predicted pose: derive the search box, write the engine config,
//! dock (unless the output already exists), score the docked poses against
//! the reference ligand and append a CSV row. A failing structure becomes a
//! sentinel row; only unreadable inputs abort the batch.

use anyhow::{Context, Result};
use dockeval_common::{DockEvalError, FailureReason, PoseEvaluation, StructureFormat, FAILURE_SENTINEL};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::comparator::PoseComparator;
use crate::coords::CoordinateReader;
use crate::docking::{CnnScoring, DockingConfig, GninaRunner, SearchSpace};
use crate::pocket::{search_region, BoxPolicy};
use crate::report::RmsdReport;

/// File name of the top-ranked pose inside each prediction directory.
pub const PREDICTION_FILE: &str = "rank1.sdf";

/// Engine parameters copied into every config file.
#[derive(Debug, Clone)]
pub struct DockingParams {
    pub cnn_scoring: CnnScoring,
    pub exhaustiveness: u32,
    pub seed: u64,
    pub num_modes: u32,
    pub verbosity: u32,
    pub cpus: Option<u32>,
}

impl Default for DockingParams {
    fn default() -> Self {
        Self {
            cnn_scoring: CnnScoring::Rescore,
            exhaustiveness: 32,
            seed: 666,
            num_modes: 9,
            verbosity: 1,
            cpus: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EvaluationSettings {
    /// `<input>/<id>/<id>_protein.pdbqt` and `<id>_ligand.{pdbqt,sdf}`.
    pub input_dir: PathBuf,
    /// `<predictions>/<...-id-...>/rank1.sdf`.
    pub predictions_dir: PathBuf,
    pub results_dir: PathBuf,
    pub policy: BoxPolicy,
    pub docking: DockingParams,
    pub top_n: usize,
    pub failure_sentinel: u32,
    /// Evaluate only this index of the discovered predictions.
    pub lig_num: Option<usize>,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input"),
            predictions_dir: PathBuf::from("diffdock/results"),
            results_dir: PathBuf::from("results"),
            policy: BoxPolicy::default(),
            docking: DockingParams::default(),
            top_n: 5,
            failure_sentinel: FAILURE_SENTINEL,
            lig_num: None,
        }
    }
}

impl EvaluationSettings {
    fn run_stem(&self) -> String {
        let sf = self.docking.cnn_scoring.scoring_function();
        format!(
            "{}_{}_diffdock_box_pdbqt_{}_seed{}",
            self.docking.exhaustiveness, sf, sf, self.docking.seed
        )
    }

    /// Directory holding configs and docked poses for this run.
    pub fn output_dir(&self) -> PathBuf {
        let suffix = match self.policy {
            // keeps the trailing `.0` so existing `_normal30.0` run directories are reused
            BoxPolicy::Fixed { edge } => format!("_normal{edge:?}"),
            BoxPolicy::Padded { .. } => "_padded".to_string(),
            BoxPolicy::Capped { .. } => String::new(),
            BoxPolicy::GroundTruthPocket => "_gt_pock".to_string(),
            BoxPolicy::WholeProtein => "_whole_protein".to_string(),
        };
        self.results_dir.join(format!("{}{}", self.run_stem(), suffix))
    }

    pub fn csv_path(&self) -> PathBuf {
        let suffix = match self.policy {
            BoxPolicy::Fixed { .. } => "_normal",
            BoxPolicy::Padded { .. } => "_padded",
            BoxPolicy::Capped { .. } => "",
            BoxPolicy::GroundTruthPocket => "_gt_pock",
            BoxPolicy::WholeProtein => "_whole_protein",
        };
        // one CSV per index so fanned-out processes do not overwrite each other
        let shard = self
            .lig_num
            .map(|idx| format!("_lig{idx}"))
            .unwrap_or_default();
        self.results_dir
            .join(format!("rmsd_results_{}{}{}.csv", self.run_stem(), suffix, shard))
    }
}

/// A predicted pose and the structure it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub pdb: String,
    pub pose: PathBuf,
}

/// Structure identifier from a prediction directory name: the second-to-last
/// `-`-separated token, or the whole name when there is no `-`.
pub fn structure_id(dir_name: &str) -> String {
    dir_name
        .rsplit('-')
        .nth(1)
        .unwrap_or(dir_name)
        .to_string()
}

/// All `<dir>/*/rank1.sdf`, in reverse lexical order of the full path string.
pub fn discover_predictions(dir: &Path) -> Result<Vec<Prediction>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Cannot list predictions in {}", dir.display()))?;

    let mut predictions = Vec::new();
    for entry in entries {
        let entry = entry?;
        let pose = entry.path().join(PREDICTION_FILE);
        if !pose.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        predictions.push(Prediction {
            pdb: structure_id(&name),
            pose,
        });
    }
    // whole-string order, not per-component: `a-b/` sorts before `a/`
    predictions.sort_by(|a, b| b.pose.to_string_lossy().cmp(&a.pose.to_string_lossy()));
    Ok(predictions)
}

/// Receptor and reference ligand of one structure.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureInputs {
    pub receptor: PathBuf,
    /// SDF when available, PDBQT otherwise.
    pub reference: PathBuf,
    pub reference_format: StructureFormat,
}

pub fn resolve_inputs(input_dir: &Path, pdb: &str) -> StructureInputs {
    let dir = input_dir.join(pdb);
    let sdf = dir.join(format!("{pdb}_ligand.sdf"));
    let (reference, reference_format) = if sdf.is_file() {
        (sdf, StructureFormat::Sdf)
    } else {
        (dir.join(format!("{pdb}_ligand.pdbqt")), StructureFormat::Pdbqt)
    };
    StructureInputs {
        receptor: dir.join(format!("{pdb}_protein.pdbqt")),
        reference,
        reference_format,
    }
}

/// Counts for a finished batch.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationSummary {
    pub csv_path: PathBuf,
    pub scored: usize,
    pub failed: usize,
}

pub struct EvaluationPipeline<C: PoseComparator> {
    settings: EvaluationSettings,
    runner: GninaRunner,
    comparator: C,
}

impl<C: PoseComparator> EvaluationPipeline<C> {
    pub fn new(settings: EvaluationSettings, runner: GninaRunner, comparator: C) -> Self {
        Self {
            settings,
            runner,
            comparator,
        }
    }

    pub async fn run(&self) -> Result<EvaluationSummary> {
        let output_dir = self.settings.output_dir();
        tokio::fs::create_dir_all(&output_dir)
            .await
            .with_context(|| format!("Cannot create {}", output_dir.display()))?;

        let csv_path = self.settings.csv_path();
        let mut report = RmsdReport::create(&csv_path, self.settings.top_n, self.settings.failure_sentinel)?;

        let mut predictions = discover_predictions(&self.settings.predictions_dir)?;
        if let Some(idx) = self.settings.lig_num {
            let total = predictions.len();
            if idx >= total {
                anyhow::bail!("lig_num {} out of range: {} predictions found", idx, total);
            }
            predictions = vec![predictions.swap_remove(idx)];
        }
        info!(
            "Evaluating {} predictions with {:?}, results in {:?}",
            predictions.len(),
            self.settings.policy,
            csv_path
        );

        let mut summary = EvaluationSummary {
            csv_path,
            scored: 0,
            failed: 0,
        };
        for prediction in &predictions {
            let evaluation = self.evaluate(prediction, &output_dir).await?;
            match &evaluation {
                PoseEvaluation::Scored { top1, best_of_n, poses } => {
                    info!(
                        "{}: top1={:.3} best of {}={:.3}",
                        prediction.pdb, top1, poses, best_of_n
                    );
                    summary.scored += 1;
                }
                PoseEvaluation::Failed(reason) => {
                    warn!("error in {}: {}", prediction.pdb, reason);
                    summary.failed += 1;
                }
            }
            report.record(&prediction.pdb, &evaluation)?;
        }

        info!(
            "Done: {} scored, {} failed ({:?})",
            summary.scored, summary.failed, summary.csv_path
        );
        Ok(summary)
    }

    /// Evaluate one structure. A predicted pose that cannot be read from disk
    /// is an error; a readable but malformed one and everything that goes wrong
    /// after it are reported as [`PoseEvaluation::Failed`].
    pub async fn evaluate(&self, prediction: &Prediction, output_dir: &Path) -> Result<PoseEvaluation> {
        let pdb = &prediction.pdb;
        let inputs = resolve_inputs(&self.settings.input_dir, pdb);

        let predicted = match CoordinateReader::new(StructureFormat::Sdf).read(&prediction.pose) {
            Ok(coords) => coords,
            Err(e @ DockEvalError::Io { .. }) => {
                return Err(e).with_context(|| format!("Cannot read predicted pose for {pdb}"));
            }
            Err(e) => {
                return Ok(PoseEvaluation::Failed(FailureReason::InvalidPose(e.to_string())));
            }
        };

        let search_space = match self.settings.policy {
            BoxPolicy::GroundTruthPocket => SearchSpace::Autobox(inputs.reference.clone()),
            BoxPolicy::WholeProtein => SearchSpace::Autobox(inputs.receptor.clone()),
            policy => match search_region(&predicted.cloud, &policy) {
                Ok((_, region)) => SearchSpace::Region(region),
                Err(e) => {
                    return Ok(PoseEvaluation::Failed(FailureReason::InvalidPose(e.to_string())));
                }
            },
        };

        let out = output_dir.join(format!(
            "{pdb}_ligand_out.{}",
            inputs.reference_format.extension()
        ));
        let params = &self.settings.docking;
        let config = DockingConfig {
            search_space,
            cnn_scoring: params.cnn_scoring,
            exhaustiveness: params.exhaustiveness,
            receptor: inputs.receptor.clone(),
            ligand: inputs.reference.clone(),
            out: out.clone(),
            seed: params.seed,
            num_modes: params.num_modes,
            verbosity: params.verbosity,
            cpus: params.cpus,
        };
        let config_path = output_dir.join(format!("{pdb}_config.txt"));
        config.write(&config_path).await?;

        if out.exists() {
            debug!("{}: reusing existing docking output {:?}", pdb, out);
        } else if let Err(e) = self.runner.run(&config_path).await {
            warn!("{}: docking engine reported failure: {}", pdb, e);
        }

        if !out.exists() {
            return Ok(PoseEvaluation::Failed(FailureReason::MissingOutput(out)));
        }

        match self.comparator.compare(&out, &inputs.reference).await {
            Ok(deviations) => Ok(PoseEvaluation::from_ranked(&deviations, self.settings.top_n)),
            Err(e) => Ok(PoseEvaluation::Failed(FailureReason::Comparator(e.to_string()))),
        }
    }
}
