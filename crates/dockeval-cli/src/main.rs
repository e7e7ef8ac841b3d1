//! dockeval: re-dock predicted ligand poses and report symmetry-aware RMSD
//! against the crystal ligand.

mod settings;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dockeval_config::Config;
use dockeval_molecules::comparator::{ObrmsComparator, PoseComparator};
use dockeval_molecules::coords::CoordinateReader;
use dockeval_molecules::docking::GninaRunner;
use dockeval_molecules::pipeline::EvaluationPipeline;
use dockeval_molecules::pocket::{bounding_box, search_region};
use dockeval_molecules::rmsd::rmsd_files;
use settings::{EvaluateArgs, PocketArgs};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dockeval", version)]
#[command(about = "Re-dock predicted ligand poses and score them against the crystal ligand")]
struct Cli {
    /// Config TOML file (falls back to DOCKEVAL_CONFIG, then ./dockeval.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dock every predicted pose and write the RMSD CSV
    Evaluate(EvaluateArgs),

    /// RMSD between two structure files of the same format (no alignment)
    Rmsd {
        first: PathBuf,
        second: PathBuf,

        /// Symmetry-aware comparison through the external comparator
        #[arg(long)]
        accurate: bool,

        /// Comparator executable for --accurate
        #[arg(long, value_name = "PATH")]
        obrms: Option<PathBuf>,
    },

    /// Print the search box a ligand file would produce
    Pocket {
        ligand: PathBuf,

        #[command(flatten)]
        pocket: PocketArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("dockeval=info,warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())
        .context("Failed to load configuration")?;

    match cli.command {
        Commands::Evaluate(args) => evaluate(&args, &config).await,
        Commands::Rmsd { first, second, accurate, obrms } => {
            if accurate {
                let exe = obrms.unwrap_or_else(|| config.scoring.comparator.clone());
                let deviations = ObrmsComparator::new(exe).compare(&first, &second).await?;
                for value in deviations {
                    println!("{value}");
                }
            } else {
                let rmsd = rmsd_files(&first, &second)?;
                if rmsd.truncated {
                    warn!("Compared only the first {} atoms", rmsd.compared_atoms);
                }
                println!("{}", rmsd.value);
            }
            Ok(())
        }
        Commands::Pocket { ligand, pocket } => {
            let policy = EvaluateArgs { pocket, ..Default::default() }
                .resolve(&config)?
                .settings
                .policy;
            let coords = CoordinateReader::for_path(&ligand)?.read(&ligand)?;
            if policy.is_autobox() {
                let bbox = bounding_box(&coords.cloud)?;
                println!("min = {:?}\nmax = {:?}", bbox.min, bbox.max);
                println!("policy {policy:?} lets the engine autobox");
            } else {
                let (bbox, region) = search_region(&coords.cloud, &policy)?;
                println!("min = {:?}\nmax = {:?}", bbox.min, bbox.max);
                println!("center = {:?}\nsize = {:?}", region.center, region.size);
            }
            Ok(())
        }
    }
}

async fn evaluate(args: &EvaluateArgs, config: &Config) -> Result<()> {
    let run = args.resolve(config)?;
    info!("dockeval {} using {:?} and {:?}", env!("CARGO_PKG_VERSION"), run.engine, run.comparator);

    let pipeline = EvaluationPipeline::new(
        run.settings,
        GninaRunner::new(&run.engine),
        ObrmsComparator::new(&run.comparator),
    );
    let summary = pipeline.run().await?;
    println!("{}", summary.csv_path.display());
    Ok(())
}
