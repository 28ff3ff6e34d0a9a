use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};

use bead_sentry::config::PipelineConfig;
use bead_sentry::data::aggregate::BatchPolicy;
use bead_sentry::data::loader::{discover_groups, list_data_files, FileSource};
use bead_sentry::detect::Contamination;
use bead_sentry::report::{write_detection, write_length_table, OutputFormat};
use bead_sentry::state::Session;

#[derive(Parser)]
#[command(name = "bead-sentry")]
#[command(about = "Weld bead segmentation and anomaly detection", version)]
struct Cli {
    /// Path to JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Stop at the first file that cannot be processed
    #[arg(long, global = true)]
    fail_fast: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List recording folders and their data files
    Groups {
        /// Root directory holding one folder per batch
        root: PathBuf,
    },

    /// Segment every recording and print bead lengths per file
    Beads {
        /// Directory of recordings (one batch)
        directory: PathBuf,
        #[command(flatten)]
        segmentation: SegmentationArgs,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Score one or more bead positions across the batch
    Detect {
        /// Directory of recordings (one batch)
        directory: PathBuf,
        /// Column the bead waveforms are cut from
        #[arg(short, long)]
        target: String,
        /// Bead numbers to score, e.g. `1,3`
        #[arg(short, long, value_delimiter = ',', required = true)]
        beads: Vec<usize>,
        #[command(flatten)]
        segmentation: SegmentationArgs,
        /// Seed for reproducible runs
        #[arg(long)]
        seed: Option<u64>,
        /// `auto` or the share of beads to flag, e.g. 0.1
        #[arg(long)]
        contamination: Option<Contamination>,
        /// Number of trees in the forest
        #[arg(long)]
        trees: Option<usize>,
        /// Add this many principal components to each row
        #[arg(long)]
        project: Option<usize>,
        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(clap::Args)]
struct SegmentationArgs {
    /// Column used to find beads
    #[arg(long)]
    column: Option<String>,
    /// Samples strictly above this value belong to a bead
    #[arg(long, allow_negative_numbers = true)]
    threshold: Option<f64>,
}

#[derive(clap::Args)]
struct OutputArgs {
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,
    /// Write to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl OutputArgs {
    fn writer(&self) -> Result<Box<dyn Write>> {
        Ok(match &self.output {
            Some(path) => Box::new(BufWriter::new(
                File::create(path).with_context(|| format!("creating {}", path.display()))?,
            )),
            None => Box::new(io::stdout().lock()),
        })
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .parse_default_env()
        .init();

    let mut config = PipelineConfig::load_or_default(cli.config.as_deref())?;
    if cli.fail_fast {
        config.batch_policy = BatchPolicy::FailFast;
    }

    match cli.command {
        Commands::Groups { root } => list_groups(&root),
        Commands::Beads {
            directory,
            segmentation,
            output,
        } => {
            apply_segmentation(&mut config, segmentation);
            run_beads(&directory, config, &output)
        }
        Commands::Detect {
            directory,
            target,
            beads,
            segmentation,
            seed,
            contamination,
            trees,
            project,
            output,
        } => {
            apply_segmentation(&mut config, segmentation);
            let forest = &mut config.detection.forest;
            if seed.is_some() {
                forest.seed = seed;
            }
            if let Some(c) = contamination {
                forest.contamination = c;
            }
            if let Some(n) = trees {
                forest.n_trees = n;
            }
            if project.is_some() {
                config.detection.projection_dims = project;
            }
            let beads: BTreeSet<usize> = beads.into_iter().collect();
            run_detect(&directory, config, &target, &beads, &output)
        }
    }
}

fn apply_segmentation(config: &mut PipelineConfig, args: SegmentationArgs) {
    if let Some(column) = args.column {
        config.segmentation.filter_column = column;
    }
    if let Some(threshold) = args.threshold {
        config.segmentation.threshold = threshold;
    }
}

fn list_groups(root: &Path) -> Result<()> {
    let groups = discover_groups(root)?;
    if groups.is_empty() {
        bail!("no recordings found under {}", root.display());
    }
    let mut out = io::stdout().lock();
    for group in groups {
        writeln!(out, "{}/", group.name)?;
        for file in &group.files {
            writeln!(out, "  {}", file.id)?;
        }
    }
    Ok(())
}

fn open_session(directory: &Path, config: PipelineConfig) -> Result<Session<FileSource>> {
    let files = list_data_files(directory)?;
    if files.is_empty() {
        bail!("no recordings found in {}", directory.display());
    }
    info!("{} recordings in {}", files.len(), directory.display());
    Ok(Session::new(files, config))
}

fn run_beads(directory: &Path, config: PipelineConfig, output: &OutputArgs) -> Result<()> {
    let mut session = open_session(directory, config)?;
    let report = session.segment()?;
    for failure in &report.failures {
        warn!("{}: {}", failure.file_id, failure.error);
    }
    write_length_table(
        output.writer()?,
        &report.length_table(),
        &report.failures,
        output.format,
    )
}

fn run_detect(
    directory: &Path,
    config: PipelineConfig,
    target: &str,
    beads: &BTreeSet<usize>,
    output: &OutputArgs,
) -> Result<()> {
    let mut session = open_session(directory, config)?;
    session.segment()?;
    let report = session.detect(target, beads)?;
    if report.rows.is_empty() {
        warn!("no bead {beads:?} found in any recording");
    }
    for failure in &report.failures {
        warn!("{}: {}", failure.file_id, failure.error);
    }
    write_detection(output.writer()?, report, output.format)
}
