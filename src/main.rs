mod chunking;
mod csv_reader;
mod error;
mod eval;
mod histogram;
mod model;
mod preprocess;
mod reader;
mod sampling;
mod writer;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use std::fs;
use std::path::PathBuf;

use crate::model::labels::LabelTable;
use crate::model::options::{Options, DEFAULT_GRID_SIZE, DEFAULT_SIZE_LIMIT_MB};

/// Dataset preparation for point-cloud semantic segmentation.
#[derive(Parser, Debug)]
#[command(name = "semantic3d-prep", version, about, long_about = None)]
struct Cli {
	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Grid-subsample every labelled point cloud of a dataset, splitting
	/// files that exceed the size limit.
	Preprocess(PreprocessArgs),
	/// Per-class IoU and accuracy of predicted labels against ground truth.
	Evaluate(EvaluateArgs),
	/// Label frequencies per station and for the whole dataset.
	Histogram(HistogramArgs),
}

#[derive(Args, Debug)]
struct PreprocessArgs {
	/// Directory holding `<name>.txt` point files and `<name>.labels` label files.
	#[arg(long, env = "SEMANTIC3D_DATASET_PATH")]
	dataset_path: PathBuf,

	/// Output directory, `<dataset_path>/processed` if not given.
	#[arg(long, env = "SEMANTIC3D_OUT_PATH")]
	out_path: Option<PathBuf>,

	/// Largest file, in megabytes, processed in one piece.
	#[arg(long, env = "SEMANTIC3D_SIZE_LIMIT", default_value_t = DEFAULT_SIZE_LIMIT_MB)]
	size_limit: u64,

	/// Edge length of the subsampling grid cells.
	#[arg(long, env = "SEMANTIC3D_GRID_SIZE", default_value_t = DEFAULT_GRID_SIZE)]
	grid_size: f64,
}

#[derive(Args, Debug)]
struct EvaluateArgs {
	/// Directory of predicted `.labels` files.
	#[arg(long, env = "SEMANTIC3D_PRED_DIR", default_value = "test/Semantic3D")]
	pred_dir: PathBuf,

	/// Directory of ground-truth `.labels` files with the same names.
	#[arg(long, env = "SEMANTIC3D_GT_DIR", default_value = "Semantic3D/processed")]
	gt_dir: PathBuf,

	/// Also write the report as JSON to this file.
	#[arg(long)]
	report: Option<PathBuf>,

	/// JSON object mapping label ids to names, Semantic3D names if not given.
	#[arg(long, env = "SEMANTIC3D_LABELS")]
	labels: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct HistogramArgs {
	/// Directory containing `.labels` files.
	input_dir: PathBuf,

	/// Where to write the table, `<input_dir>/label_histograms` if not given.
	#[arg(long)]
	output_dir: Option<PathBuf>,

	/// JSON object mapping label ids to names, Semantic3D names if not given.
	#[arg(long, env = "SEMANTIC3D_LABELS")]
	labels: Option<PathBuf>,
}

fn run_preprocess(args: &PreprocessArgs) -> Result<()> {
	let options = Options::new(
		&args.dataset_path,
		args.out_path.as_deref(),
		args.size_limit,
		args.grid_size,
	)
	.context("Invalid preprocessing options")?;
	if args.out_path.is_none() {
		info!(
			"out_path not given, saving output in {}",
			options.out_path.display()
		);
	}

	preprocess::run(&options).context("Preprocessing failed")?;
	Ok(())
}

fn run_evaluate(args: &EvaluateArgs) -> Result<()> {
	let table = LabelTable::load_or_default(args.labels.as_deref())?;
	let evaluation = eval::evaluate(&args.pred_dir, &args.gt_dir)?;
	let report = evaluation.report(&table);
	eval::log_report(&report);

	if let Some(path) = &args.report {
		writer::write_json(&report, path)?;
		info!("Saved evaluation report to {}", path.display());
	}
	Ok(())
}

fn run_histogram(args: &HistogramArgs) -> Result<()> {
	let table = LabelTable::load_or_default(args.labels.as_deref())?;
	let output_dir = args
		.output_dir
		.clone()
		.unwrap_or_else(|| args.input_dir.join("label_histograms"));
	fs::create_dir_all(&output_dir)
		.with_context(|| format!("Cannot create {}", output_dir.display()))?;

	let histogram = histogram::collect(&args.input_dir)?;
	let path = output_dir.join(histogram::HISTOGRAM_FILE);
	histogram.write_csv(&table, &path)?;
	info!("Saved label histograms to {}", path.display());
	Ok(())
}

fn main() -> Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let cli = Cli::parse();
	match &cli.command {
		Command::Preprocess(args) => run_preprocess(args),
		Command::Evaluate(args) => run_evaluate(args),
		Command::Histogram(args) => run_histogram(args),
	}
}
