use log::{debug, error, info, warn};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::chunking::{plan_partitions, Partition};
use crate::error::{PrepError, Result};
use crate::model::bounds::{find_bounds, Bounds};
use crate::model::options::Options;
use crate::reader::{count_rows, read_partition};
use crate::sampling::grid_subsample;
use crate::writer::{self, OutputPaths, LABELS_EXTENSION, MANIFEST_NAME, POINTS_EXTENSION};

/// A point file together with its label file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PairedInput {
	pub points: PathBuf,
	pub labels: PathBuf,
	pub size_bytes: u64,
}

impl PairedInput {
	fn stem(&self) -> String {
		self.points
			.file_stem()
			.map(|s| s.to_string_lossy().into_owned())
			.unwrap_or_default()
	}
}

/// One written output pair.
#[derive(Clone, Debug, Serialize)]
pub struct OutputRecord {
	pub source: PathBuf,
	pub part: Option<usize>,
	pub rows: Partition,
	pub points_out: usize,
	pub bounds: Option<Bounds>,
	#[serde(flatten)]
	pub paths: OutputPaths,
}

/// An input that produced no output, and why.
#[derive(Clone, Debug, Serialize)]
pub struct InputIssue {
	pub source: PathBuf,
	pub kind: &'static str,
	pub message: String,
}

impl InputIssue {
	fn new(source: &Path, err: &PrepError) -> InputIssue {
		InputIssue {
			source: source.to_path_buf(),
			kind: err.kind(),
			message: err.to_string(),
		}
	}
}

#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
	pub dataset_path: PathBuf,
	pub out_path: PathBuf,
	pub grid_size: f64,
	pub size_limit_mb: u64,
	pub files_processed: usize,
	pub outputs: Vec<OutputRecord>,
	pub skipped: Vec<InputIssue>,
	pub failed: Vec<InputIssue>,
}

impl RunSummary {
	fn new(options: &Options) -> RunSummary {
		RunSummary {
			dataset_path: options.dataset_path.clone(),
			out_path: options.out_path.clone(),
			grid_size: options.grid_size,
			size_limit_mb: options.size_limit_mb,
			files_processed: 0,
			outputs: Vec::new(),
			skipped: Vec::new(),
			failed: Vec::new(),
		}
	}
}

fn has_extension(path: &Path, ext: &str) -> bool {
	path.extension()
		.and_then(|s| s.to_str())
		.map(|s| s.eq_ignore_ascii_case(ext))
		.unwrap_or(false)
}

/// Point files directly inside `dir`, paired with their label files.
///
/// Point files without a label file come back as `MissingPairedFile`
/// errors. Pairs are ordered smallest file first.
pub fn find_inputs(dir: &Path) -> Result<(Vec<PairedInput>, Vec<PrepError>)> {
	fs::read_dir(dir).map_err(|e| PrepError::io(dir, e))?;

	let mut inputs = Vec::new();
	let mut missing = Vec::new();
	for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
		let entry = match entry {
			Ok(entry) => entry,
			Err(err) => {
				warn!("Cannot read entry in {}: {}", dir.display(), err);
				continue;
			}
		};
		if !entry.file_type().is_file() || !has_extension(entry.path(), POINTS_EXTENSION) {
			continue;
		}

		let points = entry.into_path();
		let labels = points.with_extension(LABELS_EXTENSION);
		if !labels.is_file() {
			missing.push(PrepError::MissingPairedFile { points, labels });
			continue;
		}

		let size_bytes = fs::metadata(&points)
			.map_err(|e| PrepError::io(&points, e))?
			.len();
		inputs.push(PairedInput {
			points,
			labels,
			size_bytes,
		});
	}

	inputs.sort_by(|a, b| {
		a.size_bytes
			.cmp(&b.size_bytes)
			.then_with(|| a.points.cmp(&b.points))
	});
	missing.sort_by_key(|err| err.to_string());

	Ok((inputs, missing))
}

fn process_partition(
	input: &PairedInput,
	partition: &Partition,
	paths: OutputPaths,
	split: bool,
	grid_size: f64,
) -> Result<OutputRecord> {
	let cloud = read_partition(&input.points, &input.labels, partition)?;
	let sampled = grid_subsample(&cloud, grid_size).map_err(|e| e.at(&input.points))?;
	writer::write_cloud(&sampled, &paths)?;

	let bounds = find_bounds(sampled.points());
	if let Some(bounds) = &bounds {
		let size = bounds.size();
		debug!(
			"{}: {} -> {} points, extent {:.2} x {:.2} x {:.2}",
			paths.points.display(),
			cloud.len(),
			sampled.len(),
			size.x,
			size.y,
			size.z
		);
	}

	Ok(OutputRecord {
		source: input.points.clone(),
		part: if split { Some(partition.index) } else { None },
		rows: *partition,
		points_out: sampled.len(),
		bounds,
		paths,
	})
}

/// Subsamples one input pair, split into parts when it is too large.
///
/// Every output pair about to be written is pushed onto `touched` first, so
/// the caller can clean up after a failure.
pub fn process_file(
	input: &PairedInput,
	options: &Options,
	touched: &mut Vec<OutputPaths>,
) -> Result<Vec<OutputRecord>> {
	let total_rows = count_rows(&input.points)?;
	let label_rows = count_rows(&input.labels)?;
	if total_rows != label_rows {
		return Err(PrepError::shape(format!(
			"{} point rows but {} label rows",
			total_rows, label_rows
		))
		.at(&input.points));
	}

	let plan = plan_partitions(input.size_bytes, total_rows, options.size_limit_mb);
	if plan.requires_split {
		info!(
			"Splitting {} into {} parts",
			input.points.display(),
			plan.parts
		);
	}

	let stem = input.stem();
	let mut outputs = Vec::with_capacity(plan.partitions.len());
	for partition in &plan.partitions {
		let part = if plan.requires_split {
			Some(partition.index)
		} else {
			None
		};
		let paths = OutputPaths::new(&options.out_path, &stem, part);
		touched.push(paths.clone());

		let record = process_partition(
			input,
			partition,
			paths,
			plan.requires_split,
			options.grid_size,
		)
		.map_err(|e| PrepError::Partition {
			path: input.points.clone(),
			index: partition.index,
			source: Box::new(e),
		})?;
		outputs.push(record);
	}

	Ok(outputs)
}

fn remove_outputs(touched: &[OutputPaths]) {
	for paths in touched {
		for path in [&paths.points, &paths.labels] {
			if path.exists() {
				if let Err(err) = fs::remove_file(path) {
					warn!("Could not remove partial output {}: {}", path.display(), err);
				}
			}
		}
	}
}

/// Preprocesses every paired file of `options.dataset_path`.
///
/// Problems with a single file are logged and recorded in the summary; only
/// failing to list the dataset or to write into the output directory ends
/// the run with an error.
pub fn run(options: &Options) -> Result<RunSummary> {
	fs::create_dir_all(&options.out_path).map_err(|e| PrepError::io(&options.out_path, e))?;

	let (inputs, missing) = find_inputs(&options.dataset_path)?;
	let mut summary = RunSummary::new(options);
	for err in &missing {
		warn!("Skipping: {}", err);
		if let PrepError::MissingPairedFile { points, .. } = err {
			summary.skipped.push(InputIssue::new(points, err));
		}
	}

	info!(
		"Processing {} files from {} into {}",
		inputs.len(),
		options.dataset_path.display(),
		options.out_path.display()
	);

	for (i, input) in inputs.iter().enumerate() {
		info!(
			"[{}/{}] {} ({:.1} MB)",
			i + 1,
			inputs.len(),
			input.points.display(),
			input.size_bytes as f64 / 1e6
		);

		let mut touched = Vec::new();
		match process_file(input, options, &mut touched) {
			Ok(outputs) => {
				summary.files_processed += 1;
				summary.outputs.extend(outputs);
			}
			Err(err) if err.is_fatal() => return Err(err),
			Err(err) => {
				error!("Failed to process {}: {}", input.points.display(), err);
				remove_outputs(&touched);
				summary.failed.push(InputIssue::new(&input.points, &err));
			}
		}
	}

	writer::write_json(&summary, &options.out_path.join(MANIFEST_NAME))?;

	info!(
		"Done: {} of {} files processed, {} outputs, {} skipped, {} failed",
		summary.files_processed,
		inputs.len(),
		summary.outputs.len(),
		summary.skipped.len(),
		summary.failed.len()
	);

	Ok(summary)
}

#[cfg(test)]
mod tests {
	use super::{find_inputs, run};
	use crate::error::PrepError;
	use crate::model::options::Options;
	use crate::writer::MANIFEST_NAME;
	use std::fs;
	use std::io::Write;
	use std::path::Path;

	fn copy_fixture(dir: &Path, name: &str) -> Result<(), Box<dyn std::error::Error>> {
		for ext in ["txt", "labels"] {
			fs::copy(
				format!("resources/station_small.{}", ext),
				dir.join(format!("{}.{}", name, ext)),
			)?;
		}
		Ok(())
	}

	#[test]
	fn test_whole_file_matches_expected_output() -> Result<(), Box<dyn std::error::Error>> {
		let dataset = tempfile::tempdir()?;
		copy_fixture(dataset.path(), "station_small")?;
		let options = Options::new(dataset.path(), None, 2000, 1.0)?;

		let summary = run(&options)?;

		assert_eq!(summary.files_processed, 1);
		assert_eq!(summary.outputs.len(), 1);
		assert_eq!(summary.outputs[0].part, None);
		assert_eq!(summary.outputs[0].points_out, 5);

		let out = dataset.path().join("processed");
		assert_eq!(
			fs::read_to_string(out.join("station_small.txt"))?,
			fs::read_to_string("resources/station_small_expected.txt")?
		);
		assert_eq!(
			fs::read_to_string(out.join("station_small.labels"))?,
			fs::read_to_string("resources/station_small_expected.labels")?
		);
		assert!(out.join(MANIFEST_NAME).is_file());

		Ok(())
	}

	#[test]
	fn test_rerun_is_byte_identical() -> Result<(), Box<dyn std::error::Error>> {
		let dataset = tempfile::tempdir()?;
		copy_fixture(dataset.path(), "station_small")?;
		let first = tempfile::tempdir()?;
		let second = tempfile::tempdir()?;

		run(&Options::new(dataset.path(), Some(first.path()), 2000, 0.5)?)?;
		run(&Options::new(dataset.path(), Some(second.path()), 2000, 0.5)?)?;

		for name in ["station_small.txt", "station_small.labels"] {
			assert_eq!(
				fs::read(first.path().join(name))?,
				fs::read(second.path().join(name))?
			);
		}

		Ok(())
	}

	#[test]
	fn test_large_file_is_split_into_parts() -> Result<(), Box<dyn std::error::Error>> {
		let dataset = tempfile::tempdir()?;
		let out = tempfile::tempdir()?;
		let mut points = fs::File::create(dataset.path().join("big.txt"))?;
		let mut labels = fs::File::create(dataset.path().join("big.labels"))?;
		// 40k rows of 28 bytes, one point per voxel.
		for i in 0..40_000 {
			let row = format!("{}.5 0.5 0.5 {} 10 20 30", i, i % 100);
			writeln!(points, "{:<27}", row)?;
			writeln!(labels, "{}", i % 9)?;
		}
		drop(points);
		drop(labels);

		let size = fs::metadata(dataset.path().join("big.txt"))?.len();
		assert!(size > 1_000_000 && size < 2_000_000);

		let summary = run(&Options::new(dataset.path(), Some(out.path()), 1, 1.0)?)?;

		assert_eq!(summary.outputs.len(), 2);
		let mut total = 0;
		for (i, output) in summary.outputs.iter().enumerate() {
			assert_eq!(output.part, Some(i));
			assert!(output.paths.points.is_file());
			assert!(output.paths.labels.is_file());
			total += output.points_out;
		}
		assert_eq!(total, 40_000);
		assert_eq!(summary.outputs[0].rows.end, 20_000);
		assert_eq!(summary.outputs[1].rows.start, 20_000);
		assert!(out.path().join("big_part_0.txt").is_file());
		assert!(out.path().join("big_part_1.labels").is_file());
		assert!(!out.path().join("big.txt").exists());

		Ok(())
	}

	#[test]
	fn test_missing_labels_are_skipped() -> Result<(), Box<dyn std::error::Error>> {
		let dataset = tempfile::tempdir()?;
		copy_fixture(dataset.path(), "station_small")?;
		fs::copy(
			"resources/station_small.txt",
			dataset.path().join("unlabelled.txt"),
		)?;

		let (inputs, missing) = find_inputs(dataset.path())?;
		assert_eq!(inputs.len(), 1);
		assert!(matches!(missing[0], PrepError::MissingPairedFile { .. }));

		let summary = run(&Options::new(dataset.path(), None, 2000, 1.0)?)?;

		assert_eq!(summary.files_processed, 1);
		assert_eq!(summary.skipped.len(), 1);
		assert_eq!(summary.skipped[0].kind, "MissingPairedFile");
		assert!(summary.failed.is_empty());
		assert!(!dataset.path().join("processed/unlabelled.txt").exists());

		Ok(())
	}

	#[test]
	fn test_bad_file_does_not_stop_run() -> Result<(), Box<dyn std::error::Error>> {
		let dataset = tempfile::tempdir()?;
		copy_fixture(dataset.path(), "good")?;
		fs::copy("resources/station_small.txt", dataset.path().join("short.txt"))?;
		fs::write(dataset.path().join("short.labels"), "1\n2\n3\n")?;
		fs::write(dataset.path().join("broken.txt"), "0 0 0 1 2 3 4\n1 x 1 1 2 3 4\n")?;
		fs::write(dataset.path().join("broken.labels"), "1\n2\n")?;

		let summary = run(&Options::new(dataset.path(), None, 2000, 1.0)?)?;

		assert_eq!(summary.files_processed, 1);
		assert_eq!(summary.failed.len(), 2);
		let kinds: Vec<&str> = summary.failed.iter().map(|f| f.kind).collect();
		assert!(kinds.contains(&"ShapeMismatch"));
		assert!(kinds.contains(&"Parse"));

		let out = dataset.path().join("processed");
		assert!(out.join("good.txt").is_file());
		assert!(!out.join("broken.txt").exists());
		assert!(!out.join("short.txt").exists());

		Ok(())
	}
}
