use log::{info, warn};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{PrepError, Result};
use crate::model::labels::LabelTable;
use crate::reader::read_label_file;
use crate::writer::LABELS_EXTENSION;

/// Ground-truth label excluded from scoring.
pub const UNLABELED: i32 = 0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClassCounts {
	pub tp: u64,
	pub fp: u64,
	pub fn_: u64,
}

impl ClassCounts {
	pub fn iou(&self) -> f64 {
		let union = self.tp + self.fp + self.fn_;
		if union == 0 {
			0.0
		} else {
			self.tp as f64 / union as f64
		}
	}

	pub fn accuracy(&self) -> f64 {
		let support = self.tp + self.fn_;
		if support == 0 {
			0.0
		} else {
			self.tp as f64 / support as f64
		}
	}
}

/// Confusion counts of one prediction file against its ground truth.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FileScores {
	pub classes: BTreeMap<i32, ClassCounts>,
	pub correct: u64,
	pub samples: u64,
}

/// Scores `pred` against `gt`, ignoring rows whose ground truth is unlabeled.
///
/// Only classes that occur in either masked sequence are reported.
pub fn score(gt: &[i32], pred: &[i32]) -> Result<FileScores> {
	if gt.len() != pred.len() {
		return Err(PrepError::shape(format!(
			"{} predictions for {} ground-truth labels",
			pred.len(),
			gt.len()
		)));
	}

	let mut scores = FileScores::default();
	for (&g, &p) in gt.iter().zip(pred) {
		if g == UNLABELED {
			continue;
		}
		scores.samples += 1;
		if g == p {
			scores.correct += 1;
			scores.classes.entry(g).or_default().tp += 1;
		} else {
			scores.classes.entry(g).or_default().fn_ += 1;
			scores.classes.entry(p).or_default().fp += 1;
		}
	}

	Ok(scores)
}

#[derive(Clone, Debug, Serialize)]
pub struct ClassReport {
	pub label: i32,
	pub name: String,
	pub iou: f64,
	pub accuracy: f64,
	pub files: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct EvalReport {
	pub classes: Vec<ClassReport>,
	pub mean_iou: f64,
	pub mean_accuracy: f64,
	pub overall_accuracy: f64,
	pub files_evaluated: usize,
	pub files_skipped: Vec<PathBuf>,
}

/// Running per-class averages over many files.
#[derive(Clone, Debug, Default)]
pub struct Evaluation {
	ious: BTreeMap<i32, Vec<f64>>,
	accuracies: BTreeMap<i32, Vec<f64>>,
	correct: u64,
	samples: u64,
	files: usize,
	skipped: Vec<PathBuf>,
}

fn mean(values: &[f64]) -> f64 {
	if values.is_empty() {
		0.0
	} else {
		values.iter().sum::<f64>() / values.len() as f64
	}
}

impl Evaluation {
	pub fn add(&mut self, scores: &FileScores) {
		for (&label, counts) in &scores.classes {
			self.ious.entry(label).or_default().push(counts.iou());
			self.accuracies
				.entry(label)
				.or_default()
				.push(counts.accuracy());
		}
		self.correct += scores.correct;
		self.samples += scores.samples;
		self.files += 1;
	}

	pub fn skip(&mut self, path: &Path) {
		self.skipped.push(path.to_path_buf());
	}

	/// Per-class IoU and accuracy are averaged over the files a class appears
	/// in; the means are then taken over classes.
	pub fn report(&self, table: &LabelTable) -> EvalReport {
		let labels: BTreeSet<i32> = self.ious.keys().copied().collect();
		let classes: Vec<ClassReport> = labels
			.into_iter()
			.map(|label| ClassReport {
				label,
				name: table.name(label),
				iou: mean(&self.ious[&label]),
				accuracy: mean(&self.accuracies[&label]),
				files: self.ious[&label].len(),
			})
			.collect();

		let ious: Vec<f64> = classes.iter().map(|c| c.iou).collect();
		let accuracies: Vec<f64> = classes.iter().map(|c| c.accuracy).collect();
		let overall_accuracy = if self.samples == 0 {
			0.0
		} else {
			self.correct as f64 / self.samples as f64
		};

		EvalReport {
			mean_iou: mean(&ious),
			mean_accuracy: mean(&accuracies),
			overall_accuracy,
			classes,
			files_evaluated: self.files,
			files_skipped: self.skipped.clone(),
		}
	}
}

fn label_files(dir: &Path) -> Vec<PathBuf> {
	let mut files: Vec<PathBuf> = WalkDir::new(dir)
		.min_depth(1)
		.max_depth(1)
		.into_iter()
		.filter_map(|entry| entry.ok())
		.filter(|entry| entry.file_type().is_file())
		.map(|entry| entry.into_path())
		.filter(|path| path.extension().and_then(|s| s.to_str()) == Some(LABELS_EXTENSION))
		.collect();
	files.sort();
	files
}

/// Compares every `*.labels` in `pred_dir` with the file of the same name in
/// `gt_dir`.
///
/// Missing ground truth and files of different length are logged and
/// skipped.
pub fn evaluate(pred_dir: &Path, gt_dir: &Path) -> Result<Evaluation> {
	if !pred_dir.is_dir() {
		return Err(PrepError::io(
			pred_dir,
			std::io::Error::new(std::io::ErrorKind::NotFound, "prediction directory not found"),
		));
	}

	let mut evaluation = Evaluation::default();
	for pred_path in label_files(pred_dir) {
		let Some(name) = pred_path.file_name() else {
			continue;
		};
		let gt_path = gt_dir.join(name);
		if !gt_path.is_file() {
			warn!("Ground truth not found for {}, skipping", pred_path.display());
			evaluation.skip(&pred_path);
			continue;
		}

		let scored = read_label_file(&gt_path).and_then(|gt| {
			let pred = read_label_file(&pred_path)?;
			score(&gt, &pred).map_err(|e| e.at(&pred_path))
		});
		match scored {
			Ok(scores) => evaluation.add(&scores),
			Err(err) => {
				warn!("Skipping {}: {}", pred_path.display(), err);
				evaluation.skip(&pred_path);
			}
		}
	}

	Ok(evaluation)
}

pub fn log_report(report: &EvalReport) {
	info!("Average per-class IoU:");
	for class in &report.classes {
		info!("Class {} ({}): {:.4}", class.label, class.name, class.iou);
	}
	info!("Average per-class accuracy:");
	for class in &report.classes {
		info!("Class {} ({}): {:.4}", class.label, class.name, class.accuracy);
	}
	info!("Mean accuracy: {:.4}", report.mean_accuracy);
	info!("Mean IoU (mIoU): {:.4}", report.mean_iou);
	info!("Overall accuracy: {:.4}", report.overall_accuracy);
}
