use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::csv_reader::MAX_FEATURES;
use crate::error::{PrepError, Result};
use crate::model::cloud::PointCloud;

pub const POINTS_EXTENSION: &str = "txt";
pub const LABELS_EXTENSION: &str = "labels";
pub const MANIFEST_NAME: &str = "preprocess_manifest.json";

/// Where one processed point cloud and its labels are written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OutputPaths {
	pub points: PathBuf,
	pub labels: PathBuf,
}

impl OutputPaths {
	/// `<stem>.txt` for a whole file, `<stem>_part_<n>.txt` for a part of a
	/// split one. The labels file differs only in its extension.
	pub fn new(dir: &Path, stem: &str, part: Option<usize>) -> OutputPaths {
		let name = match part {
			Some(index) => format!("{}_part_{}", stem, index),
			None => stem.to_string(),
		};
		OutputPaths {
			points: dir.join(format!("{}.{}", name, POINTS_EXTENSION)),
			labels: dir.join(format!("{}.{}", name, LABELS_EXTENSION)),
		}
	}
}

fn create(path: &Path) -> Result<BufWriter<File>> {
	let file = File::create(path).map_err(|e| PrepError::io(path, e))?;
	Ok(BufWriter::new(file))
}

/// One output row: `%.3f %.3f %.3f %i %i %i %i`.
///
/// Features are truncated toward zero and missing ones are written as 0.
pub fn write_point_row<W: Write>(out: &mut W, cloud: &PointCloud, index: usize) -> std::io::Result<()> {
	let [x, y, z] = cloud.point(index).to_array();
	write!(out, "{:.3} {:.3} {:.3}", x, y, z)?;

	let features = cloud.features(index);
	for column in 0..MAX_FEATURES {
		let value = features.get(column).copied().unwrap_or(0.0);
		write!(out, " {}", value as i64)?;
	}
	writeln!(out)
}

fn write_points(cloud: &PointCloud, path: &Path) -> Result<()> {
	let mut out = create(path)?;
	for i in 0..cloud.len() {
		write_point_row(&mut out, cloud, i).map_err(|e| PrepError::io(path, e))?;
	}
	out.flush().map_err(|e| PrepError::io(path, e))
}

fn write_labels(cloud: &PointCloud, path: &Path) -> Result<()> {
	let mut out = create(path)?;
	for label in cloud.labels() {
		writeln!(out, "{}", label).map_err(|e| PrepError::io(path, e))?;
	}
	out.flush().map_err(|e| PrepError::io(path, e))
}

/// Writes the point file and the row-aligned label file.
pub fn write_cloud(cloud: &PointCloud, paths: &OutputPaths) -> Result<()> {
	write_points(cloud, &paths.points)?;
	write_labels(cloud, &paths.labels)
}

pub fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
	let mut out = create(path)?;
	serde_json::to_writer_pretty(&mut out, value).map_err(|e| PrepError::json(path, e))?;
	out.flush().map_err(|e| PrepError::io(path, e))
}
