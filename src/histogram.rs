use csv::Writer;
use log::{info, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use walkdir::WalkDir;

use crate::error::{PrepError, Result};
use crate::model::labels::LabelTable;
use crate::reader::read_label_file;
use crate::writer::LABELS_EXTENSION;

pub const COMBINED_ROW: &str = "00_combined_dataset";
pub const HISTOGRAM_FILE: &str = "label_histograms.csv";

/// Station a label file belongs to: `bildstein_station1_part_2.labels` and
/// `bildstein_station1.labels` both map to `bildstein_station1`.
pub fn station_name(file_name: &str) -> &str {
	match file_name.find("_part_") {
		Some(index) => &file_name[..index],
		None => file_name.split('.').next().unwrap_or(file_name),
	}
}

/// Label frequencies per station and over the whole dataset.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LabelHistogram {
	stations: BTreeMap<String, BTreeMap<i32, u64>>,
	combined: BTreeMap<i32, u64>,
}

impl LabelHistogram {
	pub fn add(&mut self, station: &str, labels: &[i32]) {
		let counts = self.stations.entry(station.to_string()).or_default();
		for &label in labels {
			*counts.entry(label).or_insert(0) += 1;
			*self.combined.entry(label).or_insert(0) += 1;
		}
	}

	pub fn combined(&self) -> &BTreeMap<i32, u64> {
		&self.combined
	}

	/// Labels of `table` in order, followed by any other label seen.
	fn columns(&self, table: &LabelTable) -> Vec<i32> {
		let mut columns: Vec<i32> = table.ids().collect();
		let extra: BTreeSet<i32> = self
			.combined
			.keys()
			.copied()
			.filter(|label| !table.contains(*label))
			.collect();
		columns.extend(extra);
		columns
	}

	/// `station,total,<label names...>`, combined row first.
	pub fn write_csv(&self, table: &LabelTable, path: &Path) -> Result<()> {
		let columns = self.columns(table);
		let mut out = Writer::from_path(path).map_err(|e| PrepError::csv(path, e))?;

		let mut header = vec!["station".to_string(), "total".to_string()];
		header.extend(columns.iter().map(|label| table.name(*label)));
		out.write_record(&header).map_err(|e| PrepError::csv(path, e))?;

		let rows = std::iter::once((COMBINED_ROW, &self.combined))
			.chain(self.stations.iter().map(|(name, counts)| (name.as_str(), counts)));
		for (name, counts) in rows {
			let total: u64 = counts.values().sum();
			let mut record = vec![name.to_string(), total.to_string()];
			record.extend(
				columns
					.iter()
					.map(|label| counts.get(label).copied().unwrap_or(0).to_string()),
			);
			out.write_record(&record).map_err(|e| PrepError::csv(path, e))?;
		}

		out.flush().map_err(|e| PrepError::io(path, e))
	}
}

/// Counts the labels of every `*.labels` file directly inside `dir`.
pub fn collect(dir: &Path) -> Result<LabelHistogram> {
	let mut histogram = LabelHistogram::default();
	let mut files = 0;
	for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
		let entry = entry.map_err(|e| PrepError::io(dir, e.into()))?;
		let path = entry.path();
		if !entry.file_type().is_file()
			|| path.extension().and_then(|s| s.to_str()) != Some(LABELS_EXTENSION)
		{
			continue;
		}

		let file_name = entry.file_name().to_string_lossy();
		let labels = read_label_file(path)?;
		if labels.is_empty() {
			warn!("No labels found in {}", path.display());
		}
		histogram.add(station_name(&file_name), &labels);
		files += 1;
	}

	info!(
		"Counted {} labels in {} files from {} stations",
		histogram.combined().values().sum::<u64>(),
		files,
		histogram.stations.len()
	);

	Ok(histogram)
}

#[cfg(test)]
mod tests {
	use super::{collect, station_name, LabelHistogram, COMBINED_ROW};
	use crate::model::labels::LabelTable;
	use std::fs;

	#[test]
	fn test_station_name() {
		assert_eq!(station_name("bildstein_station1_part_2.labels"), "bildstein_station1");
		assert_eq!(station_name("bildstein_station1.labels"), "bildstein_station1");
		assert_eq!(station_name("untermaederbrunnen"), "untermaederbrunnen");
	}

	#[test]
	fn test_collect_groups_parts() -> Result<(), Box<dyn std::error::Error>> {
		let dir = tempfile::tempdir()?;
		fs::write(dir.path().join("sg27_part_0.labels"), "1\n1\n2\n")?;
		fs::write(dir.path().join("sg27_part_1.labels"), "2\n8\n")?;
		fs::write(dir.path().join("domfountain.labels"), "5\n5\n12\n")?;
		fs::write(dir.path().join("domfountain.txt"), "0 0 0\n")?;

		let histogram = collect(dir.path())?;

		let sg27 = &histogram.stations["sg27"];
		assert_eq!(sg27.get(&1), Some(&2));
		assert_eq!(sg27.get(&2), Some(&2));
		assert_eq!(sg27.get(&8), Some(&1));
		assert_eq!(histogram.combined().values().sum::<u64>(), 8);

		Ok(())
	}

	#[test]
	fn test_write_csv() -> Result<(), Box<dyn std::error::Error>> {
		let dir = tempfile::tempdir()?;
		let mut histogram = LabelHistogram::default();
		histogram.add("sg27", &[1, 1, 2]);
		histogram.add("domfountain", &[5, 12]);

		let path = dir.path().join("hist.csv");
		histogram.write_csv(&LabelTable::semantic3d(), &path)?;

		let text = fs::read_to_string(&path)?;
		let lines: Vec<&str> = text.lines().collect();
		assert_eq!(lines.len(), 4);
		assert_eq!(
			lines[0],
			"station,total,unlabeled,man-made terrain,natural terrain,high vegetation,\
			 low vegetation,buildings,hard scape,scanning artefacts,cars,label 12"
		);
		assert_eq!(lines[1], format!("{},5,0,2,1,0,0,1,0,0,0,1", COMBINED_ROW));
		assert_eq!(lines[2], "domfountain,2,0,0,0,0,0,1,0,0,0,1");
		assert_eq!(lines[3], "sg27,3,0,2,1,0,0,0,0,0,0,0");

		Ok(())
	}
}
