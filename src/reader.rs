use csv::{ByteRecord, Reader};
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::chunking::Partition;
use crate::csv_reader::{self, PointRow};
use crate::error::{PrepError, Result};
use crate::model::cloud::PointCloud;

type ParseRow<T> = fn(&ByteRecord, &Path, u64) -> Result<T>;

/// Counts the rows of a text file without parsing them.
pub fn count_rows(path: &Path) -> Result<u64> {
	let mut reader = csv_reader::open(path)?;
	let mut record = ByteRecord::new();
	let mut rows = 0;
	while reader
		.read_byte_record(&mut record)
		.map_err(|e| PrepError::csv(path, e))?
	{
		rows += 1;
	}
	Ok(rows)
}

/// Lazily parsed rows `[start, end)` of a file.
///
/// Rows before `start` are skipped unparsed and nothing past `end` is read.
/// If the file runs out early the iterator yields one `TruncatedFile` error
/// and then stops.
pub struct RowRange<T> {
	path: PathBuf,
	reader: Reader<File>,
	record: ByteRecord,
	row: u64,
	end: u64,
	parse: ParseRow<T>,
	done: bool,
}

impl<T> RowRange<T> {
	fn open(path: &Path, start: u64, end: u64, parse: ParseRow<T>) -> Result<RowRange<T>> {
		let mut reader = csv_reader::open(path)?;
		let mut record = ByteRecord::new();
		let mut row = 0;
		while row < start {
			let more = reader
				.read_byte_record(&mut record)
				.map_err(|e| PrepError::csv(path, e))?;
			if !more {
				return Err(PrepError::TruncatedFile {
					path: path.to_path_buf(),
					requested: end,
					available: row,
				});
			}
			row += 1;
		}

		Ok(RowRange {
			path: path.to_path_buf(),
			reader,
			record,
			row,
			end,
			parse,
			done: false,
		})
	}
}

impl<T> Iterator for RowRange<T> {
	type Item = Result<T>;

	fn next(&mut self) -> Option<Self::Item> {
		if self.done || self.row >= self.end {
			return None;
		}

		let item = match self.reader.read_byte_record(&mut self.record) {
			Ok(true) => (self.parse)(&self.record, &self.path, self.row),
			Ok(false) => Err(PrepError::TruncatedFile {
				path: self.path.clone(),
				requested: self.end,
				available: self.row,
			}),
			Err(e) => Err(PrepError::csv(&self.path, e)),
		};
		self.row += 1;
		self.done = item.is_err();

		Some(item)
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		let remaining = self.end.saturating_sub(self.row) as usize;
		(0, Some(remaining))
	}
}

pub fn read_points(path: &Path, partition: &Partition) -> Result<RowRange<PointRow>> {
	RowRange::open(path, partition.start, partition.end, csv_reader::parse_point)
}

pub fn read_labels(path: &Path, partition: &Partition) -> Result<RowRange<i32>> {
	RowRange::open(path, partition.start, partition.end, csv_reader::parse_label)
}

/// Reads every label of a label file.
pub fn read_label_file(path: &Path) -> Result<Vec<i32>> {
	let mut reader = csv_reader::open(path)?;
	let mut record = ByteRecord::new();
	let mut labels = Vec::new();
	while reader
		.read_byte_record(&mut record)
		.map_err(|e| PrepError::csv(path, e))?
	{
		labels.push(csv_reader::parse_label(&record, path, labels.len() as u64)?);
	}
	Ok(labels)
}

/// Reads one partition of a point file and the same rows of its label file.
///
/// The feature width is taken from the first row; any later row with a
/// different width is a shape mismatch.
pub fn read_partition(
	points_path: &Path,
	labels_path: &Path,
	partition: &Partition,
) -> Result<PointCloud> {
	let mut points = read_points(points_path, partition)?;
	let mut labels = read_labels(labels_path, partition)?;
	let capacity = partition.len() as usize;

	let mut cloud: Option<PointCloud> = None;
	loop {
		let (row, label) = match (points.next(), labels.next()) {
			(None, None) => break,
			(Some(row), Some(label)) => (row?, label?),
			(Some(row), None) => {
				row?;
				return Err(PrepError::shape("label file ended before point file").at(labels_path));
			}
			(None, Some(label)) => {
				label?;
				return Err(PrepError::shape("point file ended before label file").at(points_path));
			}
		};

		let cloud = cloud.get_or_insert_with(|| PointCloud::with_capacity(row.width(), capacity));
		cloud
			.push(row.position, row.features(), label)
			.map_err(|e| e.at(points_path))?;
	}

	Ok(cloud.unwrap_or_else(|| PointCloud::new(0)))
}

#[cfg(test)]
mod tests {
	use super::{count_rows, read_label_file, read_labels, read_partition, read_points};
	use crate::chunking::Partition;
	use crate::error::PrepError;
	use std::io::Write;
	use std::path::Path;

	const POINTS: &str = "resources/station_small.txt";
	const LABELS: &str = "resources/station_small.labels";

	fn range(start: u64, end: u64) -> Partition {
		Partition {
			index: 0,
			start,
			end,
		}
	}

	#[test]
	fn test_count_rows() -> Result<(), Box<dyn std::error::Error>> {
		assert_eq!(count_rows(Path::new(POINTS))?, 10);
		assert_eq!(count_rows(Path::new(LABELS))?, 10);
		Ok(())
	}

	#[test]
	fn test_read_label_file() -> Result<(), Box<dyn std::error::Error>> {
		let labels = read_label_file(Path::new(LABELS))?;
		assert_eq!(labels, vec![1, 1, 2, 2, 2, 5, 5, 5, 0, 8]);
		Ok(())
	}

	#[test]
	fn test_read_middle_range() -> Result<(), Box<dyn std::error::Error>> {
		let labels: Vec<i32> =
			read_labels(Path::new(LABELS), &range(3, 7))?.collect::<Result<_, _>>()?;
		assert_eq!(labels, vec![2, 2, 5, 5]);

		let points = read_points(Path::new(POINTS), &range(8, 10))?.count();
		assert_eq!(points, 2);

		Ok(())
	}

	#[test]
	fn test_empty_range() -> Result<(), Box<dyn std::error::Error>> {
		assert_eq!(read_labels(Path::new(LABELS), &range(4, 4))?.count(), 0);
		Ok(())
	}

	#[test]
	fn test_range_past_end_is_truncated() -> Result<(), Box<dyn std::error::Error>> {
		let results: Vec<_> = read_labels(Path::new(LABELS), &range(8, 12))?.collect();

		assert_eq!(results.len(), 3);
		assert!(results[0].is_ok());
		assert!(results[1].is_ok());
		assert!(matches!(
			results[2],
			Err(PrepError::TruncatedFile {
				requested: 12,
				available: 10,
				..
			})
		));

		assert!(matches!(
			read_labels(Path::new(LABELS), &range(11, 12)),
			Err(PrepError::TruncatedFile { .. })
		));

		Ok(())
	}

	#[test]
	fn test_read_partition() -> Result<(), Box<dyn std::error::Error>> {
		let cloud = read_partition(Path::new(POINTS), Path::new(LABELS), &range(2, 6))?;

		assert_eq!(cloud.len(), 4);
		assert_eq!(cloud.width(), 4);
		assert_eq!(cloud.labels(), &[2, 2, 2, 5]);

		Ok(())
	}

	#[test]
	fn test_read_partition_short_labels() -> Result<(), Box<dyn std::error::Error>> {
		let mut labels = tempfile::NamedTempFile::new()?;
		writeln!(labels, "1\n1\n2")?;

		let result = read_partition(Path::new(POINTS), labels.path(), &range(0, 10));

		assert!(matches!(result, Err(PrepError::TruncatedFile { .. })));

		Ok(())
	}

	#[test]
	fn test_read_partition_mixed_widths() -> Result<(), Box<dyn std::error::Error>> {
		let mut points = tempfile::NamedTempFile::new()?;
		writeln!(points, "0 0 0 1 2 3 4\n1 1 1 7")?;
		let mut labels = tempfile::NamedTempFile::new()?;
		writeln!(labels, "1\n2")?;

		let result = read_partition(points.path(), labels.path(), &range(0, 2));

		assert!(matches!(result, Err(PrepError::ShapeMismatch { path: Some(_), .. })));

		Ok(())
	}
}
