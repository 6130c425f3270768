use serde::Serialize;

const BYTES_PER_MB: f64 = 1e6;

/// Half-open row range `[start, end)` of an input file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Partition {
	pub index: usize,
	pub start: u64,
	pub end: u64,
}

impl Partition {
	pub fn len(&self) -> u64 {
		self.end - self.start
	}

	pub fn is_empty(&self) -> bool {
		self.start == self.end
	}
}

/// How one input file is cut up for processing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartitionPlan {
	pub requires_split: bool,
	/// Number of parts the file was divided into, empty ones included.
	pub parts: usize,
	pub partitions: Vec<Partition>,
}

/// Number of parts needed to keep each part under `size_limit_mb`, or `None`
/// when the whole file fits.
pub fn part_count(size_bytes: u64, size_limit_mb: u64) -> Option<usize> {
	let size_mb = size_bytes as f64 / BYTES_PER_MB;
	let limit = size_limit_mb as f64;
	if size_mb <= limit {
		return None;
	}
	Some((size_mb / limit).floor() as usize + 1)
}

/// Tiles `[0, total_rows)` into `parts` contiguous ranges.
///
/// Every range gets `total_rows / parts` rows and the last one also takes the
/// remainder. Ranges are returned even when empty.
pub fn split_rows(total_rows: u64, parts: usize) -> Vec<Partition> {
	let parts = parts.max(1);
	let rows_per_part = total_rows / parts as u64;

	(0..parts)
		.map(|index| {
			let start = index as u64 * rows_per_part;
			let end = if index + 1 == parts {
				total_rows
			} else {
				start + rows_per_part
			};
			Partition { index, start, end }
		})
		.collect()
}

/// Decides whether a file must be split and computes its row ranges.
///
/// A file that fits yields a single range covering all rows. A split file
/// yields its non-empty ranges only; each keeps the index it had in the full
/// tiling so output names stay stable.
pub fn plan_partitions(size_bytes: u64, total_rows: u64, size_limit_mb: u64) -> PartitionPlan {
	match part_count(size_bytes, size_limit_mb) {
		None => PartitionPlan {
			requires_split: false,
			parts: 1,
			partitions: vec![Partition {
				index: 0,
				start: 0,
				end: total_rows,
			}],
		},
		Some(parts) => PartitionPlan {
			requires_split: true,
			parts,
			partitions: split_rows(total_rows, parts)
				.into_iter()
				.filter(|p| !p.is_empty())
				.collect(),
		},
	}
}
