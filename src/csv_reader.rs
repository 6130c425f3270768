use csv::{ByteRecord, Reader, ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;

use crate::error::{PrepError, Result};
use crate::model::vector3::Vector3;

/// Most features a point row can carry: intensity and r, g, b.
pub const MAX_FEATURES: usize = 4;

/// One parsed line of a point file: `x y z [intensity] [r g b]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointRow {
	pub position: Vector3,
	values: [f64; MAX_FEATURES],
	width: usize,
}

impl PointRow {
	pub fn features(&self) -> &[f64] {
		&self.values[..self.width]
	}

	pub fn width(&self) -> usize {
		self.width
	}
}

/// Whitespace separated text without a header. Records are cut on spaces;
/// `fields` splits further on tabs and drops the empty fields left by
/// repeated separators.
pub fn open(path: &Path) -> Result<Reader<File>> {
	ReaderBuilder::new()
		.delimiter(b' ')
		.has_headers(false)
		.flexible(true)
		.quoting(false)
		.trim(Trim::All)
		.from_path(path)
		.map_err(|e| PrepError::csv(path, e))
}

fn fields(record: &ByteRecord) -> impl Iterator<Item = &[u8]> {
	record.iter().flat_map(|field| {
		field
			.split(|b| b.is_ascii_whitespace())
			.filter(|part| !part.is_empty())
	})
}

fn parse_field<T: std::str::FromStr>(field: &[u8], path: &Path, row: u64) -> Result<T> {
	std::str::from_utf8(field)
		.ok()
		.and_then(|s| s.parse::<T>().ok())
		.ok_or_else(|| PrepError::Parse {
			path: path.to_path_buf(),
			row,
			msg: format!("cannot parse {:?}", String::from_utf8_lossy(field)),
		})
}

pub fn parse_point(record: &ByteRecord, path: &Path, row: u64) -> Result<PointRow> {
	let mut columns = [0.0; 3 + MAX_FEATURES];
	let mut count = 0;
	for field in fields(record) {
		if count == columns.len() {
			count += 1;
			break;
		}
		let value: f64 = parse_field(field, path, row)?;
		if !value.is_finite() {
			return Err(PrepError::Parse {
				path: path.to_path_buf(),
				row,
				msg: format!("non-finite value {}", value),
			});
		}
		columns[count] = value;
		count += 1;
	}

	if !matches!(count, 3 | 4 | 7) {
		return Err(PrepError::ShapeMismatch {
			path: Some(path.to_path_buf()),
			msg: format!("row {} has {} columns, expected 3, 4 or 7", row, fields(record).count()),
		});
	}

	let mut values = [0.0; MAX_FEATURES];
	values[..count - 3].copy_from_slice(&columns[3..count]);

	Ok(PointRow {
		position: Vector3::new(columns[0], columns[1], columns[2]),
		values,
		width: count - 3,
	})
}

pub fn parse_label(record: &ByteRecord, path: &Path, row: u64) -> Result<i32> {
	let mut iter = fields(record);
	match (iter.next(), iter.next()) {
		(Some(field), None) => parse_field(field, path, row),
		_ => Err(PrepError::ShapeMismatch {
			path: Some(path.to_path_buf()),
			msg: format!("row {} of a label file must hold exactly one value", row),
		}),
	}
}
