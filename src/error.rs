use std::path::{Path, PathBuf};
use thiserror::Error;

/// Everything that can go wrong while preparing a dataset.
///
/// Configuration errors (`InvalidGridSize`, `InvalidSizeLimit`) abort a run
/// before any file is read. All other variants are scoped to one input file
/// and are reported without stopping the batch.
#[derive(Error, Debug)]
pub enum PrepError {
	#[error("no label file {} for {}", .labels.display(), .points.display())]
	MissingPairedFile { points: PathBuf, labels: PathBuf },

	#[error("shape mismatch{}: {msg}", describe(.path))]
	ShapeMismatch { path: Option<PathBuf>, msg: String },

	#[error("{} ends after {available} rows, rows up to {requested} were requested", .path.display())]
	TruncatedFile {
		path: PathBuf,
		requested: u64,
		available: u64,
	},

	#[error("grid size must be positive and finite, got {0}")]
	InvalidGridSize(f64),

	#[error("size limit must be at least 1 MB, got {0}")]
	InvalidSizeLimit(u64),

	#[error("{} row {row}: {msg}", .path.display())]
	Parse { path: PathBuf, row: u64, msg: String },

	#[error("partition {index} of {}: {source}", .path.display())]
	Partition {
		path: PathBuf,
		index: usize,
		#[source]
		source: Box<PrepError>,
	},

	#[error("{}: {source}", .path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("{}: {source}", .path.display())]
	Csv {
		path: PathBuf,
		#[source]
		source: csv::Error,
	},

	#[error("{}: {source}", .path.display())]
	Json {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},
}

impl PrepError {
	pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> PrepError {
		PrepError::Io {
			path: path.into(),
			source,
		}
	}

	pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> PrepError {
		PrepError::Csv {
			path: path.into(),
			source,
		}
	}

	pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> PrepError {
		PrepError::Json {
			path: path.into(),
			source,
		}
	}

	pub fn shape(msg: impl Into<String>) -> PrepError {
		PrepError::ShapeMismatch {
			path: None,
			msg: msg.into(),
		}
	}

	/// Attaches `path` to an error raised on in-memory data.
	pub fn at(self, path: &Path) -> PrepError {
		match self {
			PrepError::ShapeMismatch { path: None, msg } => PrepError::ShapeMismatch {
				path: Some(path.to_path_buf()),
				msg,
			},
			other => other,
		}
	}

	/// Configuration errors abort the whole run.
	pub fn is_fatal(&self) -> bool {
		match self {
			PrepError::InvalidGridSize(_) | PrepError::InvalidSizeLimit(_) => true,
			PrepError::Partition { source, .. } => source.is_fatal(),
			_ => false,
		}
	}

	/// Short name of the error kind, used in the run manifest.
	pub fn kind(&self) -> &'static str {
		match self {
			PrepError::MissingPairedFile { .. } => "MissingPairedFile",
			PrepError::ShapeMismatch { .. } => "ShapeMismatch",
			PrepError::TruncatedFile { .. } => "TruncatedFile",
			PrepError::InvalidGridSize(_) => "InvalidGridSize",
			PrepError::InvalidSizeLimit(_) => "InvalidSizeLimit",
			PrepError::Parse { .. } => "Parse",
			PrepError::Partition { source, .. } => source.kind(),
			PrepError::Io { .. } => "Io",
			PrepError::Csv { .. } => "Csv",
			PrepError::Json { .. } => "Json",
		}
	}
}

fn describe(path: &Option<PathBuf>) -> String {
	match path {
		Some(path) => format!(" in {}", path.display()),
		None => String::new(),
	}
}

pub type Result<T> = std::result::Result<T, PrepError>;

#[cfg(test)]
mod tests {
	use super::PrepError;
	use std::path::{Path, PathBuf};

	#[test]
	fn test_partition_error_reports_inner_kind() {
		let err = PrepError::Partition {
			path: PathBuf::from("bildstein_station1.txt"),
			index: 3,
			source: Box::new(PrepError::TruncatedFile {
				path: PathBuf::from("bildstein_station1.labels"),
				requested: 40,
				available: 31,
			}),
		};

		assert_eq!(err.kind(), "TruncatedFile");
		assert!(err.to_string().starts_with("partition 3 of bildstein_station1.txt"));
		assert!(!err.is_fatal());
	}

	#[test]
	fn test_shape_mismatch_picks_up_path() {
		let err = PrepError::shape("3 labels for 4 points").at(Path::new("domfountain_station1.txt"));

		assert_eq!(
			err.to_string(),
			"shape mismatch in domfountain_station1.txt: 3 labels for 4 points"
		);
	}

	#[test]
	fn test_config_errors_are_fatal() {
		assert!(PrepError::InvalidGridSize(0.0).is_fatal());
		assert!(PrepError::InvalidSizeLimit(0).is_fatal());
	}
}
