use crate::error::{PrepError, Result};
use std::path::{Path, PathBuf};

pub const DEFAULT_GRID_SIZE: f64 = 0.01;
pub const DEFAULT_SIZE_LIMIT_MB: u64 = 2000;

/// Validated configuration of one preprocessing run.
#[derive(Clone, Debug)]
pub struct Options {
	pub dataset_path: PathBuf,
	pub out_path: PathBuf,
	pub size_limit_mb: u64,
	pub grid_size: f64,
}

impl Options {
	/// `out_path` defaults to `<dataset_path>/processed`.
	pub fn new(
		dataset_path: &Path,
		out_path: Option<&Path>,
		size_limit_mb: u64,
		grid_size: f64,
	) -> Result<Options> {
		if !grid_size.is_finite() || grid_size <= 0.0 {
			return Err(PrepError::InvalidGridSize(grid_size));
		}
		if size_limit_mb == 0 {
			return Err(PrepError::InvalidSizeLimit(size_limit_mb));
		}

		let out_path = match out_path {
			Some(path) => path.to_path_buf(),
			None => dataset_path.join("processed"),
		};

		Ok(Options {
			dataset_path: dataset_path.to_path_buf(),
			out_path,
			size_limit_mb,
			grid_size,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::{Options, DEFAULT_GRID_SIZE, DEFAULT_SIZE_LIMIT_MB};
	use crate::error::PrepError;
	use std::path::Path;

	#[test]
	fn test_default_out_path() {
		let options = Options::new(
			Path::new("Semantic3D"),
			None,
			DEFAULT_SIZE_LIMIT_MB,
			DEFAULT_GRID_SIZE,
		)
		.unwrap();

		assert_eq!(options.out_path, Path::new("Semantic3D/processed"));
	}

	#[test]
	fn test_rejects_bad_grid_size() {
		for grid_size in [0.0, -0.5, f64::NAN, f64::INFINITY] {
			let result = Options::new(Path::new("data"), None, 10, grid_size);
			assert!(matches!(result, Err(PrepError::InvalidGridSize(_))));
		}
	}

	#[test]
	fn test_rejects_zero_size_limit() {
		let result = Options::new(Path::new("data"), None, 0, 0.01);
		assert!(matches!(result, Err(PrepError::InvalidSizeLimit(0))));
	}
}
