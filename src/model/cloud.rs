use crate::error::{PrepError, Result};
use crate::model::vector3::Vector3;

/// Points with a fixed number of features each and one label per point.
///
/// Features are stored flat, `width` values per point. Every constructor
/// checks that points, features and labels stay aligned, so a cloud that
/// exists is always consistent.
#[derive(Clone, Debug, PartialEq)]
pub struct PointCloud {
	points: Vec<Vector3>,
	features: Vec<f64>,
	labels: Vec<i32>,
	width: usize,
}

impl PointCloud {
	pub fn new(width: usize) -> PointCloud {
		PointCloud {
			points: Vec::new(),
			features: Vec::new(),
			labels: Vec::new(),
			width,
		}
	}

	pub fn with_capacity(width: usize, capacity: usize) -> PointCloud {
		PointCloud {
			points: Vec::with_capacity(capacity),
			features: Vec::with_capacity(capacity * width),
			labels: Vec::with_capacity(capacity),
			width,
		}
	}

	pub fn from_parts(
		points: Vec<Vector3>,
		features: Vec<f64>,
		width: usize,
		labels: Vec<i32>,
	) -> Result<PointCloud> {
		if points.len() != labels.len() {
			return Err(PrepError::shape(format!(
				"{} labels for {} points",
				labels.len(),
				points.len()
			)));
		}
		if features.len() != points.len() * width {
			return Err(PrepError::shape(format!(
				"{} feature values for {} points of width {}",
				features.len(),
				points.len(),
				width
			)));
		}

		Ok(PointCloud {
			points,
			features,
			labels,
			width,
		})
	}

	pub fn push(&mut self, point: Vector3, features: &[f64], label: i32) -> Result<()> {
		if features.len() != self.width {
			return Err(PrepError::shape(format!(
				"point {} has {} features, expected {}",
				self.points.len(),
				features.len(),
				self.width
			)));
		}
		self.points.push(point);
		self.features.extend_from_slice(features);
		self.labels.push(label);

		Ok(())
	}

	pub fn len(&self) -> usize {
		self.points.len()
	}

	pub fn is_empty(&self) -> bool {
		self.points.is_empty()
	}

	pub fn width(&self) -> usize {
		self.width
	}

	pub fn points(&self) -> &[Vector3] {
		&self.points
	}

	pub fn labels(&self) -> &[i32] {
		&self.labels
	}

	pub fn point(&self, index: usize) -> &Vector3 {
		&self.points[index]
	}

	pub fn features(&self, index: usize) -> &[f64] {
		&self.features[index * self.width..(index + 1) * self.width]
	}

	pub fn label(&self, index: usize) -> i32 {
		self.labels[index]
	}
}
