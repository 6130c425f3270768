use crate::error::{PrepError, Result};
use crate::model::cloud::PointCloud;
use crate::model::vector3::Vector3;
use hashbrown::HashMap;
use std::collections::BTreeMap;

/// Integer cell index of a point on a regular grid.
pub type VoxelKey = (i64, i64, i64);

pub fn voxel_key(point: &Vector3, grid_size: f64) -> VoxelKey {
	(
		(point.x / grid_size).floor() as i64,
		(point.y / grid_size).floor() as i64,
		(point.z / grid_size).floor() as i64,
	)
}

struct VoxelAccum {
	first: Vector3,
	position: Vector3,
	features: Vec<f64>,
	labels: BTreeMap<i32, usize>,
	n: usize,
}

impl VoxelAccum {
	fn new(first: Vector3, width: usize) -> VoxelAccum {
		VoxelAccum {
			first,
			position: Vector3::empty(),
			features: vec![0.0; width],
			labels: BTreeMap::new(),
			n: 0,
		}
	}

	fn add(&mut self, point: &Vector3, features: &[f64], label: i32) {
		self.position += point;
		for (sum, value) in self.features.iter_mut().zip(features) {
			*sum += value;
		}
		*self.labels.entry(label).or_insert(0) += 1;
		self.n += 1;
	}

	/// Most frequent label, the smallest id on ties.
	fn label(&self) -> i32 {
		let mut best = (0, 0);
		for (&label, &count) in &self.labels {
			if count > best.1 {
				best = (label, count);
			}
		}
		best.0
	}
}

/// Collapses every occupied grid cell into one point.
///
/// The output point is the centroid of the cell, or the first point seen in
/// the cell when the rounded centroid falls outside it. Its features are the
/// elementwise mean, and its label is the plurality label of the cell. Cells
/// are emitted in ascending key order, so identical input always gives
/// identical output. An empty cloud subsamples to an empty cloud.
pub fn grid_subsample(cloud: &PointCloud, grid_size: f64) -> Result<PointCloud> {
	if !grid_size.is_finite() || grid_size <= 0.0 {
		return Err(PrepError::InvalidGridSize(grid_size));
	}

	let width = cloud.width();
	if cloud.is_empty() {
		return Ok(PointCloud::new(width));
	}

	let mut bins: HashMap<VoxelKey, VoxelAccum> = HashMap::new();
	for i in 0..cloud.len() {
		let point = cloud.point(i);
		if !point.is_finite() {
			return Err(PrepError::shape(format!("point {} is not finite", i)));
		}

		bins.entry(voxel_key(point, grid_size))
			.or_insert_with(|| VoxelAccum::new(*point, width))
			.add(point, cloud.features(i), cloud.label(i));
	}

	let mut keys: Vec<VoxelKey> = bins.keys().copied().collect();
	keys.sort_unstable();

	let mut points = Vec::with_capacity(keys.len());
	let mut features = Vec::with_capacity(keys.len() * width);
	let mut labels = Vec::with_capacity(keys.len());
	for key in keys {
		let Some(accum) = bins.get(&key) else {
			continue;
		};
		let denom = accum.n as f64;
		let centroid = accum.position / denom;
		// Rounding can put a centroid on the far side of a cell boundary.
		if voxel_key(&centroid, grid_size) == key {
			points.push(centroid);
		} else {
			points.push(accum.first);
		}
		features.extend(accum.features.iter().map(|sum| sum / denom));
		labels.push(accum.label());
	}

	PointCloud::from_parts(points, features, width, labels)
}
