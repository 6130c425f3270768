use crate::model::vector3::Vector3;
use ord_subset::OrdSubsetIterExt;
use serde::Serialize;

/// Axis-aligned extent of a set of points.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Bounds {
	pub min: Vector3,
	pub max: Vector3,
}

impl Bounds {
	pub fn size(&self) -> Vector3 {
		&self.max - &self.min
	}
}

/// Returns `None` for an empty slice.
pub fn find_bounds(points: &[Vector3]) -> Option<Bounds> {
	let xs: Vec<f64> = points.iter().map(|p| p.x).collect();
	let ys: Vec<f64> = points.iter().map(|p| p.y).collect();
	let zs: Vec<f64> = points.iter().map(|p| p.z).collect();

	Some(Bounds {
		min: Vector3::new(
			*xs.iter().ord_subset_min()?,
			*ys.iter().ord_subset_min()?,
			*zs.iter().ord_subset_min()?,
		),
		max: Vector3::new(
			*xs.iter().ord_subset_max()?,
			*ys.iter().ord_subset_max()?,
			*zs.iter().ord_subset_max()?,
		),
	})
}
