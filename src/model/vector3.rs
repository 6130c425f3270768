use serde::Serialize;
use std::ops;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Vector3 {
	pub x: f64,
	pub y: f64,
	pub z: f64,
}

impl Vector3 {
	pub fn new(x: f64, y: f64, z: f64) -> Vector3 {
		Vector3 { x, y, z }
	}

	pub fn empty() -> Vector3 {
		Vector3 {
			x: 0.0,
			y: 0.0,
			z: 0.0,
		}
	}

	pub fn is_finite(&self) -> bool {
		self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
	}

	pub fn to_array(&self) -> [f64; 3] {
		[self.x, self.y, self.z]
	}
}

impl ops::AddAssign<&Vector3> for Vector3 {
	fn add_assign(&mut self, _rhs: &Vector3) {
		self.x += _rhs.x;
		self.y += _rhs.y;
		self.z += _rhs.z;
	}
}

impl ops::Div<f64> for Vector3 {
	type Output = Vector3;

	fn div(self, scalar: f64) -> Vector3 {
		Vector3 {
			x: self.x / scalar,
			y: self.y / scalar,
			z: self.z / scalar,
		}
	}
}

impl ops::Sub<&Vector3> for &Vector3 {
	type Output = Vector3;

	fn sub(self, _rhs: &Vector3) -> Vector3 {
		Vector3 {
			x: self.x - _rhs.x,
			y: self.y - _rhs.y,
			z: self.z - _rhs.z,
		}
	}
}
