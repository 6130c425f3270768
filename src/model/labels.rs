use crate::error::{PrepError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Class id to human readable name.
///
/// Passed explicitly to whatever needs names (evaluation logs, label
/// histograms). JSON form is a plain object: `{"0": "unlabeled", "1": "..."}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelTable {
	names: BTreeMap<i32, String>,
}

impl LabelTable {
	pub fn semantic3d() -> LabelTable {
		let names = [
			(0, "unlabeled"),
			(1, "man-made terrain"),
			(2, "natural terrain"),
			(3, "high vegetation"),
			(4, "low vegetation"),
			(5, "buildings"),
			(6, "hard scape"),
			(7, "scanning artefacts"),
			(8, "cars"),
		]
		.into_iter()
		.map(|(id, name)| (id, name.to_string()))
		.collect();

		LabelTable { names }
	}

	pub fn load(path: &Path) -> Result<LabelTable> {
		let contents = fs::read_to_string(path).map_err(|e| PrepError::io(path, e))?;
		serde_json::from_str(&contents).map_err(|e| PrepError::json(path, e))
	}

	/// Loads `path` when given, otherwise the Semantic3D table.
	pub fn load_or_default(path: Option<&Path>) -> Result<LabelTable> {
		match path {
			Some(path) => LabelTable::load(path),
			None => Ok(LabelTable::semantic3d()),
		}
	}

	/// Known ids in ascending order.
	pub fn ids(&self) -> impl Iterator<Item = i32> + '_ {
		self.names.keys().copied()
	}

	pub fn name(&self, id: i32) -> String {
		match self.names.get(&id) {
			Some(name) => name.clone(),
			None => format!("label {}", id),
		}
	}

	pub fn contains(&self, id: i32) -> bool {
		self.names.contains_key(&id)
	}
}
