use serde::{Deserialize, Serialize};

use crate::error::MeshError;
use crate::filter::{CollisionFilter, Material};

/// Per-mesh build configuration: the filter and material every primitive
/// of a newly built mesh resolves to.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshSettings {
    #[serde(default)]
    pub filter: CollisionFilter,
    #[serde(default)]
    pub material: Material,
}

impl MeshSettings {
    /// # Errors
    ///
    /// Returns [`MeshError::Settings`] for malformed JSON.
    pub fn from_json(json: &str) -> Result<Self, MeshError> {
        Ok(serde_json::from_str(json)?)
    }

    /// # Errors
    ///
    /// Returns [`MeshError::Settings`] if serialization fails.
    pub fn to_json(&self) -> Result<String, MeshError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
