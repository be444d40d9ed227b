//! JSON scene files for the in-memory host.
//!
//! ```json
//! { "elements": [
//!     { "name": "C1", "category": "Column",
//!       "level": { "name": "L1", "elevation": 0.0 },
//!       "geometry": [ { "box": { "min": [0, 0, 0], "max": [1, 1, 10] } } ] }
//! ] }
//! ```
//!
//! Geometry entries are `box`, `prism` (outer loop, holes, sweep direction)
//! or `instance` (translation, rotation about Z in degrees, children).
//! Lengths are in feet.

use std::collections::BTreeSet;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::math::{Isometry3, Point3, Vector3};
use crate::model::{
    Category, ElementId, ElementInfo, ExclusionFlags, HostGeometry, Level, MemoryModel, ZoneKey,
};
use crate::operations::creation::MakeBox;
use crate::operations::shaping::Extrude;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SceneGeometry {
    Box {
        min: [f64; 3],
        max: [f64; 3],
    },
    Prism {
        outer: Vec<[f64; 3]>,
        #[serde(default)]
        holes: Vec<Vec<[f64; 3]>>,
        direction: [f64; 3],
    },
    Instance {
        #[serde(default)]
        translation: [f64; 3],
        #[serde(default)]
        rotation_z_deg: f64,
        children: Vec<SceneGeometry>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct SceneElement {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    pub category: Category,
    #[serde(default)]
    pub level: Option<Level>,
    #[serde(default)]
    pub zone: Option<ZoneKey>,
    #[serde(default)]
    pub flags: ExclusionFlags,
    #[serde(default)]
    pub geometry: Vec<SceneGeometry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Scene {
    pub elements: Vec<SceneElement>,
}

fn point(p: [f64; 3]) -> Point3 {
    Point3::new(p[0], p[1], p[2])
}

impl SceneGeometry {
    fn build(&self) -> Result<HostGeometry> {
        Ok(match self {
            Self::Box { min, max } => {
                HostGeometry::Solid(MakeBox::new(point(*min), point(*max)).execute()?)
            }
            Self::Prism {
                outer,
                holes,
                direction,
            } => {
                let outer = outer.iter().copied().map(point).collect();
                let holes = holes
                    .iter()
                    .map(|hole| hole.iter().copied().map(point).collect())
                    .collect();
                let direction = Vector3::new(direction[0], direction[1], direction[2]);
                HostGeometry::Solid(Extrude::new(outer, holes, direction).execute()?)
            }
            Self::Instance {
                translation,
                rotation_z_deg,
                children,
            } => HostGeometry::Instance {
                transform: Isometry3::new(
                    Vector3::new(translation[0], translation[1], translation[2]),
                    Vector3::z() * rotation_z_deg.to_radians(),
                ),
                children: children.iter().map(Self::build).collect::<Result<_>>()?,
            },
        })
    }
}

impl Scene {
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] for malformed input.
    pub fn from_json_str(json: &str) -> std::result::Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> std::result::Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Builds an in-memory host from the scene.
    ///
    /// # Errors
    ///
    /// Returns an error for duplicate ids or geometry that cannot be built.
    pub fn into_model(self) -> Result<MemoryModel> {
        let mut model = MemoryModel::new();
        let mut seen = BTreeSet::new();
        for element in self.elements {
            let geometry = element
                .geometry
                .iter()
                .map(SceneGeometry::build)
                .collect::<Result<Vec<_>>>()?;
            let mut info = ElementInfo::new(element.name, element.category);
            info.level = element.level;
            info.zone = element.zone;
            info.flags = element.flags;
            match element.id {
                Some(id) => {
                    if !seen.insert(id) {
                        return Err(ConfigError::Invalid(format!("duplicate element id {id}")).into());
                    }
                    model.add_element_with_id(ElementId(id), info, geometry);
                }
                None => {
                    let id = model.add_element(info, geometry);
                    seen.insert(id.0);
                }
            }
        }
        debug!(elements = seen.len(), "Loaded scene");
        Ok(model)
    }
}
