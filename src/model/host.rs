use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GeometryError, ModelError, ParameterError};
use crate::geometry::Aabb;
use crate::math::Isometry3;
use crate::topology::Solid;

use super::{Category, ElementId, ElementInfo};

/// Storage type of a host parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageType {
    Double,
    Integer,
    Text,
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Double => "double",
            Self::Integer => "integer",
            Self::Text => "text",
        };
        f.write_str(name)
    }
}

/// A parameter value read from or written to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterValue {
    Double(f64),
    Integer(i64),
    Text(String),
}

impl ParameterValue {
    #[must_use]
    pub fn storage_type(&self) -> StorageType {
        match self {
            Self::Double(_) => StorageType::Double,
            Self::Integer(_) => StorageType::Integer,
            Self::Text(_) => StorageType::Text,
        }
    }

    #[must_use]
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }
}

/// Geometry as the host hands it out: solids, possibly nested in instances.
#[derive(Debug, Clone)]
pub enum HostGeometry {
    Solid(Solid),
    /// Geometry placed by a rigid transform.
    Instance {
        transform: Isometry3,
        children: Vec<HostGeometry>,
    },
}

/// Element query by category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryFilter {
    pub categories: Vec<Category>,
}

impl CategoryFilter {
    #[must_use]
    pub fn new(categories: &[Category]) -> Self {
        Self {
            categories: categories.to_vec(),
        }
    }

    #[must_use]
    pub fn matches(&self, category: Category) -> bool {
        self.categories.contains(&category)
    }
}

/// The building model the engine reads from and writes formwork back to.
///
/// All writes happen inside a batch opened with [`HostModel::begin_batch`].
pub trait HostModel {
    /// Returns `false` if no model is open.
    fn is_available(&self) -> bool;

    /// Ids of the elements whose category passes the filter, in any order.
    fn find_elements(&self, filter: &CategoryFilter) -> Vec<ElementId>;

    /// # Errors
    ///
    /// Returns [`ModelError::ElementNotFound`] for unknown ids.
    fn element_info(&self, id: ElementId) -> Result<ElementInfo, ModelError>;

    /// Raw geometry of an element.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Extraction`] if the host cannot produce it.
    fn geometry(&self, id: ElementId) -> Result<Vec<HostGeometry>, GeometryError>;

    fn bounding_box(&self, id: ElementId) -> Option<Aabb>;

    /// Formwork elements previously generated for `host`, found through the
    /// link recorded by [`HostModel::create_geometry_element`].
    fn generated_elements(&self, host: ElementId) -> Vec<ElementId>;

    /// # Errors
    ///
    /// Returns an error if the element or parameter does not exist.
    fn parameter(&self, id: ElementId, name: &str) -> Result<ParameterValue, ParameterError>;

    /// # Errors
    ///
    /// Returns [`ModelError::BatchAlreadyOpen`] if a batch is open.
    fn begin_batch(&mut self, name: &str) -> Result<(), ModelError>;

    /// # Errors
    ///
    /// Returns an error if no batch is open or the host rejects the batch.
    fn commit_batch(&mut self) -> Result<(), ModelError>;

    /// # Errors
    ///
    /// Returns [`ModelError::NoOpenBatch`] if no batch is open.
    fn rollback_batch(&mut self) -> Result<(), ModelError>;

    /// Creates a geometry-only element holding `solids`, generated for `host`.
    ///
    /// The host link is part of the element itself, so it survives failed
    /// parameter writes.
    ///
    /// # Errors
    ///
    /// Returns an error outside a batch or if the host rejects the geometry.
    fn create_geometry_element(
        &mut self,
        host: ElementId,
        solids: &[Solid],
        category: Category,
    ) -> Result<ElementId, ModelError>;

    /// # Errors
    ///
    /// Returns an error if the parameter is missing, read-only or has a
    /// different storage type.
    fn set_parameter(
        &mut self,
        id: ElementId,
        name: &str,
        value: ParameterValue,
    ) -> Result<(), ParameterError>;

    /// # Errors
    ///
    /// Returns an error outside a batch or for unknown ids.
    fn delete_element(&mut self, id: ElementId) -> Result<(), ModelError>;
}
