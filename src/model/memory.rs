use std::collections::{BTreeMap, BTreeSet};

use crate::error::{GeometryError, ModelError, ParameterError};
use crate::geometry::Aabb;
use crate::piece::params;
use crate::topology::Solid;

use super::host::{CategoryFilter, HostGeometry, HostModel, ParameterValue, StorageType};
use super::{Category, ElementId, ElementInfo};

/// Declared parameter on generated elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterSpec {
    pub storage: StorageType,
    pub read_only: bool,
}

#[derive(Debug, Clone)]
struct MemoryElement {
    info: ElementInfo,
    geometry: Vec<HostGeometry>,
    parameters: BTreeMap<String, ParameterValue>,
    /// Host element a generated element belongs to.
    generated_for: Option<ElementId>,
}

#[derive(Debug)]
struct OpenBatch {
    name: String,
    saved: BTreeMap<ElementId, MemoryElement>,
    saved_next_id: i64,
}

/// In-memory [`HostModel`] used by the CLI and the tests.
///
/// Batches snapshot the element table so a rollback restores it exactly.
#[derive(Debug)]
pub struct MemoryModel {
    elements: BTreeMap<ElementId, MemoryElement>,
    next_id: i64,
    schema: BTreeMap<String, ParameterSpec>,
    batch: Option<OpenBatch>,
    available: bool,
    geometry_failures: BTreeSet<ElementId>,
    reject_commit: bool,
    committed_batches: Vec<String>,
}

impl Default for MemoryModel {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryModel {
    /// Creates an empty model with the formwork parameter schema.
    #[must_use]
    pub fn new() -> Self {
        let schema = params::ALL
            .iter()
            .map(|&(name, storage)| {
                (
                    name.to_string(),
                    ParameterSpec {
                        storage,
                        read_only: false,
                    },
                )
            })
            .collect();
        Self {
            elements: BTreeMap::new(),
            next_id: 1,
            schema,
            batch: None,
            available: true,
            geometry_failures: BTreeSet::new(),
            reject_commit: false,
            committed_batches: Vec::new(),
        }
    }

    /// Adds a model element and returns its id.
    pub fn add_element(&mut self, info: ElementInfo, geometry: Vec<HostGeometry>) -> ElementId {
        let id = ElementId(self.next_id);
        self.next_id += 1;
        self.insert(id, info, geometry);
        id
    }

    /// Adds a model element under a caller-chosen id.
    pub fn add_element_with_id(
        &mut self,
        id: ElementId,
        info: ElementInfo,
        geometry: Vec<HostGeometry>,
    ) {
        self.next_id = self.next_id.max(id.0 + 1);
        self.insert(id, info, geometry);
    }

    fn insert(&mut self, id: ElementId, info: ElementInfo, geometry: Vec<HostGeometry>) {
        self.elements.insert(
            id,
            MemoryElement {
                info,
                geometry,
                parameters: BTreeMap::new(),
                generated_for: None,
            },
        );
    }

    /// Marks the model as closed.
    #[must_use]
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Makes `geometry(id)` fail.
    #[must_use]
    pub fn with_geometry_failure(mut self, id: ElementId) -> Self {
        self.geometry_failures.insert(id);
        self
    }

    /// Makes every commit fail.
    #[must_use]
    pub fn with_commit_failure(mut self) -> Self {
        self.reject_commit = true;
        self
    }

    /// Declares or overrides a parameter on generated elements.
    #[must_use]
    pub fn with_parameter(mut self, name: &str, spec: ParameterSpec) -> Self {
        self.schema.insert(name.to_string(), spec);
        self
    }

    /// Removes a parameter from the schema.
    #[must_use]
    pub fn without_parameter(mut self, name: &str) -> Self {
        self.schema.remove(name);
        self
    }

    /// All generated formwork elements, in id order.
    #[must_use]
    pub fn all_generated(&self) -> Vec<ElementId> {
        self.elements
            .iter()
            .filter(|(_, e)| e.info.is_generated)
            .map(|(&id, _)| id)
            .collect()
    }

    /// Solids stored on an element.
    #[must_use]
    pub fn solids_of(&self, id: ElementId) -> Vec<&Solid> {
        self.elements.get(&id).map_or_else(Vec::new, |e| {
            e.geometry
                .iter()
                .filter_map(|g| match g {
                    HostGeometry::Solid(s) => Some(s),
                    HostGeometry::Instance { .. } => None,
                })
                .collect()
        })
    }

    /// Names of the batches committed so far.
    #[must_use]
    pub fn committed_batches(&self) -> &[String] {
        &self.committed_batches
    }

    #[must_use]
    pub fn in_batch(&self) -> bool {
        self.batch.is_some()
    }

    fn require_batch(&self) -> Result<(), ModelError> {
        if self.batch.is_some() {
            Ok(())
        } else {
            Err(ModelError::NoOpenBatch)
        }
    }
}

fn geometry_aabb(geometry: &[HostGeometry]) -> Option<Aabb> {
    geometry
        .iter()
        .filter_map(|g| match g {
            HostGeometry::Solid(s) => s.aabb(),
            HostGeometry::Instance {
                transform,
                children,
            } => {
                let moved: Vec<HostGeometry> = children
                    .iter()
                    .filter_map(|c| match c {
                        HostGeometry::Solid(s) => Some(HostGeometry::Solid(s.transformed(transform))),
                        HostGeometry::Instance { .. } => None,
                    })
                    .collect();
                geometry_aabb(&moved)
            }
        })
        .reduce(|a, b| a.union(&b))
}

impl HostModel for MemoryModel {
    fn is_available(&self) -> bool {
        self.available
    }

    fn find_elements(&self, filter: &CategoryFilter) -> Vec<ElementId> {
        self.elements
            .iter()
            .filter(|(_, e)| filter.matches(e.info.category))
            .map(|(&id, _)| id)
            .collect()
    }

    fn element_info(&self, id: ElementId) -> Result<ElementInfo, ModelError> {
        self.elements
            .get(&id)
            .map(|e| e.info.clone())
            .ok_or(ModelError::ElementNotFound(id))
    }

    fn geometry(&self, id: ElementId) -> Result<Vec<HostGeometry>, GeometryError> {
        if self.geometry_failures.contains(&id) {
            return Err(GeometryError::Extraction {
                element: id,
                reason: "host returned corrupt geometry".into(),
            });
        }
        self.elements
            .get(&id)
            .map(|e| e.geometry.clone())
            .ok_or_else(|| GeometryError::Extraction {
                element: id,
                reason: "element not found".into(),
            })
    }

    fn bounding_box(&self, id: ElementId) -> Option<Aabb> {
        self.elements.get(&id).and_then(|e| geometry_aabb(&e.geometry))
    }

    fn generated_elements(&self, host: ElementId) -> Vec<ElementId> {
        self.elements
            .iter()
            .filter(|(_, e)| e.info.is_generated && e.generated_for == Some(host))
            .map(|(&id, _)| id)
            .collect()
    }

    fn parameter(&self, id: ElementId, name: &str) -> Result<ParameterValue, ParameterError> {
        let element = self
            .elements
            .get(&id)
            .ok_or(ParameterError::ElementNotFound { element: id })?;
        element
            .parameters
            .get(name)
            .cloned()
            .ok_or_else(|| ParameterError::Missing { name: name.into() })
    }

    fn begin_batch(&mut self, name: &str) -> Result<(), ModelError> {
        if self.batch.is_some() {
            return Err(ModelError::BatchAlreadyOpen);
        }
        self.batch = Some(OpenBatch {
            name: name.to_string(),
            saved: self.elements.clone(),
            saved_next_id: self.next_id,
        });
        Ok(())
    }

    fn commit_batch(&mut self) -> Result<(), ModelError> {
        let Some(batch) = self.batch.as_ref() else {
            return Err(ModelError::NoOpenBatch);
        };
        if self.reject_commit {
            return Err(ModelError::Rejected(format!(
                "batch '{}' could not be committed",
                batch.name
            )));
        }
        if let Some(batch) = self.batch.take() {
            self.committed_batches.push(batch.name);
        }
        Ok(())
    }

    fn rollback_batch(&mut self) -> Result<(), ModelError> {
        let batch = self.batch.take().ok_or(ModelError::NoOpenBatch)?;
        self.elements = batch.saved;
        self.next_id = batch.saved_next_id;
        Ok(())
    }

    fn create_geometry_element(
        &mut self,
        host: ElementId,
        solids: &[Solid],
        category: Category,
    ) -> Result<ElementId, ModelError> {
        self.require_batch()?;
        if solids.is_empty() || solids.iter().any(|s| s.is_empty() || !s.is_finite()) {
            return Err(ModelError::Rejected("geometry element needs valid solids".into()));
        }
        let mut info = ElementInfo::new("Formwork", category);
        info.is_generated = true;
        let geometry = solids.iter().cloned().map(HostGeometry::Solid).collect();
        let id = self.add_element(info, geometry);
        if let Some(element) = self.elements.get_mut(&id) {
            element.generated_for = Some(host);
        }
        Ok(id)
    }

    fn set_parameter(
        &mut self,
        id: ElementId,
        name: &str,
        value: ParameterValue,
    ) -> Result<(), ParameterError> {
        let spec = self
            .schema
            .get(name)
            .copied()
            .ok_or_else(|| ParameterError::Missing { name: name.into() })?;
        let element = self
            .elements
            .get_mut(&id)
            .ok_or(ParameterError::ElementNotFound { element: id })?;
        if spec.read_only {
            return Err(ParameterError::ReadOnly { name: name.into() });
        }
        if spec.storage != value.storage_type() {
            return Err(ParameterError::WrongStorage {
                name: name.into(),
                expected: spec.storage,
                found: value.storage_type(),
            });
        }
        element.parameters.insert(name.to_string(), value);
        Ok(())
    }

    fn delete_element(&mut self, id: ElementId) -> Result<(), ModelError> {
        self.require_batch()?;
        self.elements
            .remove(&id)
            .map(|_| ())
            .ok_or(ModelError::ElementNotFound(id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::Point3;
    use crate::operations::creation::MakeBox;

    fn cube() -> Solid {
        MakeBox::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0))
            .execute()
            .unwrap()
    }

    #[test]
    fn writes_require_a_batch() {
        let mut model = MemoryModel::new();
        let err = model.create_geometry_element(ElementId(1), &[cube()], Category::Other);
        assert!(matches!(err, Err(ModelError::NoOpenBatch)));
        assert!(matches!(model.commit_batch(), Err(ModelError::NoOpenBatch)));
    }

    #[test]
    fn rollback_restores_elements() {
        let mut model = MemoryModel::new();
        let host = model.add_element(ElementInfo::new("C1", Category::Column), vec![]);
        model.begin_batch("run").unwrap();
        let piece = model.create_geometry_element(host, &[cube()], Category::Other).unwrap();
        assert_eq!(model.generated_elements(host), vec![piece]);
        model.rollback_batch().unwrap();
        assert!(model.generated_elements(host).is_empty());
        assert!(model.all_generated().is_empty());
    }

    #[test]
    fn commit_keeps_elements() {
        let mut model = MemoryModel::new();
        model.begin_batch("run").unwrap();
        model.create_geometry_element(ElementId(1), &[cube()], Category::Other).unwrap();
        model.commit_batch().unwrap();
        assert_eq!(model.all_generated().len(), 1);
        assert_eq!(model.committed_batches(), ["run".to_string()]);
        model.begin_batch("second").unwrap();
        assert!(matches!(
            model.begin_batch("third"),
            Err(ModelError::BatchAlreadyOpen)
        ));
    }

    #[test]
    fn parameter_schema_is_enforced() {
        let mut model = MemoryModel::new()
            .with_parameter(
                params::THICKNESS,
                ParameterSpec {
                    storage: StorageType::Double,
                    read_only: true,
                },
            )
            .without_parameter(params::MATERIAL);
        model.begin_batch("run").unwrap();
        let piece = model.create_geometry_element(ElementId(1), &[cube()], Category::Other).unwrap();

        let wrong = model.set_parameter(piece, params::EFFECTIVE_AREA, ParameterValue::Integer(3));
        assert!(matches!(wrong, Err(ParameterError::WrongStorage { .. })));
        let read_only = model.set_parameter(piece, params::THICKNESS, ParameterValue::Double(0.1));
        assert!(matches!(read_only, Err(ParameterError::ReadOnly { .. })));
        let missing = model.set_parameter(piece, params::MATERIAL, ParameterValue::Integer(1));
        assert!(matches!(missing, Err(ParameterError::Missing { .. })));
        model
            .set_parameter(piece, params::EFFECTIVE_AREA, ParameterValue::Double(2.5))
            .unwrap();
        assert_eq!(
            model.parameter(piece, params::EFFECTIVE_AREA).unwrap(),
            ParameterValue::Double(2.5)
        );
    }

    #[test]
    fn geometry_failure_is_reported() {
        let mut model = MemoryModel::new();
        let id = model.add_element(
            ElementInfo::new("W1", Category::Wall),
            vec![HostGeometry::Solid(cube())],
        );
        assert!(model.bounding_box(id).is_some());
        let model = model.with_geometry_failure(id);
        assert!(model.geometry(id).is_err());
    }
}
