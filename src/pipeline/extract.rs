use crate::error::GeometryError;
use crate::math::VOLUME_EPSILON;
use crate::model::{ElementId, HostGeometry, HostModel};
use crate::topology::Solid;

/// Solids pulled out of one element.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub solids: Vec<Solid>,
    /// Instances nested more than one level deep, which are not expanded.
    pub dropped_instances: usize,
}

/// Reads element geometry from the host as positive-volume solids.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeometryExtractor;

impl GeometryExtractor {
    /// Flattens the element's geometry one instance level deep.
    ///
    /// # Errors
    ///
    /// Returns the host's [`GeometryError`] if it cannot produce geometry.
    pub fn extract<H: HostModel + ?Sized>(
        &self,
        host: &H,
        id: ElementId,
    ) -> Result<Extraction, GeometryError> {
        let geometry = host.geometry(id)?;
        let mut extraction = Extraction::default();
        for item in geometry {
            match item {
                HostGeometry::Solid(solid) => extraction.push(solid),
                HostGeometry::Instance {
                    transform,
                    children,
                } => {
                    for child in children {
                        match child {
                            HostGeometry::Solid(solid) => {
                                extraction.push(solid.transformed(&transform));
                            }
                            HostGeometry::Instance { .. } => extraction.dropped_instances += 1,
                        }
                    }
                }
            }
        }
        Ok(extraction)
    }
}

impl Extraction {
    fn push(&mut self, solid: Solid) {
        if solid.is_finite() && solid.volume() > VOLUME_EPSILON {
            self.solids.push(solid);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::{Isometry3, Point3};
    use crate::model::{Category, ElementInfo, MemoryModel};
    use crate::operations::creation::MakeBox;
    use approx::assert_relative_eq;

    fn cube(size: f64) -> Solid {
        MakeBox::new(Point3::origin(), Point3::new(size, size, size))
            .execute()
            .unwrap()
    }

    #[test]
    fn instances_are_flattened_one_level() {
        let mut model = MemoryModel::new();
        let moved = Isometry3::translation(10.0, 0.0, 0.0);
        let id = model.add_element(
            ElementInfo::new("C1", Category::Column),
            vec![
                HostGeometry::Solid(cube(1.0)),
                HostGeometry::Instance {
                    transform: moved,
                    children: vec![
                        HostGeometry::Solid(cube(2.0)),
                        HostGeometry::Instance {
                            transform: Isometry3::identity(),
                            children: vec![HostGeometry::Solid(cube(3.0))],
                        },
                    ],
                },
            ],
        );
        let extraction = GeometryExtractor.extract(&model, id).unwrap();
        assert_eq!(extraction.solids.len(), 2);
        assert_eq!(extraction.dropped_instances, 1);
        let placed = extraction.solids[1].aabb().unwrap();
        assert_relative_eq!(placed.min.x, 10.0, epsilon = 1e-9);
        assert_relative_eq!(extraction.solids[1].volume(), 8.0, epsilon = 1e-9);
    }

    #[test]
    fn empty_solids_are_dropped() {
        let mut model = MemoryModel::new();
        let id = model.add_element(
            ElementInfo::new("S", Category::Slab),
            vec![HostGeometry::Solid(Solid::default()), HostGeometry::Solid(cube(1.0))],
        );
        let extraction = GeometryExtractor.extract(&model, id).unwrap();
        assert_eq!(extraction.solids.len(), 1);
        assert!(extraction.solids.iter().all(|s| s.volume() > VOLUME_EPSILON));
    }

    #[test]
    fn host_failure_is_reported() {
        let mut model = MemoryModel::new();
        let id = model.add_element(
            ElementInfo::new("W", Category::Wall),
            vec![HostGeometry::Solid(cube(1.0))],
        );
        let model = model.with_geometry_failure(id);
        let err = GeometryExtractor.extract(&model, id).unwrap_err();
        assert!(matches!(err, GeometryError::Extraction { .. }));
    }
}
