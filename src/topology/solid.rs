use std::sync::OnceLock;

use crate::geometry::Aabb;
use crate::math::{Isometry3, Point3, PLANE_TOLERANCE};

use super::boundary::extract_faces;
use super::cell::{ConvexCell, PointClassification};
use super::face::Face;

/// A closed solid stored as interior-disjoint convex cells.
///
/// Disconnected parts and internal voids are both representable. The
/// boundary faces are derived from the cells on first use.
#[derive(Debug, Clone, Default)]
pub struct Solid {
    cells: Vec<ConvexCell>,
    faces: OnceLock<Vec<Face>>,
}

impl Solid {
    #[must_use]
    pub fn from_cells(cells: Vec<ConvexCell>) -> Self {
        Self {
            cells,
            faces: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn cells(&self) -> &[ConvexCell] {
        &self.cells
    }

    #[must_use]
    pub fn into_cells(self) -> Vec<ConvexCell> {
        self.cells
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[must_use]
    pub fn volume(&self) -> f64 {
        self.cells.iter().map(ConvexCell::volume).fold(0.0, |acc, v| acc + v)
    }

    #[must_use]
    pub fn aabb(&self) -> Option<Aabb> {
        self.cells
            .iter()
            .filter_map(ConvexCell::aabb)
            .reduce(|a, b| a.union(&b))
    }

    /// Boundary faces with outward normals.
    pub fn faces(&self) -> &[Face] {
        self.faces.get_or_init(|| extract_faces(&self.cells))
    }

    /// Total boundary area.
    pub fn surface_area(&self) -> f64 {
        self.faces().iter().map(Face::area).fold(0.0, |acc, a| acc + a)
    }

    /// Classifies a point against the solid.
    ///
    /// Points on an interface between two cells report `OnBoundary`.
    #[must_use]
    pub fn contains_point(&self, point: &Point3) -> PointClassification {
        let mut result = PointClassification::Outside;
        for cell in &self.cells {
            match cell.classify_point(point, PLANE_TOLERANCE) {
                PointClassification::Inside => return PointClassification::Inside,
                PointClassification::OnBoundary => result = PointClassification::OnBoundary,
                PointClassification::Outside => {}
            }
        }
        result
    }

    #[must_use]
    pub fn transformed(&self, iso: &Isometry3) -> Self {
        Self::from_cells(self.cells.iter().map(|c| c.transformed(iso)).collect())
    }

    /// Returns `true` if every vertex coordinate is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.cells.iter().all(|c| {
            c.faces()
                .iter()
                .flat_map(|f| f.polygon.iter())
                .all(|p| p.coords.iter().all(|x| x.is_finite()))
        })
    }
}
