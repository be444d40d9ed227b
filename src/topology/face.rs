use crate::geometry::Plane;
use crate::math::{Point3, Vector3};

use super::curve_loop::CurveLoop;

/// A planar boundary region of a solid.
///
/// The region is the union of convex loops that share the face plane and
/// are connected through common edges. The plane normal points out of the
/// solid.
#[derive(Debug, Clone)]
pub struct Face {
    plane: Plane,
    loops: Vec<CurveLoop>,
    area: f64,
}

impl Face {
    #[must_use]
    pub fn new(plane: Plane, loops: Vec<CurveLoop>) -> Self {
        let area = loops.iter().map(CurveLoop::area).sum();
        Self { plane, loops, area }
    }

    #[must_use]
    pub fn plane(&self) -> &Plane {
        &self.plane
    }

    /// Outward unit normal.
    #[must_use]
    pub fn normal(&self) -> &Vector3 {
        self.plane.normal()
    }

    /// Convex loops partitioning the face, each wound about the outward normal.
    #[must_use]
    pub fn boundary_loops(&self) -> &[CurveLoop] {
        &self.loops
    }

    #[must_use]
    pub fn area(&self) -> f64 {
        self.area
    }

    /// A point strictly inside the face: the centroid of its largest loop.
    #[must_use]
    pub fn interior_point(&self) -> Point3 {
        self.loops
            .iter()
            .max_by(|a, b| a.area().total_cmp(&b.area()))
            .map_or(*self.plane.origin(), CurveLoop::centroid)
    }
}
