use crate::error::{GeometryError, Result};
use crate::geometry::Plane;
use crate::math::polygon_2d::polygon_centroid_2d;
use crate::math::polygon_3d::{dedup_loop, newell_normal, polygon_area_3d};
use crate::math::{Point2, Point3, Vector3};

/// A closed planar polygon loop.
///
/// The winding defines the normal (counter-clockwise about it).
#[derive(Debug, Clone)]
pub struct CurveLoop {
    points: Vec<Point3>,
    normal: Vector3,
}

impl CurveLoop {
    /// Creates a loop from its vertices. The closing edge is implicit.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than 3 distinct points remain or the
    /// points enclose no area.
    pub fn new(points: Vec<Point3>) -> Result<Self> {
        let points = dedup_loop(&points);
        if points.len() < 3 {
            return Err(GeometryError::CurveLoop(format!(
                "loop needs at least 3 distinct points, got {}",
                points.len()
            ))
            .into());
        }
        let normal = newell_normal(&points)
            .ok_or_else(|| GeometryError::CurveLoop("loop encloses no area".into()))?;
        Ok(Self { points, normal })
    }

    #[must_use]
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    #[must_use]
    pub fn normal(&self) -> &Vector3 {
        &self.normal
    }

    #[must_use]
    pub fn area(&self) -> f64 {
        polygon_area_3d(&self.points, &self.normal)
    }

    /// Supporting plane of the loop.
    ///
    /// # Errors
    ///
    /// Never fails for a loop built through [`CurveLoop::new`].
    pub fn plane(&self) -> Result<Plane> {
        Plane::from_normal(self.points[0], self.normal)
    }

    /// Area-weighted centroid.
    #[must_use]
    pub fn centroid(&self) -> Point3 {
        match self.plane() {
            Ok(plane) => {
                let uv: Vec<Point2> = self.points.iter().map(|p| plane.project(p)).collect();
                plane.lift(&polygon_centroid_2d(&uv))
            }
            Err(_) => self.points[0],
        }
    }

    #[must_use]
    pub fn translated(&self, offset: &Vector3) -> Self {
        Self {
            points: self.points.iter().map(|p| p + offset).collect(),
            normal: self.normal,
        }
    }

    #[must_use]
    pub fn reversed(&self) -> Self {
        let mut points = self.points.clone();
        points.reverse();
        Self {
            points,
            normal: -self.normal,
        }
    }
}
