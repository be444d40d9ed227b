use crate::error::{GeometryError, Result};
use crate::geometry::Plane;
use crate::math::{Point2, Point3, Vector3, TOLERANCE, VOLUME_EPSILON};
use crate::operations::decompose::decompose_polygon;
use crate::topology::{ConvexCell, Face, Solid};

enum Profile {
    /// Simple polygon with holes, decomposed before sweeping.
    Polygon {
        outer: Vec<Point3>,
        holes: Vec<Vec<Point3>>,
    },
    /// Loops that are already convex.
    Convex(Vec<Vec<Point3>>),
}

/// Extrudes a planar profile along a direction vector to create a solid.
pub struct Extrude {
    profile: Profile,
    direction: Vector3,
}

impl Extrude {
    /// Extrudes a profile given by an outer loop and optional holes.
    #[must_use]
    pub fn new(outer: Vec<Point3>, holes: Vec<Vec<Point3>>, direction: Vector3) -> Self {
        Self {
            profile: Profile::Polygon { outer, holes },
            direction,
        }
    }

    /// Extrudes the region of a boundary face.
    #[must_use]
    pub fn from_face(face: &Face, direction: Vector3) -> Self {
        let loops = face
            .boundary_loops()
            .iter()
            .map(|lp| lp.points().to_vec())
            .collect();
        Self {
            profile: Profile::Convex(loops),
            direction,
        }
    }

    /// Executes the extrusion, one prism per convex piece of the profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the direction is zero-length or parallel to the
    /// profile, the profile cannot be decomposed, or the result has no
    /// volume.
    pub fn execute(&self) -> Result<Solid> {
        if self.direction.norm() < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }

        let pieces = match &self.profile {
            Profile::Convex(loops) => loops.clone(),
            Profile::Polygon { outer, holes } => {
                let plane = Plane::from_polygon(outer)?;
                let outer_2d: Vec<Point2> = outer.iter().map(|p| plane.project(p)).collect();
                let holes_2d: Vec<Vec<Point2>> = holes
                    .iter()
                    .map(|h| h.iter().map(|p| plane.project(p)).collect())
                    .collect();
                decompose_polygon(&outer_2d, &holes_2d)?
                    .iter()
                    .map(|piece| piece.iter().map(|uv| plane.lift(uv)).collect())
                    .collect()
            }
        };

        let cells = pieces
            .iter()
            .map(|piece| ConvexCell::prism(piece, &self.direction))
            .collect::<Result<Vec<_>>>()?;
        let solid = Solid::from_cells(cells);
        if solid.volume() <= VOLUME_EPSILON {
            return Err(GeometryError::Degenerate("extrusion has no volume".into()).into());
        }
        Ok(solid)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    #[test]
    fn unit_cube_has_6_faces() {
        let square = vec![
            p(0.0, 0.0, 0.0),
            p(1.0, 0.0, 0.0),
            p(1.0, 1.0, 0.0),
            p(0.0, 1.0, 0.0),
        ];
        let solid = Extrude::new(square, vec![], Vector3::new(0.0, 0.0, 1.0))
            .execute()
            .unwrap();
        assert_eq!(solid.faces().len(), 6);
        assert_relative_eq!(solid.volume(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn l_shape_has_8_faces() {
        let l = vec![
            p(0.0, 0.0, 0.0),
            p(2.0, 0.0, 0.0),
            p(2.0, 1.0, 0.0),
            p(1.0, 1.0, 0.0),
            p(1.0, 2.0, 0.0),
            p(0.0, 2.0, 0.0),
        ];
        let solid = Extrude::new(l, vec![], Vector3::new(0.0, 0.0, 3.0))
            .execute()
            .unwrap();
        assert_eq!(solid.faces().len(), 8);
        assert_relative_eq!(solid.volume(), 9.0, epsilon = 1e-9);
        // 2 * 3 (caps) + perimeter 8 * height 3
        assert_relative_eq!(solid.surface_area(), 30.0, epsilon = 1e-9);
    }

    #[test]
    fn profile_with_hole() {
        let outer = vec![
            p(0.0, 0.0, 0.0),
            p(4.0, 0.0, 0.0),
            p(4.0, 4.0, 0.0),
            p(0.0, 4.0, 0.0),
        ];
        let hole = vec![
            p(1.0, 1.0, 0.0),
            p(3.0, 1.0, 0.0),
            p(3.0, 3.0, 0.0),
            p(1.0, 3.0, 0.0),
        ];
        let solid = Extrude::new(outer, vec![hole], Vector3::new(0.0, 0.0, 1.0))
            .execute()
            .unwrap();
        assert_relative_eq!(solid.volume(), 12.0, epsilon = 1e-9);
        // Caps 2 * 12, outer walls 16, inner walls 8.
        assert_relative_eq!(solid.surface_area(), 48.0, epsilon = 1e-9);
    }

    #[test]
    fn zero_direction_fails() {
        let tri = vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0)];
        assert!(Extrude::new(tri, vec![], Vector3::zeros()).execute().is_err());
    }
}
