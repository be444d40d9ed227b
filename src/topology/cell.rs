use crate::error::{GeometryError, Result};
use crate::geometry::{Aabb, Plane};
use crate::math::polygon_2d::convex_hull_2d;
use crate::math::polygon_3d::{
    newell_normal, polygon_area_3d, split_polygon_by_plane, vertex_centroid,
};
use crate::math::{
    Isometry3, Point2, Point3, Vector3, AREA_EPSILON, PLANE_TOLERANCE, SLIVER_VOLUME, TOLERANCE,
};

/// Classification of a point relative to a closed region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointClassification {
    Inside,
    Outside,
    OnBoundary,
}

/// A planar face of a convex cell, wound counter-clockwise about the
/// outward normal.
#[derive(Debug, Clone)]
pub struct CellFace {
    pub plane: Plane,
    pub polygon: Vec<Point3>,
}

impl CellFace {
    #[must_use]
    pub fn area(&self) -> f64 {
        polygon_area_3d(&self.polygon, self.plane.normal())
    }
}

/// Result of splitting a cell by a plane.
#[derive(Debug, Clone, Default)]
pub struct CellSplit {
    /// Part on the negative side of the cutting plane.
    pub below: Option<ConvexCell>,
    /// Part on the positive side of the cutting plane.
    pub above: Option<ConvexCell>,
}

/// A bounded convex polyhedron described by its outward-oriented faces.
#[derive(Debug, Clone)]
pub struct ConvexCell {
    faces: Vec<CellFace>,
}

impl ConvexCell {
    /// Builds a cell from face polygons of a convex polyhedron.
    ///
    /// Each polygon is re-wound if needed so its normal points away from
    /// the cell.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than 4 non-degenerate faces remain.
    pub fn from_polygons(polygons: Vec<Vec<Point3>>) -> Result<Self> {
        let all: Vec<Point3> = polygons.iter().flatten().copied().collect();
        let center = vertex_centroid(&all);
        let mut faces = Vec::with_capacity(polygons.len());
        for mut polygon in polygons {
            let Some(normal) = newell_normal(&polygon) else {
                continue;
            };
            if normal.dot(&(vertex_centroid(&polygon) - center)) < 0.0 {
                polygon.reverse();
            }
            faces.push(CellFace {
                plane: Plane::from_polygon(&polygon)?,
                polygon,
            });
        }
        if faces.len() < 4 {
            return Err(GeometryError::Degenerate(format!(
                "convex cell needs at least 4 faces, got {}",
                faces.len()
            ))
            .into());
        }
        Ok(Self { faces })
    }

    /// Sweeps a convex base polygon along `direction`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base is degenerate or `direction` lies in
    /// the base plane.
    pub fn prism(base: &[Point3], direction: &Vector3) -> Result<Self> {
        let normal = newell_normal(base)
            .ok_or_else(|| GeometryError::Degenerate("prism base has no area".into()))?;
        if normal.dot(direction).abs() < TOLERANCE {
            return Err(GeometryError::Degenerate(
                "extrusion direction lies in the profile plane".into(),
            )
            .into());
        }
        let n = base.len();
        let top: Vec<Point3> = base.iter().map(|p| p + direction).collect();
        let mut polygons = Vec::with_capacity(n + 2);
        polygons.push(base.to_vec());
        polygons.push(top);
        for i in 0..n {
            let a = base[i];
            let b = base[(i + 1) % n];
            polygons.push(vec![a, b, b + direction, a + direction]);
        }
        Self::from_polygons(polygons)
    }

    /// Axis-aligned box between two corners.
    ///
    /// # Errors
    ///
    /// Returns an error if the box has zero extent along any axis.
    pub fn cuboid(min: &Point3, max: &Point3) -> Result<Self> {
        let base = vec![
            Point3::new(min.x, min.y, min.z),
            Point3::new(max.x, min.y, min.z),
            Point3::new(max.x, max.y, min.z),
            Point3::new(min.x, max.y, min.z),
        ];
        Self::prism(&base, &Vector3::new(0.0, 0.0, max.z - min.z))
    }

    #[must_use]
    pub fn faces(&self) -> &[CellFace] {
        &self.faces
    }

    /// Volume by the divergence theorem.
    #[must_use]
    pub fn volume(&self) -> f64 {
        let Some(reference) = self.faces.first().and_then(|f| f.polygon.first()) else {
            return 0.0;
        };
        let sum: f64 = self
            .faces
            .iter()
            .map(|f| f.area() * f.plane.normal().dot(&(f.polygon[0] - reference)))
            .sum();
        sum / 3.0
    }

    #[must_use]
    pub fn aabb(&self) -> Option<Aabb> {
        Aabb::from_points(self.faces.iter().flat_map(|f| f.polygon.iter()))
    }

    /// Vertex average; always strictly inside a non-degenerate cell.
    #[must_use]
    pub fn centroid(&self) -> Point3 {
        let all: Vec<Point3> = self.faces.iter().flat_map(|f| f.polygon.iter().copied()).collect();
        vertex_centroid(&all)
    }

    #[must_use]
    pub fn classify_point(&self, point: &Point3, tol: f64) -> PointClassification {
        let mut on_boundary = false;
        for face in &self.faces {
            let d = face.plane.signed_distance(point);
            if d > tol {
                return PointClassification::Outside;
            }
            if d > -tol {
                on_boundary = true;
            }
        }
        if on_boundary {
            PointClassification::OnBoundary
        } else {
            PointClassification::Inside
        }
    }

    /// Splits the cell by a plane, capping both parts on the cutting plane.
    ///
    /// A cell lying entirely on one side comes back whole on that side.
    /// Parts thinner than [`SLIVER_VOLUME`] are dropped.
    #[must_use]
    pub fn split(&self, plane: &Plane) -> CellSplit {
        let (mut min_d, mut max_d) = (f64::INFINITY, f64::NEG_INFINITY);
        for p in self.faces.iter().flat_map(|f| f.polygon.iter()) {
            let d = plane.signed_distance(p);
            min_d = min_d.min(d);
            max_d = max_d.max(d);
        }
        if max_d <= PLANE_TOLERANCE {
            return CellSplit {
                below: Some(self.clone()),
                above: None,
            };
        }
        if min_d >= -PLANE_TOLERANCE {
            return CellSplit {
                below: None,
                above: Some(self.clone()),
            };
        }

        let mut below = Vec::with_capacity(self.faces.len() + 1);
        let mut above = Vec::with_capacity(self.faces.len() + 1);
        let mut section: Vec<Point2> = Vec::new();
        for face in &self.faces {
            let parts = split_polygon_by_plane(&face.polygon, plane);
            section.extend(parts.section.iter().map(|p| plane.project(p)));
            if is_real_polygon(&parts.below, face.plane.normal()) {
                below.push(CellFace {
                    plane: face.plane,
                    polygon: parts.below,
                });
            }
            if is_real_polygon(&parts.above, face.plane.normal()) {
                above.push(CellFace {
                    plane: face.plane,
                    polygon: parts.above,
                });
            }
        }

        let hull = convex_hull_2d(&section);
        if hull.len() >= 3 {
            let cap: Vec<Point3> = hull.iter().map(|uv| plane.lift(uv)).collect();
            let mut flipped_cap = cap.clone();
            flipped_cap.reverse();
            below.push(CellFace {
                plane: *plane,
                polygon: cap,
            });
            above.push(CellFace {
                plane: plane.flipped(),
                polygon: flipped_cap,
            });
        }

        CellSplit {
            below: Self::non_sliver(below),
            above: Self::non_sliver(above),
        }
    }

    fn non_sliver(faces: Vec<CellFace>) -> Option<Self> {
        if faces.len() < 4 {
            return None;
        }
        let cell = Self { faces };
        (cell.volume() > SLIVER_VOLUME).then_some(cell)
    }

    #[must_use]
    pub fn transformed(&self, iso: &Isometry3) -> Self {
        Self {
            faces: self
                .faces
                .iter()
                .map(|f| CellFace {
                    plane: f.plane.transformed(iso),
                    polygon: f.polygon.iter().map(|p| iso * p).collect(),
                })
                .collect(),
        }
    }
}

fn is_real_polygon(points: &[Point3], normal: &Vector3) -> bool {
    points.len() >= 3 && polygon_area_3d(points, normal) > AREA_EPSILON
}
