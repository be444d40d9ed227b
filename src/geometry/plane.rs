use crate::error::{GeometryError, Result};
use crate::math::polygon_3d::newell_normal;
use crate::math::{Isometry3, Point2, Point3, Vector3, PLANE_TOLERANCE, TOLERANCE};

/// An oriented infinite plane in 3D space.
///
/// Defined by an origin point and two orthonormal direction vectors
/// (`u_dir`, `v_dir`). The normal is `u_dir × v_dir` and points to the
/// positive side.
///
/// Parametric form: `P(u, v) = origin + u * u_dir + v * v_dir`.
#[derive(Debug, Clone, Copy)]
pub struct Plane {
    origin: Point3,
    u_dir: Vector3,
    v_dir: Vector3,
    normal: Vector3,
}

impl Plane {
    /// Creates a new plane from an origin and two direction vectors.
    ///
    /// `v_dir` is re-orthogonalised against `u_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the direction vectors are zero-length
    /// or parallel (degenerate plane).
    pub fn new(origin: Point3, u_dir: Vector3, v_dir: Vector3) -> Result<Self> {
        let u_len = u_dir.norm();
        if u_len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        if v_dir.norm() < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        let u_dir = u_dir / u_len;

        let normal = u_dir.cross(&v_dir);
        let normal_len = normal.norm();
        if normal_len < TOLERANCE {
            return Err(
                GeometryError::Degenerate("plane directions are parallel".into()).into(),
            );
        }
        let normal = normal / normal_len;
        let v_dir = normal.cross(&u_dir);

        Ok(Self {
            origin,
            u_dir,
            v_dir,
            normal,
        })
    }

    /// Creates a plane from an origin and a normal vector.
    ///
    /// The U and V directions are computed automatically.
    ///
    /// # Errors
    ///
    /// Returns an error if the normal vector is zero-length.
    pub fn from_normal(origin: Point3, normal: Vector3) -> Result<Self> {
        let len = normal.norm();
        if len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        let normal = normal / len;

        // Choose a reference vector not parallel to the normal
        let reference = if normal.x.abs() < 0.9 {
            Vector3::new(1.0, 0.0, 0.0)
        } else {
            Vector3::new(0.0, 1.0, 0.0)
        };

        let u_dir = reference.cross(&normal).normalize();
        let v_dir = normal.cross(&u_dir);

        Ok(Self {
            origin,
            u_dir,
            v_dir,
            normal,
        })
    }

    /// Creates the supporting plane of a planar polygon.
    ///
    /// The normal follows the polygon's winding (counter-clockwise when
    /// viewed from the positive side).
    ///
    /// # Errors
    ///
    /// Returns an error if the polygon is degenerate.
    pub fn from_polygon(points: &[Point3]) -> Result<Self> {
        let normal = newell_normal(points)
            .ok_or_else(|| GeometryError::Degenerate("polygon has no area".into()))?;
        Self::from_normal(points[0], normal)
    }

    /// Returns the origin point of the plane.
    #[must_use]
    pub fn origin(&self) -> &Point3 {
        &self.origin
    }

    /// Returns the U direction vector.
    #[must_use]
    pub fn u_dir(&self) -> &Vector3 {
        &self.u_dir
    }

    /// Returns the V direction vector.
    #[must_use]
    pub fn v_dir(&self) -> &Vector3 {
        &self.v_dir
    }

    /// Returns the unit normal of the plane.
    #[must_use]
    pub fn normal(&self) -> &Vector3 {
        &self.normal
    }

    /// Signed distance from the plane, positive on the normal side.
    #[must_use]
    pub fn signed_distance(&self, point: &Point3) -> f64 {
        (point - self.origin).dot(&self.normal)
    }

    /// Projects a point into the plane's UV frame.
    #[must_use]
    pub fn project(&self, point: &Point3) -> Point2 {
        let d = point - self.origin;
        Point2::new(d.dot(&self.u_dir), d.dot(&self.v_dir))
    }

    /// Lifts a UV point back onto the plane.
    #[must_use]
    pub fn lift(&self, uv: &Point2) -> Point3 {
        self.origin + self.u_dir * uv.x + self.v_dir * uv.y
    }

    /// The same plane with the opposite orientation.
    ///
    /// `u_dir` is kept and `v_dir` negated so the frame stays right-handed.
    #[must_use]
    pub fn flipped(&self) -> Self {
        Self {
            origin: self.origin,
            u_dir: self.u_dir,
            v_dir: -self.v_dir,
            normal: -self.normal,
        }
    }

    /// A parallel plane moved `distance` along the normal.
    #[must_use]
    pub fn offset(&self, distance: f64) -> Self {
        Self {
            origin: self.origin + self.normal * distance,
            ..*self
        }
    }

    /// The plane moved by a rigid transform.
    #[must_use]
    pub fn transformed(&self, iso: &Isometry3) -> Self {
        Self {
            origin: iso * self.origin,
            u_dir: iso * self.u_dir,
            v_dir: iso * self.v_dir,
            normal: iso * self.normal,
        }
    }

    /// Returns `true` if `other` is the same plane with the same orientation.
    #[must_use]
    pub fn is_coplanar_with(&self, other: &Plane) -> bool {
        self.normal.dot(&other.normal) >= 1.0 - 1e-9
            && self.signed_distance(&other.origin).abs() < PLANE_TOLERANCE
    }

    /// Returns `true` if `other` is the same plane facing the other way.
    #[must_use]
    pub fn is_opposite_to(&self, other: &Plane) -> bool {
        self.normal.dot(&other.normal) <= -(1.0 - 1e-9)
            && self.signed_distance(&other.origin).abs() < PLANE_TOLERANCE
    }
}
