use crate::math::{Point3, Vector3};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3,
    pub max: Point3,
}

impl Aabb {
    /// Creates a box from two corners, normalising their order.
    #[must_use]
    pub fn new(a: Point3, b: Point3) -> Self {
        Self {
            min: Point3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Point3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Smallest box enclosing every point, or `None` for an empty input.
    #[must_use]
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point3>,
    {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut bb = Self {
            min: first,
            max: first,
        };
        for p in iter {
            bb.include(p);
        }
        Some(bb)
    }

    /// Grows the box to include a point.
    pub fn include(&mut self, p: &Point3) {
        self.min = Point3::new(self.min.x.min(p.x), self.min.y.min(p.y), self.min.z.min(p.z));
        self.max = Point3::new(self.max.x.max(p.x), self.max.y.max(p.y), self.max.z.max(p.z));
    }

    #[must_use]
    pub fn union(&self, other: &Aabb) -> Self {
        let mut bb = *self;
        bb.include(&other.min);
        bb.include(&other.max);
        bb
    }

    /// The box grown by `margin` on every side.
    #[must_use]
    pub fn expanded(&self, margin: f64) -> Self {
        let m = Vector3::new(margin, margin, margin);
        Self {
            min: self.min - m,
            max: self.max + m,
        }
    }

    /// Returns `true` if the boxes overlap or lie within `tol` of each other.
    #[must_use]
    pub fn overlaps(&self, other: &Aabb, tol: f64) -> bool {
        self.min.x <= other.max.x + tol
            && self.max.x >= other.min.x - tol
            && self.min.y <= other.max.y + tol
            && self.max.y >= other.min.y - tol
            && self.min.z <= other.max.z + tol
            && self.max.z >= other.min.z - tol
    }

    #[must_use]
    pub fn contains_point(&self, p: &Point3, tol: f64) -> bool {
        p.x >= self.min.x - tol
            && p.x <= self.max.x + tol
            && p.y >= self.min.y - tol
            && p.y <= self.max.y + tol
            && p.z >= self.min.z - tol
            && p.z <= self.max.z + tol
    }

    #[must_use]
    pub fn center(&self) -> Point3 {
        nalgebra::center(&self.min, &self.max)
    }

    #[must_use]
    pub fn extent(&self) -> Vector3 {
        self.max - self.min
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    #[test]
    fn from_points_encloses_all() {
        let pts = [p(1.0, -2.0, 0.0), p(-1.0, 3.0, 2.0), p(0.0, 0.0, -4.0)];
        let bb = Aabb::from_points(&pts).unwrap();
        assert_eq!(bb.min, p(-1.0, -2.0, -4.0));
        assert_eq!(bb.max, p(1.0, 3.0, 2.0));
        assert!(Aabb::from_points(&Vec::<Point3>::new()).is_none());
    }

    #[test]
    fn touching_boxes_overlap_within_tolerance() {
        let a = Aabb::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0));
        let b = Aabb::new(p(1.0, 0.0, 0.0), p(2.0, 1.0, 1.0));
        let c = Aabb::new(p(1.5, 0.0, 0.0), p(2.0, 1.0, 1.0));
        assert!(a.overlaps(&b, 0.0));
        assert!(!a.overlaps(&c, 0.1));
        assert!(a.expanded(0.5).overlaps(&c, 0.0));
    }

    #[test]
    fn union_and_center() {
        let a = Aabb::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0));
        let b = Aabb::new(p(2.0, 2.0, 2.0), p(3.0, 3.0, 3.0));
        let u = a.union(&b);
        assert_eq!(u.center(), p(1.5, 1.5, 1.5));
        assert!(u.contains_point(&p(2.5, 0.5, 1.0), 0.0));
    }
}
