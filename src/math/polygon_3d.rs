use crate::geometry::Plane;

use super::{Point3, Vector3, PLANE_TOLERANCE, TOLERANCE};

/// Computes the unit normal of a polygon using Newell's method.
///
/// Returns `None` for degenerate (zero-area) polygons.
#[must_use]
pub fn newell_normal(points: &[Point3]) -> Option<Vector3> {
    let n = points.len();
    if n < 3 {
        return None;
    }
    let mut normal = Vector3::new(0.0, 0.0, 0.0);
    for i in 0..n {
        let curr = &points[i];
        let next = &points[(i + 1) % n];
        normal.x += (curr.y - next.y) * (curr.z + next.z);
        normal.y += (curr.z - next.z) * (curr.x + next.x);
        normal.z += (curr.x - next.x) * (curr.y + next.y);
    }
    let len = normal.norm();
    if len < TOLERANCE {
        return None;
    }
    Some(normal / len)
}

/// Compute the area of a 3D polygon (coplanar points).
///
/// Uses the cross-product summation method projected along the polygon normal.
#[must_use]
pub fn polygon_area_3d(points: &[Point3], normal: &Vector3) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let n = points.len();
    let mut cross_sum = Vector3::new(0.0, 0.0, 0.0);
    let o = &points[0];
    for i in 1..n {
        let a = points[i] - o;
        let b = points[(i + 1) % n] - o;
        cross_sum += a.cross(&b);
    }
    0.5 * cross_sum.dot(normal).abs()
}

/// Average of the polygon's vertices. Lies inside convex polygons.
#[must_use]
pub fn vertex_centroid(points: &[Point3]) -> Point3 {
    let n = points.len();
    if n == 0 {
        return Point3::origin();
    }
    #[allow(clippy::cast_precision_loss)]
    let inv_n = 1.0 / n as f64;
    Point3::new(
        points.iter().map(|p| p.x).sum::<f64>() * inv_n,
        points.iter().map(|p| p.y).sum::<f64>() * inv_n,
        points.iter().map(|p| p.z).sum::<f64>() * inv_n,
    )
}

/// Removes consecutive duplicate vertices, including the closing pair.
#[must_use]
pub fn dedup_loop(points: &[Point3]) -> Vec<Point3> {
    let mut pts: Vec<Point3> = Vec::with_capacity(points.len());
    for p in points {
        if pts.last().map_or(true, |last| (p - last).norm() > PLANE_TOLERANCE) {
            pts.push(*p);
        }
    }
    while pts.len() > 1 && (pts[0] - pts[pts.len() - 1]).norm() <= PLANE_TOLERANCE {
        pts.pop();
    }
    pts
}

/// Result of splitting a polygon by a plane.
#[derive(Debug, Clone, Default)]
pub struct PolygonSplit {
    /// Part on the negative side of the plane (signed distance <= 0).
    pub below: Vec<Point3>,
    /// Part on the positive side of the plane (signed distance >= 0).
    pub above: Vec<Point3>,
    /// Vertices and crossing points lying on the plane.
    pub section: Vec<Point3>,
}

/// Splits a polygon by a plane (Sutherland–Hodgman against both half-spaces).
///
/// Vertices within [`PLANE_TOLERANCE`] of the plane go to both parts.
#[must_use]
pub fn split_polygon_by_plane(points: &[Point3], plane: &Plane) -> PolygonSplit {
    let n = points.len();
    let mut split = PolygonSplit::default();
    for i in 0..n {
        let cur = points[i];
        let next = points[(i + 1) % n];
        let dc = plane.signed_distance(&cur);
        let dn = plane.signed_distance(&next);

        if dc <= PLANE_TOLERANCE {
            split.below.push(cur);
        }
        if dc >= -PLANE_TOLERANCE {
            split.above.push(cur);
        }
        if dc.abs() <= PLANE_TOLERANCE {
            split.section.push(cur);
        }
        if (dc < -PLANE_TOLERANCE && dn > PLANE_TOLERANCE)
            || (dc > PLANE_TOLERANCE && dn < -PLANE_TOLERANCE)
        {
            let t = dc / (dc - dn);
            let crossing = cur + (next - cur) * t;
            split.below.push(crossing);
            split.above.push(crossing);
            split.section.push(crossing);
        }
    }
    split.below = dedup_loop(&split.below);
    split.above = dedup_loop(&split.above);
    split
}
