use super::{Point2, Vector2, AREA_EPSILON, PLANE_TOLERANCE, TOLERANCE};

/// 2D cross product: `(ax * by - ay * bx)`.
#[inline]
#[must_use]
pub fn cross_2d(a: &Vector2, b: &Vector2) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Computes the signed area of a polygon (shoelace formula).
///
/// Positive for counter-clockwise, negative for clockwise.
#[must_use]
pub fn signed_area_2d(points: &[Point2]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        sum += points[i].x * points[j].y - points[j].x * points[i].y;
    }
    sum * 0.5
}

/// Returns the polygon in counter-clockwise order.
#[must_use]
pub fn ensure_ccw(mut points: Vec<Point2>) -> Vec<Point2> {
    if signed_area_2d(&points) < 0.0 {
        points.reverse();
    }
    points
}

/// Removes repeated and collinear vertices.
///
/// May return fewer than three points if the polygon collapses.
#[must_use]
pub fn cleanup_polygon(points: &[Point2]) -> Vec<Point2> {
    let mut pts: Vec<Point2> = Vec::with_capacity(points.len());
    for p in points {
        if pts.last().map_or(true, |last| (p - last).norm() > PLANE_TOLERANCE) {
            pts.push(*p);
        }
    }
    while pts.len() > 1 && (pts[0] - pts[pts.len() - 1]).norm() <= PLANE_TOLERANCE {
        pts.pop();
    }

    let mut changed = true;
    while changed && pts.len() >= 3 {
        changed = false;
        let n = pts.len();
        for i in 0..n {
            let prev = pts[(i + n - 1) % n];
            let cur = pts[i];
            let next = pts[(i + 1) % n];
            let base = next - prev;
            let len = base.norm();
            let offset = if len < TOLERANCE {
                0.0
            } else {
                cross_2d(&base, &(cur - prev)).abs() / len
            };
            if offset < PLANE_TOLERANCE {
                pts.remove(i);
                changed = true;
                break;
            }
        }
    }
    pts
}

/// Returns `true` if a counter-clockwise polygon is convex.
#[must_use]
pub fn is_convex_2d(points: &[Point2]) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }
    (0..n).all(|i| {
        let a = points[i];
        let b = points[(i + 1) % n];
        let c = points[(i + 2) % n];
        cross_2d(&(b - a), &(c - b)) >= -TOLERANCE
    })
}

/// Clips a polygon to the half-plane left of the directed line `a -> b`.
///
/// Points within [`PLANE_TOLERANCE`] of the line are kept.
#[must_use]
pub fn clip_half_plane(points: &[Point2], a: &Point2, b: &Point2) -> Vec<Point2> {
    let edge = b - a;
    let len = edge.norm();
    if len < TOLERANCE || points.len() < 3 {
        return points.to_vec();
    }
    let dist = |p: &Point2| cross_2d(&edge, &(p - a)) / len;

    let n = points.len();
    let mut out = Vec::with_capacity(n + 1);
    for i in 0..n {
        let cur = points[i];
        let next = points[(i + 1) % n];
        let dc = dist(&cur);
        let dn = dist(&next);
        if dc >= -PLANE_TOLERANCE {
            out.push(cur);
        }
        if (dc > PLANE_TOLERANCE && dn < -PLANE_TOLERANCE)
            || (dc < -PLANE_TOLERANCE && dn > PLANE_TOLERANCE)
        {
            let t = dc / (dc - dn);
            out.push(cur + (next - cur) * t);
        }
    }
    cleanup_polygon(&out)
}

/// Intersects a polygon with a convex counter-clockwise clip polygon.
#[must_use]
pub fn intersect_convex(subject: &[Point2], clip: &[Point2]) -> Vec<Point2> {
    let m = clip.len();
    let mut result = subject.to_vec();
    for i in 0..m {
        if result.len() < 3 {
            return Vec::new();
        }
        result = clip_half_plane(&result, &clip[i], &clip[(i + 1) % m]);
    }
    if result.len() < 3 {
        Vec::new()
    } else {
        result
    }
}

/// Subtracts a convex counter-clockwise `cutter` from a convex `subject`.
///
/// Returns the disjoint convex pieces of `subject` lying outside `cutter`.
/// When the two do not overlap, the subject is returned whole.
#[must_use]
pub fn subtract_convex(subject: &[Point2], cutter: &[Point2]) -> Vec<Vec<Point2>> {
    let overlap = intersect_convex(subject, cutter);
    if signed_area_2d(&overlap).abs() <= AREA_EPSILON {
        return vec![subject.to_vec()];
    }

    let m = cutter.len();
    let mut pieces = Vec::new();
    let mut remaining = subject.to_vec();
    for i in 0..m {
        let a = cutter[i];
        let b = cutter[(i + 1) % m];
        let outside = clip_half_plane(&remaining, &b, &a);
        if outside.len() >= 3 && signed_area_2d(&outside).abs() > AREA_EPSILON {
            pieces.push(outside);
        }
        remaining = clip_half_plane(&remaining, &a, &b);
        if remaining.len() < 3 {
            break;
        }
    }
    pieces
}

/// Computes the convex hull of a point set (Andrew's monotone chain).
///
/// The hull is counter-clockwise with collinear points removed.
#[must_use]
pub fn convex_hull_2d(points: &[Point2]) -> Vec<Point2> {
    let mut pts = points.to_vec();
    pts.sort_by(|p, q| p.x.total_cmp(&q.x).then(p.y.total_cmp(&q.y)));
    pts.dedup_by(|a, b| (*a - *b).norm() < PLANE_TOLERANCE);
    if pts.len() < 3 {
        return pts;
    }

    let turn = |o: &Point2, a: &Point2, b: &Point2| cross_2d(&(a - o), &(b - o));

    let mut lower: Vec<Point2> = Vec::with_capacity(pts.len());
    for p in &pts {
        while lower.len() >= 2 && turn(&lower[lower.len() - 2], &lower[lower.len() - 1], p) <= TOLERANCE
        {
            lower.pop();
        }
        lower.push(*p);
    }
    let mut upper: Vec<Point2> = Vec::with_capacity(pts.len());
    for p in pts.iter().rev() {
        while upper.len() >= 2 && turn(&upper[upper.len() - 2], &upper[upper.len() - 1], p) <= TOLERANCE
        {
            upper.pop();
        }
        upper.push(*p);
    }
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Area-weighted centroid of a simple polygon.
///
/// Falls back to the vertex average for degenerate polygons.
#[must_use]
pub fn polygon_centroid_2d(points: &[Point2]) -> Point2 {
    let n = points.len();
    if n == 0 {
        return Point2::origin();
    }
    let area = signed_area_2d(points);
    if area.abs() <= AREA_EPSILON {
        #[allow(clippy::cast_precision_loss)]
        let inv_n = 1.0 / n as f64;
        return Point2::new(
            points.iter().map(|p| p.x).sum::<f64>() * inv_n,
            points.iter().map(|p| p.y).sum::<f64>() * inv_n,
        );
    }
    let mut cx = 0.0;
    let mut cy = 0.0;
    for i in 0..n {
        let p = points[i];
        let q = points[(i + 1) % n];
        let f = p.x * q.y - q.x * p.y;
        cx += (p.x + q.x) * f;
        cy += (p.y + q.y) * f;
    }
    Point2::new(cx / (6.0 * area), cy / (6.0 * area))
}

/// Winding-number point-in-polygon test. Boundary points may go either way.
#[must_use]
pub fn point_in_polygon_2d(point: &Point2, polygon: &[Point2]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut winding = 0i32;
    for i in 0..n {
        let a = polygon[i];
        let b = polygon[(i + 1) % n];
        let side = cross_2d(&(b - a), &(point - a));
        if a.y <= point.y {
            if b.y > point.y && side > 0.0 {
                winding += 1;
            }
        } else if b.y <= point.y && side < 0.0 {
            winding -= 1;
        }
    }
    winding != 0
}
