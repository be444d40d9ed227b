use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};
use spade::handles::{FixedFaceHandle, InnerTag};
use spade::{ConstrainedDelaunayTriangulation, InsertionError, Point2 as SpadePoint2, Triangulation};

use crate::error::GeometryError;
use crate::math::polygon_2d::{cleanup_polygon, ensure_ccw, is_convex_2d, signed_area_2d};
use crate::math::{Point2, AREA_EPSILON};

type Cdt = ConstrainedDelaunayTriangulation<SpadePoint2<f64>>;

/// Splits a simple polygon with holes into convex pieces.
///
/// Convex polygons without holes come back unchanged. Everything else is
/// triangulated (constrained Delaunay) and the triangles are merged
/// greedily across diagonals while the union stays convex. Pieces are
/// counter-clockwise.
///
/// # Errors
///
/// Returns [`GeometryError::Decomposition`] if the outer loop is degenerate
/// or the triangulation fails.
pub fn decompose_polygon(
    outer: &[Point2],
    holes: &[Vec<Point2>],
) -> Result<Vec<Vec<Point2>>, GeometryError> {
    let outer = ensure_ccw(cleanup_polygon(outer));
    if outer.len() < 3 || signed_area_2d(&outer) <= AREA_EPSILON {
        return Err(GeometryError::Decomposition("outer loop is degenerate".into()));
    }
    let holes: Vec<Vec<Point2>> = holes
        .iter()
        .map(|h| cleanup_polygon(h))
        .filter(|h| h.len() >= 3 && signed_area_2d(h).abs() > AREA_EPSILON)
        .collect();

    if holes.is_empty() && is_convex_2d(&outer) {
        return Ok(vec![outer]);
    }

    let mut cdt = Cdt::new();
    insert_constraint_loop(&mut cdt, &outer)?;
    for hole in &holes {
        insert_constraint_loop(&mut cdt, hole)?;
    }

    let interior = classify_interior_faces(&cdt);
    let positions: Vec<Point2> = cdt
        .vertices()
        .map(|v| Point2::new(v.position().x, v.position().y))
        .collect();

    let mut polygons: Vec<Option<Vec<usize>>> = Vec::new();
    for face in cdt.inner_faces() {
        if !interior.contains(&face.fix().index()) {
            continue;
        }
        let mut tri: Vec<usize> = face.vertices().iter().map(|v| v.fix().index()).collect();
        let pts: Vec<Point2> = tri.iter().map(|&i| positions[i]).collect();
        let area = signed_area_2d(&pts);
        if area.abs() <= AREA_EPSILON {
            continue;
        }
        if area < 0.0 {
            tri.reverse();
        }
        polygons.push(Some(tri));
    }
    if polygons.is_empty() {
        return Err(GeometryError::Decomposition(
            "triangulation has no interior faces".into(),
        ));
    }

    merge_convex(&mut polygons, &positions);

    Ok(polygons
        .into_iter()
        .flatten()
        .map(|idx| cleanup_polygon(&idx.iter().map(|&i| positions[i]).collect::<Vec<_>>()))
        .filter(|p| p.len() >= 3)
        .collect())
}

/// Greedy Hertel–Mehlhorn merge over shared edges.
fn merge_convex(polygons: &mut [Option<Vec<usize>>], positions: &[Point2]) {
    let mut owner: FxHashMap<(usize, usize), usize> = FxHashMap::default();
    for (id, poly) in polygons.iter().enumerate() {
        if let Some(poly) = poly {
            for k in 0..poly.len() {
                owner.insert((poly[k], poly[(k + 1) % poly.len()]), id);
            }
        }
    }

    let mut diagonals: Vec<(usize, usize)> = owner
        .keys()
        .filter(|(a, b)| a < b && owner.contains_key(&(*b, *a)))
        .copied()
        .collect();
    diagonals.sort_unstable();

    for (a, b) in diagonals {
        let (Some(&p), Some(&q)) = (owner.get(&(a, b)), owner.get(&(b, a))) else {
            continue;
        };
        if p == q {
            continue;
        }
        let (Some(pp), Some(qq)) = (&polygons[p], &polygons[q]) else {
            continue;
        };
        let Some(merged) = join_across(pp, qq, a, b) else {
            continue;
        };
        let pts: Vec<Point2> = merged.iter().map(|&i| positions[i]).collect();
        if !is_convex_2d(&pts) {
            continue;
        }
        owner.remove(&(a, b));
        owner.remove(&(b, a));
        for k in 0..merged.len() {
            owner.insert((merged[k], merged[(k + 1) % merged.len()]), p);
        }
        polygons[p] = Some(merged);
        polygons[q] = None;
    }
}

/// Joins `p` (containing edge `a -> b`) and `q` (containing `b -> a`).
fn join_across(p: &[usize], q: &[usize], a: usize, b: usize) -> Option<Vec<usize>> {
    let pb = p.iter().position(|&v| v == b)?;
    let qa = q.iter().position(|&v| v == a)?;
    // p rotated to run b .. a, then q's vertices strictly between a and b.
    let mut merged: Vec<usize> = (0..p.len()).map(|k| p[(pb + k) % p.len()]).collect();
    merged.extend((1..q.len() - 1).map(|k| q[(qa + k) % q.len()]));
    Some(merged)
}

/// Inserts a closed polygon as constraint edges into the CDT.
fn insert_constraint_loop(cdt: &mut Cdt, points: &[Point2]) -> Result<(), GeometryError> {
    let mut handles = Vec::with_capacity(points.len());
    for p in points {
        let h = cdt
            .insert(SpadePoint2::new(p.x, p.y))
            .map_err(|e: InsertionError| GeometryError::Decomposition(format!("CDT insert: {e}")))?;
        handles.push(h);
    }

    for i in 0..handles.len() {
        let from = handles[i];
        let to = handles[(i + 1) % handles.len()];
        if from != to {
            cdt.add_constraint(from, to);
        }
    }
    Ok(())
}

/// Classifies which inner faces of the CDT are inside the polygon using flood-fill.
///
/// Faces next to the outer face start at depth 0; crossing a constraint
/// edge increments the depth. Odd depth = interior.
fn classify_interior_faces(cdt: &Cdt) -> FxHashSet<usize> {
    let mut interior = FxHashSet::default();
    let mut depth_map: FxHashMap<usize, u32> = FxHashMap::default();
    let mut queue: VecDeque<(FixedFaceHandle<InnerTag>, u32)> = VecDeque::new();

    let outer_fix = cdt.outer_face().fix();

    for edge in cdt.directed_edges() {
        if edge.face().fix() != outer_fix {
            continue;
        }
        if let Some(inner) = edge.rev().face().as_inner() {
            let idx = inner.fix().index();
            if depth_map.contains_key(&idx) {
                continue;
            }
            let depth = u32::from(cdt.is_constraint_edge(edge.as_undirected().fix()));
            depth_map.insert(idx, depth);
            if depth % 2 == 1 {
                interior.insert(idx);
            }
            queue.push_back((inner.fix(), depth));
        }
    }

    while let Some((face_fix, depth)) = queue.pop_front() {
        let face = cdt.face(face_fix);
        for edge in face.adjacent_edges() {
            let Some(neighbor) = edge.rev().face().as_inner() else {
                continue;
            };
            let n_idx = neighbor.fix().index();
            if depth_map.contains_key(&n_idx) {
                continue;
            }
            let new_depth = if cdt.is_constraint_edge(edge.as_undirected().fix()) {
                depth + 1
            } else {
                depth
            };
            depth_map.insert(n_idx, new_depth);
            if new_depth % 2 == 1 {
                interior.insert(n_idx);
            }
            queue.push_back((neighbor.fix(), new_depth));
        }
    }

    interior
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    fn total_area(pieces: &[Vec<Point2>]) -> f64 {
        pieces.iter().map(|pc| signed_area_2d(pc)).sum()
    }

    #[test]
    fn convex_polygon_is_returned_whole() {
        let square = vec![p(0.0, 0.0), p(0.0, 2.0), p(2.0, 2.0), p(2.0, 0.0)];
        let pieces = decompose_polygon(&square, &[]).unwrap();
        assert_eq!(pieces.len(), 1);
        assert_relative_eq!(signed_area_2d(&pieces[0]), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn l_shape_splits_into_few_convex_pieces() {
        let l = vec![
            p(0.0, 0.0),
            p(4.0, 0.0),
            p(4.0, 1.0),
            p(1.0, 1.0),
            p(1.0, 3.0),
            p(0.0, 3.0),
        ];
        let pieces = decompose_polygon(&l, &[]).unwrap();
        assert!((2..=3).contains(&pieces.len()));
        assert!(pieces.iter().all(|pc| is_convex_2d(pc)));
        assert_relative_eq!(total_area(&pieces), 6.0, epsilon = 1e-9);
    }

    #[test]
    fn hole_is_excluded() {
        let outer = vec![p(0.0, 0.0), p(10.0, 0.0), p(10.0, 10.0), p(0.0, 10.0)];
        let hole = vec![p(3.0, 3.0), p(3.0, 7.0), p(7.0, 7.0), p(7.0, 3.0)];
        let pieces = decompose_polygon(&outer, &[hole]).unwrap();
        assert!(pieces.iter().all(|pc| is_convex_2d(pc)));
        assert_relative_eq!(total_area(&pieces), 84.0, epsilon = 1e-9);
    }

    #[test]
    fn degenerate_outer_is_rejected() {
        let line = vec![p(0.0, 0.0), p(1.0, 0.0), p(2.0, 0.0)];
        assert!(decompose_polygon(&line, &[]).is_err());
    }
}
