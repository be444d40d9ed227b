use crate::geometry::{Aabb, Plane};
use crate::math::polygon_2d::{ensure_ccw, signed_area_2d, subtract_convex};
use crate::math::{Point2, Point3, AREA_EPSILON, PLANE_TOLERANCE};

use super::cell::{CellFace, ConvexCell};
use super::curve_loop::CurveLoop;
use super::face::Face;

/// Minimum overlap length for two fragments to count as edge-connected.
const EDGE_OVERLAP: f64 = 1e-6;

struct PlaneGroup {
    plane: Plane,
    fragments: Vec<Vec<Point3>>,
}

/// Extracts the boundary faces of a union of interior-disjoint convex cells.
///
/// Cell faces covered by an opposite, coplanar face of another cell are
/// interior and removed. The exposed fragments are grouped by plane and
/// then by edge connectivity, one [`Face`] per connected region.
#[must_use]
pub fn extract_faces(cells: &[ConvexCell]) -> Vec<Face> {
    let boxes: Vec<Option<Aabb>> = cells.iter().map(ConvexCell::aabb).collect();
    let mut groups: Vec<PlaneGroup> = Vec::new();

    for (i, cell) in cells.iter().enumerate() {
        for face in cell.faces() {
            for fragment in exposed_fragments(i, face, cells, &boxes) {
                match groups
                    .iter_mut()
                    .find(|g| g.plane.is_coplanar_with(&face.plane))
                {
                    Some(group) => group.fragments.push(fragment),
                    None => groups.push(PlaneGroup {
                        plane: face.plane,
                        fragments: vec![fragment],
                    }),
                }
            }
        }
    }

    groups.into_iter().flat_map(connected_faces).collect()
}

/// Portions of `face` (of cell `owner`) not covered by other cells.
fn exposed_fragments(
    owner: usize,
    face: &CellFace,
    cells: &[ConvexCell],
    boxes: &[Option<Aabb>],
) -> Vec<Vec<Point3>> {
    let plane = &face.plane;
    let face_box = Aabb::from_points(&face.polygon);
    let mut pieces: Vec<Vec<Point2>> = vec![face.polygon.iter().map(|p| plane.project(p)).collect()];

    for (j, other) in cells.iter().enumerate() {
        if j == owner {
            continue;
        }
        if let (Some(fb), Some(ob)) = (face_box, boxes[j]) {
            if !fb.overlaps(&ob, PLANE_TOLERANCE) {
                continue;
            }
        }
        for cover in other.faces() {
            if !plane.is_opposite_to(&cover.plane) {
                continue;
            }
            let cutter = ensure_ccw(cover.polygon.iter().map(|p| plane.project(p)).collect());
            pieces = pieces
                .iter()
                .flat_map(|piece| subtract_convex(piece, &cutter))
                .collect();
            if pieces.is_empty() {
                return Vec::new();
            }
        }
    }

    pieces
        .into_iter()
        .filter(|piece| signed_area_2d(piece).abs() > AREA_EPSILON)
        .map(|piece| piece.iter().map(|uv| plane.lift(uv)).collect())
        .collect()
}

/// Splits a plane group into edge-connected regions.
fn connected_faces(group: PlaneGroup) -> Vec<Face> {
    let n = group.fragments.len();
    let mut parent: Vec<usize> = (0..n).collect();

    for i in 0..n {
        for j in (i + 1)..n {
            if shares_edge(&group.fragments[i], &group.fragments[j]) {
                let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                if ri != rj {
                    parent[ri.max(rj)] = ri.min(rj);
                }
            }
        }
    }

    let mut components: Vec<(usize, Vec<CurveLoop>)> = Vec::new();
    for (i, fragment) in group.fragments.into_iter().enumerate() {
        let root = find(&mut parent, i);
        let Ok(lp) = CurveLoop::new(fragment) else {
            continue;
        };
        match components.iter_mut().find(|(r, _)| *r == root) {
            Some((_, loops)) => loops.push(lp),
            None => components.push((root, vec![lp])),
        }
    }

    components
        .into_iter()
        .map(|(_, loops)| Face::new(group.plane, loops))
        .collect()
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

/// Returns `true` if the polygons have collinear edges overlapping over a
/// positive length.
fn shares_edge(a: &[Point3], b: &[Point3]) -> bool {
    for i in 0..a.len() {
        let a0 = a[i];
        let a1 = a[(i + 1) % a.len()];
        let len = (a1 - a0).norm();
        if len < EDGE_OVERLAP {
            continue;
        }
        let dir = (a1 - a0) / len;
        let off_line = |p: &Point3| {
            let d = p - a0;
            (d - dir * d.dot(&dir)).norm()
        };
        for j in 0..b.len() {
            let b0 = b[j];
            let b1 = b[(j + 1) % b.len()];
            if off_line(&b0) > PLANE_TOLERANCE * 10.0 || off_line(&b1) > PLANE_TOLERANCE * 10.0 {
                continue;
            }
            let t0 = (b0 - a0).dot(&dir);
            let t1 = (b1 - a0).dot(&dir);
            let overlap = t0.max(t1).min(len) - t0.min(t1).max(0.0);
            if overlap > EDGE_OVERLAP {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn cube(min: Point3, max: Point3) -> ConvexCell {
        ConvexCell::cuboid(&min, &max).unwrap()
    }

    #[test]
    fn single_cell_has_one_face_per_side() {
        let faces = extract_faces(&[cube(p(0.0, 0.0, 0.0), p(2.0, 3.0, 4.0))]);
        assert_eq!(faces.len(), 6);
        let area: f64 = faces.iter().map(Face::area).sum();
        assert_relative_eq!(area, 52.0, epsilon = 1e-9);
    }

    #[test]
    fn shared_interface_is_removed_and_faces_merge() {
        let cells = [
            cube(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0)),
            cube(p(1.0, 0.0, 0.0), p(2.0, 1.0, 1.0)),
        ];
        let faces = extract_faces(&cells);
        assert_eq!(faces.len(), 6);
        let area: f64 = faces.iter().map(Face::area).sum();
        assert_relative_eq!(area, 10.0, epsilon = 1e-9);
        let top = faces.iter().find(|f| f.normal().z > 0.5).unwrap();
        assert_eq!(top.boundary_loops().len(), 2);
        assert_relative_eq!(top.area(), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn partial_contact_leaves_exposed_ring() {
        // Small block standing on the middle of a larger slab.
        let cells = [
            cube(p(0.0, 0.0, 0.0), p(4.0, 4.0, 1.0)),
            cube(p(1.0, 1.0, 1.0), p(3.0, 3.0, 2.0)),
        ];
        let faces = extract_faces(&cells);
        let area: f64 = faces.iter().map(Face::area).sum();
        // Slab 48 + block 16 minus twice the contact area of 4.
        assert_relative_eq!(area, 56.0, epsilon = 1e-9);
        let slab_top = faces
            .iter()
            .find(|f| f.normal().z > 0.5 && f.plane().signed_distance(&p(0.0, 0.0, 1.0)).abs() < 1e-9)
            .unwrap();
        assert_relative_eq!(slab_top.area(), 12.0, epsilon = 1e-9);
    }

    #[test]
    fn separated_coplanar_regions_stay_distinct() {
        let cells = [
            cube(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0)),
            cube(p(3.0, 0.0, 0.0), p(4.0, 1.0, 1.0)),
        ];
        let faces = extract_faces(&cells);
        assert_eq!(faces.len(), 12);
    }
}
