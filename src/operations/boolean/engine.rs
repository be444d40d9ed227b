use crate::error::BooleanError;
use crate::math::PLANE_TOLERANCE;
use crate::topology::{ConvexCell, Solid};

use super::classify::{classify_cells, CellFragment, FragmentClass};
use super::select::{should_keep_fragment, BooleanOp, KeepDecision};
use super::split::SolidSource;

/// Upper bound on the number of cells in a boolean result.
pub const MAX_RESULT_CELLS: usize = 50_000;

/// Relative slack allowed by the volume consistency check.
const VOLUME_SLACK: f64 = 1e-6;

/// Executes a boolean operation on two solids.
///
/// Orchestrates the full pipeline: validation, AABB early-out, cell
/// splitting and classification, selection, and result checks.
///
/// # Errors
///
/// Returns [`BooleanError::InvalidInput`] for empty or non-finite operands,
/// [`BooleanError::EmptyResult`] when nothing is left,
/// [`BooleanError::TooComplex`] beyond [`MAX_RESULT_CELLS`] and
/// [`BooleanError::Inconsistent`] when the result volume is impossible for
/// the operation.
pub fn boolean_execute(a: &Solid, b: &Solid, op: BooleanOp) -> Result<Solid, BooleanError> {
    // Step 1: validate operands
    validate(a, op)?;
    validate(b, op)?;

    // Step 2: AABB early-out
    let overlap = match (a.aabb(), b.aabb()) {
        (Some(ba), Some(bb)) => ba.overlaps(&bb, PLANE_TOLERANCE),
        _ => false,
    };
    if !overlap {
        return handle_disjoint(a, b, op);
    }

    // Step 3: split and classify
    let fragments: Vec<CellFragment> = match op {
        BooleanOp::Union => {
            let mut fragments: Vec<CellFragment> = a
                .cells()
                .iter()
                .map(|cell| CellFragment {
                    cell: cell.clone(),
                    source: SolidSource::A,
                    class: FragmentClass::Unsplit,
                })
                .collect();
            fragments.extend(classify_cells(b.cells(), a, SolidSource::B));
            fragments
        }
        BooleanOp::Subtract | BooleanOp::Intersect => {
            classify_cells(a.cells(), b, SolidSource::A)
        }
    };

    // Step 4: select
    let kept: Vec<ConvexCell> = fragments
        .into_iter()
        .filter(|f| should_keep_fragment(f.source, f.class, op) == KeepDecision::Keep)
        .map(|f| f.cell)
        .collect();

    // Step 5: check the result
    let result = Solid::from_cells(kept);
    check_result(&result, a.volume(), b.volume(), op)?;
    Ok(result)
}

fn validate(solid: &Solid, op: BooleanOp) -> Result<(), BooleanError> {
    if solid.is_empty() {
        return Err(BooleanError::InvalidInput {
            op,
            reason: "operand has no cells".into(),
        });
    }
    if !solid.is_finite() {
        return Err(BooleanError::InvalidInput {
            op,
            reason: "operand has non-finite coordinates".into(),
        });
    }
    if solid.volume() <= 0.0 {
        return Err(BooleanError::InvalidInput {
            op,
            reason: "operand has no volume".into(),
        });
    }
    Ok(())
}

/// Handles the case where the operands' bounding boxes don't overlap.
fn handle_disjoint(a: &Solid, b: &Solid, op: BooleanOp) -> Result<Solid, BooleanError> {
    match op {
        BooleanOp::Union => {
            let mut cells = a.cells().to_vec();
            cells.extend_from_slice(b.cells());
            Ok(Solid::from_cells(cells))
        }
        BooleanOp::Subtract => Ok(a.clone()),
        BooleanOp::Intersect => Err(BooleanError::EmptyResult { op }),
    }
}

fn check_result(result: &Solid, va: f64, vb: f64, op: BooleanOp) -> Result<(), BooleanError> {
    if result.is_empty() {
        return Err(BooleanError::EmptyResult { op });
    }
    let cells = result.cells().len();
    if cells > MAX_RESULT_CELLS {
        return Err(BooleanError::TooComplex { op, cells });
    }

    let v = result.volume();
    let slack = VOLUME_SLACK * (va + vb).max(1.0);
    let (lo, hi) = match op {
        BooleanOp::Union => (va.max(vb), va + vb),
        BooleanOp::Subtract => (va - vb, va),
        BooleanOp::Intersect => (0.0, va.min(vb)),
    };
    if !v.is_finite() || v < lo - slack || v > hi + slack {
        return Err(BooleanError::Inconsistent {
            op,
            reason: format!("result volume {v:.6} outside [{lo:.6}, {hi:.6}]"),
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::Point3;
    use crate::operations::creation::MakeBox;
    use approx::assert_relative_eq;

    fn make_box(x: f64, y: f64, z: f64, dx: f64, dy: f64, dz: f64) -> Solid {
        MakeBox::new(Point3::new(x, y, z), Point3::new(x + dx, y + dy, z + dz))
            .execute()
            .unwrap()
    }

    #[test]
    fn subtract_through_hole() {
        // Large box: 0..4 x 0..4 x 0..4
        let a = make_box(0.0, 0.0, 0.0, 4.0, 4.0, 4.0);
        // Small box: 1..3 x 1..3 x -0.5..4.5 (passes right through)
        let b = make_box(1.0, 1.0, -0.5, 2.0, 2.0, 5.0);

        let result = boolean_execute(&a, &b, BooleanOp::Subtract).unwrap();
        assert_relative_eq!(result.volume(), 48.0, epsilon = 1e-9);
        // Outer walls 64 + two rings of 12 + inner walls 32.
        assert_relative_eq!(result.surface_area(), 120.0, epsilon = 1e-9);
    }

    #[test]
    fn union_overlapping_boxes() {
        let a = make_box(0.0, 0.0, 0.0, 2.0, 2.0, 2.0);
        let b = make_box(1.0, 1.0, 1.0, 2.0, 2.0, 2.0);
        let result = boolean_execute(&a, &b, BooleanOp::Union).unwrap();
        assert_relative_eq!(result.volume(), 15.0, epsilon = 1e-9);
        assert_relative_eq!(result.surface_area(), 42.0, epsilon = 1e-9);
    }

    #[test]
    fn intersect_overlapping_boxes() {
        let a = make_box(0.0, 0.0, 0.0, 2.0, 2.0, 2.0);
        let b = make_box(1.0, 1.0, 1.0, 2.0, 2.0, 2.0);
        let result = boolean_execute(&a, &b, BooleanOp::Intersect).unwrap();
        assert_relative_eq!(result.volume(), 1.0, epsilon = 1e-9);
        assert_eq!(result.faces().len(), 6);
    }

    #[test]
    fn disjoint_union_keeps_both() {
        let a = make_box(0.0, 0.0, 0.0, 1.0, 1.0, 1.0);
        let b = make_box(5.0, 0.0, 0.0, 1.0, 1.0, 1.0);
        let result = boolean_execute(&a, &b, BooleanOp::Union).unwrap();
        assert_relative_eq!(result.volume(), 2.0, epsilon = 1e-9);
        assert_eq!(result.faces().len(), 12);
    }

    #[test]
    fn disjoint_intersect_is_empty() {
        let a = make_box(0.0, 0.0, 0.0, 1.0, 1.0, 1.0);
        let b = make_box(5.0, 0.0, 0.0, 1.0, 1.0, 1.0);
        let err = boolean_execute(&a, &b, BooleanOp::Intersect).unwrap_err();
        assert!(err.is_empty_result());
    }

    #[test]
    fn touching_intersect_is_empty() {
        let a = make_box(0.0, 0.0, 0.0, 1.0, 1.0, 1.0);
        let b = make_box(1.0, 0.0, 0.0, 1.0, 1.0, 1.0);
        let err = boolean_execute(&a, &b, BooleanOp::Intersect).unwrap_err();
        assert!(err.is_empty_result());
    }

    #[test]
    fn subtract_creates_void() {
        let a = make_box(0.0, 0.0, 0.0, 3.0, 3.0, 3.0);
        let b = make_box(1.0, 1.0, 1.0, 1.0, 1.0, 1.0);
        let result = boolean_execute(&a, &b, BooleanOp::Subtract).unwrap();
        assert_relative_eq!(result.volume(), 26.0, epsilon = 1e-9);
        // Outer skin 54 + void skin 6.
        assert_relative_eq!(result.surface_area(), 60.0, epsilon = 1e-9);
    }

    #[test]
    fn subtract_covering_solid_is_empty() {
        let a = make_box(1.0, 1.0, 1.0, 1.0, 1.0, 1.0);
        let b = make_box(0.0, 0.0, 0.0, 3.0, 3.0, 3.0);
        let err = boolean_execute(&a, &b, BooleanOp::Subtract).unwrap_err();
        assert!(err.is_empty_result());
    }

    #[test]
    fn empty_operand_is_invalid() {
        let a = make_box(0.0, 0.0, 0.0, 1.0, 1.0, 1.0);
        let err = boolean_execute(&a, &Solid::default(), BooleanOp::Union).unwrap_err();
        assert!(matches!(err, BooleanError::InvalidInput { .. }));
    }
}
