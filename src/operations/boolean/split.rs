use crate::math::PLANE_TOLERANCE;
use crate::topology::ConvexCell;

/// Which solid a cell fragment originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolidSource {
    A,
    B,
}

/// Pieces of a cell after splitting it against a convex cutter.
#[derive(Debug, Clone, Default)]
pub struct CellPieces {
    /// The part inside the cutter, if any.
    pub inside: Option<ConvexCell>,
    /// The parts outside the cutter.
    pub outside: Vec<ConvexCell>,
}

/// Splits `cell` against a convex `cutter`.
///
/// The cell is cascaded through the cutter's face planes: the part above
/// each plane is outside, the part below continues to the next plane and
/// whatever survives every plane is inside. A cell that turns out to lie
/// entirely outside comes back whole.
#[must_use]
pub fn split_cell(cell: &ConvexCell, cutter: &ConvexCell) -> CellPieces {
    let whole_outside = || CellPieces {
        inside: None,
        outside: vec![cell.clone()],
    };
    match (cell.aabb(), cutter.aabb()) {
        (Some(a), Some(b)) if a.overlaps(&b, PLANE_TOLERANCE) => {}
        _ => return whole_outside(),
    }

    let mut outside = Vec::new();
    let mut remaining = cell.clone();
    for face in cutter.faces() {
        let split = remaining.split(&face.plane);
        if let Some(above) = split.above {
            outside.push(above);
        }
        match split.below {
            Some(below) => remaining = below,
            None => return whole_outside(),
        }
    }

    CellPieces {
        inside: Some(remaining),
        outside,
    }
}
