use crate::math::PLANE_TOLERANCE;
use crate::topology::{ConvexCell, Solid};

use super::split::{split_cell, SolidSource};

/// Classification of a cell fragment relative to the other solid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentClass {
    Inside,
    Outside,
    /// The cell was not touched by the other solid at all.
    Unsplit,
}

/// A cell fragment tagged with its origin and classification.
#[derive(Debug, Clone)]
pub struct CellFragment {
    pub cell: ConvexCell,
    pub source: SolidSource,
    pub class: FragmentClass,
}

/// Splits every cell of `cells` against the cells of `other` and
/// classifies the pieces.
///
/// `other`'s cells are interior-disjoint, so a piece found inside one of
/// them is final; pieces outside are carried on to the next cutter.
#[must_use]
pub fn classify_cells(cells: &[ConvexCell], other: &Solid, source: SolidSource) -> Vec<CellFragment> {
    let Some(other_box) = other.aabb() else {
        return cells
            .iter()
            .map(|cell| unsplit(cell, source))
            .collect();
    };

    let mut fragments = Vec::with_capacity(cells.len());
    for cell in cells {
        let touches = cell
            .aabb()
            .is_some_and(|bb| bb.overlaps(&other_box, PLANE_TOLERANCE));
        if !touches {
            fragments.push(unsplit(cell, source));
            continue;
        }

        let mut pending = vec![cell.clone()];
        let mut was_split = false;
        for cutter in other.cells() {
            let mut next = Vec::with_capacity(pending.len());
            for piece in &pending {
                let pieces = split_cell(piece, cutter);
                if let Some(inside) = pieces.inside {
                    was_split = true;
                    fragments.push(CellFragment {
                        cell: inside,
                        source,
                        class: FragmentClass::Inside,
                    });
                }
                next.extend(pieces.outside);
            }
            pending = next;
            if pending.is_empty() {
                break;
            }
        }

        let class = if was_split {
            FragmentClass::Outside
        } else {
            FragmentClass::Unsplit
        };
        fragments.extend(pending.into_iter().map(|cell| CellFragment { cell, source, class }));
    }
    fragments
}

fn unsplit(cell: &ConvexCell, source: SolidSource) -> CellFragment {
    CellFragment {
        cell: cell.clone(),
        source,
        class: FragmentClass::Unsplit,
    }
}
