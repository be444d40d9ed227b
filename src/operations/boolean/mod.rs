mod classify;
mod engine;
mod intersect_op;
mod select;
mod split;
mod subtract;
mod union;

pub use classify::{classify_cells, CellFragment, FragmentClass};
pub use engine::{boolean_execute, MAX_RESULT_CELLS};
pub use intersect_op::Intersect;
pub use select::BooleanOp;
pub use split::{split_cell, CellPieces, SolidSource};
pub use subtract::Subtract;
pub use union::Union;

use crate::error::BooleanError;
use crate::topology::Solid;

/// The boolean operations the formwork pipeline relies on.
///
/// Implementations must be shareable across the per-element worker threads.
pub trait BooleanKernel: Sync {
    /// Computes `a ∪ b`.
    ///
    /// # Errors
    ///
    /// Returns an error if the union cannot be computed.
    fn union(&self, a: &Solid, b: &Solid) -> Result<Solid, BooleanError>;

    /// Computes `a ∩ b`.
    ///
    /// # Errors
    ///
    /// Returns [`BooleanError::EmptyResult`] if the solids don't overlap.
    fn intersect(&self, a: &Solid, b: &Solid) -> Result<Solid, BooleanError>;

    /// Computes `a - b`.
    ///
    /// # Errors
    ///
    /// Returns [`BooleanError::EmptyResult`] if `b` covers `a`.
    fn subtract(&self, a: &Solid, b: &Solid) -> Result<Solid, BooleanError>;
}

/// Boolean kernel built on convex cell splitting.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvexKernel;

impl BooleanKernel for ConvexKernel {
    fn union(&self, a: &Solid, b: &Solid) -> Result<Solid, BooleanError> {
        Union::new(a, b).execute()
    }

    fn intersect(&self, a: &Solid, b: &Solid) -> Result<Solid, BooleanError> {
        Intersect::new(a, b).execute()
    }

    fn subtract(&self, a: &Solid, b: &Solid) -> Result<Solid, BooleanError> {
        Subtract::new(a, b).execute()
    }
}
