use crate::error::BooleanError;
use crate::topology::Solid;

use super::engine::boolean_execute;
use super::select::BooleanOp;

/// Computes the boolean union of two solids.
pub struct Union<'a> {
    solid_a: &'a Solid,
    solid_b: &'a Solid,
}

impl<'a> Union<'a> {
    /// Creates a new `Union` operation.
    #[must_use]
    pub fn new(solid_a: &'a Solid, solid_b: &'a Solid) -> Self {
        Self { solid_a, solid_b }
    }

    /// Executes the union.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    pub fn execute(&self) -> Result<Solid, BooleanError> {
        boolean_execute(self.solid_a, self.solid_b, BooleanOp::Union)
    }
}
