use tracing::debug;

use crate::error::BooleanError;
use crate::math::VOLUME_EPSILON;
use crate::operations::boolean::{BooleanKernel, BooleanOp};
use crate::topology::Solid;

/// Union of a host's neighbours.
#[derive(Debug, Clone)]
pub struct AggregateSolid {
    pub solid: Solid,
    /// Solids folded in, counting the first.
    pub merged: usize,
    pub skipped: usize,
}

/// Result of folding neighbour solids together.
#[derive(Debug, Default)]
pub struct UnionBuild {
    /// `None` when there were no inputs, or every union attempt failed.
    pub aggregate: Option<AggregateSolid>,
    pub errors: Vec<BooleanError>,
}

/// Folds solids into one aggregate, skipping any that fail to union.
#[derive(Debug, Clone, Copy)]
pub struct UnionSolidBuilder<'k, K: BooleanKernel> {
    kernel: &'k K,
}

impl<'k, K: BooleanKernel> UnionSolidBuilder<'k, K> {
    #[must_use]
    pub fn new(kernel: &'k K) -> Self {
        Self { kernel }
    }

    #[must_use]
    pub fn build<'s>(&self, solids: impl IntoIterator<Item = &'s Solid>) -> UnionBuild {
        let mut solids = solids.into_iter();
        let Some(first) = solids.next() else {
            return UnionBuild::default();
        };
        let mut current = first.clone();
        let mut merged = 1;
        let mut skipped = 0;
        let mut errors = Vec::new();

        for next in solids {
            let floor = current.volume().max(next.volume()) - VOLUME_EPSILON;
            match self.kernel.union(&current, next) {
                Ok(result) if result.volume() >= floor => {
                    current = result;
                    merged += 1;
                }
                Ok(result) => {
                    skipped += 1;
                    errors.push(BooleanError::Inconsistent {
                        op: BooleanOp::Union,
                        reason: format!(
                            "union volume {:.6} fell below {:.6}",
                            result.volume(),
                            floor
                        ),
                    });
                }
                Err(err) => {
                    debug!(error = %err, "Skipping neighbour solid");
                    skipped += 1;
                    errors.push(err);
                }
            }
        }

        let aggregate = (merged > 1 || skipped == 0).then_some(AggregateSolid {
            solid: current,
            merged,
            skipped,
        });
        UnionBuild { aggregate, errors }
    }
}
