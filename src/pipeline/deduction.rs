use tracing::debug;

use crate::error::BooleanError;
use crate::math::VOLUME_EPSILON;
use crate::operations::boolean::{BooleanKernel, BooleanOp};
use crate::topology::Solid;

/// Contact ratio at or above which an empty difference means the face is
/// fully covered.
pub const FULL_CONTACT_RATIO: f64 = 1.0 - 1e-3;

/// Outcome of deducting neighbour contact from a candidate.
#[derive(Debug)]
pub struct Deduction {
    /// Final formwork solid; `None` if the face is fully covered.
    pub solid: Option<Solid>,
    /// Intersection volume over candidate volume, in [0, 1].
    pub contact_ratio: f64,
    /// `true` if the difference replaced the candidate.
    pub applied: bool,
    /// Boolean errors recovered by keeping the previous solid.
    pub errors: Vec<BooleanError>,
}

impl Deduction {
    #[must_use]
    pub fn is_full_contact(&self) -> bool {
        self.solid.is_none()
    }
}

/// Trims candidates by the neighbour aggregate when contact is significant.
#[derive(Debug, Clone, Copy)]
pub struct ContactDeductionEngine<'k, K: BooleanKernel> {
    kernel: &'k K,
}

impl<'k, K: BooleanKernel> ContactDeductionEngine<'k, K> {
    #[must_use]
    pub fn new(kernel: &'k K) -> Self {
        Self { kernel }
    }

    /// Subtracts `aggregate` from `candidate` iff the contact ratio exceeds
    /// `threshold`. Boolean failures fall back to the candidate.
    #[must_use]
    pub fn deduct(&self, candidate: Solid, aggregate: Option<&Solid>, threshold: f64) -> Deduction {
        let mut deduction = Deduction {
            solid: None,
            contact_ratio: 0.0,
            applied: false,
            errors: Vec::new(),
        };
        let Some(aggregate) = aggregate else {
            deduction.solid = Some(candidate);
            return deduction;
        };

        let candidate_volume = candidate.volume();
        match self.kernel.intersect(&candidate, aggregate) {
            Ok(overlap) => {
                deduction.contact_ratio = if candidate_volume > 0.0 {
                    (overlap.volume() / candidate_volume).clamp(0.0, 1.0)
                } else {
                    0.0
                };
            }
            Err(err) if err.is_empty_result() => {}
            Err(err) => deduction.errors.push(err),
        }

        if deduction.contact_ratio <= threshold {
            deduction.solid = Some(candidate);
            return deduction;
        }

        match self.kernel.subtract(&candidate, aggregate) {
            Ok(difference) if difference.volume() > VOLUME_EPSILON => {
                deduction.solid = Some(difference);
                deduction.applied = true;
            }
            Ok(difference) => {
                deduction.errors.push(BooleanError::Inconsistent {
                    op: BooleanOp::Subtract,
                    reason: format!("difference has volume {:.3e}", difference.volume()),
                });
                deduction.solid = Some(candidate);
            }
            Err(err) if err.is_empty_result() && deduction.contact_ratio >= FULL_CONTACT_RATIO => {
                deduction.applied = true;
            }
            Err(err) => {
                debug!(error = %err, "Keeping undeducted candidate");
                deduction.errors.push(err);
                deduction.solid = Some(candidate);
            }
        }
        deduction
    }
}
