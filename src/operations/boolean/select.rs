use std::fmt;

use super::classify::FragmentClass;
use super::split::SolidSource;

/// The type of boolean operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOp {
    Union,
    Subtract,
    Intersect,
}

impl fmt::Display for BooleanOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Union => "union",
            Self::Subtract => "subtract",
            Self::Intersect => "intersect",
        };
        f.write_str(name)
    }
}

/// Decision about whether to keep a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepDecision {
    Keep,
    Discard,
}

/// Determines whether a cell fragment is part of the result, based on its
/// classification against the other solid and the boolean operation.
///
/// | Fragment | vs Other Solid | Union | Subtract(A-B) | Intersect |
/// |----------|----------------|-------|---------------|-----------|
/// | from A   | UNSPLIT        | keep  | keep          | discard   |
/// | from A   | OUTSIDE B      | keep  | keep          | discard   |
/// | from A   | INSIDE B       | discard | discard     | keep      |
/// | from B   | UNSPLIT        | keep  | discard       | discard   |
/// | from B   | OUTSIDE A      | keep  | discard       | discard   |
/// | from B   | INSIDE A       | discard | discard     | discard   |
///
/// Only union splits B; subtraction and intersection are fully described
/// by the fragments of A.
#[allow(clippy::match_same_arms)]
#[must_use]
pub fn should_keep_fragment(source: SolidSource, class: FragmentClass, op: BooleanOp) -> KeepDecision {
    match (source, class, op) {
        // Fragment from A, classified vs B
        (SolidSource::A, FragmentClass::Unsplit | FragmentClass::Outside, BooleanOp::Union) => {
            KeepDecision::Keep
        }
        (SolidSource::A, FragmentClass::Unsplit | FragmentClass::Outside, BooleanOp::Subtract) => {
            KeepDecision::Keep
        }
        (SolidSource::A, FragmentClass::Unsplit | FragmentClass::Outside, BooleanOp::Intersect) => {
            KeepDecision::Discard
        }
        (SolidSource::A, FragmentClass::Inside, BooleanOp::Union) => KeepDecision::Discard,
        (SolidSource::A, FragmentClass::Inside, BooleanOp::Subtract) => KeepDecision::Discard,
        (SolidSource::A, FragmentClass::Inside, BooleanOp::Intersect) => KeepDecision::Keep,

        // Fragment from B, classified vs A
        (SolidSource::B, FragmentClass::Unsplit | FragmentClass::Outside, BooleanOp::Union) => {
            KeepDecision::Keep
        }
        (SolidSource::B, FragmentClass::Inside, BooleanOp::Union) => KeepDecision::Discard,
        (SolidSource::B, _, BooleanOp::Subtract | BooleanOp::Intersect) => KeepDecision::Discard,
    }
}
