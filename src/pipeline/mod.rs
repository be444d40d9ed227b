//! Per-element formwork stages: collect, index, union, select, extrude,
//! deduct and measure.

pub mod aggregate;
pub mod area;
pub mod collect;
pub mod deduction;
pub mod extract;
pub mod face_select;
pub mod formwork_solid;
pub mod proximity;
pub mod rules;
pub mod zone;

pub use aggregate::{AggregateSolid, UnionBuild, UnionSolidBuilder};
pub use area::{AreaCalculator, PieceAreas};
pub use collect::{collect_snapshot, Collected, StructuralElementCollector};
pub use deduction::{ContactDeductionEngine, Deduction, FULL_CONTACT_RATIO};
pub use extract::{Extraction, GeometryExtractor};
pub use face_select::{FaceCandidate, FaceRejection, FaceSelection, FormworkFaceSelector, RejectReason};
pub use formwork_solid::FormworkSolidBuilder;
pub use proximity::{NeighborSet, ProximityIndex};
pub use rules::{FaceClass, FaceRule, FaceRuleTable};
pub use zone::PourZoneGrouper;
