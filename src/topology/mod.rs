mod boundary;
pub mod cell;
pub mod curve_loop;
pub mod face;
pub mod solid;

pub use cell::{CellFace, CellSplit, ConvexCell, PointClassification};
pub use curve_loop::CurveLoop;
pub use face::Face;
pub use solid::Solid;
