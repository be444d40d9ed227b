//! Formwork area takeoff for structural concrete models.
//!
//! For each structural element the engine picks the faces that need
//! formwork, sweeps each into a thin solid, subtracts whatever neighbouring
//! concrete it touches and reports the remaining contact area. Pieces are
//! written back to the host model as geometry elements with formwork
//! parameters.

pub mod analysis;
pub mod config;
pub mod error;
pub mod export;
pub mod geometry;
pub mod interactive;
pub mod math;
pub mod model;
pub mod operations;
pub mod piece;
pub mod pipeline;
pub mod report;
pub mod scene;
pub mod session;
pub mod topology;
pub mod units;

pub use analysis::{ElementOutcome, ElementStatus, FormworkAnalysis};
pub use config::AnalysisConfig;
pub use error::{FormworkError, Result};
pub use interactive::{FacePicker, InteractiveReport, PickEvent};
pub use model::{Category, ElementId, HostModel, MemoryModel};
pub use piece::{FaceRef, FormworkPiece};
pub use report::RunReport;
pub use session::{AnalysisSession, CancelToken};
