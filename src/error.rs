use thiserror::Error;

use crate::model::{ElementId, StorageType};
use crate::operations::boolean::BooleanOp;
use crate::session::RunPhase;

/// Top-level error type for the formwork engine.
#[derive(Debug, Error)]
pub enum FormworkError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Boolean(#[from] BooleanError),

    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("operation cancelled by user")]
    Cancelled,
}

/// Errors related to geometric computations and geometry extraction.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    #[error("zero-length vector")]
    ZeroVector,

    #[error("element {element} has no usable solids")]
    NoSolids { element: ElementId },

    #[error("geometry extraction failed for element {element}: {reason}")]
    Extraction { element: ElementId, reason: String },

    #[error("invalid curve loop: {0}")]
    CurveLoop(String),

    #[error("polygon decomposition failed: {0}")]
    Decomposition(String),

    #[error("formwork thickness must be positive, got {0}")]
    InvalidThickness(f64),
}

/// Errors raised by the boolean engine.
#[derive(Debug, Error)]
pub enum BooleanError {
    #[error("{op}: invalid input: {reason}")]
    InvalidInput { op: BooleanOp, reason: String },

    #[error("{op} produced an empty result")]
    EmptyResult { op: BooleanOp },

    #[error("{op} result is too complex ({cells} cells)")]
    TooComplex { op: BooleanOp, cells: usize },

    #[error("{op} result is inconsistent: {reason}")]
    Inconsistent { op: BooleanOp, reason: String },

    #[error("{op} failed: {reason}")]
    Failed { op: BooleanOp, reason: String },
}

impl BooleanError {
    /// Returns `true` if the operation ran cleanly and simply left nothing behind.
    #[must_use]
    pub fn is_empty_result(&self) -> bool {
        matches!(self, Self::EmptyResult { .. })
    }
}

/// Errors writing a parameter onto a host element.
#[derive(Debug, Error)]
pub enum ParameterError {
    #[error("parameter '{name}' does not exist")]
    Missing { name: String },

    #[error("parameter '{name}' stores {expected}, got {found}")]
    WrongStorage {
        name: String,
        expected: StorageType,
        found: StorageType,
    },

    #[error("parameter '{name}' is read-only")]
    ReadOnly { name: String },

    #[error("element {element} not found")]
    ElementNotFound { element: ElementId },
}

/// Errors raised by the host model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("host model unavailable: {0}")]
    Unavailable(String),

    #[error("element {0} not found")]
    ElementNotFound(ElementId),

    #[error("no write batch is open")]
    NoOpenBatch,

    #[error("a write batch is already open")]
    BatchAlreadyOpen,

    #[error("host rejected the request: {0}")]
    Rejected(String),
}

/// Errors loading configuration or scene input.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors in the run state machine.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid run phase transition {from:?} -> {to:?}")]
    InvalidTransition { from: RunPhase, to: RunPhase },
}

/// Convenience type alias for results using [`FormworkError`].
pub type Result<T> = std::result::Result<T, FormworkError>;
