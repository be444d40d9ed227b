use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::AnalysisConfig;
use crate::error::{ConfigError, SessionError};
use crate::model::{ElementId, ZoneKey};
use crate::piece::PieceStore;
use crate::pipeline::rules::FaceRuleTable;
use crate::topology::Solid;

/// Timestamp layout persisted on generated pieces.
pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Phase of a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunPhase {
    Idle,
    Collect,
    Index,
    PerElement,
    Aggregate,
    Report,
}

impl RunPhase {
    /// Returns `true` if `next` may follow `self`. Every phase may fall back to `Idle`.
    #[must_use]
    pub fn can_advance_to(self, next: RunPhase) -> bool {
        matches!(
            (self, next),
            (_, Self::Idle)
                | (Self::Idle, Self::Collect)
                | (Self::Collect, Self::Index)
                | (Self::Index, Self::PerElement)
                | (Self::PerElement, Self::Aggregate)
                | (Self::Aggregate, Self::Report)
        )
    }
}

/// Shared cooperative cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticKind {
    GeometryExtraction,
    BooleanOperation,
    ParameterWrite,
    UserCancellation,
    ElementFailure,
    Setup,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::GeometryExtraction => "geometry extraction",
            Self::BooleanOperation => "boolean operation",
            Self::ParameterWrite => "parameter write",
            Self::UserCancellation => "user cancellation",
            Self::ElementFailure => "element failure",
            Self::Setup => "setup",
        };
        f.write_str(name)
    }
}

/// A recovered error, kept for the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub element: Option<ElementId>,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    #[must_use]
    pub fn new(element: Option<ElementId>, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            element,
            kind,
            message: message.into(),
        }
    }
}

/// Run-wide tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunCounters {
    /// Elements processed without error.
    pub succeeded: usize,
    /// Elements whose processing recorded an error.
    pub failed: usize,
    /// Elements not processed (override flag, no geometry, cancellation).
    pub skipped: usize,
    pub pieces: usize,
    pub deductions_applied: usize,
    pub boolean_fallbacks: usize,
    pub union_skips: usize,
    pub parameter_failures: usize,
    pub dropped_instances: usize,
}

/// State carried through one analysis run.
#[derive(Debug)]
pub struct AnalysisSession {
    config: AnalysisConfig,
    rules: FaceRuleTable,
    phase: RunPhase,
    counters: RunCounters,
    diagnostics: Vec<Diagnostic>,
    timestamp: String,
    fixed_timestamp: Option<String>,
    cancel: CancelToken,
    pieces: PieceStore,
    zone_aggregates: FxHashMap<ZoneKey, Option<Solid>>,
}

impl AnalysisSession {
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the configuration fails validation.
    pub fn new(config: AnalysisConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let rules = FaceRuleTable::from_config(&config);
        Ok(Self {
            config,
            rules,
            phase: RunPhase::Idle,
            counters: RunCounters::default(),
            diagnostics: Vec::new(),
            timestamp: String::new(),
            fixed_timestamp: None,
            cancel: CancelToken::new(),
            pieces: PieceStore::new(),
            zone_aggregates: FxHashMap::default(),
        })
    }

    /// Pins the timestamp written on pieces instead of the local clock.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        let timestamp = timestamp.into();
        self.timestamp.clone_from(&timestamp);
        self.fixed_timestamp = Some(timestamp);
        self
    }

    /// Clears the per-run state and stamps the run.
    pub fn begin_run(&mut self) {
        self.counters = RunCounters::default();
        self.diagnostics.clear();
        self.zone_aggregates.clear();
        self.timestamp = match &self.fixed_timestamp {
            Some(ts) => ts.clone(),
            None => chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(),
        };
    }

    /// Ends a run. A pending cancellation is consumed by the run it stopped,
    /// so the next run starts uncancelled.
    pub fn end_run(&mut self) {
        self.cancel.reset();
    }

    /// # Errors
    ///
    /// Returns [`SessionError::InvalidTransition`] for a transition the run
    /// state machine does not allow.
    pub fn transition(&mut self, to: RunPhase) -> Result<(), SessionError> {
        if !self.phase.can_advance_to(to) {
            return Err(SessionError::InvalidTransition {
                from: self.phase,
                to,
            });
        }
        debug!(from = ?self.phase, to = ?to, "run phase");
        self.phase = to;
        Ok(())
    }

    pub fn record(&mut self, diagnostic: Diagnostic) {
        warn!(
            element = ?diagnostic.element,
            kind = %diagnostic.kind,
            "{}",
            diagnostic.message
        );
        self.diagnostics.push(diagnostic);
    }

    #[must_use]
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    #[must_use]
    pub fn rules(&self) -> &FaceRuleTable {
        &self.rules
    }

    #[must_use]
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    #[must_use]
    pub fn counters(&self) -> &RunCounters {
        &self.counters
    }

    pub fn counters_mut(&mut self) -> &mut RunCounters {
        &mut self.counters
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    #[must_use]
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Token that cancels this session's runs from another thread.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    #[must_use]
    pub fn pieces(&self) -> &PieceStore {
        &self.pieces
    }

    pub fn pieces_mut(&mut self) -> &mut PieceStore {
        &mut self.pieces
    }

    pub(crate) fn zone_aggregates_mut(&mut self) -> &mut FxHashMap<ZoneKey, Option<Solid>> {
        &mut self.zone_aggregates
    }

    pub(crate) fn zone_aggregates(&self) -> &FxHashMap<ZoneKey, Option<Solid>> {
        &self.zone_aggregates
    }
}
