use rustc_hash::FxHashMap;
use tracing::{debug, info};

use crate::analysis::{rollback, ElementContext, FormworkAnalysis};
use crate::error::{FormworkError, ModelError, Result};
use crate::model::{Category, ElementId, HostModel, ParameterValue};
use crate::operations::boolean::BooleanKernel;
use crate::piece::{params, FaceRef, FormworkPiece};
use crate::pipeline::{collect_snapshot, FormworkFaceSelector, ProximityIndex, UnionSolidBuilder};
use crate::session::{AnalysisSession, Diagnostic, DiagnosticKind};

/// Batch name for a committed pick.
pub const PICK_BATCH_NAME: &str = "Formwork face";

/// User input in the face-pick loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickEvent {
    Face { element: ElementId, face: FaceRef },
    /// Stop picking and keep what was committed.
    Finish,
}

/// Source of face picks, typically a viewport selection prompt.
pub trait FacePicker {
    /// # Errors
    ///
    /// Returns [`FormworkError::Cancelled`] when the user aborts the prompt.
    fn prompt(&mut self, message: &str) -> Result<PickEvent>;
}

/// What a pick session committed.
#[derive(Debug, Default)]
pub struct InteractiveReport {
    pub committed: Vec<FormworkPiece>,
    /// Picks that produced nothing, with the reason.
    pub rejected: Vec<(ElementId, FaceRef, String)>,
    pub cancelled: bool,
}

impl<K: BooleanKernel> FormworkAnalysis<K> {
    /// Generates formwork one picked face at a time.
    ///
    /// Every pick is committed in its own batch. Picking a face that already
    /// has formwork replaces it. Category face rules do not apply to picks;
    /// the category deduction threshold does.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Unavailable`] if no model is open, or any picker
    /// error other than cancellation.
    pub fn run_interactive<H, P>(
        &self,
        host: &mut H,
        picker: &mut P,
        session: &mut AnalysisSession,
    ) -> Result<InteractiveReport>
    where
        H: HostModel + ?Sized,
        P: FacePicker + ?Sized,
    {
        session.begin_run();
        if !host.is_available() {
            session.record(Diagnostic::new(None, DiagnosticKind::Setup, "host model unavailable"));
            return Err(ModelError::Unavailable("no model is open".into()).into());
        }
        let collected = collect_snapshot(&*host, session.config());
        let snapshot = collected.snapshot;
        let index = ProximityIndex::build(&snapshot, session.config().grid_cell_ft);
        let no_zones = FxHashMap::default();
        let no_errors = FxHashMap::default();
        let mut report = InteractiveReport::default();

        loop {
            if session.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let event = match picker.prompt("Select a face to form") {
                Ok(event) => event,
                Err(FormworkError::Cancelled) => {
                    report.cancelled = true;
                    break;
                }
                Err(err) => return Err(err),
            };
            let PickEvent::Face { element, face } = event else {
                break;
            };

            let ctx = ElementContext {
                snapshot: &snapshot,
                index: &index,
                config: session.config(),
                rules: session.rules(),
                zone_aggregates: &no_zones,
                extraction_errors: &no_errors,
            };
            let piece = match self.pick_piece(&ctx, element, face) {
                Ok(piece) => piece,
                Err(reason) => {
                    session.record(Diagnostic::new(
                        Some(element),
                        DiagnosticKind::ElementFailure,
                        format!("face {face}: {reason}"),
                    ));
                    report.rejected.push((element, face, reason));
                    continue;
                }
            };

            let previous = session
                .pieces()
                .for_face(element, face)
                .and_then(|stored| stored.generated);
            match commit_pick(host, &piece, previous, session) {
                Ok((generated, parameter_errors)) => {
                    for message in parameter_errors {
                        session.counters_mut().parameter_failures += 1;
                        session.record(Diagnostic::new(
                            Some(element),
                            DiagnosticKind::ParameterWrite,
                            message,
                        ));
                    }
                    session.pieces_mut().insert(piece.clone(), Some(generated));
                    session.counters_mut().pieces += 1;
                    info!(element = %element, face = %face, net_area_ft2 = piece.net_area_ft2, "Committed formwork");
                    report.committed.push(piece);
                }
                Err(err) => {
                    let reason = err.to_string();
                    session.record(Diagnostic::new(
                        Some(element),
                        DiagnosticKind::ElementFailure,
                        format!("face {face}: {reason}"),
                    ));
                    report.rejected.push((element, face, reason));
                }
            }
        }

        if report.cancelled {
            session.record(Diagnostic::new(
                None,
                DiagnosticKind::UserCancellation,
                format!("picking cancelled after {} pieces", report.committed.len()),
            ));
        }
        session.end_run();
        Ok(report)
    }

    fn pick_piece(
        &self,
        ctx: &ElementContext<'_>,
        element: ElementId,
        face: FaceRef,
    ) -> std::result::Result<FormworkPiece, String> {
        let slot = ctx
            .snapshot
            .slot(element)
            .ok_or_else(|| format!("element {element} is not a structural element"))?;
        let host = ctx.snapshot.element(slot);
        let selector = FormworkFaceSelector::new(ctx.rules, ctx.config.thickness_ft());
        let candidate = selector
            .classified(host)
            .into_iter()
            .find(|c| c.face_ref == face)
            .ok_or_else(|| format!("element {element} has no face {face}"))?;

        let rule = ctx.rules.rule(host.category);
        let zone_scope = ctx.config.precision_mode.then_some(host.zone.as_ref());
        let neighbours = ctx.index.neighbours(
            ctx.snapshot,
            slot,
            ctx.config.thickness_ft() + rule.search_buffer_ft,
            zone_scope,
        );
        let build = UnionSolidBuilder::new(self.kernel()).build(
            neighbours
                .iter()
                .flat_map(|&s| ctx.snapshot.element(s).solids.iter()),
        );
        let aggregate = build.aggregate.map(|a| a.solid);
        let outcome = self
            .generate_piece(ctx.config, host, &candidate, aggregate.as_ref(), rule.threshold)
            .map_err(|e| e.to_string())?;
        debug!(ratio = outcome.contact_ratio, "Picked face");
        outcome
            .piece
            .ok_or_else(|| "face is fully covered by neighbours".to_string())
    }
}

/// Writes one piece in its own batch, replacing earlier formwork on the same
/// face. Returns the new element and any parameter write failures.
fn commit_pick<H: HostModel + ?Sized>(
    host: &mut H,
    piece: &FormworkPiece,
    previous: Option<ElementId>,
    session: &mut AnalysisSession,
) -> std::result::Result<(ElementId, Vec<String>), ModelError> {
    host.begin_batch(PICK_BATCH_NAME)?;
    let written = write_pick(host, piece, previous, session.timestamp())
        .and_then(|written| host.commit_batch().map(|()| written));
    if written.is_err() {
        rollback(host, session);
    }
    written
}

fn write_pick<H: HostModel + ?Sized>(
    host: &mut H,
    piece: &FormworkPiece,
    previous: Option<ElementId>,
    timestamp: &str,
) -> std::result::Result<(ElementId, Vec<String>), ModelError> {
    let source = ParameterValue::Text(piece.face.to_string());
    for existing in host.generated_elements(piece.host) {
        let same_face = Some(existing) == previous
            || host.parameter(existing, params::SOURCE_FACE).ok().as_ref() == Some(&source);
        if same_face {
            host.delete_element(existing)?;
        }
    }
    let generated = host.create_geometry_element(
        piece.host,
        std::slice::from_ref(&piece.solid),
        Category::Other,
    )?;
    let errors = piece
        .parameters(timestamp)
        .into_iter()
        .filter_map(|(name, value)| host.set_parameter(generated, name, value).err())
        .map(|e| e.to_string())
        .collect();
    Ok((generated, errors))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::math::Point3;
    use crate::model::{ElementInfo, HostGeometry, MemoryModel};
    use crate::operations::creation::MakeBox;
    use std::collections::VecDeque;

    struct Script(VecDeque<Result<PickEvent>>);

    impl FacePicker for Script {
        fn prompt(&mut self, _: &str) -> Result<PickEvent> {
            self.0.pop_front().unwrap_or(Ok(PickEvent::Finish))
        }
    }

    fn column_model() -> (MemoryModel, ElementId) {
        let mut model = MemoryModel::new();
        let solid = MakeBox::new(Point3::origin(), Point3::new(1.0, 1.0, 10.0))
            .execute()
            .unwrap();
        let id = model.add_element(
            ElementInfo::new("C1", Category::Column),
            vec![HostGeometry::Solid(solid)],
        );
        (model, id)
    }

    fn session() -> AnalysisSession {
        AnalysisSession::new(AnalysisConfig::default())
            .unwrap()
            .with_timestamp("2026/10/14 10:00:00")
    }

    fn pick(element: ElementId, face: usize) -> Result<PickEvent> {
        Ok(PickEvent::Face {
            element,
            face: FaceRef { solid: 0, face },
        })
    }

    #[test]
    fn each_pick_commits_its_own_batch() {
        let (mut model, id) = column_model();
        let mut picker = Script(VecDeque::from([pick(id, 0), pick(id, 1)]));
        let mut session = session();
        let report = FormworkAnalysis::new()
            .run_interactive(&mut model, &mut picker, &mut session)
            .unwrap();
        assert_eq!(report.committed.len(), 2);
        assert!(!report.cancelled);
        assert_eq!(model.committed_batches().len(), 2);
        assert_eq!(model.generated_elements(id).len(), 2);
    }

    #[test]
    fn repicking_a_face_replaces_its_piece() {
        let (mut model, id) = column_model();
        let mut picker = Script(VecDeque::from([pick(id, 2), pick(id, 2)]));
        let mut session = session();
        FormworkAnalysis::new()
            .run_interactive(&mut model, &mut picker, &mut session)
            .unwrap();
        assert_eq!(model.generated_elements(id).len(), 1);
        assert_eq!(session.pieces().len(), 1);
    }

    #[test]
    fn cancel_keeps_committed_pieces() {
        let (mut model, id) = column_model();
        let mut picker = Script(VecDeque::from([
            pick(id, 0),
            Err(FormworkError::Cancelled),
            pick(id, 1),
        ]));
        let mut session = session();
        let report = FormworkAnalysis::new()
            .run_interactive(&mut model, &mut picker, &mut session)
            .unwrap();
        assert!(report.cancelled);
        assert_eq!(report.committed.len(), 1);
        assert_eq!(model.generated_elements(id).len(), 1);
        assert!(!model.in_batch());
    }

    #[test]
    fn unknown_face_is_rejected_and_loop_continues() {
        let (mut model, id) = column_model();
        let mut picker = Script(VecDeque::from([pick(id, 99), pick(id, 0)]));
        let mut session = session();
        let report = FormworkAnalysis::new()
            .run_interactive(&mut model, &mut picker, &mut session)
            .unwrap();
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.committed.len(), 1);
    }

    #[test]
    fn failed_commit_leaves_no_piece() {
        let (model, id) = column_model();
        let mut model = model.with_commit_failure();
        let mut picker = Script(VecDeque::from([pick(id, 0)]));
        let mut session = session();
        let report = FormworkAnalysis::new()
            .run_interactive(&mut model, &mut picker, &mut session)
            .unwrap();
        assert!(report.committed.is_empty());
        assert_eq!(report.rejected.len(), 1);
        assert!(model.all_generated().is_empty());
        assert!(session.pieces().is_empty());
    }

    #[test]
    fn repick_replaces_even_without_source_face_parameter() {
        let (model, id) = column_model();
        let mut model = model
            .without_parameter(params::SOURCE_FACE)
            .without_parameter(params::HOST_ELEMENT);
        let mut picker = Script(VecDeque::from([pick(id, 1), pick(id, 1), pick(id, 2)]));
        let mut session = session();
        let report = FormworkAnalysis::new()
            .run_interactive(&mut model, &mut picker, &mut session)
            .unwrap();
        assert_eq!(report.committed.len(), 3);
        assert_eq!(model.generated_elements(id).len(), 2);
        assert_eq!(session.counters().parameter_failures, 6);
    }

    #[test]
    fn token_cancel_is_cleared_after_picking() {
        let (mut model, id) = column_model();
        let mut session = session();
        session.cancel_token().cancel();
        let mut picker = Script(VecDeque::from([pick(id, 0)]));
        let report = FormworkAnalysis::new()
            .run_interactive(&mut model, &mut picker, &mut session)
            .unwrap();
        assert!(report.cancelled);
        assert!(report.committed.is_empty());
        assert!(!session.is_cancelled());
    }
}
