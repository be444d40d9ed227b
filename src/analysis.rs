use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::{debug, info, info_span, warn};

use crate::config::AnalysisConfig;
use crate::error::{BooleanError, FormworkError, GeometryError, ModelError, Result};
use crate::model::{Category, ElementId, HostModel, ModelSnapshot, StructuralElement, ZoneKey};
use crate::operations::boolean::{BooleanKernel, ConvexKernel};
use crate::piece::FormworkPiece;
use crate::pipeline::{
    collect_snapshot, AreaCalculator, ContactDeductionEngine, FaceCandidate, FaceRejection,
    FaceRuleTable, FormworkFaceSelector, FormworkSolidBuilder, PourZoneGrouper, ProximityIndex,
    UnionSolidBuilder,
};
use crate::report::{ResultAggregator, RunReport};
use crate::session::{AnalysisSession, Diagnostic, DiagnosticKind, RunPhase};
use crate::topology::Solid;

/// Name of the host batch a run writes its pieces in.
pub const BATCH_NAME: &str = "Formwork analysis";

/// How processing of one element ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ElementStatus {
    Succeeded,
    /// Geometry could not be read, or a face failed to build.
    Failed,
    /// Excluded by override.
    Skipped,
}

/// Everything computed for one host element.
#[derive(Debug)]
pub struct ElementOutcome {
    pub slot: usize,
    pub status: ElementStatus,
    pub pieces: Vec<FormworkPiece>,
    pub rejections: Vec<FaceRejection>,
    pub diagnostics: Vec<Diagnostic>,
    pub neighbours: usize,
    pub union_skips: usize,
    pub boolean_fallbacks: usize,
    pub deductions_applied: usize,
    /// Faces fully covered by neighbours.
    pub full_contacts: usize,
    /// Gross area of the fully covered faces, which have no piece.
    pub full_contact_gross_ft2: f64,
}

impl ElementOutcome {
    fn new(slot: usize) -> Self {
        Self {
            slot,
            status: ElementStatus::Succeeded,
            pieces: Vec::new(),
            rejections: Vec::new(),
            diagnostics: Vec::new(),
            neighbours: 0,
            union_skips: 0,
            boolean_fallbacks: 0,
            deductions_applied: 0,
            full_contacts: 0,
            full_contact_gross_ft2: 0.0,
        }
    }
}

/// Read-only inputs shared by every per-element evaluation of a run.
#[derive(Debug, Clone, Copy)]
pub struct ElementContext<'a> {
    pub snapshot: &'a ModelSnapshot,
    pub index: &'a ProximityIndex,
    pub config: &'a AnalysisConfig,
    pub rules: &'a FaceRuleTable,
    /// Per-zone aggregates when zone amortisation is on.
    pub zone_aggregates: &'a FxHashMap<ZoneKey, Option<Solid>>,
    /// Host-reported reasons for elements whose geometry failed to load.
    pub extraction_errors: &'a FxHashMap<ElementId, String>,
}

/// Result of generating formwork for one face.
#[derive(Debug)]
pub struct FaceOutcome {
    /// `None` if neighbours fully cover the face.
    pub piece: Option<FormworkPiece>,
    /// Face area before deduction, in square feet.
    pub gross_area_ft2: f64,
    pub contact_ratio: f64,
    pub boolean_errors: Vec<BooleanError>,
}

/// Formwork area analysis over a host model.
#[derive(Debug, Clone, Default)]
pub struct FormworkAnalysis<K: BooleanKernel = ConvexKernel> {
    kernel: K,
}

impl FormworkAnalysis<ConvexKernel> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<K: BooleanKernel> FormworkAnalysis<K> {
    #[must_use]
    pub fn with_kernel(kernel: K) -> Self {
        Self { kernel }
    }

    #[must_use]
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Runs a full batch analysis and writes the pieces back to `host`.
    ///
    /// Individual element failures are recorded in the session and never
    /// abort the run.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Unavailable`] if no model is open, or the host's
    /// error if the write batch cannot be opened or committed.
    pub fn run<H: HostModel + ?Sized>(
        &self,
        host: &mut H,
        session: &mut AnalysisSession,
    ) -> Result<RunReport> {
        let span = info_span!("formwork_run");
        let _guard = span.enter();
        session.begin_run();
        let result = self.run_phases(host, session);
        if result.is_err() {
            warn!("Run aborted");
        }
        session.end_run();
        session.transition(RunPhase::Idle)?;
        result
    }

    fn run_phases<H: HostModel + ?Sized>(
        &self,
        host: &mut H,
        session: &mut AnalysisSession,
    ) -> Result<RunReport> {
        if !host.is_available() {
            session.record(Diagnostic::new(None, DiagnosticKind::Setup, "host model unavailable"));
            return Err(ModelError::Unavailable("no model is open".into()).into());
        }

        session.transition(RunPhase::Collect)?;
        let collected = collect_snapshot(&*host, session.config());
        info!(
            hosts = collected.hosts.len(),
            elements = collected.snapshot.len(),
            "Starting formwork analysis"
        );
        session.counters_mut().dropped_instances += collected.dropped_instances;
        let mut extraction_errors = FxHashMap::default();
        for (id, err) in &collected.extraction_failures {
            if collected.hosts.binary_search(id).is_err() {
                session.record(Diagnostic::new(
                    Some(*id),
                    DiagnosticKind::GeometryExtraction,
                    err.to_string(),
                ));
            }
            extraction_errors.insert(*id, err.to_string());
        }
        let snapshot = collected.snapshot;
        let host_slots: Vec<usize> = collected
            .hosts
            .iter()
            .filter_map(|&id| snapshot.slot(id))
            .collect();

        session.transition(RunPhase::Index)?;
        let index = ProximityIndex::build(&snapshot, session.config().grid_cell_ft);
        if session.config().precision_mode && session.config().amortize_zone_aggregates {
            self.build_zone_aggregates(&snapshot, &host_slots, session);
        }

        session.transition(RunPhase::PerElement)?;
        let cancel = session.cancel_token();
        let outcomes: Vec<ElementOutcome> = {
            let ctx = ElementContext {
                snapshot: &snapshot,
                index: &index,
                config: session.config(),
                rules: session.rules(),
                zone_aggregates: session.zone_aggregates(),
                extraction_errors: &extraction_errors,
            };
            if ctx.config.parallel {
                host_slots
                    .par_iter()
                    .map(|&slot| (!cancel.is_cancelled()).then(|| self.process_element(&ctx, slot)))
                    .collect::<Vec<_>>()
                    .into_iter()
                    .flatten()
                    .collect()
            } else {
                let mut outcomes = Vec::with_capacity(host_slots.len());
                for &slot in &host_slots {
                    if cancel.is_cancelled() {
                        break;
                    }
                    outcomes.push(self.process_element(&ctx, slot));
                }
                outcomes
            }
        };
        let cancelled = outcomes.len() < host_slots.len();
        if cancelled {
            session.record(Diagnostic::new(
                None,
                DiagnosticKind::UserCancellation,
                format!(
                    "run cancelled after {} of {} elements",
                    outcomes.len(),
                    host_slots.len()
                ),
            ));
        }

        write_back(host, &snapshot, &outcomes, session)?;

        session.transition(RunPhase::Aggregate)?;
        tally(&outcomes, host_slots.len(), session);
        let report = ResultAggregator.aggregate(&snapshot, &outcomes, session, cancelled);

        session.transition(RunPhase::Report)?;
        info!(
            elements = report.summary.element_count,
            pieces = report.summary.piece_count,
            net_area_m2 = report.summary.net_area_m2,
            failed = report.summary.counters.failed,
            "Formwork analysis complete"
        );
        Ok(report)
    }

    fn build_zone_aggregates(
        &self,
        snapshot: &ModelSnapshot,
        host_slots: &[usize],
        session: &mut AnalysisSession,
    ) {
        let zones: Vec<ZoneKey> = PourZoneGrouper
            .group(snapshot, host_slots.iter().copied())
            .into_keys()
            .flatten()
            .cloned()
            .collect();
        for zone in zones {
            let build = PourZoneGrouper.zone_aggregate(&self.kernel, snapshot, &zone);
            for err in &build.errors {
                session.record(Diagnostic::new(
                    None,
                    DiagnosticKind::BooleanOperation,
                    format!("zone {zone}: {err}"),
                ));
            }
            session.counters_mut().union_skips += build.errors.len();
            debug!(zone = %zone, built = build.aggregate.is_some(), "Zone aggregate");
            session
                .zone_aggregates_mut()
                .insert(zone, build.aggregate.map(|a| a.solid));
        }
    }

    /// Computes the formwork of one host element. Pure: reads only `ctx`.
    #[must_use]
    pub fn process_element(&self, ctx: &ElementContext<'_>, slot: usize) -> ElementOutcome {
        let element = ctx.snapshot.element(slot);
        let span = info_span!("element", id = %element.id, category = %element.category);
        let _guard = span.enter();
        let mut outcome = ElementOutcome::new(slot);

        if element.solids.is_empty() {
            let message = ctx.extraction_errors.get(&element.id).cloned().unwrap_or_else(|| {
                GeometryError::NoSolids {
                    element: element.id,
                }
                .to_string()
            });
            outcome.status = ElementStatus::Failed;
            outcome.diagnostics.push(Diagnostic::new(
                Some(element.id),
                DiagnosticKind::GeometryExtraction,
                message,
            ));
            return outcome;
        }

        let selector = FormworkFaceSelector::new(ctx.rules, ctx.config.thickness_ft());
        if element.flags.override_excluded {
            outcome.status = ElementStatus::Skipped;
            outcome.rejections = selector.select(element, &[]).rejected;
            return outcome;
        }

        let rule = ctx.rules.rule(element.category);
        let zone_scope = ctx.config.precision_mode.then_some(element.zone.as_ref());
        let neighbour_slots = ctx.index.neighbours(
            ctx.snapshot,
            slot,
            ctx.config.thickness_ft() + rule.search_buffer_ft,
            zone_scope,
        );
        let neighbours: Vec<&StructuralElement> = neighbour_slots
            .iter()
            .map(|&s| ctx.snapshot.element(s))
            .collect();
        outcome.neighbours = neighbours.len();

        let built_aggregate;
        let aggregate: Option<&Solid> = match (zone_scope, ctx.config.amortize_zone_aggregates) {
            (Some(Some(zone)), true) => ctx.zone_aggregates.get(zone).and_then(Option::as_ref),
            _ => {
                let build = UnionSolidBuilder::new(&self.kernel)
                    .build(neighbours.iter().flat_map(|n| n.solids.iter()));
                outcome.union_skips = build.errors.len();
                for err in build.errors {
                    outcome.diagnostics.push(Diagnostic::new(
                        Some(element.id),
                        DiagnosticKind::BooleanOperation,
                        format!("neighbour union skipped: {err}"),
                    ));
                }
                built_aggregate = build.aggregate.map(|a| a.solid);
                built_aggregate.as_ref()
            }
        };

        let selection = selector.select(element, &neighbours);
        outcome.rejections = selection.rejected;
        for candidate in selection.selected {
            match self.generate_piece(ctx.config, element, &candidate, aggregate, rule.threshold) {
                Ok(face) => {
                    outcome.boolean_fallbacks += face.boolean_errors.len();
                    for err in face.boolean_errors {
                        outcome.diagnostics.push(Diagnostic::new(
                            Some(element.id),
                            DiagnosticKind::BooleanOperation,
                            format!("face {}: {err}", candidate.face_ref),
                        ));
                    }
                    match face.piece {
                        Some(piece) => {
                            if piece.deducted {
                                outcome.deductions_applied += 1;
                            }
                            outcome.pieces.push(piece);
                        }
                        None => {
                            outcome.deductions_applied += 1;
                            outcome.full_contacts += 1;
                            outcome.full_contact_gross_ft2 += face.gross_area_ft2;
                        }
                    }
                }
                Err(err) => {
                    outcome.status = ElementStatus::Failed;
                    outcome.diagnostics.push(Diagnostic::new(
                        Some(element.id),
                        DiagnosticKind::ElementFailure,
                        format!("face {}: {err}", candidate.face_ref),
                    ));
                }
            }
        }
        debug!(
            pieces = outcome.pieces.len(),
            neighbours = outcome.neighbours,
            deductions = outcome.deductions_applied,
            "Element processed"
        );
        outcome
    }

    /// Builds, trims and measures the formwork of one face.
    ///
    /// # Errors
    ///
    /// Returns the geometry error if the candidate solid cannot be built.
    pub fn generate_piece(
        &self,
        config: &AnalysisConfig,
        element: &StructuralElement,
        candidate: &FaceCandidate<'_>,
        aggregate: Option<&Solid>,
        threshold: f64,
    ) -> Result<FaceOutcome> {
        let thickness_ft = config.thickness_ft();
        let solid = FormworkSolidBuilder::new(thickness_ft).build(candidate.face)?;
        let deduction = ContactDeductionEngine::new(&self.kernel).deduct(solid, aggregate, threshold);
        let areas = AreaCalculator.measure(candidate.face, deduction.solid.as_ref());
        let contact_ratio = deduction.contact_ratio;
        let applied = deduction.applied;
        let piece = deduction.solid.map(|solid| FormworkPiece {
            host: element.id,
            host_category: element.category,
            face: candidate.face_ref,
            class: candidate.class,
            thickness_ft,
            material: config.material_id,
            gross_area_ft2: areas.gross_ft2,
            net_area_ft2: areas.net_ft2,
            deduction_ratio: contact_ratio,
            solid,
            deducted: applied,
        });
        Ok(FaceOutcome {
            piece,
            gross_area_ft2: areas.gross_ft2,
            contact_ratio,
            boolean_errors: deduction.errors,
        })
    }
}

/// Replaces each processed host's generated elements with its new pieces,
/// in one batch.
fn write_back<H: HostModel + ?Sized>(
    host: &mut H,
    snapshot: &ModelSnapshot,
    outcomes: &[ElementOutcome],
    session: &mut AnalysisSession,
) -> Result<()> {
    host.begin_batch(BATCH_NAME)?;
    let timestamp = session.timestamp().to_string();
    let mut staged: Vec<(ElementId, Vec<(FormworkPiece, Option<ElementId>)>)> = Vec::new();
    let mut diagnostics = Vec::new();
    let mut parameter_failures = 0;

    for outcome in outcomes {
        let element_id = snapshot.element(outcome.slot).id;
        for stale in host.generated_elements(element_id) {
            if let Err(err) = host.delete_element(stale) {
                diagnostics.push(Diagnostic::new(
                    Some(element_id),
                    DiagnosticKind::ElementFailure,
                    format!("could not delete previous formwork {stale}: {err}"),
                ));
            }
        }
        let mut written = Vec::with_capacity(outcome.pieces.len());
        for piece in &outcome.pieces {
            let generated =
                match host.create_geometry_element(
                    element_id,
                    std::slice::from_ref(&piece.solid),
                    Category::Other,
                ) {
                    Ok(id) => id,
                    Err(err) => {
                        diagnostics.push(Diagnostic::new(
                            Some(element_id),
                            DiagnosticKind::ElementFailure,
                            format!("face {}: {err}", piece.face),
                        ));
                        written.push((piece.clone(), None));
                        continue;
                    }
                };
            for (name, value) in piece.parameters(&timestamp) {
                if let Err(err) = host.set_parameter(generated, name, value) {
                    parameter_failures += 1;
                    diagnostics.push(Diagnostic::new(
                        Some(element_id),
                        DiagnosticKind::ParameterWrite,
                        err.to_string(),
                    ));
                }
            }
            written.push((piece.clone(), Some(generated)));
        }
        staged.push((element_id, written));
    }

    if let Err(err) = host.commit_batch() {
        rollback(host, session);
        session.record(Diagnostic::new(
            None,
            DiagnosticKind::Setup,
            format!("commit failed: {err}"),
        ));
        return Err(FormworkError::Model(err));
    }
    for diagnostic in diagnostics {
        session.record(diagnostic);
    }
    session.counters_mut().parameter_failures += parameter_failures;
    for (element_id, pieces) in staged {
        session.pieces_mut().replace_for_host(element_id, pieces);
    }
    Ok(())
}

/// Rolls back the open batch, recording a failed rollback as a diagnostic.
pub(crate) fn rollback<H: HostModel + ?Sized>(host: &mut H, session: &mut AnalysisSession) {
    if let Err(err) = host.rollback_batch() {
        session.record(Diagnostic::new(
            None,
            DiagnosticKind::Setup,
            format!("rollback failed: {err}"),
        ));
    }
}

fn tally(outcomes: &[ElementOutcome], hosts: usize, session: &mut AnalysisSession) {
    let mut diagnostics = Vec::new();
    {
        let counters = session.counters_mut();
        for outcome in outcomes {
            match outcome.status {
                ElementStatus::Succeeded => counters.succeeded += 1,
                ElementStatus::Failed => counters.failed += 1,
                ElementStatus::Skipped => counters.skipped += 1,
            }
            counters.pieces += outcome.pieces.len();
            counters.deductions_applied += outcome.deductions_applied;
            counters.boolean_fallbacks += outcome.boolean_fallbacks;
            counters.union_skips += outcome.union_skips;
            diagnostics.extend(outcome.diagnostics.iter().cloned());
        }
        counters.skipped += hosts - outcomes.len();
    }
    for diagnostic in diagnostics {
        session.record(diagnostic);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::Point3;
    use crate::model::{ElementInfo, HostGeometry, Level, MemoryModel, ParameterSpec, StorageType};
    use crate::operations::boolean::BooleanOp;
    use crate::operations::creation::MakeBox;
    use crate::piece::params;
    use crate::pipeline::FaceClass;
    use crate::units::m2_to_ft2;
    use approx::assert_relative_eq;

    const STAMP: &str = "2026/10/14 09:30:00";

    fn boxed(min: [f64; 3], max: [f64; 3]) -> Vec<HostGeometry> {
        let solid = MakeBox::new(
            Point3::new(min[0], min[1], min[2]),
            Point3::new(max[0], max[1], max[2]),
        )
        .execute()
        .unwrap();
        vec![HostGeometry::Solid(solid)]
    }

    fn session(config: AnalysisConfig) -> AnalysisSession {
        AnalysisSession::new(config).unwrap().with_timestamp(STAMP)
    }

    fn record<'r>(report: &'r RunReport, id: ElementId) -> &'r crate::report::ElementRecord {
        report.elements.iter().find(|r| r.id == id).unwrap()
    }

    /// Beam 10 x 1 x 1 with an optional column overlapping a bottom strip of
    /// `covered` feet, deep enough to intersect the soffit candidate.
    fn beam_model(covered: Option<f64>) -> (MemoryModel, ElementId) {
        let mut model = MemoryModel::new();
        let beam = model.add_element(
            ElementInfo::new("B1", Category::Beam),
            boxed([0.0, 0.0, 9.0], [10.0, 1.0, 10.0]),
        );
        if let Some(covered) = covered {
            model.add_element(
                ElementInfo::new("C1", Category::Column),
                boxed([0.0, 0.0, 0.0], [covered, 1.0, 9.0]),
            );
        }
        (model, beam)
    }

    fn beam_config() -> AnalysisConfig {
        AnalysisConfig {
            categories: vec![Category::Beam],
            ..AnalysisConfig::default()
        }
    }

    #[test]
    fn isolated_column_nets_its_gross_area() {
        let mut model = MemoryModel::new();
        let column = model.add_element(
            ElementInfo::new("C1", Category::Column),
            boxed([0.0, 0.0, 0.0], [1.0, 2.0, 10.0]),
        );
        let mut session = session(AnalysisConfig::default());
        let report = FormworkAnalysis::new().run(&mut model, &mut session).unwrap();
        let rec = record(&report, column);
        assert_eq!(rec.piece_count, 4);
        let gross = m2_to_ft2(rec.gross_area_m2);
        assert_relative_eq!(gross, 60.0, epsilon = 1e-6);
        assert_relative_eq!(rec.net_area_m2, rec.gross_area_m2, epsilon = 1e-9);
        assert_eq!(session.phase(), RunPhase::Idle);
        assert_eq!(model.all_generated().len(), 4);
    }

    #[test]
    fn beam_contact_above_five_percent_is_deducted() {
        let (mut model, beam) = beam_model(Some(0.6));
        let mut session = session(beam_config());
        let report = FormworkAnalysis::new().run(&mut model, &mut session).unwrap();
        let rec = record(&report, beam);
        assert!(rec.net_area_m2 < rec.gross_area_m2);
        let bottom = session
            .pieces()
            .iter()
            .find(|p| p.piece.class == FaceClass::Bottom)
            .unwrap();
        assert!(bottom.piece.deducted);
        assert_relative_eq!(bottom.piece.net_area_ft2, 9.4, epsilon = 1e-6);
    }

    #[test]
    fn beam_contact_below_five_percent_is_kept() {
        let (mut model, beam) = beam_model(Some(0.4));
        let mut session = session(beam_config());
        let report = FormworkAnalysis::new().run(&mut model, &mut session).unwrap();
        let rec = record(&report, beam);
        assert_relative_eq!(rec.net_area_m2, rec.gross_area_m2, epsilon = 1e-9);
        assert!(session.pieces().iter().all(|p| !p.piece.deducted));
    }

    #[test]
    fn column_deducts_at_two_percent() {
        let mut model = MemoryModel::new();
        let column = model.add_element(
            ElementInfo::new("C1", Category::Column),
            boxed([0.0, 0.0, 0.0], [1.0, 1.0, 10.0]),
        );
        // Wall overlapping the east candidate over 0.2 ft of its 10 ft height.
        model.add_element(
            ElementInfo::new("W1", Category::Wall),
            boxed([1.0, 0.0, 9.8], [5.0, 1.0, 12.0]),
        );
        let config = AnalysisConfig {
            categories: vec![Category::Column],
            ..AnalysisConfig::default()
        };
        let mut session = session(config);
        FormworkAnalysis::new().run(&mut model, &mut session).unwrap();
        let east = session
            .pieces()
            .for_host(column)
            .into_iter()
            .find(|p| p.piece.solid.aabb().unwrap().min.x > 0.99)
            .unwrap();
        assert_relative_eq!(east.piece.deduction_ratio, 0.02, epsilon = 1e-6);
        assert!(east.piece.deducted);
        assert_relative_eq!(east.piece.net_area_ft2, 9.8, epsilon = 1e-6);
    }

    #[test]
    fn slab_top_never_counts() {
        let mut model = MemoryModel::new();
        let slab = model.add_element(
            ElementInfo::new("S1", Category::Slab),
            boxed([0.0, 0.0, 0.0], [30.0, 20.0, 1.0]),
        );
        let mut session = session(AnalysisConfig::default());
        let report = FormworkAnalysis::new().run(&mut model, &mut session).unwrap();
        let rec = record(&report, slab);
        // Soffit 600 plus edges 2 * (30 + 20).
        assert_relative_eq!(m2_to_ft2(rec.gross_area_m2), 700.0, epsilon = 1e-6);
        assert!(session
            .pieces()
            .iter()
            .all(|p| p.piece.class != FaceClass::Top));
    }

    #[test]
    fn rerun_replaces_pieces_and_matches_net_area() {
        let (mut model, beam) = beam_model(Some(0.6));
        let analysis = FormworkAnalysis::new();
        let mut session = session(beam_config());
        let first = analysis.run(&mut model, &mut session).unwrap();
        let generated = model.all_generated().len();
        let second = analysis.run(&mut model, &mut session).unwrap();
        assert_eq!(model.all_generated().len(), generated);
        assert_eq!(session.pieces().len(), record(&second, beam).piece_count);
        assert!((record(&first, beam).net_area_m2 - record(&second, beam).net_area_m2).abs() < 1e-3);
        assert_eq!(model.committed_batches().len(), 2);
    }

    #[test]
    fn pieces_carry_their_parameters() {
        let (mut model, beam) = beam_model(None);
        let config = AnalysisConfig {
            material_id: Some(42),
            ..beam_config()
        };
        let mut session = session(config);
        FormworkAnalysis::new().run(&mut model, &mut session).unwrap();
        let generated = model.generated_elements(beam);
        assert_eq!(generated.len(), 3);
        let id = generated[0];
        assert_eq!(
            model.parameter(id, params::HOST_ELEMENT).unwrap(),
            crate::model::ParameterValue::Integer(beam.0)
        );
        assert_eq!(
            model.parameter(id, params::MATERIAL).unwrap(),
            crate::model::ParameterValue::Integer(42)
        );
        assert_eq!(
            model.parameter(id, params::TIMESTAMP).unwrap().as_text(),
            Some(STAMP)
        );
        assert_eq!(
            model.parameter(id, params::HOST_CATEGORY).unwrap().as_text(),
            Some("Structural Framing")
        );
    }

    #[test]
    fn parameter_failures_are_skipped_and_counted() {
        let (model, beam) = beam_model(None);
        let mut model = model
            .without_parameter(params::TIMESTAMP)
            .with_parameter(
                params::THICKNESS,
                ParameterSpec {
                    storage: StorageType::Double,
                    read_only: true,
                },
            );
        let mut session = session(beam_config());
        let report = FormworkAnalysis::new().run(&mut model, &mut session).unwrap();
        assert_eq!(report.summary.counters.parameter_failures, 6);
        assert_eq!(model.generated_elements(beam).len(), 3);
        assert!(model
            .parameter(model.generated_elements(beam)[0], params::EFFECTIVE_AREA)
            .is_ok());
        assert!(session
            .diagnostics()
            .iter()
            .any(|d| d.kind == DiagnosticKind::ParameterWrite));
    }

    #[test]
    fn extraction_failure_is_counted_and_run_continues() {
        let mut model = MemoryModel::new();
        let broken = model.add_element(
            ElementInfo::new("C1", Category::Column),
            boxed([0.0, 0.0, 0.0], [1.0, 1.0, 10.0]),
        );
        let fine = model.add_element(
            ElementInfo::new("C2", Category::Column),
            boxed([20.0, 0.0, 0.0], [21.0, 1.0, 10.0]),
        );
        let mut model = model.with_geometry_failure(broken);
        let mut session = session(AnalysisConfig::default());
        let report = FormworkAnalysis::new().run(&mut model, &mut session).unwrap();
        assert_eq!(report.summary.counters.failed, 1);
        assert_eq!(report.summary.counters.succeeded, 1);
        assert_eq!(record(&report, broken).area_formula, "0.000m²");
        assert_eq!(record(&report, fine).piece_count, 4);
        assert!(session
            .diagnostics()
            .iter()
            .any(|d| d.kind == DiagnosticKind::GeometryExtraction && d.element == Some(broken)));
    }

    #[test]
    fn unavailable_host_is_fatal() {
        let mut model = MemoryModel::new().unavailable();
        let mut session = session(AnalysisConfig::default());
        let err = FormworkAnalysis::new().run(&mut model, &mut session).unwrap_err();
        assert!(matches!(err, FormworkError::Model(ModelError::Unavailable(_))));
        assert_eq!(session.phase(), RunPhase::Idle);
    }

    #[test]
    fn commit_failure_rolls_back() {
        let (model, _) = beam_model(None);
        let mut model = model.with_commit_failure();
        let mut session = session(beam_config());
        let err = FormworkAnalysis::new().run(&mut model, &mut session).unwrap_err();
        assert!(matches!(err, FormworkError::Model(ModelError::Rejected(_))));
        assert!(model.all_generated().is_empty());
        assert!(!model.in_batch());
        assert!(session.pieces().is_empty());
    }

    #[test]
    fn cancelled_run_skips_remaining_elements() {
        let mut model = MemoryModel::new();
        for i in 0..3 {
            let x = f64::from(i) * 10.0;
            model.add_element(
                ElementInfo::new(format!("C{i}"), Category::Column),
                boxed([x, 0.0, 0.0], [x + 1.0, 1.0, 10.0]),
            );
        }
        let mut session = session(AnalysisConfig::default());
        session.cancel_token().cancel();
        let report = FormworkAnalysis::new().run(&mut model, &mut session).unwrap();
        assert!(report.cancelled);
        assert_eq!(report.summary.counters.skipped, 3);
        assert!(session
            .diagnostics()
            .iter()
            .any(|d| d.kind == DiagnosticKind::UserCancellation));
    }

    #[test]
    fn parallel_matches_sequential() {
        let build = || {
            let mut model = MemoryModel::new();
            model.add_element(
                ElementInfo::new("B1", Category::Beam),
                boxed([0.0, 0.0, 9.0], [10.0, 1.0, 10.0]),
            );
            model.add_element(
                ElementInfo::new("C1", Category::Column),
                boxed([0.0, 0.0, 0.0], [1.0, 1.0, 9.0]),
            );
            model.add_element(
                ElementInfo::new("C2", Category::Column),
                boxed([9.0, 0.0, 0.0], [10.0, 1.0, 9.0]),
            );
            model.add_element(
                ElementInfo::new("S1", Category::Slab),
                boxed([-2.0, -2.0, 10.0], [12.0, 3.0, 11.0]),
            );
            model
        };
        let mut sequential_model = build();
        let mut parallel_model = build();
        let mut sequential = session(AnalysisConfig::default());
        let mut parallel = session(AnalysisConfig {
            parallel: true,
            ..AnalysisConfig::default()
        });
        let a = FormworkAnalysis::new().run(&mut sequential_model, &mut sequential).unwrap();
        let b = FormworkAnalysis::new().run(&mut parallel_model, &mut parallel).unwrap();
        assert_eq!(a.elements.len(), b.elements.len());
        for (x, y) in a.elements.iter().zip(&b.elements) {
            assert_eq!(x.id, y.id);
            assert_eq!(x.area_formula, y.area_formula);
        }
    }

    #[test]
    fn precision_mode_ignores_other_zones() {
        let zone = |z: &str| {
            Some(ZoneKey {
                zone: z.into(),
                phase: None,
            })
        };
        let build = |column_zone: Option<ZoneKey>| {
            let mut model = MemoryModel::new();
            let mut beam_info = ElementInfo::new("B1", Category::Beam);
            beam_info.zone = zone("A");
            let beam = model.add_element(beam_info, boxed([0.0, 0.0, 9.0], [10.0, 1.0, 10.0]));
            let mut column_info = ElementInfo::new("C1", Category::Column);
            column_info.zone = column_zone;
            model.add_element(column_info, boxed([0.0, 0.0, 0.0], [2.0, 1.0, 9.0]));
            (model, beam)
        };
        for amortize in [false, true] {
            let config = AnalysisConfig {
                precision_mode: true,
                amortize_zone_aggregates: amortize,
                ..beam_config()
            };
            let (mut same, beam) = build(zone("A"));
            let mut s1 = session(config.clone());
            let same_zone = FormworkAnalysis::new().run(&mut same, &mut s1).unwrap();
            let (mut other, beam2) = build(zone("B"));
            let mut s2 = session(config);
            let other_zone = FormworkAnalysis::new().run(&mut other, &mut s2).unwrap();
            let deducted = record(&same_zone, beam);
            let untouched = record(&other_zone, beam2);
            assert!(deducted.net_area_m2 < deducted.gross_area_m2);
            assert_relative_eq!(untouched.net_area_m2, untouched.gross_area_m2, epsilon = 1e-9);
        }
    }

    #[test]
    fn override_flag_skips_element() {
        let mut model = MemoryModel::new();
        let mut info = ElementInfo::new("C1", Category::Column);
        info.flags.override_excluded = true;
        info.level = Some(Level {
            name: "L1".into(),
            elevation: 0.0,
        });
        let id = model.add_element(info, boxed([0.0, 0.0, 0.0], [1.0, 1.0, 10.0]));
        let mut session = session(AnalysisConfig::default());
        let report = FormworkAnalysis::new().run(&mut model, &mut session).unwrap();
        assert_eq!(record(&report, id).status, ElementStatus::Skipped);
        assert_eq!(report.summary.counters.skipped, 1);
        assert!(model.all_generated().is_empty());
    }

    /// Fails every union whose right operand is the given element's box.
    struct FailOn(f64);

    impl BooleanKernel for FailOn {
        fn union(&self, a: &Solid, b: &Solid) -> std::result::Result<Solid, BooleanError> {
            if b.aabb().is_some_and(|bb| (bb.min.x - self.0).abs() < 1e-9) {
                return Err(BooleanError::Failed {
                    op: BooleanOp::Union,
                    reason: "injected".into(),
                });
            }
            ConvexKernel.union(a, b)
        }

        fn intersect(&self, a: &Solid, b: &Solid) -> std::result::Result<Solid, BooleanError> {
            ConvexKernel.intersect(a, b)
        }

        fn subtract(&self, a: &Solid, b: &Solid) -> std::result::Result<Solid, BooleanError> {
            ConvexKernel.subtract(a, b)
        }
    }

    #[test]
    fn failed_neighbour_union_keeps_the_rest() {
        let mut model = MemoryModel::new();
        let beam = model.add_element(
            ElementInfo::new("B1", Category::Beam),
            boxed([0.0, 0.0, 9.0], [10.0, 1.0, 10.0]),
        );
        model.add_element(
            ElementInfo::new("C1", Category::Column),
            boxed([0.0, 0.0, 0.0], [1.0, 1.0, 9.0]),
        );
        model.add_element(
            ElementInfo::new("C2", Category::Column),
            boxed([4.5, 0.0, 0.0], [5.5, 1.0, 9.0]),
        );
        model.add_element(
            ElementInfo::new("C3", Category::Column),
            boxed([9.0, 0.0, 0.0], [10.0, 1.0, 9.0]),
        );
        let mut session = session(beam_config());
        let report = FormworkAnalysis::with_kernel(FailOn(4.5))
            .run(&mut model, &mut session)
            .unwrap();
        assert_eq!(report.summary.counters.union_skips, 1);
        let bottom = session
            .pieces()
            .iter()
            .find(|p| p.piece.host == beam && p.piece.class == FaceClass::Bottom)
            .unwrap();
        // The two end columns are deducted; the middle one is not.
        assert_relative_eq!(bottom.piece.net_area_ft2, 8.0, epsilon = 1e-6);
    }

    #[test]
    fn fully_covered_face_keeps_its_gross_area() {
        let mut model = MemoryModel::new();
        let column = model.add_element(
            ElementInfo::new("C1", Category::Column),
            boxed([0.0, 0.0, 0.0], [1.0, 1.0, 10.0]),
        );
        model.add_element(
            ElementInfo::new("W1", Category::Wall),
            boxed([1.0, -1.0, 0.0], [2.0, 2.0, 10.0]),
        );
        let mut session = session(AnalysisConfig::default());
        let report = FormworkAnalysis::new().run(&mut model, &mut session).unwrap();
        let rec = record(&report, column);
        assert_eq!(rec.piece_count, 3);
        assert_relative_eq!(m2_to_ft2(rec.gross_area_m2), 40.0, epsilon = 1e-6);
        assert_relative_eq!(m2_to_ft2(rec.net_area_m2), 30.0, epsilon = 1e-6);
        let columns = report
            .summary
            .categories
            .iter()
            .find(|c| c.category == Category::Column)
            .unwrap();
        assert_relative_eq!(columns.gross_area_m2, rec.gross_area_m2, epsilon = 1e-9);
    }

    #[test]
    fn empty_element_totals_are_positive_zero() {
        let mut model = MemoryModel::new();
        let column = model.add_element(ElementInfo::new("C1", Category::Column), Vec::new());
        let mut session = session(AnalysisConfig::default());
        let report = FormworkAnalysis::new().run(&mut model, &mut session).unwrap();
        let rec = record(&report, column);
        assert_eq!(rec.status, ElementStatus::Failed);
        assert_eq!(rec.area_formula, "0.000m²");
        assert!(rec.net_area_m2.is_sign_positive());
        assert!(rec.gross_area_m2.is_sign_positive());
        assert!(rec.concrete_volume_m3.is_sign_positive());
        assert!(report.summary.net_area_m2.is_sign_positive());
    }

    #[test]
    fn rerun_replaces_pieces_without_host_parameter() {
        let mut model = MemoryModel::new().without_parameter(params::HOST_ELEMENT);
        model.add_element(
            ElementInfo::new("C1", Category::Column),
            boxed([0.0, 0.0, 0.0], [1.0, 1.0, 10.0]),
        );
        let analysis = FormworkAnalysis::new();
        let mut session = session(AnalysisConfig::default());
        let first = analysis.run(&mut model, &mut session).unwrap();
        assert_eq!(first.summary.counters.parameter_failures, 4);
        assert_eq!(model.all_generated().len(), 4);
        analysis.run(&mut model, &mut session).unwrap();
        assert_eq!(model.all_generated().len(), 4);
        assert_eq!(session.pieces().len(), 4);
    }

    #[test]
    fn cancellation_applies_to_one_run_only() {
        let mut model = MemoryModel::new();
        model.add_element(
            ElementInfo::new("C1", Category::Column),
            boxed([0.0, 0.0, 0.0], [1.0, 1.0, 10.0]),
        );
        let analysis = FormworkAnalysis::new();
        let mut session = session(AnalysisConfig::default());
        session.cancel_token().cancel();
        assert!(analysis.run(&mut model, &mut session).unwrap().cancelled);
        assert!(!session.is_cancelled());
        let second = analysis.run(&mut model, &mut session).unwrap();
        assert!(!second.cancelled);
        assert_eq!(second.summary.counters.succeeded, 1);
    }

    #[test]
    fn failed_rollback_is_recorded() {
        let mut model = MemoryModel::new();
        let mut session = session(AnalysisConfig::default());
        rollback(&mut model, &mut session);
        assert!(session
            .diagnostics()
            .iter()
            .any(|d| d.kind == DiagnosticKind::Setup && d.message.contains("rollback")));
    }
}
