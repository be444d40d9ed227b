use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Serialize;

use crate::analysis::{ElementOutcome, ElementStatus};
use crate::model::{Category, ElementId, ModelSnapshot, ZoneKey};
use crate::session::{AnalysisSession, Diagnostic, RunCounters};
use crate::units::{ft2_to_m2, ft3_to_m3};

/// Sum that is `+0.0` when empty; `Iterator::sum` starts from `-0.0`.
fn total(values: impl Iterator<Item = f64>) -> f64 {
    values.fold(0.0, |acc, v| acc + v)
}

/// Renders piece areas as `"3.120 + 2.480 = 5.600m²"`.
///
/// A single piece renders as `"5.600m²"` and no pieces as `"0.000m²"`.
#[must_use]
pub fn area_formula(net_areas_m2: &[f64]) -> String {
    let sum = total(net_areas_m2.iter().copied());
    if net_areas_m2.len() < 2 {
        return format!("{sum:.3}m²");
    }
    let mut formula = String::new();
    for (i, area) in net_areas_m2.iter().enumerate() {
        if i > 0 {
            formula.push_str(" + ");
        }
        let _ = write!(formula, "{area:.3}");
    }
    let _ = write!(formula, " = {sum:.3}m²");
    formula
}

/// One row per analysed element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementRecord {
    pub id: ElementId,
    pub name: String,
    pub level: Option<String>,
    pub level_elevation: Option<f64>,
    pub category: Category,
    pub zone: Option<ZoneKey>,
    pub status: ElementStatus,
    pub piece_count: usize,
    pub area_formula: String,
    pub gross_area_m2: f64,
    pub net_area_m2: f64,
    pub concrete_volume_m3: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryBreakdown {
    pub category: Category,
    pub element_count: usize,
    pub piece_count: usize,
    pub gross_area_m2: f64,
    pub net_area_m2: f64,
    pub concrete_volume_m3: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PourZoneGroup {
    /// `None` groups the elements without a zone tag.
    pub zone: Option<ZoneKey>,
    pub members: Vec<ElementId>,
    pub element_count: usize,
    pub piece_count: usize,
    pub net_area_m2: f64,
    pub concrete_volume_m3: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub element_count: usize,
    pub piece_count: usize,
    pub gross_area_m2: f64,
    pub net_area_m2: f64,
    pub concrete_volume_m3: f64,
    pub counters: RunCounters,
    pub categories: Vec<CategoryBreakdown>,
}

/// Everything a run produced, ready for CSV or JSON output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub timestamp: String,
    pub precision_mode: bool,
    pub cancelled: bool,
    pub summary: RunSummary,
    /// Sorted by level elevation, level name, category, then name.
    pub elements: Vec<ElementRecord>,
    pub zones: Vec<PourZoneGroup>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Rolls element outcomes up into a [`RunReport`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultAggregator;

impl ResultAggregator {
    #[must_use]
    pub fn aggregate(
        &self,
        snapshot: &ModelSnapshot,
        outcomes: &[ElementOutcome],
        session: &AnalysisSession,
        cancelled: bool,
    ) -> RunReport {
        let mut elements: Vec<ElementRecord> = outcomes
            .iter()
            .map(|outcome| Self::record(snapshot, outcome))
            .collect();
        elements.sort_by(compare_records);

        let mut categories: BTreeMap<Category, CategoryBreakdown> = BTreeMap::new();
        let mut zones: BTreeMap<Option<ZoneKey>, PourZoneGroup> = BTreeMap::new();
        for record in &elements {
            let entry = categories
                .entry(record.category)
                .or_insert_with(|| CategoryBreakdown {
                    category: record.category,
                    element_count: 0,
                    piece_count: 0,
                    gross_area_m2: 0.0,
                    net_area_m2: 0.0,
                    concrete_volume_m3: 0.0,
                });
            entry.element_count += 1;
            entry.piece_count += record.piece_count;
            entry.gross_area_m2 += record.gross_area_m2;
            entry.net_area_m2 += record.net_area_m2;
            entry.concrete_volume_m3 += record.concrete_volume_m3;

            let group = zones
                .entry(record.zone.clone())
                .or_insert_with(|| PourZoneGroup {
                    zone: record.zone.clone(),
                    members: Vec::new(),
                    element_count: 0,
                    piece_count: 0,
                    net_area_m2: 0.0,
                    concrete_volume_m3: 0.0,
                });
            group.members.push(record.id);
            group.element_count += 1;
            group.piece_count += record.piece_count;
            group.net_area_m2 += record.net_area_m2;
            group.concrete_volume_m3 += record.concrete_volume_m3;
        }
        let mut zones: Vec<PourZoneGroup> = zones.into_values().collect();
        for group in &mut zones {
            group.members.sort_unstable();
        }

        let summary = RunSummary {
            element_count: elements.len(),
            piece_count: elements.iter().map(|r| r.piece_count).sum(),
            gross_area_m2: total(elements.iter().map(|r| r.gross_area_m2)),
            net_area_m2: total(elements.iter().map(|r| r.net_area_m2)),
            concrete_volume_m3: total(elements.iter().map(|r| r.concrete_volume_m3)),
            counters: *session.counters(),
            categories: categories.into_values().collect(),
        };

        RunReport {
            timestamp: session.timestamp().to_string(),
            precision_mode: session.config().precision_mode,
            cancelled,
            summary,
            elements,
            zones,
            diagnostics: session.diagnostics().to_vec(),
        }
    }

    fn record(snapshot: &ModelSnapshot, outcome: &ElementOutcome) -> ElementRecord {
        let element = snapshot.element(outcome.slot);
        let net: Vec<f64> = outcome.pieces.iter().map(|p| p.net_area_m2()).collect();
        ElementRecord {
            id: element.id,
            name: element.name.clone(),
            level: element.level.as_ref().map(|l| l.name.clone()),
            level_elevation: element.level.as_ref().map(|l| l.elevation),
            category: element.category,
            zone: element.zone.clone(),
            status: outcome.status,
            piece_count: outcome.pieces.len(),
            area_formula: area_formula(&net),
            gross_area_m2: ft2_to_m2(
                total(outcome.pieces.iter().map(|p| p.gross_area_ft2))
                    + outcome.full_contact_gross_ft2,
            ),
            net_area_m2: total(net.iter().copied()),
            concrete_volume_m3: ft3_to_m3(element.volume()),
        }
    }
}

// Elements without a level sort last.
fn compare_records(a: &ElementRecord, b: &ElementRecord) -> Ordering {
    let elevation = match (a.level_elevation, b.level_elevation) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    elevation
        .then_with(|| a.level.cmp(&b.level))
        .then_with(|| a.category.cmp(&b.category))
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.id.cmp(&b.id))
}
