use std::fmt;

use serde::Serialize;

use crate::math::Vector3;
use crate::model::{Category, StructuralElement};
use crate::piece::FaceRef;
use crate::topology::{Face, PointClassification};
use crate::units::ft2_to_m2;

use super::rules::{principal_axis, FaceClass, FaceRule, FaceRuleTable};

/// Why a face gets no formwork.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RejectReason {
    OverrideExcluded,
    NotIncluded(FaceClass),
    OnGrade,
    AgainstSoil,
    /// The face bears on a neighbouring slab or foundation.
    SlabContact,
    BelowMinimumArea { area_m2: f64, min_m2: f64 },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OverrideExcluded => f.write_str("element excluded by override"),
            Self::NotIncluded(class) => write!(f, "{class} faces are not formed"),
            Self::OnGrade => f.write_str("cast on grade"),
            Self::AgainstSoil => f.write_str("poured against soil"),
            Self::SlabContact => f.write_str("bears on a slab or foundation"),
            Self::BelowMinimumArea { area_m2, min_m2 } => {
                write!(f, "area {area_m2:.4}m² is below {min_m2:.4}m²")
            }
        }
    }
}

/// A face that needs formwork.
#[derive(Debug, Clone, Copy)]
pub struct FaceCandidate<'a> {
    pub face_ref: FaceRef,
    pub face: &'a Face,
    pub class: FaceClass,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaceRejection {
    /// `None` when the whole element was rejected.
    pub face_ref: Option<FaceRef>,
    pub class: Option<FaceClass>,
    pub reason: RejectReason,
}

#[derive(Debug, Default)]
pub struct FaceSelection<'a> {
    pub selected: Vec<FaceCandidate<'a>>,
    pub rejected: Vec<FaceRejection>,
}

/// Applies the category rule table to the boundary faces of a host.
#[derive(Debug, Clone, Copy)]
pub struct FormworkFaceSelector<'r> {
    rules: &'r FaceRuleTable,
    thickness_ft: f64,
}

impl<'r> FormworkFaceSelector<'r> {
    #[must_use]
    pub fn new(rules: &'r FaceRuleTable, thickness_ft: f64) -> Self {
        Self {
            rules,
            thickness_ft,
        }
    }

    /// Every boundary face of `host` with its class, in face-reference order.
    #[must_use]
    pub fn classified<'h>(&self, host: &'h StructuralElement) -> Vec<FaceCandidate<'h>> {
        let rule = self.rules.rule(host.category);
        let axis = if rule.uses_axis {
            principal_axis(host.solids.iter().flat_map(|s| s.faces()))
        } else {
            None
        };
        host.solids
            .iter()
            .enumerate()
            .flat_map(|(solid, s)| {
                s.faces().iter().enumerate().map(move |(face, f)| FaceCandidate {
                    face_ref: FaceRef { solid, face },
                    face: f,
                    class: FaceClass::of_normal(f.normal(), axis.as_ref()),
                })
            })
            .collect()
    }

    /// Selects the faces of `host` that need formwork.
    ///
    /// `neighbours` are checked for slab contact on categories that use it.
    #[must_use]
    pub fn select<'h>(
        &self,
        host: &'h StructuralElement,
        neighbours: &[&StructuralElement],
    ) -> FaceSelection<'h> {
        let mut selection = FaceSelection::default();
        if host.flags.override_excluded {
            selection.rejected.push(FaceRejection {
                face_ref: None,
                class: None,
                reason: RejectReason::OverrideExcluded,
            });
            return selection;
        }
        let rule = self.rules.rule(host.category);
        for candidate in self.classified(host) {
            match self.rejection(rule, host, &candidate, neighbours) {
                Some(reason) => selection.rejected.push(FaceRejection {
                    face_ref: Some(candidate.face_ref),
                    class: Some(candidate.class),
                    reason,
                }),
                None => selection.selected.push(candidate),
            }
        }
        selection
    }

    fn rejection(
        &self,
        rule: &FaceRule,
        host: &StructuralElement,
        candidate: &FaceCandidate<'_>,
        neighbours: &[&StructuralElement],
    ) -> Option<RejectReason> {
        let class = candidate.class;
        if !rule.includes(class) {
            return Some(RejectReason::NotIncluded(class));
        }
        if host.flags.on_grade && rule.on_grade_excludes.contains(&class) {
            return Some(RejectReason::OnGrade);
        }
        if host.flags.against_soil && rule.against_soil_excludes.contains(&class) {
            return Some(RejectReason::AgainstSoil);
        }
        if rule.slab_contact
            && !class.is_lateral()
            && self.bears_on_slab(candidate.face, neighbours)
        {
            return Some(RejectReason::SlabContact);
        }
        let area_m2 = ft2_to_m2(candidate.face.area());
        if area_m2 < rule.min_area_m2 {
            return Some(RejectReason::BelowMinimumArea {
                area_m2,
                min_m2: rule.min_area_m2,
            });
        }
        None
    }

    fn bears_on_slab(&self, face: &Face, neighbours: &[&StructuralElement]) -> bool {
        let offset: Vector3 = face.normal() * (self.thickness_ft / 2.0);
        let probe = face.interior_point() + offset;
        neighbours
            .iter()
            .filter(|n| matches!(n.category, Category::Slab | Category::Foundation))
            .flat_map(|n| n.solids.iter())
            .any(|s| s.contains_point(&probe) == PointClassification::Inside)
    }
}
