use std::fmt;

use serde::Serialize;

use crate::config::AnalysisConfig;
use crate::math::Vector3;
use crate::model::Category;
use crate::topology::Face;

/// |n.z| above which a face counts as horizontal.
const HORIZONTAL_Z: f64 = 0.5;
/// cos 45°: lateral faces closer than this to the principal axis are ends.
const END_ALIGNMENT: f64 = std::f64::consts::FRAC_1_SQRT_2;

/// Orientation class of a boundary face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FaceClass {
    Top,
    Bottom,
    Side,
    End,
}

impl fmt::Display for FaceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Side => "side",
            Self::End => "end",
        };
        f.write_str(name)
    }
}

impl FaceClass {
    /// Classifies an outward normal. Without an axis every lateral face is a side.
    #[must_use]
    pub fn of_normal(normal: &Vector3, axis: Option<&Vector3>) -> Self {
        if normal.z > HORIZONTAL_Z {
            Self::Top
        } else if normal.z < -HORIZONTAL_Z {
            Self::Bottom
        } else if axis.is_some_and(|a| normal.dot(a).abs() > END_ALIGNMENT) {
            Self::End
        } else {
            Self::Side
        }
    }

    #[must_use]
    pub fn is_lateral(self) -> bool {
        matches!(self, Self::Side | Self::End)
    }
}

/// Horizontal direction lying in the largest lateral face.
///
/// For a beam or wall this runs along its length, so the faces at either end
/// are the ones whose normals align with it.
#[must_use]
pub fn principal_axis<'a>(faces: impl IntoIterator<Item = &'a Face>) -> Option<Vector3> {
    let largest = faces
        .into_iter()
        .filter(|f| f.normal().z.abs() <= HORIZONTAL_Z)
        .max_by(|a, b| a.area().total_cmp(&b.area()))?;
    let n = largest.normal();
    Vector3::z().cross(n).try_normalize(1e-9)
}

/// Face selection policy for one category.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceRule {
    pub category: Category,
    pub included: &'static [FaceClass],
    pub on_grade_excludes: &'static [FaceClass],
    pub against_soil_excludes: &'static [FaceClass],
    /// Drop top and bottom faces that bear on a slab or foundation.
    pub slab_contact: bool,
    /// Distinguish end faces from side faces.
    pub uses_axis: bool,
    pub min_area_m2: f64,
    /// Contact ratio above which contact is subtracted.
    pub threshold: f64,
    /// Neighbour search buffer in feet.
    pub search_buffer_ft: f64,
}

impl FaceRule {
    #[must_use]
    pub fn includes(&self, class: FaceClass) -> bool {
        self.included.contains(&class)
    }
}

const LATERAL: &[FaceClass] = &[FaceClass::Side, FaceClass::End];
const BOTTOM: &[FaceClass] = &[FaceClass::Bottom];
const NONE: &[FaceClass] = &[];

/// One [`FaceRule`] per category.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceRuleTable {
    rules: Vec<FaceRule>,
}

impl FaceRuleTable {
    #[must_use]
    pub fn from_config(config: &AnalysisConfig) -> Self {
        let fine = config.min_face_area.fine_m2;
        let coarse = config.min_face_area.coarse_m2;
        let rule = |category: Category,
                    included: &'static [FaceClass],
                    on_grade_excludes: &'static [FaceClass],
                    against_soil_excludes: &'static [FaceClass],
                    slab_contact: bool,
                    uses_axis: bool,
                    min_area_m2: f64| FaceRule {
            category,
            included,
            on_grade_excludes,
            against_soil_excludes,
            slab_contact,
            uses_axis,
            min_area_m2,
            threshold: config.thresholds.for_category(category),
            search_buffer_ft: config.search.buffer_ft(category),
        };
        let rules = vec![
            rule(Category::Column, LATERAL, NONE, NONE, false, false, fine),
            rule(
                Category::Beam,
                &[FaceClass::Side, FaceClass::Bottom],
                BOTTOM,
                NONE,
                false,
                true,
                fine,
            ),
            rule(
                Category::Slab,
                &[FaceClass::Bottom, FaceClass::Side, FaceClass::End],
                BOTTOM,
                LATERAL,
                false,
                false,
                coarse,
            ),
            rule(
                Category::Wall,
                &[FaceClass::Side, FaceClass::Top],
                NONE,
                NONE,
                true,
                true,
                coarse,
            ),
            rule(Category::Foundation, LATERAL, NONE, LATERAL, false, false, coarse),
            rule(
                Category::Stair,
                &[FaceClass::Bottom, FaceClass::Side, FaceClass::End],
                BOTTOM,
                NONE,
                false,
                false,
                fine,
            ),
            rule(
                Category::Other,
                &[FaceClass::Bottom, FaceClass::Side, FaceClass::End],
                BOTTOM,
                NONE,
                false,
                false,
                coarse,
            ),
        ];
        Self { rules }
    }

    #[must_use]
    pub fn rule(&self, category: Category) -> &FaceRule {
        let index = match category {
            Category::Column => 0,
            Category::Beam => 1,
            Category::Slab => 2,
            Category::Wall => 3,
            Category::Foundation => 4,
            Category::Stair => 5,
            Category::Other => 6,
        };
        &self.rules[index]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::Point3;
    use crate::operations::creation::MakeBox;
    use approx::assert_relative_eq;

    #[test]
    fn normals_classify_by_orientation() {
        let axis = Vector3::x();
        assert_eq!(FaceClass::of_normal(&Vector3::z(), None), FaceClass::Top);
        assert_eq!(FaceClass::of_normal(&-Vector3::z(), None), FaceClass::Bottom);
        assert_eq!(FaceClass::of_normal(&Vector3::x(), None), FaceClass::Side);
        assert_eq!(FaceClass::of_normal(&Vector3::x(), Some(&axis)), FaceClass::End);
        assert_eq!(FaceClass::of_normal(&Vector3::y(), Some(&axis)), FaceClass::Side);
    }

    #[test]
    fn beam_axis_runs_along_its_length() {
        let beam = MakeBox::new(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 1.0, 2.0))
            .execute()
            .unwrap();
        let axis = principal_axis(beam.faces()).unwrap();
        assert_relative_eq!(axis.x.abs(), 1.0, epsilon = 1e-9);
        let ends = beam
            .faces()
            .iter()
            .filter(|f| FaceClass::of_normal(f.normal(), Some(&axis)) == FaceClass::End)
            .count();
        assert_eq!(ends, 2);
    }

    #[test]
    fn table_carries_both_thresholds_and_buffers() {
        let table = FaceRuleTable::from_config(&AnalysisConfig::default());
        assert_relative_eq!(table.rule(Category::Column).threshold, 0.01);
        assert_relative_eq!(table.rule(Category::Beam).threshold, 0.05);
        assert_relative_eq!(table.rule(Category::Slab).search_buffer_ft, 3000.0 / 304.8);
        assert_relative_eq!(table.rule(Category::Wall).search_buffer_ft, 5.0);
        assert!(!table.rule(Category::Slab).includes(FaceClass::Top));
        assert!(table.rule(Category::Wall).slab_contact);
        assert!(table.rule(Category::Beam).uses_axis);
        for category in Category::STRUCTURAL {
            assert_eq!(table.rule(category).category, category);
        }
    }
}
