use crate::error::{GeometryError, Result};
use crate::operations::shaping::Extrude;
use crate::topology::{Face, Solid};

/// Builds the candidate formwork solid for a face.
#[derive(Debug, Clone, Copy)]
pub struct FormworkSolidBuilder {
    thickness_ft: f64,
}

impl FormworkSolidBuilder {
    #[must_use]
    pub fn new(thickness_ft: f64) -> Self {
        Self { thickness_ft }
    }

    /// Extrudes the face outward by the formwork thickness.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::InvalidThickness`] for a non-positive
    /// thickness, or the extrusion error if the face yields no volume.
    pub fn build(&self, face: &Face) -> Result<Solid> {
        if !(self.thickness_ft.is_finite() && self.thickness_ft > 0.0) {
            return Err(GeometryError::InvalidThickness(self.thickness_ft).into());
        }
        if face.boundary_loops().is_empty() {
            return Err(GeometryError::CurveLoop("face has no boundary loops".into()).into());
        }
        Extrude::from_face(face, face.normal() * self.thickness_ft).execute()
    }
}
