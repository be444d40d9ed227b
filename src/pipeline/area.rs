use crate::geometry::Plane;
use crate::topology::{Face, Solid};
use crate::units::ft2_to_m2;

/// Gross and net area of one piece, in square feet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PieceAreas {
    pub gross_ft2: f64,
    pub net_ft2: f64,
}

impl PieceAreas {
    #[must_use]
    pub fn net_m2(&self) -> f64 {
        ft2_to_m2(self.net_ft2)
    }

    #[must_use]
    pub fn gross_m2(&self) -> f64 {
        ft2_to_m2(self.gross_ft2)
    }
}

/// Measures formwork solids by summing actual face areas.
#[derive(Debug, Clone, Copy, Default)]
pub struct AreaCalculator;

impl AreaCalculator {
    /// Area of the faces of `solid` lying on `host_plane` and facing the host.
    ///
    /// Only the contact side counts, not the whole surface of the piece, so
    /// net area stays within `0..=gross`.
    #[must_use]
    pub fn contact_area(&self, solid: &Solid, host_plane: &Plane) -> f64 {
        solid
            .faces()
            .iter()
            .filter(|f| f.plane().is_opposite_to(host_plane))
            .map(Face::area)
            .fold(0.0, |acc, a| acc + a)
    }

    /// Areas of the piece built on `host_face`. `solid` is `None` for a fully
    /// covered face.
    #[must_use]
    pub fn measure(&self, host_face: &Face, solid: Option<&Solid>) -> PieceAreas {
        let gross_ft2 = host_face.area().max(0.0);
        let net_ft2 = solid
            .map_or(0.0, |s| self.contact_area(s, host_face.plane()))
            .clamp(0.0, gross_ft2);
        PieceAreas { gross_ft2, net_ft2 }
    }

    #[must_use]
    pub fn surface_area(&self, solid: &Solid) -> f64 {
        solid.surface_area()
    }
}
