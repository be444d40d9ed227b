use std::fmt;
use std::str::FromStr;

use rustc_hash::FxHashMap;
use serde::Serialize;
use slotmap::SlotMap;

use crate::model::{Category, ElementId, ParameterValue};
use crate::pipeline::rules::FaceClass;
use crate::topology::Solid;
use crate::units::ft2_to_m2;

/// Names and storage types of the parameters written on generated pieces.
pub mod params {
    use crate::model::StorageType;

    /// Net formwork area in square feet.
    pub const EFFECTIVE_AREA: &str = "Formwork Effective Area";
    /// Gross face area in square feet.
    pub const TOTAL_AREA: &str = "Formwork Total Area";
    pub const HOST_ELEMENT: &str = "Formwork Host Element";
    pub const HOST_CATEGORY: &str = "Formwork Host Category";
    /// Panel thickness in feet.
    pub const THICKNESS: &str = "Formwork Thickness";
    /// Material id, -1 when none is assigned.
    pub const MATERIAL: &str = "Formwork Material";
    pub const TIMESTAMP: &str = "Formwork Analysis Timestamp";
    pub const SOURCE_FACE: &str = "Formwork Source Face";

    pub const ALL: [(&str, StorageType); 8] = [
        (EFFECTIVE_AREA, StorageType::Double),
        (TOTAL_AREA, StorageType::Double),
        (HOST_ELEMENT, StorageType::Integer),
        (HOST_CATEGORY, StorageType::Text),
        (THICKNESS, StorageType::Double),
        (MATERIAL, StorageType::Integer),
        (TIMESTAMP, StorageType::Text),
        (SOURCE_FACE, StorageType::Text),
    ];
}

/// Reference to a boundary face of a host element: solid index, face index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FaceRef {
    pub solid: usize,
    pub face: usize,
}

impl fmt::Display for FaceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.solid, self.face)
    }
}

impl FromStr for FaceRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (solid, face) = s
            .split_once(':')
            .ok_or_else(|| format!("face reference '{s}' is not of the form solid:face"))?;
        let parse = |part: &str| {
            part.trim()
                .parse::<usize>()
                .map_err(|e| format!("face reference '{s}': {e}"))
        };
        Ok(Self {
            solid: parse(solid)?,
            face: parse(face)?,
        })
    }
}

/// Formwork generated for one face of a host element.
#[derive(Debug, Clone)]
pub struct FormworkPiece {
    pub host: ElementId,
    pub host_category: Category,
    pub face: FaceRef,
    pub class: FaceClass,
    pub thickness_ft: f64,
    pub material: Option<i64>,
    pub gross_area_ft2: f64,
    pub net_area_ft2: f64,
    /// Intersection volume over candidate volume, in [0, 1].
    pub deduction_ratio: f64,
    pub solid: Solid,
    /// `true` if contact was subtracted from the candidate.
    pub deducted: bool,
}

impl FormworkPiece {
    #[must_use]
    pub fn net_area_m2(&self) -> f64 {
        ft2_to_m2(self.net_area_ft2)
    }

    #[must_use]
    pub fn gross_area_m2(&self) -> f64 {
        ft2_to_m2(self.gross_area_ft2)
    }

    /// Parameter values persisted on the generated element.
    #[must_use]
    pub fn parameters(&self, timestamp: &str) -> Vec<(&'static str, ParameterValue)> {
        vec![
            (params::EFFECTIVE_AREA, ParameterValue::Double(self.net_area_ft2)),
            (params::TOTAL_AREA, ParameterValue::Double(self.gross_area_ft2)),
            (params::HOST_ELEMENT, ParameterValue::Integer(self.host.0)),
            (
                params::HOST_CATEGORY,
                ParameterValue::Text(self.host_category.label().to_string()),
            ),
            (params::THICKNESS, ParameterValue::Double(self.thickness_ft)),
            (params::MATERIAL, ParameterValue::Integer(self.material.unwrap_or(-1))),
            (params::TIMESTAMP, ParameterValue::Text(timestamp.to_string())),
            (params::SOURCE_FACE, ParameterValue::Text(self.face.to_string())),
        ]
    }
}

slotmap::new_key_type! {
    /// Unique identifier for a piece in the piece store.
    pub struct PieceId;
}

/// A piece together with the host element it was written to.
#[derive(Debug, Clone)]
pub struct StoredPiece {
    pub piece: FormworkPiece,
    pub generated: Option<ElementId>,
}

/// Arena of the pieces produced in a session.
///
/// At most one piece exists per (host, face); inserting another replaces it.
#[derive(Debug, Default)]
pub struct PieceStore {
    pieces: SlotMap<PieceId, StoredPiece>,
    by_face: FxHashMap<(ElementId, FaceRef), PieceId>,
    by_host: FxHashMap<ElementId, Vec<PieceId>>,
}

impl PieceStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a piece, returning its id and the piece it superseded.
    pub fn insert(
        &mut self,
        piece: FormworkPiece,
        generated: Option<ElementId>,
    ) -> (PieceId, Option<StoredPiece>) {
        let key = (piece.host, piece.face);
        let replaced = self.by_face.get(&key).copied().and_then(|old| self.remove(old));
        let host = piece.host;
        let id = self.pieces.insert(StoredPiece { piece, generated });
        self.by_face.insert(key, id);
        self.by_host.entry(host).or_default().push(id);
        (id, replaced)
    }

    /// Replaces every piece of `host`, returning the removed ones.
    pub fn replace_for_host(
        &mut self,
        host: ElementId,
        pieces: Vec<(FormworkPiece, Option<ElementId>)>,
    ) -> Vec<StoredPiece> {
        let old_ids = self.by_host.remove(&host).unwrap_or_default();
        let removed = old_ids.into_iter().filter_map(|id| self.remove(id)).collect();
        for (piece, generated) in pieces {
            self.insert(piece, generated);
        }
        removed
    }

    pub fn remove(&mut self, id: PieceId) -> Option<StoredPiece> {
        let stored = self.pieces.remove(id)?;
        let key = (stored.piece.host, stored.piece.face);
        if self.by_face.get(&key) == Some(&id) {
            self.by_face.remove(&key);
        }
        if let Some(ids) = self.by_host.get_mut(&stored.piece.host) {
            ids.retain(|&other| other != id);
            if ids.is_empty() {
                self.by_host.remove(&stored.piece.host);
            }
        }
        Some(stored)
    }

    #[must_use]
    pub fn get(&self, id: PieceId) -> Option<&StoredPiece> {
        self.pieces.get(id)
    }

    #[must_use]
    pub fn for_face(&self, host: ElementId, face: FaceRef) -> Option<&StoredPiece> {
        self.by_face.get(&(host, face)).and_then(|&id| self.pieces.get(id))
    }

    #[must_use]
    pub fn for_host(&self, host: ElementId) -> Vec<&StoredPiece> {
        self.by_host
            .get(&host)
            .map(|ids| ids.iter().filter_map(|&id| self.pieces.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StoredPiece> {
        self.pieces.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn piece(host: i64, face: usize, net: f64) -> FormworkPiece {
        FormworkPiece {
            host: ElementId(host),
            host_category: Category::Column,
            face: FaceRef { solid: 0, face },
            class: FaceClass::Side,
            thickness_ft: 0.06,
            material: None,
            gross_area_ft2: net,
            net_area_ft2: net,
            deduction_ratio: 0.0,
            solid: Solid::default(),
            deducted: false,
        }
    }

    #[test]
    fn rejections_serialize_with_face_reference() {
        let rejection = crate::pipeline::FaceRejection {
            face_ref: Some(FaceRef { solid: 0, face: 2 }),
            class: Some(FaceClass::Top),
            reason: crate::pipeline::RejectReason::OnGrade,
        };
        let json = serde_json::to_value(&rejection).unwrap();
        assert_eq!(json["face_ref"], serde_json::json!({ "solid": 0, "face": 2 }));
    }

    #[test]
    fn same_face_replaces_earlier_piece() {
        let mut store = PieceStore::new();
        store.insert(piece(1, 0, 2.0), Some(ElementId(100)));
        let (_, replaced) = store.insert(piece(1, 0, 3.0), Some(ElementId(101)));
        assert_eq!(replaced.unwrap().generated, Some(ElementId(100)));
        assert_eq!(store.len(), 1);
        let current = store.for_face(ElementId(1), FaceRef { solid: 0, face: 0 }).unwrap();
        assert!((current.piece.net_area_ft2 - 3.0).abs() < 1e-12);
    }

    #[test]
    fn replace_for_host_drops_all_old_pieces() {
        let mut store = PieceStore::new();
        store.insert(piece(1, 0, 1.0), None);
        store.insert(piece(1, 1, 1.0), None);
        store.insert(piece(2, 0, 1.0), None);
        let removed = store.replace_for_host(ElementId(1), vec![(piece(1, 2, 5.0), None)]);
        assert_eq!(removed.len(), 2);
        assert_eq!(store.for_host(ElementId(1)).len(), 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn parameters_carry_material_sentinel() {
        let values = piece(7, 3, 4.0).parameters("2026/01/02 03:04:05");
        assert_eq!(values.len(), params::ALL.len());
        let material = values.iter().find(|(n, _)| *n == params::MATERIAL).unwrap();
        assert_eq!(material.1, ParameterValue::Integer(-1));
        let face = values.iter().find(|(n, _)| *n == params::SOURCE_FACE).unwrap();
        assert_eq!(face.1, ParameterValue::Text("0:3".into()));
    }

    #[test]
    fn face_ref_parses_back() {
        let r: FaceRef = "2:14".parse().unwrap();
        assert_eq!(r, FaceRef { solid: 2, face: 14 });
        assert!("bad".parse::<FaceRef>().is_err());
    }
}
