mod host;
mod memory;

pub use host::{CategoryFilter, HostGeometry, HostModel, ParameterValue, StorageType};
pub use memory::{MemoryModel, ParameterSpec};

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::geometry::Aabb;
use crate::topology::Solid;

/// Stable id of a host element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub i64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Structural category of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Column,
    Beam,
    Slab,
    Wall,
    Foundation,
    Stair,
    Other,
}

impl Category {
    /// Every category that takes part in contact deduction.
    pub const STRUCTURAL: [Category; 6] = [
        Category::Column,
        Category::Beam,
        Category::Slab,
        Category::Wall,
        Category::Foundation,
        Category::Stair,
    ];

    /// Human-readable label, also persisted on generated pieces.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Column => "Structural Column",
            Self::Beam => "Structural Framing",
            Self::Slab => "Floor",
            Self::Wall => "Wall",
            Self::Foundation => "Structural Foundation",
            Self::Stair => "Stair",
            Self::Other => "Generic Model",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Building level an element is hosted on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub name: String,
    /// Elevation in feet.
    pub elevation: f64,
}

/// Pour zone tag: zone name plus optional construction phase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ZoneKey {
    pub zone: String,
    #[serde(default)]
    pub phase: Option<String>,
}

impl fmt::Display for ZoneKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.phase {
            Some(phase) => write!(f, "{} / {phase}", self.zone),
            None => f.write_str(&self.zone),
        }
    }
}

/// Per-element flags that suppress formwork on some or all faces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExclusionFlags {
    /// Cast directly on grade: no soffit formwork.
    pub on_grade: bool,
    /// Poured against soil: no lateral formwork for slabs and foundations.
    pub against_soil: bool,
    /// Manually excluded from the analysis.
    pub override_excluded: bool,
}

/// Descriptive data the host reports for an element.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementInfo {
    pub name: String,
    pub category: Category,
    pub level: Option<Level>,
    pub zone: Option<ZoneKey>,
    pub flags: ExclusionFlags,
    /// `true` for element types (templates) rather than placed instances.
    pub is_type: bool,
    /// `true` for formwork geometry written by a previous run.
    pub is_generated: bool,
}

impl ElementInfo {
    #[must_use]
    pub fn new(name: impl Into<String>, category: Category) -> Self {
        Self {
            name: name.into(),
            category,
            level: None,
            zone: None,
            flags: ExclusionFlags::default(),
            is_type: false,
            is_generated: false,
        }
    }
}

/// A structural element as captured at analysis start.
#[derive(Debug, Clone)]
pub struct StructuralElement {
    pub id: ElementId,
    pub name: String,
    pub category: Category,
    pub solids: Vec<Solid>,
    pub bbox: Aabb,
    pub level: Option<Level>,
    pub zone: Option<ZoneKey>,
    pub flags: ExclusionFlags,
}

impl StructuralElement {
    /// Concrete volume in cubic feet.
    #[must_use]
    pub fn volume(&self) -> f64 {
        self.solids.iter().map(Solid::volume).fold(0.0, |acc, v| acc + v)
    }
}

/// Read-only arena of the elements taking part in one run.
#[derive(Debug, Default)]
pub struct ModelSnapshot {
    elements: Vec<StructuralElement>,
    index: FxHashMap<ElementId, usize>,
}

impl ModelSnapshot {
    /// Builds the arena. Elements are stored in ascending id order; a
    /// repeated id keeps its first occurrence.
    #[must_use]
    pub fn new(mut elements: Vec<StructuralElement>) -> Self {
        elements.sort_by_key(|e| e.id);
        elements.dedup_by_key(|e| e.id);
        let index = elements
            .iter()
            .enumerate()
            .map(|(slot, e)| (e.id, slot))
            .collect();
        Self { elements, index }
    }

    #[must_use]
    pub fn get(&self, id: ElementId) -> Option<&StructuralElement> {
        self.index.get(&id).map(|&slot| &self.elements[slot])
    }

    #[must_use]
    pub fn slot(&self, id: ElementId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    #[must_use]
    pub fn element(&self, slot: usize) -> &StructuralElement {
        &self.elements[slot]
    }

    #[must_use]
    pub fn elements(&self) -> &[StructuralElement] {
        &self.elements
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}
