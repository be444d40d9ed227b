use rustc_hash::FxHashMap;

use crate::geometry::Aabb;
use crate::math::TOLERANCE;
use crate::model::{Category, ModelSnapshot, ZoneKey};

/// Boxes spanning more grid cells than this go in the linear list.
const MAX_CELLS_PER_BOX: i64 = 512;

type CellKey = (i64, i64, i64);

/// Snapshot slots of the candidate neighbours of one host, ascending.
pub type NeighborSet = Vec<usize>;

/// Neighbour lookup over a uniform grid of element bounding boxes.
///
/// Only structural elements with geometry are indexed. Results are snapshot
/// slots in ascending order.
#[derive(Debug)]
pub struct ProximityIndex {
    cell_size: f64,
    grid: FxHashMap<CellKey, Vec<usize>>,
    oversized: Vec<usize>,
    boxes: Vec<Option<Aabb>>,
}

impl ProximityIndex {
    #[must_use]
    pub fn build(snapshot: &ModelSnapshot, cell_size: f64) -> Self {
        let mut index = Self {
            cell_size,
            grid: FxHashMap::default(),
            oversized: Vec::new(),
            boxes: Vec::with_capacity(snapshot.len()),
        };
        for (slot, element) in snapshot.elements().iter().enumerate() {
            let indexed = !element.solids.is_empty()
                && Category::STRUCTURAL.contains(&element.category);
            if !indexed {
                index.boxes.push(None);
                continue;
            }
            index.boxes.push(Some(element.bbox));
            match index.cell_range(&element.bbox) {
                Some((lo, hi)) => {
                    for key in cells(lo, hi) {
                        index.grid.entry(key).or_default().push(slot);
                    }
                }
                None => index.oversized.push(slot),
            }
        }
        index
    }

    // Saturating float-to-int cast: far-off coordinates clamp to the edge cells.
    #[allow(clippy::cast_possible_truncation)]
    fn cell_of(&self, value: f64) -> i64 {
        (value / self.cell_size).floor() as i64
    }

    /// Cell range of a box, or `None` if it spans too many cells.
    fn cell_range(&self, bbox: &Aabb) -> Option<(CellKey, CellKey)> {
        let lo = (
            self.cell_of(bbox.min.x),
            self.cell_of(bbox.min.y),
            self.cell_of(bbox.min.z),
        );
        let hi = (
            self.cell_of(bbox.max.x),
            self.cell_of(bbox.max.y),
            self.cell_of(bbox.max.z),
        );
        let span = (hi.0 - lo.0 + 1)
            .saturating_mul(hi.1 - lo.1 + 1)
            .saturating_mul(hi.2 - lo.2 + 1);
        (span <= MAX_CELLS_PER_BOX).then_some((lo, hi))
    }

    /// Indexed slots whose boxes overlap `query`.
    #[must_use]
    pub fn overlapping(&self, query: &Aabb) -> Vec<usize> {
        let mut found: Vec<usize> = match self.cell_range(query) {
            Some((lo, hi)) => cells(lo, hi)
                .filter_map(|key| self.grid.get(&key))
                .flatten()
                .copied()
                .chain(self.oversized.iter().copied())
                .collect(),
            None => (0..self.boxes.len()).collect(),
        };
        found.sort_unstable();
        found.dedup();
        found.retain(|&slot| {
            self.boxes[slot].is_some_and(|bbox| bbox.overlaps(query, TOLERANCE))
        });
        found
    }

    /// Neighbours of the element in `host_slot` within `margin` of its box.
    ///
    /// With a zone scope only elements carrying that same zone key are kept.
    #[must_use]
    pub fn neighbours(
        &self,
        snapshot: &ModelSnapshot,
        host_slot: usize,
        margin: f64,
        zone_scope: Option<Option<&ZoneKey>>,
    ) -> NeighborSet {
        let host = snapshot.element(host_slot);
        let query = host.bbox.expanded(margin);
        let mut found = self.overlapping(&query);
        found.retain(|&slot| slot != host_slot);
        if let Some(zone) = zone_scope {
            found.retain(|&slot| snapshot.element(slot).zone.as_ref() == zone);
        }
        found
    }
}

fn cells(lo: CellKey, hi: CellKey) -> impl Iterator<Item = CellKey> {
    (lo.0..=hi.0).flat_map(move |x| {
        (lo.1..=hi.1).flat_map(move |y| (lo.2..=hi.2).map(move |z| (x, y, z)))
    })
}
