use std::collections::BTreeMap;

use crate::model::{ModelSnapshot, ZoneKey};
use crate::operations::boolean::BooleanKernel;

use super::aggregate::{UnionBuild, UnionSolidBuilder};

/// Groups snapshot elements by pour zone and phase.
#[derive(Debug, Clone, Copy, Default)]
pub struct PourZoneGrouper;

impl PourZoneGrouper {
    /// Slots per zone key, ascending. Untagged elements group under `None`.
    #[must_use]
    pub fn group<'s>(
        &self,
        snapshot: &'s ModelSnapshot,
        slots: impl IntoIterator<Item = usize>,
    ) -> BTreeMap<Option<&'s ZoneKey>, Vec<usize>> {
        let mut groups: BTreeMap<Option<&ZoneKey>, Vec<usize>> = BTreeMap::new();
        for slot in slots {
            groups
                .entry(snapshot.element(slot).zone.as_ref())
                .or_default()
                .push(slot);
        }
        for members in groups.values_mut() {
            members.sort_unstable();
            members.dedup();
        }
        groups
    }

    /// Unions the solids of every element tagged with `zone`.
    #[must_use]
    pub fn zone_aggregate<K: BooleanKernel>(
        &self,
        kernel: &K,
        snapshot: &ModelSnapshot,
        zone: &ZoneKey,
    ) -> UnionBuild {
        let solids = snapshot
            .elements()
            .iter()
            .filter(|e| e.zone.as_ref() == Some(zone))
            .flat_map(|e| e.solids.iter());
        UnionSolidBuilder::new(kernel).build(solids)
    }
}
