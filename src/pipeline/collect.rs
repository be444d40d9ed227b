use tracing::debug;

use crate::config::AnalysisConfig;
use crate::error::GeometryError;
use crate::geometry::Aabb;
use crate::math::Point3;
use crate::model::{
    Category, CategoryFilter, ElementId, HostModel, ModelSnapshot, StructuralElement,
};

use super::extract::GeometryExtractor;

/// Finds the structural elements of a model by category.
#[derive(Debug, Clone)]
pub struct StructuralElementCollector {
    categories: Vec<Category>,
    exclude_foundations: bool,
}

impl StructuralElementCollector {
    #[must_use]
    pub fn new(categories: &[Category], exclude_foundations: bool) -> Self {
        Self {
            categories: categories.to_vec(),
            exclude_foundations,
        }
    }

    /// Ascending, deduplicated ids of placed, non-generated elements in the
    /// allowed categories.
    #[must_use]
    pub fn collect<H: HostModel + ?Sized>(&self, host: &H) -> Vec<ElementId> {
        let categories: Vec<Category> = self
            .categories
            .iter()
            .copied()
            .filter(|&c| !(self.exclude_foundations && c == Category::Foundation))
            .collect();
        let filter = CategoryFilter::new(&categories);
        let mut ids = host.find_elements(&filter);
        ids.sort_unstable();
        ids.dedup();
        ids.retain(|&id| {
            host.element_info(id).is_ok_and(|info| {
                !info.is_type && !info.is_generated && filter.matches(info.category)
            })
        });
        ids
    }
}

/// Elements taking part in a run.
#[derive(Debug, Default)]
pub struct Collected {
    pub snapshot: ModelSnapshot,
    /// Elements formwork is generated for, ascending.
    pub hosts: Vec<ElementId>,
    /// Elements whose geometry could not be read.
    pub extraction_failures: Vec<(ElementId, GeometryError)>,
    pub dropped_instances: usize,
}

/// Captures the hosts plus every structural element that may touch them.
///
/// A host whose geometry fails to load stays in the snapshot without solids.
pub fn collect_snapshot<H: HostModel + ?Sized>(host: &H, config: &AnalysisConfig) -> Collected {
    let hosts = StructuralElementCollector::new(&config.categories, config.exclude_foundations)
        .collect(host);
    let mut universe_categories = Category::STRUCTURAL.to_vec();
    universe_categories.extend(config.categories.iter().copied());
    universe_categories.sort_unstable();
    universe_categories.dedup();
    let mut universe = StructuralElementCollector::new(&universe_categories, false).collect(host);
    universe.extend(hosts.iter().copied());
    universe.sort_unstable();
    universe.dedup();

    let extractor = GeometryExtractor;
    let mut collected = Collected {
        hosts,
        ..Collected::default()
    };
    let mut elements = Vec::with_capacity(universe.len());
    for id in universe {
        let Ok(info) = host.element_info(id) else {
            continue;
        };
        let solids = match extractor.extract(host, id) {
            Ok(extraction) => {
                collected.dropped_instances += extraction.dropped_instances;
                extraction.solids
            }
            Err(err) => {
                collected.extraction_failures.push((id, err));
                Vec::new()
            }
        };
        let bbox = solids
            .iter()
            .filter_map(|s| s.aabb())
            .reduce(|a, b| a.union(&b))
            .or_else(|| host.bounding_box(id))
            .unwrap_or_else(|| Aabb::new(Point3::origin(), Point3::origin()));
        elements.push(StructuralElement {
            id,
            name: info.name,
            category: info.category,
            solids,
            bbox,
            level: info.level,
            zone: info.zone,
            flags: info.flags,
        });
    }
    collected.snapshot = ModelSnapshot::new(elements);
    debug!(
        hosts = collected.hosts.len(),
        elements = collected.snapshot.len(),
        failures = collected.extraction_failures.len(),
        "Collected structural elements"
    );
    collected
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{ElementInfo, HostGeometry, MemoryModel};
    use crate::operations::creation::MakeBox;
    use crate::topology::Solid;

    fn cube(x: f64) -> Vec<HostGeometry> {
        let solid: Solid = MakeBox::new(Point3::new(x, 0.0, 0.0), Point3::new(x + 1.0, 1.0, 1.0))
            .execute()
            .unwrap();
        vec![HostGeometry::Solid(solid)]
    }

    fn model() -> MemoryModel {
        let mut model = MemoryModel::new();
        model.add_element_with_id(ElementId(30), ElementInfo::new("B1", Category::Beam), cube(0.0));
        model.add_element_with_id(ElementId(10), ElementInfo::new("C1", Category::Column), cube(2.0));
        model.add_element_with_id(ElementId(20), ElementInfo::new("F1", Category::Foundation), cube(4.0));
        let mut type_info = ElementInfo::new("C-type", Category::Column);
        type_info.is_type = true;
        model.add_element_with_id(ElementId(40), type_info, cube(6.0));
        let mut generated = ElementInfo::new("Formwork", Category::Column);
        generated.is_generated = true;
        model.add_element_with_id(ElementId(50), generated, cube(8.0));
        model.add_element_with_id(ElementId(60), ElementInfo::new("Misc", Category::Other), cube(10.0));
        model
    }

    #[test]
    fn collects_sorted_instances_only() {
        let ids = StructuralElementCollector::new(&Category::STRUCTURAL, false).collect(&model());
        assert_eq!(ids, vec![ElementId(10), ElementId(20), ElementId(30)]);
    }

    #[test]
    fn foundations_can_be_excluded() {
        let ids = StructuralElementCollector::new(&Category::STRUCTURAL, true).collect(&model());
        assert_eq!(ids, vec![ElementId(10), ElementId(30)]);
    }

    #[test]
    fn neighbour_universe_spans_structural_categories() {
        let config = AnalysisConfig {
            categories: vec![Category::Beam],
            ..AnalysisConfig::default()
        };
        let collected = collect_snapshot(&model(), &config);
        assert_eq!(collected.hosts, vec![ElementId(30)]);
        assert_eq!(collected.snapshot.len(), 3);
        assert!(collected.snapshot.get(ElementId(60)).is_none());
    }

    #[test]
    fn failed_geometry_is_kept_without_solids() {
        let model = model().with_geometry_failure(ElementId(10));
        let collected = collect_snapshot(&model, &AnalysisConfig::default());
        assert_eq!(collected.extraction_failures.len(), 1);
        let column = collected.snapshot.get(ElementId(10)).unwrap();
        assert!(column.solids.is_empty());
    }
}
