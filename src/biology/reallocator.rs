//! Reallocation of aggregated biology onto map cells
//!
//! For each slot of the aggregate, the grid active at the current step is
//! fetched (per grid category, via the size classifier for structured
//! abundance) and every target cell receives `grid share x slot total`,
//! written in place. The aggregate itself is never mutated.
//!
//! Conservation holds because the grid store rejects shares on land: every
//! positive grid cell coincides with a water cell, so summing the targets
//! afterwards reproduces the aggregated totals up to rounding.

use crate::allocation::grids::AllocationGrids;
use crate::biology::classifier::SizeClassifier;
use crate::biology::pool::{Biology, MapCell};
use crate::core::error::Result;
use crate::core::types::Step;
use std::sync::Arc;

pub struct Reallocator {
    grids: Arc<AllocationGrids>,
    classifier: SizeClassifier,
}

impl Reallocator {
    pub fn new(grids: Arc<AllocationGrids>, classifier: SizeClassifier) -> Self {
        Self { grids, classifier }
    }

    pub fn classifier(&self) -> &SizeClassifier {
        &self.classifier
    }

    pub fn grids(&self) -> &Arc<AllocationGrids> {
        &self.grids
    }

    /// Distribute the aggregate across the target cells per the grids active
    /// at `step`, overwriting each cell's previous quantities
    pub fn reallocate<B: Biology>(
        &self,
        step: Step,
        aggregate: &B,
        cells: &mut [MapCell<B>],
    ) -> Result<()> {
        let active = self.grids.at_or_before(step)?;
        for slot in aggregate.slots() {
            let category = aggregate.grid_category(slot, &self.classifier);
            let grid = active.get(&category).ok_or_else(|| {
                crate::core::error::PelagosError::AllocationData(format!(
                    "no grid for category {category:?} at step {step}"
                ))
            })?;
            let total = aggregate.get(slot);
            for cell in cells.iter_mut() {
                cell.biology.set(slot, grid.get(cell.x, cell.y) * total);
            }
        }
        tracing::debug!(step, slots = aggregate.slots().len(), "reallocated aggregate");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::grids::ShareGrid;
    use crate::allocation::period::PeriodMapper;
    use crate::biology::pool::BiomassPool;
    use crate::core::types::{CategoryKey, SpeciesId};
    use ahash::AHashMap;
    use std::collections::BTreeMap;

    fn two_cell_grids(shares: [f64; 2]) -> Arc<AllocationGrids> {
        let mut grid = ShareGrid::zeros(2, 1);
        grid.add(0, 0, shares[0]);
        grid.add(1, 0, shares[1]);
        let mut by_category = AHashMap::new();
        by_category.insert(CategoryKey::species(SpeciesId(0)), grid);
        let mut steps = BTreeMap::new();
        steps.insert(0, by_category);
        Arc::new(AllocationGrids::new(
            PeriodMapper::new(365).unwrap(),
            steps,
        ))
    }

    #[test]
    fn test_reallocation_follows_grid_shares() {
        let reallocator = Reallocator::new(two_cell_grids([0.6, 0.4]), SizeClassifier::new());
        let template = BiomassPool::new([SpeciesId(0)]);
        let mut aggregate = template.zero_like();
        aggregate.add(SpeciesId(0), 100.0);
        let mut cells = vec![
            MapCell::new(0, 0, template.zero_like()),
            MapCell::new(1, 0, template.zero_like()),
        ];
        reallocator.reallocate(0, &aggregate, &mut cells).unwrap();
        assert!((cells[0].biology.tonnes_of(SpeciesId(0)) - 60.0).abs() < 1e-9);
        assert!((cells[1].biology.tonnes_of(SpeciesId(0)) - 40.0).abs() < 1e-9);
        // aggregate untouched
        assert!((aggregate.tonnes_of(SpeciesId(0)) - 100.0).abs() < 1e-12);
    }

    #[test]
    fn test_reallocation_overwrites_previous_state() {
        let reallocator = Reallocator::new(two_cell_grids([1.0, 0.0]), SizeClassifier::new());
        let template = BiomassPool::new([SpeciesId(0)]);
        let mut stale = template.zero_like();
        stale.add(SpeciesId(0), 999.0);
        let mut cells = vec![
            MapCell::new(0, 0, template.zero_like()),
            MapCell::new(1, 0, stale),
        ];
        let mut aggregate = template.zero_like();
        aggregate.add(SpeciesId(0), 10.0);
        reallocator.reallocate(0, &aggregate, &mut cells).unwrap();
        assert!((cells[0].biology.tonnes_of(SpeciesId(0)) - 10.0).abs() < 1e-9);
        assert_eq!(cells[1].biology.tonnes_of(SpeciesId(0)), 0.0);
    }

    #[test]
    fn test_missing_category_grid_fails() {
        let reallocator = Reallocator::new(two_cell_grids([0.5, 0.5]), SizeClassifier::new());
        let template = BiomassPool::new([SpeciesId(7)]);
        let mut aggregate = template.zero_like();
        aggregate.add(SpeciesId(7), 1.0);
        let mut cells = vec![MapCell::new(0, 0, template.zero_like())];
        assert!(reallocator.reallocate(0, &aggregate, &mut cells).is_err());
    }
}
