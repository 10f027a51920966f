//! Bin-to-category mapping
//!
//! Different age classes of one species can follow different spatial
//! distributions: bins below a per-species threshold use the "small" grid,
//! bins at or above it use the "large" grid. Species without a threshold use
//! a single species-keyed grid for all bins.

use crate::core::types::{CategoryKey, SizeClass, SpeciesId};
use ahash::AHashMap;

#[derive(Debug, Clone, Default)]
pub struct SizeClassifier {
    /// First bin classified as Large, per species
    thresholds: AHashMap<SpeciesId, usize>,
}

impl SizeClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold(mut self, species: SpeciesId, first_large_bin: usize) -> Self {
        self.thresholds.insert(species, first_large_bin);
        self
    }

    /// Size group for a bin, or `None` if the species is not size-resolved
    pub fn classify(&self, species: SpeciesId, bin: usize) -> Option<SizeClass> {
        self.thresholds.get(&species).map(|&threshold| {
            if bin < threshold {
                SizeClass::Small
            } else {
                SizeClass::Large
            }
        })
    }

    /// Allocation grid category a bin of this species follows
    pub fn category_for_bin(&self, species: SpeciesId, bin: usize) -> CategoryKey {
        match self.classify(species, bin) {
            Some(size) => CategoryKey::sized(species, size),
            None => CategoryKey::species(species),
        }
    }

    /// All grid categories a species can resolve to
    pub fn categories_for(&self, species: SpeciesId) -> Vec<CategoryKey> {
        if self.thresholds.contains_key(&species) {
            vec![
                CategoryKey::sized(species, SizeClass::Small),
                CategoryKey::sized(species, SizeClass::Large),
            ]
        } else {
            vec![CategoryKey::species(species)]
        }
    }
}
