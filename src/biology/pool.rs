//! Local biology containers
//!
//! A container holds the fish quantity present at one holder: a map cell or
//! the interior of a floating object. Two shapes exist: `BiomassPool`, a raw
//! per-species scalar, and `AbundancePool`, a per-species matrix of counts
//! indexed by (subdivision, age/size bin). The aggregation, exclusion, and
//! reallocation machinery is written once against the `Biology` trait; only
//! the per-shape combination and addressing differ.
//!
//! Containers are owned by their holder and mutated in place every step;
//! shapes never change after construction.

use crate::biology::classifier::SizeClassifier;
use crate::core::types::{CategoryKey, SpeciesId};
use ahash::AHashMap;

/// Operations every biology shape supports
pub trait Biology: Clone {
    /// Fine-grained addressable position within the container
    type Slot: Copy + PartialEq + std::fmt::Debug;

    /// Same shape, all quantities zero
    fn zero_like(&self) -> Self;

    /// Elementwise sum with another container of the same shape
    fn merge(&mut self, other: &Self);

    /// Elementwise `max(0, self - other)`
    ///
    /// Clamping is deliberate: floating-point drift or process ordering can
    /// produce small negative differences, which are physically meaningless
    /// and must be absorbed rather than propagated.
    fn exclude(&mut self, other: &Self);

    /// Whether every quantity is finite
    fn is_finite(&self) -> bool;

    /// All slots, in a deterministic order
    fn slots(&self) -> Vec<Self::Slot>;

    fn get(&self, slot: Self::Slot) -> f64;

    fn set(&mut self, slot: Self::Slot, value: f64);

    /// Allocation grid category this slot follows
    fn grid_category(&self, slot: Self::Slot, classifier: &SizeClassifier) -> CategoryKey;

    /// Sum of all slots resolving to one grid category
    fn category_total(&self, category: &CategoryKey, classifier: &SizeClassifier) -> f64 {
        self.slots()
            .into_iter()
            .filter(|&slot| self.grid_category(slot, classifier) == *category)
            .map(|slot| self.get(slot))
            .sum()
    }

    /// Sum of every quantity in the container
    fn total(&self) -> f64 {
        self.slots().into_iter().map(|slot| self.get(slot)).sum()
    }
}

/// Raw per-species biomass, in tonnes
#[derive(Debug, Clone, Default)]
pub struct BiomassPool {
    tonnes: AHashMap<SpeciesId, f64>,
}

impl BiomassPool {
    /// Zeroed pool covering the given species
    pub fn new(species: impl IntoIterator<Item = SpeciesId>) -> Self {
        Self {
            tonnes: species.into_iter().map(|id| (id, 0.0)).collect(),
        }
    }

    pub fn tonnes_of(&self, species: SpeciesId) -> f64 {
        self.tonnes.get(&species).copied().unwrap_or(0.0)
    }

    pub fn add(&mut self, species: SpeciesId, tonnes: f64) {
        *self.tonnes.entry(species).or_insert(0.0) += tonnes;
    }
}

impl Biology for BiomassPool {
    type Slot = SpeciesId;

    fn zero_like(&self) -> Self {
        Self {
            tonnes: self.tonnes.keys().map(|&id| (id, 0.0)).collect(),
        }
    }

    fn merge(&mut self, other: &Self) {
        for (&species, &tonnes) in &other.tonnes {
            *self.tonnes.entry(species).or_insert(0.0) += tonnes;
        }
    }

    fn exclude(&mut self, other: &Self) {
        for (species, tonnes) in self.tonnes.iter_mut() {
            *tonnes = (*tonnes - other.tonnes_of(*species)).max(0.0);
        }
    }

    fn is_finite(&self) -> bool {
        self.tonnes.values().all(|t| t.is_finite())
    }

    fn slots(&self) -> Vec<SpeciesId> {
        let mut slots: Vec<_> = self.tonnes.keys().copied().collect();
        slots.sort_by_key(|id| id.0);
        slots
    }

    fn get(&self, slot: SpeciesId) -> f64 {
        self.tonnes_of(slot)
    }

    fn set(&mut self, slot: SpeciesId, value: f64) {
        self.tonnes.insert(slot, value);
    }

    fn grid_category(&self, slot: SpeciesId, _classifier: &SizeClassifier) -> CategoryKey {
        CategoryKey::species(slot)
    }
}

/// One fine-grained position in an [`AbundancePool`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AbundanceSlot {
    pub species: SpeciesId,
    pub subdivision: usize,
    pub bin: usize,
}

#[derive(Debug, Clone)]
struct SpeciesMatrix {
    subdivisions: usize,
    bins: usize,
    /// Row-major [subdivision][bin]
    counts: Vec<f64>,
}

impl SpeciesMatrix {
    fn zeros(subdivisions: usize, bins: usize) -> Self {
        Self {
            subdivisions,
            bins,
            counts: vec![0.0; subdivisions * bins],
        }
    }

    #[inline]
    fn idx(&self, subdivision: usize, bin: usize) -> usize {
        subdivision * self.bins + bin
    }
}

/// Structured abundance: per-species counts by (subdivision, age/size bin)
#[derive(Debug, Clone, Default)]
pub struct AbundancePool {
    species: AHashMap<SpeciesId, SpeciesMatrix>,
}

impl AbundancePool {
    /// Zeroed pool with the given per-species (subdivisions, bins) shapes
    pub fn new(shapes: impl IntoIterator<Item = (SpeciesId, usize, usize)>) -> Self {
        Self {
            species: shapes
                .into_iter()
                .map(|(id, subdivisions, bins)| (id, SpeciesMatrix::zeros(subdivisions, bins)))
                .collect(),
        }
    }

    pub fn count(&self, species: SpeciesId, subdivision: usize, bin: usize) -> f64 {
        self.species
            .get(&species)
            .map(|m| m.counts[m.idx(subdivision, bin)])
            .unwrap_or(0.0)
    }

    pub fn set_count(&mut self, species: SpeciesId, subdivision: usize, bin: usize, count: f64) {
        if let Some(matrix) = self.species.get_mut(&species) {
            let idx = matrix.idx(subdivision, bin);
            matrix.counts[idx] = count;
        }
    }

    pub fn add_count(&mut self, species: SpeciesId, subdivision: usize, bin: usize, count: f64) {
        if let Some(matrix) = self.species.get_mut(&species) {
            let idx = matrix.idx(subdivision, bin);
            matrix.counts[idx] += count;
        }
    }

    pub fn bins(&self, species: SpeciesId) -> usize {
        self.species.get(&species).map(|m| m.bins).unwrap_or(0)
    }

    pub fn subdivisions(&self, species: SpeciesId) -> usize {
        self.species
            .get(&species)
            .map(|m| m.subdivisions)
            .unwrap_or(0)
    }

    pub fn species_ids(&self) -> Vec<SpeciesId> {
        let mut ids: Vec<_> = self.species.keys().copied().collect();
        ids.sort_by_key(|id| id.0);
        ids
    }

    /// Total count for one species across all subdivisions and bins
    pub fn species_total(&self, species: SpeciesId) -> f64 {
        self.species
            .get(&species)
            .map(|m| m.counts.iter().sum())
            .unwrap_or(0.0)
    }
}

impl Biology for AbundancePool {
    type Slot = AbundanceSlot;

    fn zero_like(&self) -> Self {
        Self {
            species: self
                .species
                .iter()
                .map(|(&id, m)| (id, SpeciesMatrix::zeros(m.subdivisions, m.bins)))
                .collect(),
        }
    }

    fn merge(&mut self, other: &Self) {
        for (id, other_matrix) in &other.species {
            match self.species.get_mut(id) {
                Some(matrix) => {
                    for (count, add) in matrix.counts.iter_mut().zip(&other_matrix.counts) {
                        *count += add;
                    }
                }
                None => {
                    self.species.insert(*id, other_matrix.clone());
                }
            }
        }
    }

    fn exclude(&mut self, other: &Self) {
        for (id, matrix) in self.species.iter_mut() {
            if let Some(other_matrix) = other.species.get(id) {
                for (count, sub) in matrix.counts.iter_mut().zip(&other_matrix.counts) {
                    *count = (*count - sub).max(0.0);
                }
            }
        }
    }

    fn is_finite(&self) -> bool {
        self.species
            .values()
            .all(|m| m.counts.iter().all(|c| c.is_finite()))
    }

    fn slots(&self) -> Vec<AbundanceSlot> {
        let mut slots = Vec::new();
        for species in self.species_ids() {
            let matrix = &self.species[&species];
            for subdivision in 0..matrix.subdivisions {
                for bin in 0..matrix.bins {
                    slots.push(AbundanceSlot {
                        species,
                        subdivision,
                        bin,
                    });
                }
            }
        }
        slots
    }

    fn get(&self, slot: AbundanceSlot) -> f64 {
        self.count(slot.species, slot.subdivision, slot.bin)
    }

    fn set(&mut self, slot: AbundanceSlot, value: f64) {
        self.set_count(slot.species, slot.subdivision, slot.bin, value);
    }

    fn grid_category(&self, slot: AbundanceSlot, classifier: &SizeClassifier) -> CategoryKey {
        classifier.category_for_bin(slot.species, slot.bin)
    }
}

/// A map cell holding biology at fixed grid coordinates
#[derive(Debug, Clone)]
pub struct MapCell<B: Biology> {
    pub x: usize,
    pub y: usize,
    pub biology: B,
}

impl<B: Biology> MapCell<B> {
    pub fn new(x: usize, y: usize, biology: B) -> Self {
        Self { x, y, biology }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_biomass_merge_and_totals() {
        let mut a = BiomassPool::new([SpeciesId(0), SpeciesId(1)]);
        a.add(SpeciesId(0), 10.0);
        let mut b = a.zero_like();
        b.add(SpeciesId(0), 2.5);
        b.add(SpeciesId(1), 4.0);
        a.merge(&b);
        assert!((a.tonnes_of(SpeciesId(0)) - 12.5).abs() < 1e-12);
        assert!((a.tonnes_of(SpeciesId(1)) - 4.0).abs() < 1e-12);
        assert!((a.total() - 16.5).abs() < 1e-12);
    }

    #[test]
    fn test_biomass_exclude_clamps_to_zero() {
        let mut a = BiomassPool::new([SpeciesId(0)]);
        a.add(SpeciesId(0), 3.0);
        let mut b = a.zero_like();
        b.add(SpeciesId(0), 5.0);
        a.exclude(&b);
        assert_eq!(a.tonnes_of(SpeciesId(0)), 0.0);
    }

    #[test]
    fn test_abundance_slots_are_deterministic() {
        let pool = AbundancePool::new([(SpeciesId(1), 2, 2), (SpeciesId(0), 1, 3)]);
        let slots = pool.slots();
        assert_eq!(slots.len(), 7);
        assert_eq!(slots[0].species, SpeciesId(0));
        assert_eq!(slots[3].species, SpeciesId(1));
        assert_eq!(pool.slots(), slots);
    }

    #[test]
    fn test_abundance_merge_elementwise() {
        let mut a = AbundancePool::new([(SpeciesId(0), 2, 3)]);
        a.set_count(SpeciesId(0), 0, 1, 5.0);
        a.set_count(SpeciesId(0), 1, 2, 2.0);
        let mut b = a.zero_like();
        b.set_count(SpeciesId(0), 0, 1, 1.0);
        a.merge(&b);
        assert!((a.count(SpeciesId(0), 0, 1) - 6.0).abs() < 1e-12);
        assert!((a.species_total(SpeciesId(0)) - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_abundance_exclude_never_negative() {
        let mut a = AbundancePool::new([(SpeciesId(0), 1, 2)]);
        a.set_count(SpeciesId(0), 0, 0, 1.0);
        a.set_count(SpeciesId(0), 0, 1, 10.0);
        let mut b = a.zero_like();
        b.set_count(SpeciesId(0), 0, 0, 4.0);
        b.set_count(SpeciesId(0), 0, 1, 3.0);
        a.exclude(&b);
        assert_eq!(a.count(SpeciesId(0), 0, 0), 0.0);
        assert!((a.count(SpeciesId(0), 0, 1) - 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_non_finite_detected() {
        let mut pool = AbundancePool::new([(SpeciesId(0), 1, 1)]);
        assert!(Biology::is_finite(&pool));
        pool.set_count(SpeciesId(0), 0, 0, f64::NAN);
        assert!(!Biology::is_finite(&pool));
    }

    #[test]
    fn test_category_total_splits_by_size() {
        use crate::core::types::SizeClass;
        let classifier = SizeClassifier::new().with_threshold(SpeciesId(0), 2);
        let mut pool = AbundancePool::new([(SpeciesId(0), 1, 4)]);
        for bin in 0..4 {
            pool.set_count(SpeciesId(0), 0, bin, 1.0 + bin as f64);
        }
        let small =
            pool.category_total(&CategoryKey::sized(SpeciesId(0), SizeClass::Small), &classifier);
        let large =
            pool.category_total(&CategoryKey::sized(SpeciesId(0), SizeClass::Large), &classifier);
        assert!((small - 3.0).abs() < 1e-12);
        assert!((large - 7.0).abs() < 1e-12);
    }
}
