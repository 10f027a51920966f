//! Allocation grid store
//!
//! Builds a normalized, date-indexed grid set from raw point records, and
//! caches built sets keyed by (source identity, map extent, period) so that
//! independent simulation replicates share one immutable copy instead of
//! re-reading the source.

use crate::allocation::grids::{AllocationGrids, ShareGrid};
use crate::allocation::period::PeriodMapper;
use crate::allocation::record::{read_observations, ObservationRecord};
use crate::biology::classifier::SizeClassifier;
use crate::core::error::{PelagosError, Result};
use crate::core::types::{CategoryKey, LonLat, SpeciesId, Step};
use crate::geography::OceanMap;
use ahash::AHashMap;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Derives a grid category from a record's species code and optional bin
#[derive(Debug, Clone)]
pub struct CategoryResolver {
    species_ids: AHashMap<String, SpeciesId>,
    classifier: SizeClassifier,
}

impl CategoryResolver {
    pub fn new(
        codes: impl IntoIterator<Item = (String, SpeciesId)>,
        classifier: SizeClassifier,
    ) -> Self {
        Self {
            species_ids: codes.into_iter().collect(),
            classifier,
        }
    }

    pub fn species_id(&self, code: &str) -> Result<SpeciesId> {
        self.species_ids
            .get(code)
            .copied()
            .ok_or_else(|| PelagosError::UnknownSpecies(code.to_string()))
    }

    fn resolve(&self, record: &ObservationRecord) -> Result<CategoryKey> {
        let species = self.species_id(&record.species)?;
        match self.classifier.classify(species, record.bin.unwrap_or(0)) {
            Some(_) => {
                // Size-resolved species require an explicit bin column
                let bin = record.bin.ok_or_else(|| {
                    PelagosError::AllocationData(format!(
                        "species {} is size-resolved but record has no bin",
                        record.species
                    ))
                })?;
                Ok(self.classifier.category_for_bin(species, bin))
            }
            None => Ok(CategoryKey::species(species)),
        }
    }
}

/// Build an [`AllocationGrids`] from point records
///
/// Records are grouped by (date, category); each group accumulates its values
/// into the cells their coordinates map to, then normalizes to sum 1.0. Dates
/// become step offsets from the earliest observed date. Every positive share
/// must land on a water cell; a share on land would silently lose biomass at
/// reallocation time and is rejected here instead.
pub fn build_allocation_grids(
    records: &[ObservationRecord],
    map: &OceanMap,
    period: u64,
    resolver: &CategoryResolver,
) -> Result<AllocationGrids> {
    let mapper = PeriodMapper::new(period)?;
    let earliest = records
        .iter()
        .map(|r| r.date)
        .min()
        .ok_or_else(|| PelagosError::AllocationData("allocation source has no records".into()))?;

    let mut steps: BTreeMap<Step, AHashMap<CategoryKey, ShareGrid>> = BTreeMap::new();
    for record in records {
        let step = (record.date - earliest).num_days() as Step;
        let category = resolver.resolve(record)?;
        let (x, y) = map
            .coord_to_cell(LonLat::new(record.lon, record.lat))
            .ok_or_else(|| {
                PelagosError::AllocationData(format!(
                    "record at ({}, {}) on {} falls outside the map extent",
                    record.lon, record.lat, record.date
                ))
            })?;
        steps
            .entry(step)
            .or_default()
            .entry(category)
            .or_insert_with(|| ShareGrid::zeros(map.width(), map.height()))
            .add(x, y, record.value);
    }

    let mut grid_count = 0usize;
    for (&step, by_category) in &mut steps {
        if step >= period {
            tracing::warn!(
                step,
                period,
                "grid data beyond one period is unreachable through periodic lookup"
            );
        }
        for (category, grid) in by_category.iter_mut() {
            grid.normalize().map_err(|_| {
                PelagosError::AllocationData(format!(
                    "zero-sum grid for category {category:?} at step {step}"
                ))
            })?;
            for ((x, y), _) in grid.iter_nonzero() {
                if !map.is_water(x, y) {
                    return Err(PelagosError::ShareOnLand {
                        x,
                        y,
                        category: *category,
                    });
                }
            }
            grid_count += 1;
        }
    }

    tracing::info!(
        steps = steps.len(),
        grids = grid_count,
        period,
        "built allocation grid set"
    );
    Ok(AllocationGrids::new(mapper, steps))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    source: String,
    extent: String,
    period: u64,
}

/// Read-through cache of built allocation grid sets
///
/// One cache instance is constructed per process (or per test) and passed by
/// reference wherever grids are built; it is deliberately not a global, so
/// multiple configurations can coexist. Cached sets are immutable and shared
/// via `Arc` across replicates.
#[derive(Debug, Default)]
pub struct AllocationGridCache {
    entries: Mutex<AHashMap<CacheKey, Arc<AllocationGrids>>>,
}

impl AllocationGridCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the grid set for (source, extent, period), building it on first
    /// request and serving the cached copy afterwards
    pub fn get_or_build(
        &self,
        source: &Path,
        map: &OceanMap,
        period: u64,
        resolver: &CategoryResolver,
    ) -> Result<Arc<AllocationGrids>> {
        let key = CacheKey {
            source: source.to_string_lossy().into_owned(),
            extent: map.extent_key(),
            period,
        };
        if let Some(hit) = self
            .entries
            .lock()
            .map_err(|_| PelagosError::Config("allocation cache poisoned".into()))?
            .get(&key)
        {
            tracing::debug!(source = %key.source, "allocation grid cache hit");
            return Ok(Arc::clone(hit));
        }

        let records = read_observations(source)?;
        let grids = Arc::new(build_allocation_grids(&records, map, period, resolver)?);
        self.entries
            .lock()
            .map_err(|_| PelagosError::Config("allocation cache poisoned".into()))?
            .insert(key, Arc::clone(&grids));
        Ok(grids)
    }
}
