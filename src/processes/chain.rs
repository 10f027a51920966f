//! Biological process chain
//!
//! On full-chain steps the pipeline runs mortality, lost-biomass recovery,
//! aging/recruitment, and a final reallocation, in that order. Each process
//! receives a private copy of the aggregate and optionally returns a new one;
//! returning `None` means the process only had side effects (the final
//! reallocation) and the previous aggregate stays current. Live map state is
//! only touched by the final reallocation, so a failure mid-chain leaves the
//! cells as they were.

use crate::biology::pool::{AbundancePool, Biology, MapCell};
use crate::biology::reallocator::Reallocator;
use crate::core::error::{PelagosError, Result};
use crate::core::types::{SpeciesId, Step};
use ahash::AHashMap;

/// Biomass recorded as lost (e.g. from despawned floating objects), awaiting
/// recovery on the next full-chain step
#[derive(Debug)]
pub struct LostBiologyLedger {
    pool: AbundancePool,
}

impl LostBiologyLedger {
    pub fn new(template: &AbundancePool) -> Self {
        Self {
            pool: template.zero_like(),
        }
    }

    pub fn deposit(&mut self, lost: &AbundancePool) {
        self.pool.merge(lost);
    }

    pub fn pending(&self) -> f64 {
        self.pool.total()
    }

    /// Take everything deposited so far, leaving the ledger empty
    pub fn drain(&mut self) -> AbundancePool {
        let empty = self.pool.zero_like();
        std::mem::replace(&mut self.pool, empty)
    }
}

/// Mutable state a process may touch besides its aggregate copy
pub struct ChainContext<'a> {
    pub reallocator: &'a Reallocator,
    pub cells: &'a mut [MapCell<AbundancePool>],
    pub lost: &'a mut LostBiologyLedger,
}

/// One step of the biological pipeline
pub trait BiologicalProcess {
    fn name(&self) -> &'static str;

    /// Transform the aggregate, or return `None` if this process only had
    /// side effects and the previous aggregate should stay current
    fn apply(
        &mut self,
        step: Step,
        aggregate: AbundancePool,
        ctx: &mut ChainContext<'_>,
    ) -> Result<Option<AbundancePool>>;
}

/// `count *= 1 - rate[subdivision][bin]`, per species
pub struct NaturalMortality {
    rates: AHashMap<SpeciesId, Vec<Vec<f64>>>,
}

impl NaturalMortality {
    pub fn new(rates: AHashMap<SpeciesId, Vec<Vec<f64>>>) -> Self {
        Self { rates }
    }
}

impl BiologicalProcess for NaturalMortality {
    fn name(&self) -> &'static str {
        "natural_mortality"
    }

    fn apply(
        &mut self,
        _step: Step,
        mut aggregate: AbundancePool,
        _ctx: &mut ChainContext<'_>,
    ) -> Result<Option<AbundancePool>> {
        for slot in aggregate.slots() {
            let rate = self
                .rates
                .get(&slot.species)
                .and_then(|subs| subs.get(slot.subdivision))
                .and_then(|bins| bins.get(slot.bin))
                .copied()
                .ok_or_else(|| {
                    PelagosError::Config(format!(
                        "no mortality rate for species {:?} subdivision {} bin {}",
                        slot.species, slot.subdivision, slot.bin
                    ))
                })?;
            aggregate.set(slot, aggregate.get(slot) * (1.0 - rate));
        }
        Ok(Some(aggregate))
    }
}

/// Folds everything in the lost-biomass ledger back into the aggregate
pub struct LostBiomassRecovery;

impl BiologicalProcess for LostBiomassRecovery {
    fn name(&self) -> &'static str {
        "lost_biomass_recovery"
    }

    fn apply(
        &mut self,
        step: Step,
        mut aggregate: AbundancePool,
        ctx: &mut ChainContext<'_>,
    ) -> Result<Option<AbundancePool>> {
        let pending = ctx.lost.pending();
        if pending > 0.0 {
            tracing::debug!(step, pending, "recovering lost biomass");
            let recovered = ctx.lost.drain();
            aggregate.merge(&recovered);
        }
        Ok(Some(aggregate))
    }
}

/// Per-species inputs to spawning-biomass recruitment
#[derive(Debug, Clone)]
pub struct RecruitmentParams {
    /// Individual weight per bin, kg
    pub weight: Vec<f64>,
    /// Fraction mature per bin
    pub maturity: Vec<f64>,
    pub recruits_per_spawning_kg: f64,
}

/// Shifts abundance one bin toward the terminal bin (which accumulates), then
/// injects recruits computed from spawning biomass into bin 0, split evenly
/// across subdivisions
pub struct AgingAndRecruitment {
    params: AHashMap<SpeciesId, RecruitmentParams>,
}

impl AgingAndRecruitment {
    pub fn new(params: AHashMap<SpeciesId, RecruitmentParams>) -> Self {
        Self { params }
    }
}

impl BiologicalProcess for AgingAndRecruitment {
    fn name(&self) -> &'static str {
        "aging_and_recruitment"
    }

    fn apply(
        &mut self,
        step: Step,
        mut aggregate: AbundancePool,
        _ctx: &mut ChainContext<'_>,
    ) -> Result<Option<AbundancePool>> {
        for species in aggregate.species_ids() {
            let params = self.params.get(&species).ok_or_else(|| {
                PelagosError::Config(format!(
                    "no recruitment parameters for species {species:?}"
                ))
            })?;
            let bins = aggregate.bins(species);
            let subdivisions = aggregate.subdivisions(species);
            if params.weight.len() < bins || params.maturity.len() < bins {
                return Err(PelagosError::Config(format!(
                    "recruitment parameters for species {species:?} cover {} weight and {} \
                     maturity bins, need {bins}",
                    params.weight.len(),
                    params.maturity.len()
                )));
            }

            let mut spawning_biomass = 0.0;
            for subdivision in 0..subdivisions {
                for bin in 0..bins {
                    spawning_biomass += aggregate.count(species, subdivision, bin)
                        * params.maturity[bin]
                        * params.weight[bin];
                }
            }
            let recruits = spawning_biomass * params.recruits_per_spawning_kg;
            tracing::debug!(step, ?species, spawning_biomass, recruits, "recruitment");

            for subdivision in 0..subdivisions {
                // Shift descending so each bin reads its predecessor before it
                // is overwritten; the terminal bin accumulates.
                for bin in (1..bins).rev() {
                    let incoming = aggregate.count(species, subdivision, bin - 1);
                    let value = if bin == bins - 1 {
                        aggregate.count(species, subdivision, bin) + incoming
                    } else {
                        incoming
                    };
                    aggregate.set_count(species, subdivision, bin, value);
                }
                aggregate.set_count(species, subdivision, 0, recruits / subdivisions as f64);
            }
        }
        Ok(Some(aggregate))
    }
}

/// Commits the aggregate onto the map; the chain's terminal side effect
pub struct FinalReallocation;

impl BiologicalProcess for FinalReallocation {
    fn name(&self) -> &'static str {
        "final_reallocation"
    }

    fn apply(
        &mut self,
        step: Step,
        aggregate: AbundancePool,
        ctx: &mut ChainContext<'_>,
    ) -> Result<Option<AbundancePool>> {
        ctx.reallocator.reallocate(step, &aggregate, ctx.cells)?;
        Ok(None)
    }
}

/// Ordered pipeline of biological processes
pub struct ProcessChain {
    processes: Vec<Box<dyn BiologicalProcess>>,
}

impl ProcessChain {
    pub fn new(processes: Vec<Box<dyn BiologicalProcess>>) -> Self {
        Self { processes }
    }

    /// The standard full chain: mortality, lost-biomass recovery,
    /// aging/recruitment, final reallocation
    pub fn full(
        mortality: AHashMap<SpeciesId, Vec<Vec<f64>>>,
        recruitment: AHashMap<SpeciesId, RecruitmentParams>,
    ) -> Self {
        Self::new(vec![
            Box::new(NaturalMortality::new(mortality)),
            Box::new(LostBiomassRecovery),
            Box::new(AgingAndRecruitment::new(recruitment)),
            Box::new(FinalReallocation),
        ])
    }

    pub fn run(
        &mut self,
        step: Step,
        start: AbundancePool,
        ctx: &mut ChainContext<'_>,
    ) -> Result<()> {
        let mut current = start;
        for process in &mut self.processes {
            tracing::debug!(step, process = process.name(), "running biological process");
            if let Some(next) = process.apply(step, current.clone(), ctx)? {
                current = next;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::grids::ShareGrid;
    use crate::allocation::period::PeriodMapper;
    use crate::allocation::AllocationGrids;
    use crate::biology::SizeClassifier;
    use crate::core::types::CategoryKey;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn species() -> SpeciesId {
        SpeciesId(0)
    }

    fn pool(subdivisions: usize, bins: usize) -> AbundancePool {
        AbundancePool::new([(species(), subdivisions, bins)])
    }

    fn single_cell_reallocator() -> Reallocator {
        let mut grid = ShareGrid::zeros(1, 1);
        grid.add(0, 0, 1.0);
        let mut by_category = ahash::AHashMap::new();
        by_category.insert(CategoryKey::species(species()), grid);
        let mut steps = BTreeMap::new();
        steps.insert(0, by_category);
        Reallocator::new(
            Arc::new(AllocationGrids::new(PeriodMapper::new(365).unwrap(), steps)),
            SizeClassifier::new(),
        )
    }

    fn ctx_parts() -> (Reallocator, Vec<MapCell<AbundancePool>>, LostBiologyLedger) {
        let template = pool(1, 3);
        (
            single_cell_reallocator(),
            vec![MapCell::new(0, 0, template.zero_like())],
            LostBiologyLedger::new(&template),
        )
    }

    #[test]
    fn test_mortality_applies_rate() {
        let mut rates = AHashMap::new();
        rates.insert(species(), vec![vec![0.1, 0.2, 0.0]]);
        let mut process = NaturalMortality::new(rates);
        let mut aggregate = pool(1, 3);
        aggregate.set_count(species(), 0, 0, 50.0);
        aggregate.set_count(species(), 0, 1, 10.0);
        let (reallocator, mut cells, mut lost) = ctx_parts();
        let mut ctx = ChainContext {
            reallocator: &reallocator,
            cells: &mut cells,
            lost: &mut lost,
        };
        let result = process.apply(0, aggregate, &mut ctx).unwrap().unwrap();
        assert!((result.count(species(), 0, 0) - 45.0).abs() < 1e-12);
        assert!((result.count(species(), 0, 1) - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_missing_mortality_rate_fails() {
        let mut process = NaturalMortality::new(AHashMap::new());
        let (reallocator, mut cells, mut lost) = ctx_parts();
        let mut ctx = ChainContext {
            reallocator: &reallocator,
            cells: &mut cells,
            lost: &mut lost,
        };
        assert!(process.apply(0, pool(1, 3), &mut ctx).is_err());
    }

    #[test]
    fn test_aging_shifts_and_terminal_bin_accumulates() {
        let mut params = AHashMap::new();
        params.insert(
            species(),
            RecruitmentParams {
                weight: vec![1.0, 1.0, 1.0],
                maturity: vec![0.0, 0.0, 0.0],
                recruits_per_spawning_kg: 0.0,
            },
        );
        let mut process = AgingAndRecruitment::new(params);
        let mut aggregate = pool(1, 3);
        aggregate.set_count(species(), 0, 0, 10.0);
        aggregate.set_count(species(), 0, 1, 20.0);
        aggregate.set_count(species(), 0, 2, 30.0);
        let (reallocator, mut cells, mut lost) = ctx_parts();
        let mut ctx = ChainContext {
            reallocator: &reallocator,
            cells: &mut cells,
            lost: &mut lost,
        };
        let result = process.apply(0, aggregate, &mut ctx).unwrap().unwrap();
        assert_eq!(result.count(species(), 0, 0), 0.0);
        assert!((result.count(species(), 0, 1) - 10.0).abs() < 1e-12);
        assert!((result.count(species(), 0, 2) - 50.0).abs() < 1e-12);
    }

    #[test]
    fn test_recruits_injected_into_bin_zero_split_evenly() {
        let mut params = AHashMap::new();
        params.insert(
            species(),
            RecruitmentParams {
                weight: vec![1.0, 2.0],
                maturity: vec![0.0, 1.0],
                recruits_per_spawning_kg: 0.5,
            },
        );
        let mut process = AgingAndRecruitment::new(params);
        let mut aggregate = pool(2, 2);
        // 10 mature individuals of 2 kg in each subdivision: ssb = 40 kg
        aggregate.set_count(species(), 0, 1, 10.0);
        aggregate.set_count(species(), 1, 1, 10.0);
        let (reallocator, mut cells, mut lost) = ctx_parts();
        let mut ctx = ChainContext {
            reallocator: &reallocator,
            cells: &mut cells,
            lost: &mut lost,
        };
        let result = process.apply(0, aggregate, &mut ctx).unwrap().unwrap();
        // 40 kg * 0.5 = 20 recruits, 10 per subdivision
        assert!((result.count(species(), 0, 0) - 10.0).abs() < 1e-12);
        assert!((result.count(species(), 1, 0) - 10.0).abs() < 1e-12);
        // terminal bin keeps its occupants
        assert!((result.count(species(), 0, 1) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_lost_recovery_drains_ledger() {
        let template = pool(1, 3);
        let (reallocator, mut cells, mut lost) = ctx_parts();
        let mut deposit = template.zero_like();
        deposit.set_count(species(), 0, 1, 7.0);
        lost.deposit(&deposit);
        assert!((lost.pending() - 7.0).abs() < 1e-12);

        let mut process = LostBiomassRecovery;
        let mut ctx = ChainContext {
            reallocator: &reallocator,
            cells: &mut cells,
            lost: &mut lost,
        };
        let result = process
            .apply(0, template.zero_like(), &mut ctx)
            .unwrap()
            .unwrap();
        assert!((result.count(species(), 0, 1) - 7.0).abs() < 1e-12);
        assert_eq!(lost.pending(), 0.0);
    }

    #[test]
    fn test_ledger_drain_resets_and_accepts_new_deposits() {
        let template = pool(1, 2);
        let mut ledger = LostBiologyLedger::new(&template);
        let mut deposit = template.zero_like();
        deposit.set_count(species(), 0, 0, 3.0);
        ledger.deposit(&deposit);

        let drained = ledger.drain();
        assert!((drained.count(species(), 0, 0) - 3.0).abs() < 1e-12);
        assert_eq!(ledger.pending(), 0.0);

        ledger.deposit(&deposit);
        assert!((ledger.pending() - 3.0).abs() < 1e-12);
        assert!((ledger.drain().count(species(), 0, 0) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_short_recruitment_vectors_fail() {
        let mut params = AHashMap::new();
        params.insert(
            species(),
            RecruitmentParams {
                weight: vec![1.0],
                maturity: vec![0.0],
                recruits_per_spawning_kg: 0.0,
            },
        );
        let mut process = AgingAndRecruitment::new(params);
        let (reallocator, mut cells, mut lost) = ctx_parts();
        let mut ctx = ChainContext {
            reallocator: &reallocator,
            cells: &mut cells,
            lost: &mut lost,
        };
        let result = process.apply(0, pool(1, 3), &mut ctx);
        assert!(matches!(result, Err(PelagosError::Config(_))));
    }

    #[test]
    fn test_full_chain_commits_to_cells() {
        let mut mortality = AHashMap::new();
        mortality.insert(species(), vec![vec![0.0, 0.0, 0.0]]);
        let mut recruitment = AHashMap::new();
        recruitment.insert(
            species(),
            RecruitmentParams {
                weight: vec![1.0, 1.0, 1.0],
                maturity: vec![0.0, 0.0, 0.0],
                recruits_per_spawning_kg: 0.0,
            },
        );
        let mut chain = ProcessChain::full(mortality, recruitment);

        let mut start = pool(1, 3);
        start.set_count(species(), 0, 0, 12.0);
        let (reallocator, mut cells, mut lost) = ctx_parts();
        let mut ctx = ChainContext {
            reallocator: &reallocator,
            cells: &mut cells,
            lost: &mut lost,
        };
        chain.run(0, start, &mut ctx).unwrap();
        // aging moved bin 0 into bin 1; the single cell received everything
        assert!((cells[0].biology.count(species(), 0, 1) - 12.0).abs() < 1e-9);
        assert_eq!(cells[0].biology.count(species(), 0, 0), 0.0);
    }
}
