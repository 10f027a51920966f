//! One simulation replicate
//!
//! Owns the water cells' biology, the floating-object field, and the
//! per-step machinery, and drives each step through its ordered slots:
//!
//! 1. snapshot slot: the restorer records, before any biological processing;
//! 2. biological slot: the full chain or the reallocation-only path;
//! 3. floating-object drift;
//! 4. post-growth slot: the restorer redistributes its reduced snapshot;
//! 5. data collection would read here.
//!
//! Execution is single-threaded and step-driven: one step completes fully
//! before the next begins. The allocation grid set is the only state shared
//! with other replicates, behind `Arc`; everything else is exclusively owned.

use crate::allocation::store::CategoryResolver;
use crate::allocation::AllocationGrids;
use crate::biology::ops::aggregate;
use crate::biology::pool::{AbundancePool, Biology, MapCell};
use crate::biology::reallocator::Reallocator;
use crate::biology::SizeClassifier;
use crate::core::config::ScenarioConfig;
use crate::core::error::Result;
use crate::core::types::{LonLat, SpeciesId, Step};
use crate::geography::OceanMap;
use crate::processes::chain::{ChainContext, LostBiologyLedger, ProcessChain, RecruitmentParams};
use crate::processes::restorer::SeasonalRestorer;
use crate::processes::schedule::{ChainKind, ProcessSchedule};
use crate::simulation::floating::{FloatingField, FloatingObjectId};
use ahash::AHashMap;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

/// Size classifier for a scenario: one threshold per size-resolved species
pub fn scenario_classifier(config: &ScenarioConfig) -> SizeClassifier {
    let mut classifier = SizeClassifier::new();
    for (i, species) in config.species.iter().enumerate() {
        if let Some(threshold) = species.small_bin_threshold {
            classifier = classifier.with_threshold(SpeciesId(i as u16), threshold);
        }
    }
    classifier
}

/// Category resolver mapping the scenario's species codes to ids
pub fn scenario_resolver(config: &ScenarioConfig) -> CategoryResolver {
    CategoryResolver::new(
        config
            .species
            .iter()
            .enumerate()
            .map(|(i, s)| (s.code.clone(), SpeciesId(i as u16))),
        scenario_classifier(config),
    )
}

/// Zeroed abundance container with the scenario's per-species shapes
pub fn scenario_template(config: &ScenarioConfig) -> AbundancePool {
    AbundancePool::new(
        config
            .species
            .iter()
            .enumerate()
            .map(|(i, s)| (SpeciesId(i as u16), s.subdivisions, s.bins)),
    )
}

pub struct Replicate {
    map: OceanMap,
    cells: Vec<MapCell<AbundancePool>>,
    template: AbundancePool,
    floating: FloatingField<AbundancePool>,
    reallocator: Reallocator,
    schedule: ProcessSchedule,
    chain: ProcessChain,
    restorer: SeasonalRestorer<AbundancePool>,
    lost: LostBiologyLedger,
    rng: ChaCha8Rng,
    step: Step,
}

impl Replicate {
    pub fn from_config(
        config: &ScenarioConfig,
        grids: Arc<AllocationGrids>,
        seed: u64,
    ) -> Result<Self> {
        let map = OceanMap::from_config(&config.map)?;
        let template = scenario_template(config);
        let cells = map
            .water_cells()
            .map(|(x, y)| MapCell::new(x, y, template.zero_like()))
            .collect();

        let mut mortality = AHashMap::new();
        let mut recruitment = AHashMap::new();
        for (i, species) in config.species.iter().enumerate() {
            let id = SpeciesId(i as u16);
            mortality.insert(id, species.mortality.clone());
            recruitment.insert(
                id,
                RecruitmentParams {
                    weight: species.weight.clone(),
                    maturity: species.maturity.clone(),
                    recruits_per_spawning_kg: species.recruits_per_spawning_kg,
                },
            );
        }

        Ok(Self {
            map,
            cells,
            lost: LostBiologyLedger::new(&template),
            floating: FloatingField::new(config.drift_sigma),
            reallocator: Reallocator::new(grids, scenario_classifier(config)),
            schedule: ProcessSchedule::from_config(&config.schedule, config.period)?,
            chain: ProcessChain::full(mortality, recruitment),
            restorer: SeasonalRestorer::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            template,
            step: 0,
        })
    }

    /// Distribute the scenario's initial counts across the map using the
    /// grids active at step 0
    pub fn seed_initial(&mut self, config: &ScenarioConfig) -> Result<()> {
        let mut initial = self.template.zero_like();
        for (i, species) in config.species.iter().enumerate() {
            let id = SpeciesId(i as u16);
            for (bin, &count) in species.initial_counts.iter().enumerate() {
                let per_subdivision = count / species.subdivisions as f64;
                for subdivision in 0..species.subdivisions {
                    initial.set_count(id, subdivision, bin, per_subdivision);
                }
            }
        }
        tracing::info!(total = initial.total(), "seeding initial abundance");
        self.reallocator.reallocate(0, &initial, &mut self.cells)
    }

    /// Add a floating object holding the given biology
    pub fn deploy_floating_object(
        &mut self,
        position: LonLat,
        biology: AbundancePool,
    ) -> FloatingObjectId {
        self.floating.deploy(position, self.step, biology)
    }

    pub fn current_step(&self) -> Step {
        self.step
    }

    pub fn map(&self) -> &OceanMap {
        &self.map
    }

    pub fn cells(&self) -> &[MapCell<AbundancePool>] {
        &self.cells
    }

    pub fn floating(&self) -> &FloatingField<AbundancePool> {
        &self.floating
    }

    pub fn lost_pending(&self) -> f64 {
        self.lost.pending()
    }

    /// Aggregate over water cells only
    pub fn cell_aggregate(&self) -> AbundancePool {
        aggregate(&self.template, self.cells.iter().map(|c| &c.biology))
    }

    /// Aggregate over floating-object interiors only
    pub fn trapped_aggregate(&self) -> AbundancePool {
        aggregate(&self.template, self.floating.iter_biology())
    }

    /// Everything currently alive: cells plus floating-object contents
    pub fn total_abundance(&self) -> AbundancePool {
        let mut total = self.cell_aggregate();
        total.merge(&self.trapped_aggregate());
        total
    }

    /// Advance the simulation by one step
    pub fn run_step(&mut self) -> Result<()> {
        let step = self.step;

        // Snapshot slot: before any other biological processing
        if self.schedule.records_at(step) {
            let mut snapshot = self.cell_aggregate();
            snapshot.merge(&self.trapped_aggregate());
            tracing::debug!(step, total = snapshot.total(), "recording seasonal snapshot");
            self.restorer.record(snapshot)?;
        }

        // Biological slot
        let cell_aggregate = aggregate(&self.template, self.cells.iter().map(|c| &c.biology));
        match self.schedule.chain_kind(step) {
            ChainKind::Full => {
                let mut ctx = ChainContext {
                    reallocator: &self.reallocator,
                    cells: &mut self.cells,
                    lost: &mut self.lost,
                };
                self.chain.run(step, cell_aggregate, &mut ctx)?;
            }
            ChainKind::ReallocationOnly => {
                self.reallocator
                    .reallocate(step, &cell_aggregate, &mut self.cells)?;
            }
        }

        // Floating objects drift once per step
        let lost = &mut self.lost;
        self.floating
            .drift(&mut self.rng, &self.map, |biology| lost.deposit(&biology));

        // Post-growth slot: after mortality/growth, before data collection
        if self.schedule.restores_at(step) {
            let trapped = aggregate(&self.template, self.floating.iter_biology());
            self.restorer
                .restore(step, &trapped, &self.reallocator, &mut self.cells)?;
        }

        self.step += 1;
        Ok(())
    }

    pub fn run(&mut self, steps: u64) -> Result<()> {
        for _ in 0..steps {
            self.run_step()?;
        }
        Ok(())
    }
}
