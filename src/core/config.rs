//! Scenario configuration loaded from TOML
//!
//! A scenario file describes the map extent, the repeating period, the species
//! being simulated, and the per-step schedule. Everything here is validated up
//! front: a bad scenario fails at load, never mid-run.

use crate::core::error::{PelagosError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Top-level scenario configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioConfig {
    pub map: MapConfig,
    /// Length of one repeating cycle, in simulation steps (e.g. 365)
    pub period: u64,
    /// Path to the tabular allocation grid data, relative to the scenario file
    pub allocation_data: PathBuf,
    pub species: Vec<SpeciesConfig>,
    pub schedule: ScheduleConfig,
    /// Floating-object drift magnitude in degrees per step
    #[serde(default = "default_drift_sigma")]
    pub drift_sigma: f64,
}

fn default_drift_sigma() -> f64 {
    0.05
}

/// Map extent: grid dimensions plus the lon/lat rectangle they discretize
#[derive(Debug, Clone, Deserialize)]
pub struct MapConfig {
    pub width: usize,
    pub height: usize,
    pub lon_min: f64,
    pub lon_max: f64,
    pub lat_min: f64,
    pub lat_max: f64,
    /// Cells that cannot hold biology, as (x, y) pairs
    #[serde(default)]
    pub land_cells: Vec<[usize; 2]>,
}

/// One simulated species
#[derive(Debug, Clone, Deserialize)]
pub struct SpeciesConfig {
    /// Species code as it appears in the allocation data (e.g. "SKJ")
    pub code: String,
    /// Number of age/size bins
    pub bins: usize,
    /// Number of subdivisions (e.g. 2 for male/female)
    pub subdivisions: usize,
    /// First bin that follows the "large" allocation grid; absent means the
    /// species uses a single species-keyed grid for all bins
    pub small_bin_threshold: Option<usize>,
    /// Daily natural mortality rate, indexed [subdivision][bin]
    pub mortality: Vec<Vec<f64>>,
    /// Individual weight per bin, kg
    pub weight: Vec<f64>,
    /// Fraction mature per bin
    pub maturity: Vec<f64>,
    /// Recruits produced per kg of spawning biomass on a full-chain step
    pub recruits_per_spawning_kg: f64,
    /// Initial count per bin, split evenly across subdivisions at seeding
    pub initial_counts: Vec<f64>,
}

/// Per-step scheduling: when the full biological chain runs, and when the
/// seasonal snapshot/restore events fire within each cycle
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// The full chain runs every this many steps; other steps run
    /// reallocation only
    pub full_chain_interval: u64,
    #[serde(default)]
    pub restoration: Vec<RestorationConfig>,
}

/// One (record, restore) pair, as in-cycle steps repeating every period
#[derive(Debug, Clone, Deserialize)]
pub struct RestorationConfig {
    pub record_step: u64,
    pub restore_step: u64,
}

impl ScenarioConfig {
    /// Load a scenario from a TOML string
    pub fn load_from_str(toml_str: &str) -> Result<Self> {
        let config: ScenarioConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a scenario from a TOML file on disk
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.period == 0 {
            return Err(PelagosError::Config("period must be > 0".into()));
        }
        if self.map.width == 0 || self.map.height == 0 {
            return Err(PelagosError::Config("map dimensions must be > 0".into()));
        }
        if self.map.lon_max <= self.map.lon_min || self.map.lat_max <= self.map.lat_min {
            return Err(PelagosError::Config(
                "map extent must span a positive lon/lat range".into(),
            ));
        }
        for cell in &self.map.land_cells {
            if cell[0] >= self.map.width || cell[1] >= self.map.height {
                return Err(PelagosError::Config(format!(
                    "land cell ({}, {}) outside {}x{} map",
                    cell[0], cell[1], self.map.width, self.map.height
                )));
            }
        }
        if self.species.is_empty() {
            return Err(PelagosError::Config(
                "at least one species must be configured".into(),
            ));
        }
        for species in &self.species {
            species.validate()?;
        }
        if self.schedule.full_chain_interval == 0 {
            return Err(PelagosError::Config(
                "full_chain_interval must be > 0".into(),
            ));
        }
        for restoration in &self.schedule.restoration {
            if restoration.record_step >= self.period || restoration.restore_step >= self.period {
                return Err(PelagosError::Config(format!(
                    "restoration steps ({}, {}) must lie within one period of {} steps",
                    restoration.record_step, restoration.restore_step, self.period
                )));
            }
            if restoration.record_step >= restoration.restore_step {
                return Err(PelagosError::Config(format!(
                    "record_step {} must precede restore_step {}",
                    restoration.record_step, restoration.restore_step
                )));
            }
        }
        if !self.drift_sigma.is_finite() || self.drift_sigma < 0.0 {
            return Err(PelagosError::Config(
                "drift_sigma must be finite and non-negative".into(),
            ));
        }
        Ok(())
    }
}

impl SpeciesConfig {
    fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(PelagosError::Config(format!("species {}: {msg}", self.code)));

        if self.bins == 0 || self.subdivisions == 0 {
            return fail("bins and subdivisions must be > 0".into());
        }
        if let Some(threshold) = self.small_bin_threshold {
            if threshold == 0 || threshold >= self.bins {
                return fail(format!(
                    "small_bin_threshold {threshold} must lie strictly inside 0..{}",
                    self.bins
                ));
            }
        }
        if self.mortality.len() != self.subdivisions {
            return fail(format!(
                "mortality has {} subdivision rows, expected {}",
                self.mortality.len(),
                self.subdivisions
            ));
        }
        for row in &self.mortality {
            if row.len() != self.bins {
                return fail(format!(
                    "mortality row has {} bins, expected {}",
                    row.len(),
                    self.bins
                ));
            }
            if row.iter().any(|r| !(0.0..=1.0).contains(r)) {
                return fail("mortality rates must lie in [0, 1]".into());
            }
        }
        for (name, values) in [
            ("weight", &self.weight),
            ("maturity", &self.maturity),
            ("initial_counts", &self.initial_counts),
        ] {
            if values.len() != self.bins {
                return fail(format!(
                    "{name} has {} entries, expected {}",
                    values.len(),
                    self.bins
                ));
            }
            if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
                return fail(format!("{name} entries must be finite and non-negative"));
            }
        }
        if !self.recruits_per_spawning_kg.is_finite() || self.recruits_per_spawning_kg < 0.0 {
            return fail("recruits_per_spawning_kg must be finite and non-negative".into());
        }
        Ok(())
    }
}
