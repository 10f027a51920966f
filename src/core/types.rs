//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};

/// Simulation step counter (one step = one simulated day)
pub type Step = u64;

/// Unique identifier for a species within one scenario
///
/// Assigned in species declaration order by the scenario configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpeciesId(pub u16);

impl SpeciesId {
    pub fn new(id: u16) -> Self {
        Self(id)
    }
}

/// Size group used to pick between allocation grids for structured abundance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SizeClass {
    Small,
    Large,
}

/// The dimension along which allocation grids differ besides time:
/// species alone, or species combined with a size group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryKey {
    pub species: SpeciesId,
    pub size: Option<SizeClass>,
}

impl CategoryKey {
    /// Category keyed by species identity only
    pub fn species(species: SpeciesId) -> Self {
        Self {
            species,
            size: None,
        }
    }

    /// Category keyed by (species, size group)
    pub fn sized(species: SpeciesId, size: SizeClass) -> Self {
        Self {
            species,
            size: Some(size),
        }
    }
}

/// Geographic coordinate in decimal degrees
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}
