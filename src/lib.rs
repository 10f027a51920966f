//! Pelagos - Spatial Fish Biomass Simulation Engine

pub mod allocation;
pub mod biology;
pub mod core;
pub mod geography;
pub mod processes;
pub mod simulation;
