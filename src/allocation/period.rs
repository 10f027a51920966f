//! Periodic step mapping
//!
//! A single year's worth of grid data serves an arbitrarily long simulation:
//! every absolute step is mapped to its position within the repeating cycle.

use crate::core::error::{PelagosError, Result};
use crate::core::types::Step;

/// Maps absolute simulation steps onto a repeating cycle of fixed length
#[derive(Debug, Clone, Copy)]
pub struct PeriodMapper {
    period: u64,
}

impl PeriodMapper {
    pub fn new(period: u64) -> Result<Self> {
        if period == 0 {
            return Err(PelagosError::Config("period must be > 0".into()));
        }
        Ok(Self { period })
    }

    #[inline]
    pub fn map(&self, step: Step) -> Step {
        step % self.period
    }

    pub fn period(&self) -> u64 {
        self.period
    }
}
