//! Normalized spatial share grids and their date-indexed lookup
//!
//! A `ShareGrid` is a probability distribution over map cells: non-negative
//! values summing to 1.0. `AllocationGrids` indexes one grid per category at
//! each data-defined step, sparsely; lookup resolves any step to the most
//! recent defined entry at or before it ("floor" semantics), after mapping the
//! step into the repeating cycle.

use crate::allocation::period::PeriodMapper;
use crate::core::error::{PelagosError, Result};
use crate::core::types::{CategoryKey, Step};
use ahash::AHashMap;
use std::collections::BTreeMap;

/// Tolerance for the sum-to-one invariant
pub const SHARE_SUM_EPSILON: f64 = 1e-6;

/// Dense 2-D grid of per-cell shares, row-major, summing to 1.0
#[derive(Debug, Clone)]
pub struct ShareGrid {
    width: usize,
    height: usize,
    data: Vec<f64>,
}

impl ShareGrid {
    pub(crate) fn zeros(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f64 {
        if x < self.width && y < self.height {
            self.data[y * self.width + x]
        } else {
            0.0
        }
    }

    pub(crate) fn add(&mut self, x: usize, y: usize, value: f64) {
        if x < self.width && y < self.height {
            self.data[y * self.width + x] += value;
        }
    }

    pub fn total(&self) -> f64 {
        self.data.iter().sum()
    }

    /// Divide every cell by the grid total so the grid sums to 1.0
    ///
    /// A zero or non-finite total cannot be normalized and is a data error.
    pub(crate) fn normalize(&mut self) -> Result<()> {
        let total = self.total();
        if !total.is_finite() || total <= 0.0 {
            return Err(PelagosError::AllocationData(format!(
                "cannot normalize grid with total {total}"
            )));
        }
        for value in &mut self.data {
            *value /= total;
        }
        Ok(())
    }

    /// Iterate cells with a positive share
    pub fn iter_nonzero(&self) -> impl Iterator<Item = ((usize, usize), f64)> + '_ {
        self.data
            .iter()
            .enumerate()
            .filter(|(_, v)| **v > 0.0)
            .map(move |(i, v)| ((i % self.width, i / self.width), *v))
    }
}

/// Sparse step-indexed set of per-category share grids with floor lookup
#[derive(Debug)]
pub struct AllocationGrids {
    mapper: PeriodMapper,
    steps: BTreeMap<Step, AHashMap<CategoryKey, ShareGrid>>,
}

impl AllocationGrids {
    pub(crate) fn new(
        mapper: PeriodMapper,
        steps: BTreeMap<Step, AHashMap<CategoryKey, ShareGrid>>,
    ) -> Self {
        Self { mapper, steps }
    }

    pub fn period(&self) -> u64 {
        self.mapper.period()
    }

    /// Steps that carry data, in ascending order
    pub fn defined_steps(&self) -> impl Iterator<Item = Step> + '_ {
        self.steps.keys().copied()
    }

    /// Grids active at `step`: the entry at the greatest defined step at or
    /// before the period-mapped step
    ///
    /// Failure here means the schedule asked for a step before any data is
    /// defined, which is a configuration mismatch, not a runtime condition.
    pub fn at_or_before(&self, step: Step) -> Result<&AHashMap<CategoryKey, ShareGrid>> {
        let mapped = self.mapper.map(step);
        self.steps
            .range(..=mapped)
            .next_back()
            .map(|(_, grids)| grids)
            .ok_or(PelagosError::NoGridBefore(step))
    }

    /// Grid active at `step` for one category
    pub fn grid_for(&self, step: Step, category: &CategoryKey) -> Result<&ShareGrid> {
        self.at_or_before(step)?.get(category).ok_or_else(|| {
            PelagosError::AllocationData(format!(
                "no grid for category {category:?} at step {step}"
            ))
        })
    }
}
