//! Per-step scheduling
//!
//! Built once at scenario start and immutable thereafter. Decides, for each
//! simulation step, whether the full biological chain or the lighter
//! reallocation-only chain runs, and whether the seasonal restorer records or
//! restores a snapshot. Restoration windows are expressed as in-cycle steps
//! and repeat every period.

use crate::allocation::period::PeriodMapper;
use crate::core::config::ScheduleConfig;
use crate::core::error::{PelagosError, Result};
use crate::core::types::Step;

/// Which chain runs on a given step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainKind {
    Full,
    ReallocationOnly,
}

/// One snapshot/restore pair, as in-cycle steps
#[derive(Debug, Clone, Copy)]
pub struct RestorationWindow {
    pub record_step: Step,
    pub restore_step: Step,
}

#[derive(Debug, Clone)]
pub struct ProcessSchedule {
    mapper: PeriodMapper,
    full_chain_interval: u64,
    restorations: Vec<RestorationWindow>,
}

impl ProcessSchedule {
    pub fn new(
        mapper: PeriodMapper,
        full_chain_interval: u64,
        restorations: Vec<RestorationWindow>,
    ) -> Result<Self> {
        if full_chain_interval == 0 {
            return Err(PelagosError::Config(
                "full_chain_interval must be > 0".into(),
            ));
        }
        for window in &restorations {
            if window.record_step >= mapper.period() || window.restore_step >= mapper.period() {
                return Err(PelagosError::Config(format!(
                    "restoration window ({}, {}) outside period {}",
                    window.record_step,
                    window.restore_step,
                    mapper.period()
                )));
            }
            if window.record_step >= window.restore_step {
                return Err(PelagosError::Config(format!(
                    "record step {} must precede restore step {}",
                    window.record_step, window.restore_step
                )));
            }
        }
        Ok(Self {
            mapper,
            full_chain_interval,
            restorations,
        })
    }

    pub fn from_config(config: &ScheduleConfig, period: u64) -> Result<Self> {
        Self::new(
            PeriodMapper::new(period)?,
            config.full_chain_interval,
            config
                .restoration
                .iter()
                .map(|r| RestorationWindow {
                    record_step: r.record_step,
                    restore_step: r.restore_step,
                })
                .collect(),
        )
    }

    pub fn chain_kind(&self, step: Step) -> ChainKind {
        if step % self.full_chain_interval == 0 {
            ChainKind::Full
        } else {
            ChainKind::ReallocationOnly
        }
    }

    /// Whether the restorer takes its snapshot on this step
    pub fn records_at(&self, step: Step) -> bool {
        let mapped = self.mapper.map(step);
        self.restorations.iter().any(|w| w.record_step == mapped)
    }

    /// Whether the restorer redistributes its snapshot on this step
    pub fn restores_at(&self, step: Step) -> bool {
        let mapped = self.mapper.map(step);
        self.restorations.iter().any(|w| w.restore_step == mapped)
    }
}
