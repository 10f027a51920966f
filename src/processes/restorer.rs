//! Seasonal snapshot-then-restore cycle
//!
//! At the recording step, before any other biological work, the aggregate
//! over every holder (cells plus floating-object interiors) is captured. At
//! the restoring step, after growth/mortality for that step but before data
//! collection, the snapshot minus the currently-trapped share is redistributed
//! across the map. Restoring earlier would hand out biomass floating objects
//! still expect to hold; restoring later would corrupt that step's
//! data-collection reads.

use crate::biology::ops::exclude;
use crate::biology::pool::{Biology, MapCell};
use crate::biology::reallocator::Reallocator;
use crate::core::error::{PelagosError, Result};
use crate::core::types::Step;

/// Snapshot state for one replicate's restoration windows
#[derive(Debug, Default)]
pub struct SeasonalRestorer<B: Biology> {
    snapshot: Option<B>,
}

impl<B: Biology> SeasonalRestorer<B> {
    pub fn new() -> Self {
        Self { snapshot: None }
    }

    pub fn has_snapshot(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Retain an aggregate as the snapshot for the next restore
    ///
    /// Non-finite snapshots indicate degenerate upstream state and are
    /// rejected rather than redistributed.
    pub fn record(&mut self, snapshot: B) -> Result<()> {
        if !snapshot.is_finite() {
            return Err(PelagosError::Numerical(
                "refusing to record non-finite snapshot".into(),
            ));
        }
        self.snapshot = Some(snapshot);
        Ok(())
    }

    /// Redistribute `snapshot - trapped` across the target cells
    ///
    /// Consumes the snapshot, so each cycle must record again before it can
    /// restore; restoring without a snapshot is a scheduling mismatch.
    pub fn restore(
        &mut self,
        step: Step,
        trapped: &B,
        reallocator: &Reallocator,
        cells: &mut [MapCell<B>],
    ) -> Result<()> {
        let snapshot = self.snapshot.take().ok_or_else(|| {
            PelagosError::Config(format!(
                "restore scheduled at step {step} with no recorded snapshot"
            ))
        })?;
        let freed = exclude(&snapshot, trapped);
        tracing::debug!(
            step,
            snapshot_total = snapshot.total(),
            freed_total = freed.total(),
            "restoring seasonal snapshot"
        );
        reallocator.reallocate(step, &freed, cells)
    }
}
