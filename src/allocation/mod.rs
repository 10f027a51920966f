//! Allocation grid loading, caching, and date-indexed lookup

pub mod grids;
pub mod period;
pub mod record;
pub mod store;

pub use grids::{AllocationGrids, ShareGrid, SHARE_SUM_EPSILON};
pub use period::PeriodMapper;
pub use record::{read_observations, read_observations_str, ObservationRecord};
pub use store::{build_allocation_grids, AllocationGridCache, CategoryResolver};
