//! Scheduled biological processing: the per-step chain and the seasonal
//! snapshot/restore cycle

pub mod chain;
pub mod restorer;
pub mod schedule;

pub use chain::{
    AgingAndRecruitment, BiologicalProcess, ChainContext, FinalReallocation, LostBiologyLedger,
    LostBiomassRecovery, NaturalMortality, ProcessChain, RecruitmentParams,
};
pub use restorer::SeasonalRestorer;
pub use schedule::{ChainKind, ProcessSchedule, RestorationWindow};
