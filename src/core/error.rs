use crate::core::types::{CategoryKey, Step};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PelagosError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("allocation data error: {0}")]
    AllocationData(String),

    #[error("no allocation grid defined at or before step {0}")]
    NoGridBefore(Step),

    #[error("allocation share on land at cell ({x}, {y}) for category {category:?}")]
    ShareOnLand {
        x: usize,
        y: usize,
        category: CategoryKey,
    },

    #[error("unknown species code: {0}")]
    UnknownSpecies(String),

    #[error("numerical error: {0}")]
    Numerical(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, PelagosError>;
