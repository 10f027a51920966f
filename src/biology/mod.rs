//! Biology containers and the aggregate/exclude/reallocate engine

pub mod classifier;
pub mod ops;
pub mod pool;
pub mod reallocator;

pub use classifier::SizeClassifier;
pub use ops::{aggregate, exclude};
pub use pool::{AbundancePool, AbundanceSlot, Biology, BiomassPool, MapCell};
pub use reallocator::Reallocator;
