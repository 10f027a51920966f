//! Replicate driver and floating objects

pub mod floating;
pub mod replicate;

pub use floating::{FloatingField, FloatingObject, FloatingObjectId};
pub use replicate::{
    scenario_classifier, scenario_resolver, scenario_template, Replicate,
};
