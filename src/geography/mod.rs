//! Map geography: extent, land mask, coordinate mapping

pub mod map;

pub use map::OceanMap;
