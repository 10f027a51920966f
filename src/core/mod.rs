//! Core types, errors, and scenario configuration

pub mod config;
pub mod error;
pub mod types;
