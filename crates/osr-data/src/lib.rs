//! Revenue data pipeline for the OSR dashboard.
//!
//! Reads one CSV file per year, unifies and sanitizes the rows, and runs the
//! aggregation, distribution and clustering analyses over the result.

pub mod aggregator;
pub mod analysis;
pub mod clustering;
pub mod distribution;
pub mod loader;
pub mod sanitizer;
pub mod unifier;

pub use osr_core as core;
