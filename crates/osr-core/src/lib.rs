//! Shared building blocks for the own-source revenue (OSR) analytics
//! workspace: domain types, the error taxonomy, CLI settings and small
//! numeric / formatting helpers.

pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod stats;

pub use error::{OsrError, Result};
