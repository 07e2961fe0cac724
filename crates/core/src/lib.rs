//! Pure domain logic for the Label Pizza sync engine.
//!
//! This crate has zero I/O: no database access, no async, no filesystem.
//! It provides:
//!
//! - Entity record types for the nine workspace entity types, each with
//!   its natural-key function and field-set constants.
//! - Exact field-set (structural) validation over raw JSON values.
//! - The diff engine: key-by-key comparison of two record collections.
//! - The merge engine: combining two collections under a conflict policy.
//! - Sync report types shared by the orchestrator and the CLI.

pub mod diff;
pub mod error;
pub mod fields;
pub mod keys;
pub mod merge;
pub mod records;
pub mod report;

pub use error::CoreError;
pub use keys::{EntityKey, EntityType};
pub use report::SyncReport;
