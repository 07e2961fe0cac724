//! Sync pipeline errors.
//!
//! A pipeline run fails as a whole: validation, duplicate, and verification
//! errors aggregate every offending record before the batch is rejected, so
//! one run surfaces everything that needs fixing.

use labelpizza_core::report::truncated_list;
use labelpizza_core::{CoreError, EntityKey, EntityType};
use labelpizza_db::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Structural or semantic validation failure. Already aggregated by the
    /// validators in `labelpizza_core`.
    #[error("{0}")]
    Validation(#[from] CoreError),

    /// Two or more records in one batch resolve to the same key.
    #[error("{entity} batch contains duplicate keys: {}", format_duplicates(.duplicates))]
    Duplicate {
        entity: EntityType,
        duplicates: Vec<DuplicateKey>,
    },

    /// Verification failures, collected across the whole batch. Nothing was
    /// written.
    #[error(
        "{entity} verification failed for {} record(s): {}",
        .failures.len(),
        truncated_list(.failures)
    )]
    Verification {
        entity: EntityType,
        failures: Vec<String>,
    },

    /// A store write failed mid-mutation. Earlier writes in the batch have
    /// already landed.
    #[error("{entity} mutation failed for {key}: {source}")]
    Mutation {
        entity: EntityType,
        key: EntityKey,
        source: StoreError,
    },

    /// A store read failed outside the mutation phase.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A spawned pipeline task panicked or was cancelled.
    #[error("sync task failed: {0}")]
    Task(String),

    #[error("workspace I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("workspace JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One key claimed by more than one record in a batch, with the zero-based
/// input positions of every claimant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateKey {
    pub key: String,
    pub indices: Vec<usize>,
}

impl std::fmt::Display for DuplicateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let indices: Vec<String> = self.indices.iter().map(|i| i.to_string()).collect();
        write!(f, "'{}' (records {})", self.key, indices.join(", "))
    }
}

fn format_duplicates(duplicates: &[DuplicateKey]) -> String {
    let rendered: Vec<String> = duplicates.iter().map(|d| d.to_string()).collect();
    truncated_list(&rendered)
}
