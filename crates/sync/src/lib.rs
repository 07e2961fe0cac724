//! The Label Pizza sync engine: batch reconciliation of desired workspace
//! state against an entity store.
//!
//! One generic pipeline ([`engine::run_sync`]) drives nine per-entity-type
//! adapters. The pipeline parses and validates a raw JSON batch, rejects
//! intra-batch duplicates before touching the store, classifies records
//! against stored state, plans create/update/remove/skip actions purely,
//! verifies the whole batch, and only then mutates. The workspace module
//! stitches the nine pipelines into folder-level sync/export; compare and
//! merge operate on folders without a store.

pub mod adapter;
pub mod adapters;
pub mod compare;
pub mod engine;
pub mod error;
pub mod merge;
pub mod typed;
pub mod workspace;

pub use adapter::{EntityAdapter, Planned};
pub use engine::{run_sync, SyncOptions};
pub use error::{DuplicateKey, SyncError};
pub use workspace::{
    export_workspace, load_workspace, sync_workspace, WorkspaceData, WorkspaceSyncOutcome,
};
