//! The per-entity-type adapter trait consumed by the sync engine.
//!
//! The engine owns the pipeline shape (parse, validate, deduplicate,
//! classify, plan, verify, apply, report); adapters supply the entity-type
//! specifics at each seam. Planning is pure: it sees only the desired record
//! and whatever `classify` fetched, never the store.

use async_trait::async_trait;

use labelpizza_core::report::FieldChange;
use labelpizza_core::{CoreError, EntityKey, EntityType};
use labelpizza_db::EntityStore;

use crate::error::SyncError;

/// The planned action for one desired-state record.
#[derive(Debug, Clone)]
pub enum Planned {
    /// No stored counterpart; create it.
    Create,
    /// Stored counterpart differs in the listed fields; update it.
    Update { changes: Vec<FieldChange> },
    /// The stored row must be deleted (assignments with `is_active =
    /// false`).
    Remove,
    /// Nothing to do.
    Skip { reason: String },
}

impl Planned {
    pub fn skip(reason: impl Into<String>) -> Self {
        Self::Skip {
            reason: reason.into(),
        }
    }
}

/// Entity-type specifics plugged into the sync engine.
///
/// `Record` is the desired-state type parsed from workspace JSON.
/// `Classified` is whatever stored context planning needs; `classify` is the
/// only read phase, so everything `plan` and `verify` look at must be
/// fetched there or in `verify` itself.
#[async_trait]
pub trait EntityAdapter: Send + Sync + 'static {
    type Record: Clone + Send + Sync + 'static;
    type Classified: Clone + Send + Sync + 'static;

    fn entity_type(&self) -> EntityType;

    /// Structurally validate and deserialize the raw batch.
    fn parse(&self, values: &[serde_json::Value]) -> Result<Vec<Self::Record>, CoreError>;

    /// Per-record semantic validation. Pure.
    fn validate(&self, record: &Self::Record) -> Result<(), CoreError>;

    /// Batch-level rules that span records (e.g. URL uniqueness within the
    /// batch). Pure. Runs after per-record validation.
    fn validate_batch(&self, _records: &[Self::Record]) -> Result<(), CoreError> {
        Ok(())
    }

    /// The record's natural key, used for reporting.
    fn natural_key(&self, record: &Self::Record) -> EntityKey;

    /// Keys used for intra-batch duplicate detection. Defaults to the
    /// natural key; annotation pipelines expand to one key per answered
    /// question.
    fn duplicate_keys(&self, record: &Self::Record) -> Vec<EntityKey> {
        vec![self.natural_key(record)]
    }

    /// Fetch whatever stored context planning and verification need.
    async fn classify(
        &self,
        store: &dyn EntityStore,
        record: &Self::Record,
    ) -> Result<Self::Classified, SyncError>;

    /// Decide the action for one record. Pure; identical inputs must plan
    /// identical actions.
    fn plan(
        &self,
        classified: &Self::Classified,
        desired: &Self::Record,
    ) -> Result<Planned, CoreError>;

    /// Pre-flight checks against the store (referential integrity, locks).
    /// Failures across the batch are collected; no mutation happens until
    /// every record verifies.
    async fn verify(
        &self,
        store: &dyn EntityStore,
        desired: &Self::Record,
        classified: &Self::Classified,
        planned: &Planned,
    ) -> Result<(), SyncError>;

    /// Execute the planned action. Only called after the whole batch
    /// verified.
    async fn apply(
        &self,
        store: &dyn EntityStore,
        desired: &Self::Record,
        classified: &Self::Classified,
        planned: &Planned,
    ) -> Result<(), SyncError>;
}
