//! The generic sync pipeline.
//!
//! One entity type per run. Phases, in order:
//!
//! 1. parse — structural field-set validation, then typed deserialization
//! 2. validate — per-record semantic rules, then batch rules
//! 3. deduplicate — intra-batch key collisions, before any store access
//! 4. classify — parallel stored-state lookup
//! 5. plan — pure action planning (create / update / remove / skip)
//! 6. verify — parallel pre-flight checks, collecting every failure
//! 7. apply — parallel mutation, only reached when the whole batch verified
//!
//! The verify/apply boundary is the pipeline's safety property: a batch that
//! fails verification leaves the store untouched.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use labelpizza_core::report::{truncated_list, RecordOutcome, SyncAction, SyncReport};
use labelpizza_core::{CoreError, EntityKey};
use labelpizza_db::EntityStore;

use crate::adapter::{EntityAdapter, Planned};
use crate::error::{DuplicateKey, SyncError};

/// Engine tuning knobs.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Maximum concurrent store operations within one phase.
    pub parallelism: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self { parallelism: 16 }
    }
}

/// Run one entity-type pipeline over a raw JSON batch.
pub async fn run_sync<A: EntityAdapter>(
    adapter: Arc<A>,
    store: Arc<dyn EntityStore>,
    values: &[serde_json::Value],
    options: &SyncOptions,
) -> Result<SyncReport, SyncError> {
    let entity = adapter.entity_type();
    let started = Instant::now();

    // Phase 1: parse.
    let records = adapter.parse(values)?;
    debug!(%entity, records = records.len(), "batch parsed");

    // Phase 2: validate, collecting every failure.
    let failures: Vec<String> = records
        .iter()
        .filter_map(|r| adapter.validate(r).err().map(|e| e.to_string()))
        .collect();
    if !failures.is_empty() {
        return Err(SyncError::Validation(CoreError::Validation(format!(
            "{entity} batch failed validation ({} records): {}",
            failures.len(),
            truncated_list(&failures)
        ))));
    }
    adapter.validate_batch(&records)?;

    // Phase 3: intra-batch duplicate detection. Runs before any store
    // access so a bad batch is rejected without I/O. Every claimant's input
    // position is kept so the error names the offending records.
    let mut seen: HashMap<EntityKey, Vec<usize>> = HashMap::new();
    let mut collided: Vec<EntityKey> = Vec::new();
    for (index, record) in records.iter().enumerate() {
        for key in adapter.duplicate_keys(record) {
            let indices = seen.entry(key.clone()).or_default();
            indices.push(index);
            if indices.len() == 2 {
                collided.push(key);
            }
        }
    }
    if !collided.is_empty() {
        let duplicates: Vec<DuplicateKey> = collided
            .into_iter()
            .map(|key| {
                let indices = seen.remove(&key).unwrap_or_default();
                DuplicateKey {
                    key: key.as_str().to_string(),
                    indices,
                }
            })
            .collect();
        return Err(SyncError::Duplicate { entity, duplicates });
    }

    // Phase 4: classify, in parallel.
    let classified = classify_all(&adapter, &store, &records, options).await?;

    // Phase 5: plan. Pure and sequential.
    let mut planned: Vec<Planned> = Vec::with_capacity(records.len());
    for (record, classified) in records.iter().zip(&classified) {
        planned.push(adapter.plan(classified, record)?);
    }

    // Phase 6: verify, in parallel, collecting every failure.
    let failures = verify_all(&adapter, &store, &records, &classified, &planned, options).await?;
    if !failures.is_empty() {
        return Err(SyncError::Verification { entity, failures });
    }

    // Phase 7: apply. The whole batch verified; first write failure aborts.
    apply_all(&adapter, &store, &records, &classified, &planned, options).await?;

    let outcomes: Vec<RecordOutcome> = records
        .iter()
        .zip(&planned)
        .map(|(record, planned)| {
            let key = adapter.natural_key(record);
            match planned {
                Planned::Create => RecordOutcome::new(key, SyncAction::Created),
                Planned::Update { changes } => RecordOutcome {
                    key,
                    action: SyncAction::Updated,
                    changes: changes.clone(),
                    reason: None,
                },
                Planned::Remove => RecordOutcome::new(key, SyncAction::Removed),
                Planned::Skip { reason } => RecordOutcome {
                    key,
                    action: SyncAction::Skipped,
                    changes: Vec::new(),
                    reason: Some(reason.clone()),
                },
            }
        })
        .collect();

    let report = SyncReport::from_outcomes(entity, outcomes, started.elapsed().as_millis() as u64);
    info!(
        %entity,
        created = report.created,
        updated = report.updated,
        removed = report.removed,
        skipped = report.skipped,
        elapsed_ms = report.elapsed_ms,
        "pipeline finished"
    );
    Ok(report)
}

async fn classify_all<A: EntityAdapter>(
    adapter: &Arc<A>,
    store: &Arc<dyn EntityStore>,
    records: &[A::Record],
    options: &SyncOptions,
) -> Result<Vec<A::Classified>, SyncError> {
    let semaphore = Arc::new(Semaphore::new(options.parallelism));
    let mut set = JoinSet::new();
    for (index, record) in records.iter().cloned().enumerate() {
        let adapter = Arc::clone(adapter);
        let store = Arc::clone(store);
        let semaphore = Arc::clone(&semaphore);
        set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            let result = adapter.classify(store.as_ref(), &record).await;
            (index, result)
        });
    }

    let mut classified: Vec<Option<A::Classified>> = Vec::new();
    classified.resize_with(records.len(), || None);
    while let Some(joined) = set.join_next().await {
        let (index, result) = joined.map_err(|e| SyncError::Task(e.to_string()))?;
        classified[index] = Some(result?);
    }
    Ok(classified.into_iter().flatten().collect())
}

async fn verify_all<A: EntityAdapter>(
    adapter: &Arc<A>,
    store: &Arc<dyn EntityStore>,
    records: &[A::Record],
    classified: &[A::Classified],
    planned: &[Planned],
    options: &SyncOptions,
) -> Result<Vec<String>, SyncError> {
    let semaphore = Arc::new(Semaphore::new(options.parallelism));
    let mut set = JoinSet::new();
    for (index, record) in records.iter().cloned().enumerate() {
        let adapter = Arc::clone(adapter);
        let store = Arc::clone(store);
        let semaphore = Arc::clone(&semaphore);
        let classified = classified[index].clone();
        let planned = planned[index].clone();
        set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            let result = adapter
                .verify(store.as_ref(), &record, &classified, &planned)
                .await;
            (index, result)
        });
    }

    // Keep failures in input order so error messages are reproducible.
    let mut failures: Vec<(usize, String)> = Vec::new();
    while let Some(joined) = set.join_next().await {
        let (index, result) = joined.map_err(|e| SyncError::Task(e.to_string()))?;
        if let Err(e) = result {
            failures.push((index, e.to_string()));
        }
    }
    failures.sort_by_key(|(index, _)| *index);
    Ok(failures.into_iter().map(|(_, message)| message).collect())
}

async fn apply_all<A: EntityAdapter>(
    adapter: &Arc<A>,
    store: &Arc<dyn EntityStore>,
    records: &[A::Record],
    classified: &[A::Classified],
    planned: &[Planned],
    options: &SyncOptions,
) -> Result<(), SyncError> {
    let semaphore = Arc::new(Semaphore::new(options.parallelism));
    let mut set = JoinSet::new();
    for (index, record) in records.iter().cloned().enumerate() {
        let adapter = Arc::clone(adapter);
        let store = Arc::clone(store);
        let semaphore = Arc::clone(&semaphore);
        let classified = classified[index].clone();
        let planned = planned[index].clone();
        set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            adapter
                .apply(store.as_ref(), &record, &classified, &planned)
                .await
        });
    }

    let mut first_error: Option<SyncError> = None;
    while let Some(joined) = set.join_next().await {
        let result = joined.map_err(|e| SyncError::Task(e.to_string()))?;
        if let Err(e) = result {
            first_error.get_or_insert(e);
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
