//! Workspace merge driver: combine two workspace folders under a
//! whole-record conflict policy and write the merged workspace plus a
//! conflict report.

use std::path::Path;

use serde::Serialize;
use tracing::info;

use labelpizza_core::merge::{merge_collections, ConflictPolicy, MergeConflict};
use labelpizza_core::EntityType;

use crate::error::SyncError;
use crate::typed::TypedWorkspace;
use crate::workspace::load_workspace;

/// Conflict counts per entity type, as written to `merge_conflicts.json`.
#[derive(Debug, Default, Serialize)]
pub struct MergeSummary {
    pub total_conflicts: usize,
    pub per_type: serde_json::Map<String, serde_json::Value>,
}

/// Merge two workspace folders into `out_dir`.
///
/// The merged workspace is the union of both inputs; shared keys with
/// differing content resolve per `policy` and every such conflict is
/// reported in `merge_conflicts.json` regardless of which side won.
pub fn merge_workspaces(
    folder1: &Path,
    folder2: &Path,
    out_dir: &Path,
    policy: ConflictPolicy,
) -> Result<MergeSummary, SyncError> {
    let first = TypedWorkspace::parse(&load_workspace(folder1)?)?;
    let second = TypedWorkspace::parse(&load_workspace(folder2)?)?;

    let mut merged = TypedWorkspace::default();
    let mut summary = MergeSummary::default();
    let mut conflicts_by_type = serde_json::Map::new();

    macro_rules! merge_type {
        ($entity:expr, $field:ident, $key:expr) => {{
            let outcome = merge_collections($key, &first.$field, &second.$field, policy);
            record_conflicts(
                &mut summary,
                &mut conflicts_by_type,
                $entity,
                &outcome.conflicts,
            )?;
            merged.$field = outcome.merged;
        }};
    }

    merge_type!(EntityType::Video, videos, |v: &_| v.natural_key());
    merge_type!(EntityType::User, users, |u: &_| u.natural_key());
    merge_type!(EntityType::QuestionGroup, question_groups, |g: &_| g
        .natural_key());
    merge_type!(EntityType::Schema, schemas, |s: &_| s.natural_key());
    merge_type!(EntityType::Project, projects, |p: &_| p.natural_key());
    merge_type!(EntityType::ProjectGroup, project_groups, |g: &_| g
        .natural_key());
    merge_type!(EntityType::Assignment, assignments, |a: &_| a.natural_key());
    merge_type!(EntityType::Annotation, annotations, |a: &_| a.natural_key());
    merge_type!(EntityType::GroundTruth, ground_truths, |g: &_| g
        .natural_key());

    merged.write(out_dir)?;

    let report = serde_json::json!({
        "folder1": folder1.display().to_string(),
        "folder2": folder2.display().to_string(),
        "policy": policy.as_str(),
        "total_conflicts": summary.total_conflicts,
        "conflicts": serde_json::Value::Object(conflicts_by_type),
    });
    std::fs::write(
        out_dir.join("merge_conflicts.json"),
        serde_json::to_string_pretty(&report)?,
    )?;

    info!(
        out = %out_dir.display(),
        conflicts = summary.total_conflicts,
        "workspace merge written"
    );
    Ok(summary)
}

fn record_conflicts<T: Serialize>(
    summary: &mut MergeSummary,
    conflicts_by_type: &mut serde_json::Map<String, serde_json::Value>,
    entity: EntityType,
    conflicts: &[MergeConflict<T>],
) -> Result<(), SyncError> {
    summary.total_conflicts += conflicts.len();
    summary.per_type.insert(
        entity.as_str().to_string(),
        serde_json::Value::from(conflicts.len()),
    );
    if !conflicts.is_empty() {
        conflicts_by_type.insert(
            entity.as_str().to_string(),
            serde_json::to_value(conflicts)?,
        );
    }
    Ok(())
}
