//! Workspace compare driver: diff two workspace folders entity type by
//! entity type and write one JSON report per type plus a summary.

use std::path::Path;

use serde::Serialize;
use tracing::info;

use labelpizza_core::diff::{diff_collections, DiffPair, DiffSummary};
use labelpizza_core::{EntityKey, EntityType};

use crate::error::SyncError;
use crate::typed::TypedWorkspace;
use crate::workspace::load_workspace;

/// One entity type's compare report, as written to disk. The diff engine
/// speaks left/right; the report contract speaks folder1/folder2.
#[derive(Serialize)]
struct CompareReport<'a, T: Serialize> {
    entity_type: EntityType,
    summary: ReportSummary,
    identical: &'a [EntityKey],
    folder1_only: &'a [T],
    folder2_only: &'a [T],
    different: &'a [DiffPair<T>],
}

/// [`DiffSummary`] under the report's folder-side field names.
#[derive(Debug, Clone, Copy, Serialize)]
struct ReportSummary {
    identical: usize,
    folder1_only: usize,
    folder2_only: usize,
    different: usize,
}

impl From<DiffSummary> for ReportSummary {
    fn from(summary: DiffSummary) -> Self {
        Self {
            identical: summary.identical,
            folder1_only: summary.left_only,
            folder2_only: summary.right_only,
            different: summary.different,
        }
    }
}

/// Totals across all nine entity types.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CompareTotals {
    pub identical: usize,
    pub folder1_only: usize,
    pub folder2_only: usize,
    pub different: usize,
}

impl CompareTotals {
    fn add(&mut self, summary: DiffSummary) {
        self.identical += summary.identical;
        self.folder1_only += summary.left_only;
        self.folder2_only += summary.right_only;
        self.different += summary.different;
    }

    pub fn is_identical(&self) -> bool {
        self.folder1_only == 0 && self.folder2_only == 0 && self.different == 0
    }
}

/// Diff two workspace folders and write per-type reports into `out_dir`.
pub fn compare_workspaces(
    folder1: &Path,
    folder2: &Path,
    out_dir: &Path,
) -> Result<CompareTotals, SyncError> {
    let left = TypedWorkspace::parse(&load_workspace(folder1)?)?;
    let right = TypedWorkspace::parse(&load_workspace(folder2)?)?;
    std::fs::create_dir_all(out_dir)?;

    let mut totals = CompareTotals::default();
    let mut summaries = serde_json::Map::new();

    macro_rules! compare_type {
        ($entity:expr, $field:ident, $key:expr) => {{
            let diff = diff_collections($key, &left.$field, &right.$field);
            let summary = diff.summary();
            totals.add(summary);
            summaries.insert(
                $entity.as_str().to_string(),
                serde_json::to_value(ReportSummary::from(summary))?,
            );
            let report = CompareReport {
                entity_type: $entity,
                summary: summary.into(),
                identical: &diff.identical,
                folder1_only: &diff.left_only,
                folder2_only: &diff.right_only,
                different: &diff.different,
            };
            let path = out_dir.join(format!("{}_diff.json", $entity.as_str()));
            std::fs::write(&path, serde_json::to_string_pretty(&report)?)?;
        }};
    }

    compare_type!(EntityType::Video, videos, |v: &_| v.natural_key());
    compare_type!(EntityType::User, users, |u: &_| u.natural_key());
    compare_type!(EntityType::QuestionGroup, question_groups, |g: &_| g
        .natural_key());
    compare_type!(EntityType::Schema, schemas, |s: &_| s.natural_key());
    compare_type!(EntityType::Project, projects, |p: &_| p.natural_key());
    compare_type!(EntityType::ProjectGroup, project_groups, |g: &_| g
        .natural_key());
    compare_type!(EntityType::Assignment, assignments, |a: &_| a.natural_key());
    compare_type!(EntityType::Annotation, annotations, |a: &_| a.natural_key());
    compare_type!(EntityType::GroundTruth, ground_truths, |g: &_| g
        .natural_key());

    let summary = serde_json::json!({
        "folder1": folder1.display().to_string(),
        "folder2": folder2.display().to_string(),
        "identical": totals.is_identical(),
        "totals": totals,
        "per_type": serde_json::Value::Object(summaries),
    });
    std::fs::write(
        out_dir.join("summary.json"),
        serde_json::to_string_pretty(&summary)?,
    )?;

    info!(
        out = %out_dir.display(),
        identical = totals.is_identical(),
        "workspace compare written"
    );
    Ok(totals)
}
