//! Workspace folder pipeline: load, sync in dependency order, export.
//!
//! A workspace folder holds the full desired state:
//!
//! ```text
//! workspace/
//!   videos.json            one JSON array per file
//!   users.json
//!   schemas.json
//!   projects.json
//!   project_groups.json
//!   assignments.json
//!   question_groups/       one group object per file
//!   annotations/           arrays, any file split
//!   ground_truths/
//! ```
//!
//! Missing files and folders mean empty batches, so partial workspaces sync
//! fine.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use labelpizza_core::records::{
    AnnotationRecord, GroundTruthRecord, QuestionGroupRecord,
};
use labelpizza_core::{EntityType, SyncReport};
use labelpizza_db::{AnnotationRow, EntityStore, GroundTruthRow};

use crate::adapters::{
    AnnotationAdapter, AssignmentAdapter, GroundTruthAdapter, ProjectAdapter,
    ProjectGroupAdapter, QuestionGroupAdapter, SchemaAdapter, UserAdapter, VideoAdapter,
};
use crate::engine::{run_sync, SyncOptions};
use crate::error::SyncError;

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// The nine raw batches of one workspace folder, in file order.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceData {
    pub videos: Vec<serde_json::Value>,
    pub users: Vec<serde_json::Value>,
    pub question_groups: Vec<serde_json::Value>,
    pub schemas: Vec<serde_json::Value>,
    pub projects: Vec<serde_json::Value>,
    pub project_groups: Vec<serde_json::Value>,
    pub assignments: Vec<serde_json::Value>,
    pub annotations: Vec<serde_json::Value>,
    pub ground_truths: Vec<serde_json::Value>,
}

impl WorkspaceData {
    /// The batch for one entity type.
    pub fn batch(&self, entity: EntityType) -> &[serde_json::Value] {
        match entity {
            EntityType::Video => &self.videos,
            EntityType::User => &self.users,
            EntityType::QuestionGroup => &self.question_groups,
            EntityType::Schema => &self.schemas,
            EntityType::Project => &self.projects,
            EntityType::ProjectGroup => &self.project_groups,
            EntityType::Assignment => &self.assignments,
            EntityType::Annotation => &self.annotations,
            EntityType::GroundTruth => &self.ground_truths,
        }
    }

    pub fn total_records(&self) -> usize {
        EntityType::SYNC_ORDER
            .iter()
            .map(|e| self.batch(*e).len())
            .sum()
    }
}

/// Read a workspace folder into raw batches.
pub fn load_workspace(folder: &Path) -> Result<WorkspaceData, SyncError> {
    let data = WorkspaceData {
        videos: load_array_file(&folder.join("videos.json"))?,
        users: load_array_file(&folder.join("users.json"))?,
        question_groups: load_folder(&folder.join("question_groups"))?,
        schemas: load_array_file(&folder.join("schemas.json"))?,
        projects: load_array_file(&folder.join("projects.json"))?,
        project_groups: load_array_file(&folder.join("project_groups.json"))?,
        assignments: load_array_file(&folder.join("assignments.json"))?,
        annotations: load_folder(&folder.join("annotations"))?,
        ground_truths: load_folder(&folder.join("ground_truths"))?,
    };
    info!(
        folder = %folder.display(),
        records = data.total_records(),
        "workspace loaded"
    );
    Ok(data)
}

/// Read one JSON file expected to hold an array. Missing file means empty.
fn load_array_file(path: &Path) -> Result<Vec<serde_json::Value>, SyncError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&raw)?;
    match value {
        serde_json::Value::Array(items) => Ok(items),
        other => Ok(vec![other]),
    }
}

/// Read every `.json` file in a folder (sorted by name for reproducible
/// batch order), flattening arrays and single objects alike.
fn load_folder(folder: &Path) -> Result<Vec<serde_json::Value>, SyncError> {
    if !folder.is_dir() {
        return Ok(Vec::new());
    }
    let mut paths: Vec<PathBuf> = std::fs::read_dir(folder)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
        .collect();
    paths.sort();

    let mut values = Vec::new();
    for path in paths {
        values.extend(load_array_file(&path)?);
    }
    Ok(values)
}

// ---------------------------------------------------------------------------
// Ordered sync
// ---------------------------------------------------------------------------

/// The result of a whole-workspace sync: reports for the pipelines that
/// ran, and the failure (if any) that halted the run.
pub struct WorkspaceSyncOutcome {
    pub reports: Vec<SyncReport>,
    pub failure: Option<(EntityType, SyncError)>,
}

impl WorkspaceSyncOutcome {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

/// Sync all nine batches in dependency order, halting on the first pipeline
/// failure. Pipelines after the failed one do not run.
pub async fn sync_workspace(
    store: Arc<dyn EntityStore>,
    data: &WorkspaceData,
    options: &SyncOptions,
) -> WorkspaceSyncOutcome {
    let mut reports = Vec::new();
    for entity in EntityType::SYNC_ORDER {
        let result = match entity {
            EntityType::Video => {
                run_sync(Arc::new(VideoAdapter), Arc::clone(&store), &data.videos, options).await
            }
            EntityType::User => {
                run_sync(Arc::new(UserAdapter), Arc::clone(&store), &data.users, options).await
            }
            EntityType::QuestionGroup => {
                run_sync(
                    Arc::new(QuestionGroupAdapter),
                    Arc::clone(&store),
                    &data.question_groups,
                    options,
                )
                .await
            }
            EntityType::Schema => {
                run_sync(Arc::new(SchemaAdapter), Arc::clone(&store), &data.schemas, options).await
            }
            EntityType::Project => {
                run_sync(Arc::new(ProjectAdapter), Arc::clone(&store), &data.projects, options)
                    .await
            }
            EntityType::ProjectGroup => {
                run_sync(
                    Arc::new(ProjectGroupAdapter),
                    Arc::clone(&store),
                    &data.project_groups,
                    options,
                )
                .await
            }
            EntityType::Assignment => {
                run_sync(
                    Arc::new(AssignmentAdapter),
                    Arc::clone(&store),
                    &data.assignments,
                    options,
                )
                .await
            }
            EntityType::Annotation => {
                run_sync(
                    Arc::new(AnnotationAdapter),
                    Arc::clone(&store),
                    &data.annotations,
                    options,
                )
                .await
            }
            EntityType::GroundTruth => {
                run_sync(
                    Arc::new(GroundTruthAdapter),
                    Arc::clone(&store),
                    &data.ground_truths,
                    options,
                )
                .await
            }
        };
        match result {
            Ok(report) => reports.push(report),
            Err(e) => {
                warn!(entity = %entity, error = %e, "pipeline failed, halting workspace sync");
                return WorkspaceSyncOutcome {
                    reports,
                    failure: Some((*entity, e)),
                };
            }
        }
    }
    WorkspaceSyncOutcome {
        reports,
        failure: None,
    }
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Write the store's current state as a workspace folder, in the same
/// layout the loader reads.
pub async fn export_workspace(store: &dyn EntityStore, folder: &Path) -> Result<(), SyncError> {
    std::fs::create_dir_all(folder)?;

    write_json(&folder.join("videos.json"), &store.list_videos().await?)?;
    write_json(&folder.join("users.json"), &store.list_users().await?)?;
    write_json(&folder.join("schemas.json"), &store.list_schemas().await?)?;
    write_json(&folder.join("projects.json"), &store.list_projects().await?)?;
    write_json(
        &folder.join("project_groups.json"),
        &store.list_project_groups().await?,
    )?;
    write_json(
        &folder.join("assignments.json"),
        &store.list_assignments().await?,
    )?;

    // One file per question group, questions embedded.
    let groups_dir = folder.join("question_groups");
    std::fs::create_dir_all(&groups_dir)?;
    let mut groups = Vec::new();
    for row in store.list_question_groups().await? {
        let mut questions = Vec::with_capacity(row.question_texts.len());
        for text in &row.question_texts {
            if let Some(question) = store.get_question(text).await? {
                questions.push(question);
            }
        }
        groups.push(row.into_record(questions));
    }
    for group in &groups {
        let path = groups_dir.join(format!("{}.json", file_stem(&group.title)));
        write_json(&path, group)?;
    }

    let annotations = assemble_annotations(&groups, store.list_annotations().await?);
    write_grouped(&folder.join("annotations"), annotations)?;

    let ground_truths = assemble_ground_truths(&groups, store.list_ground_truths().await?);
    write_grouped(&folder.join("ground_truths"), ground_truths)?;

    info!(folder = %folder.display(), "workspace exported");
    Ok(())
}

pub(crate) fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), SyncError> {
    let rendered = serde_json::to_string_pretty(value)?;
    std::fs::write(path, rendered)?;
    Ok(())
}

/// Sanitize a natural key into a file stem.
pub(crate) fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

fn write_grouped<T: serde::Serialize>(
    folder: &Path,
    by_project: BTreeMap<String, Vec<T>>,
) -> Result<(), SyncError> {
    std::fs::create_dir_all(folder)?;
    for (project, records) in by_project {
        write_json(&folder.join(format!("{}.json", file_stem(&project))), &records)?;
    }
    Ok(())
}

/// The title of the first group containing a question. Stored rows do not
/// remember which group a row came in through, so exports attribute shared
/// questions to the first group that carries them.
fn group_for_question<'a>(groups: &'a [QuestionGroupRecord], question: &str) -> Option<&'a str> {
    groups
        .iter()
        .find(|g| g.questions.iter().any(|q| q.text == question))
        .map(|g| g.title.as_str())
}

fn assemble_annotations(
    groups: &[QuestionGroupRecord],
    rows: Vec<AnnotationRow>,
) -> BTreeMap<String, Vec<AnnotationRecord>> {
    let mut records: BTreeMap<(String, String, String, String), AnnotationRecord> =
        BTreeMap::new();
    for row in rows {
        let group = match group_for_question(groups, &row.question_text) {
            Some(group) => group.to_string(),
            None => continue,
        };
        let key = (
            row.project_name.clone(),
            group.clone(),
            row.user_id.clone(),
            row.video_uid.clone(),
        );
        let record = records.entry(key).or_insert_with(|| AnnotationRecord {
            question_group_title: group,
            project_name: row.project_name.clone(),
            user_name: row.user_id.clone(),
            video_uid: row.video_uid.clone(),
            answers: BTreeMap::new(),
            confidence_scores: None,
            notes: None,
            is_ground_truth: false,
        });
        record.answers.insert(row.question_text.clone(), row.answer);
        if let Some(c) = row.confidence {
            record
                .confidence_scores
                .get_or_insert_with(BTreeMap::new)
                .insert(row.question_text.clone(), c);
        }
        if let Some(n) = row.note {
            record
                .notes
                .get_or_insert_with(BTreeMap::new)
                .insert(row.question_text, n);
        }
    }

    let mut by_project: BTreeMap<String, Vec<AnnotationRecord>> = BTreeMap::new();
    for record in records.into_values() {
        by_project
            .entry(record.project_name.clone())
            .or_default()
            .push(record);
    }
    by_project
}

fn assemble_ground_truths(
    groups: &[QuestionGroupRecord],
    rows: Vec<GroundTruthRow>,
) -> BTreeMap<String, Vec<GroundTruthRecord>> {
    let mut records: BTreeMap<(String, String, String), GroundTruthRecord> = BTreeMap::new();
    for row in rows {
        let group = match group_for_question(groups, &row.question_text) {
            Some(group) => group.to_string(),
            None => continue,
        };
        let key = (row.project_name.clone(), group.clone(), row.video_uid.clone());
        let record = records.entry(key).or_insert_with(|| GroundTruthRecord {
            question_group_title: group,
            project_name: row.project_name.clone(),
            user_name: row.submitted_by.clone(),
            video_uid: row.video_uid.clone(),
            answers: BTreeMap::new(),
            confidence_scores: None,
            notes: None,
            is_ground_truth: true,
        });
        record.answers.insert(row.question_text.clone(), row.answer);
        if let Some(c) = row.confidence {
            record
                .confidence_scores
                .get_or_insert_with(BTreeMap::new)
                .insert(row.question_text.clone(), c);
        }
        if let Some(n) = row.note {
            record
                .notes
                .get_or_insert_with(BTreeMap::new)
                .insert(row.question_text, n);
        }
    }

    let mut by_project: BTreeMap<String, Vec<GroundTruthRecord>> = BTreeMap::new();
    for record in records.into_values() {
        by_project
            .entry(record.project_name.clone())
            .or_default()
            .push(record);
    }
    by_project
}
