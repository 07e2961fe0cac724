//! Fully typed view of a workspace: every raw batch structurally validated
//! and deserialized. The compare and merge drivers work on this view; the
//! sync pipelines parse per batch instead so a failure is attributed to its
//! pipeline.

use std::collections::BTreeMap;
use std::path::Path;

use labelpizza_core::fields::parse_batch;
use labelpizza_core::records::{
    AnnotationRecord, AssignmentRecord, GroundTruthRecord, ProjectGroupRecord, ProjectRecord,
    QuestionGroupRecord, SchemaRecord, UserRecord, VideoRecord,
};
use labelpizza_core::EntityType;

use crate::error::SyncError;
use crate::workspace::{file_stem, write_json, WorkspaceData};

/// A workspace with every batch parsed into record types.
#[derive(Debug, Clone, Default)]
pub struct TypedWorkspace {
    pub videos: Vec<VideoRecord>,
    pub users: Vec<UserRecord>,
    pub question_groups: Vec<QuestionGroupRecord>,
    pub schemas: Vec<SchemaRecord>,
    pub projects: Vec<ProjectRecord>,
    pub project_groups: Vec<ProjectGroupRecord>,
    pub assignments: Vec<AssignmentRecord>,
    pub annotations: Vec<AnnotationRecord>,
    pub ground_truths: Vec<GroundTruthRecord>,
}

impl TypedWorkspace {
    pub fn parse(data: &WorkspaceData) -> Result<Self, SyncError> {
        Ok(Self {
            videos: parse_batch(
                EntityType::Video,
                &data.videos,
                VideoRecord::REQUIRED_FIELDS,
                VideoRecord::OPTIONAL_FIELDS,
            )?,
            users: parse_batch(
                EntityType::User,
                &data.users,
                UserRecord::REQUIRED_FIELDS,
                UserRecord::OPTIONAL_FIELDS,
            )?,
            question_groups: parse_batch(
                EntityType::QuestionGroup,
                &data.question_groups,
                QuestionGroupRecord::REQUIRED_FIELDS,
                QuestionGroupRecord::OPTIONAL_FIELDS,
            )?,
            schemas: parse_batch(
                EntityType::Schema,
                &data.schemas,
                SchemaRecord::REQUIRED_FIELDS,
                SchemaRecord::OPTIONAL_FIELDS,
            )?,
            projects: parse_batch(
                EntityType::Project,
                &data.projects,
                ProjectRecord::REQUIRED_FIELDS,
                ProjectRecord::OPTIONAL_FIELDS,
            )?,
            project_groups: parse_batch(
                EntityType::ProjectGroup,
                &data.project_groups,
                ProjectGroupRecord::REQUIRED_FIELDS,
                ProjectGroupRecord::OPTIONAL_FIELDS,
            )?,
            assignments: parse_batch(
                EntityType::Assignment,
                &data.assignments,
                AssignmentRecord::REQUIRED_FIELDS,
                AssignmentRecord::OPTIONAL_FIELDS,
            )?,
            annotations: parse_batch(
                EntityType::Annotation,
                &data.annotations,
                AnnotationRecord::REQUIRED_FIELDS,
                AnnotationRecord::OPTIONAL_FIELDS,
            )?,
            ground_truths: parse_batch(
                EntityType::GroundTruth,
                &data.ground_truths,
                GroundTruthRecord::REQUIRED_FIELDS,
                GroundTruthRecord::OPTIONAL_FIELDS,
            )?,
        })
    }

    /// Write this workspace out in the loader's folder layout.
    pub fn write(&self, folder: &Path) -> Result<(), SyncError> {
        std::fs::create_dir_all(folder)?;
        write_json(&folder.join("videos.json"), &self.videos)?;
        write_json(&folder.join("users.json"), &self.users)?;
        write_json(&folder.join("schemas.json"), &self.schemas)?;
        write_json(&folder.join("projects.json"), &self.projects)?;
        write_json(&folder.join("project_groups.json"), &self.project_groups)?;
        write_json(&folder.join("assignments.json"), &self.assignments)?;

        let groups_dir = folder.join("question_groups");
        std::fs::create_dir_all(&groups_dir)?;
        for group in &self.question_groups {
            write_json(
                &groups_dir.join(format!("{}.json", file_stem(&group.title))),
                group,
            )?;
        }

        write_by_project(
            &folder.join("annotations"),
            &self.annotations,
            |a| &a.project_name,
        )?;
        write_by_project(
            &folder.join("ground_truths"),
            &self.ground_truths,
            |g| &g.project_name,
        )?;
        Ok(())
    }
}

fn write_by_project<T: serde::Serialize + Clone, F: Fn(&T) -> &String>(
    folder: &Path,
    records: &[T],
    project_of: F,
) -> Result<(), SyncError> {
    std::fs::create_dir_all(folder)?;
    let mut by_project: BTreeMap<String, Vec<T>> = BTreeMap::new();
    for record in records {
        by_project
            .entry(project_of(record).clone())
            .or_default()
            .push(record.clone());
    }
    for (project, records) in by_project {
        write_json(&folder.join(format!("{}.json", file_stem(&project))), &records)?;
    }
    Ok(())
}
