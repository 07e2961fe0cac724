//! The `EntityStore` trait and the stored row types that differ from their
//! desired-state records.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use labelpizza_core::records::{
    AssignmentRecord, AssignmentRole, ProjectGroupRecord, ProjectRecord, QuestionGroupRecord,
    QuestionRecord, SchemaRecord, UserRecord, VideoRecord,
};

use crate::error::StoreError;

// ---------------------------------------------------------------------------
// Stored row types
// ---------------------------------------------------------------------------

/// Stored form of a question group: metadata plus the ordered member
/// question texts. Questions themselves are stored once, globally, keyed by
/// text — groups only reference them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionGroupRow {
    pub title: String,
    pub display_title: Option<String>,
    pub description: Option<String>,
    pub is_reusable: bool,
    pub is_auto_submit: bool,
    pub verification_function: Option<String>,
    pub question_texts: Vec<String>,
}

impl QuestionGroupRow {
    /// Project the stored fields out of a desired-state record.
    pub fn from_record(record: &QuestionGroupRecord) -> Self {
        Self {
            title: record.title.clone(),
            display_title: record.display_title.clone(),
            description: record.description.clone(),
            is_reusable: record.is_reusable,
            is_auto_submit: record.is_auto_submit,
            verification_function: record.verification_function.clone(),
            question_texts: record.question_texts(),
        }
    }

    /// Reassemble a full record from this row and its resolved questions.
    pub fn into_record(self, questions: Vec<QuestionRecord>) -> QuestionGroupRecord {
        QuestionGroupRecord {
            title: self.title,
            display_title: self.display_title,
            description: self.description,
            is_reusable: self.is_reusable,
            is_auto_submit: self.is_auto_submit,
            verification_function: self.verification_function,
            questions,
        }
    }
}

/// One stored annotation answer: per (video, project, user, question).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRow {
    pub video_uid: String,
    pub project_name: String,
    pub user_id: String,
    pub question_text: String,
    pub answer: String,
    pub confidence: Option<f64>,
    pub note: Option<String>,
}

/// One stored ground-truth answer: per (video, project, question),
/// user-independent. Carries the admin-lock metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundTruthRow {
    pub video_uid: String,
    pub project_name: String,
    pub question_text: String,
    pub answer: String,
    pub confidence: Option<f64>,
    pub note: Option<String>,
    /// User who last wrote the value.
    pub submitted_by: String,
    /// Set when an admin last modified the value; locks it against
    /// non-admin overwrites.
    pub admin_user_id: Option<String>,
    pub admin_modified_at: Option<DateTime<Utc>>,
}

impl GroundTruthRow {
    pub fn is_admin_locked(&self) -> bool {
        self.admin_user_id.is_some()
    }
}

// ---------------------------------------------------------------------------
// The store trait
// ---------------------------------------------------------------------------

/// CRUD and natural-key lookup per entity type.
///
/// `get_*` returns `Ok(None)` when absent; `insert_*` fails with
/// [`StoreError::Conflict`] when the key already exists (the race signal);
/// `update_*` fails with [`StoreError::NotFound`] when it does not. Every
/// mutation is atomic at the single-record level.
#[async_trait]
pub trait EntityStore: Send + Sync {
    // -- videos ---------------------------------------------------------
    async fn get_video(&self, video_uid: &str) -> Result<Option<VideoRecord>, StoreError>;
    async fn get_video_by_url(&self, url: &str) -> Result<Option<VideoRecord>, StoreError>;
    async fn list_videos(&self) -> Result<Vec<VideoRecord>, StoreError>;
    async fn insert_video(&self, video: &VideoRecord) -> Result<(), StoreError>;
    async fn update_video(&self, video: &VideoRecord) -> Result<(), StoreError>;

    // -- users ----------------------------------------------------------
    async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;
    async fn list_users(&self) -> Result<Vec<UserRecord>, StoreError>;
    async fn insert_user(&self, user: &UserRecord) -> Result<(), StoreError>;
    async fn update_user(&self, user: &UserRecord) -> Result<(), StoreError>;

    // -- questions ------------------------------------------------------
    async fn get_question(&self, text: &str) -> Result<Option<QuestionRecord>, StoreError>;
    async fn list_questions(&self) -> Result<Vec<QuestionRecord>, StoreError>;
    async fn insert_question(&self, question: &QuestionRecord) -> Result<(), StoreError>;
    async fn update_question(&self, question: &QuestionRecord) -> Result<(), StoreError>;

    // -- question groups ------------------------------------------------
    async fn get_question_group(&self, title: &str)
        -> Result<Option<QuestionGroupRow>, StoreError>;
    async fn list_question_groups(&self) -> Result<Vec<QuestionGroupRow>, StoreError>;
    async fn insert_question_group(&self, group: &QuestionGroupRow) -> Result<(), StoreError>;
    async fn update_question_group(&self, group: &QuestionGroupRow) -> Result<(), StoreError>;

    // -- schemas --------------------------------------------------------
    async fn get_schema(&self, schema_name: &str) -> Result<Option<SchemaRecord>, StoreError>;
    async fn list_schemas(&self) -> Result<Vec<SchemaRecord>, StoreError>;
    async fn insert_schema(&self, schema: &SchemaRecord) -> Result<(), StoreError>;
    async fn update_schema(&self, schema: &SchemaRecord) -> Result<(), StoreError>;

    // -- projects -------------------------------------------------------
    async fn get_project(&self, project_name: &str) -> Result<Option<ProjectRecord>, StoreError>;
    async fn list_projects(&self) -> Result<Vec<ProjectRecord>, StoreError>;
    async fn insert_project(&self, project: &ProjectRecord) -> Result<(), StoreError>;
    async fn update_project(&self, project: &ProjectRecord) -> Result<(), StoreError>;

    // -- project groups -------------------------------------------------
    async fn get_project_group(
        &self,
        name: &str,
    ) -> Result<Option<ProjectGroupRecord>, StoreError>;
    async fn list_project_groups(&self) -> Result<Vec<ProjectGroupRecord>, StoreError>;
    async fn insert_project_group(&self, group: &ProjectGroupRecord) -> Result<(), StoreError>;
    async fn update_project_group(&self, group: &ProjectGroupRecord) -> Result<(), StoreError>;

    // -- assignments ----------------------------------------------------
    async fn get_assignment(
        &self,
        user_id: &str,
        project_name: &str,
        role: AssignmentRole,
    ) -> Result<Option<AssignmentRecord>, StoreError>;
    async fn list_assignments(&self) -> Result<Vec<AssignmentRecord>, StoreError>;
    async fn insert_assignment(&self, assignment: &AssignmentRecord) -> Result<(), StoreError>;
    async fn update_assignment(&self, assignment: &AssignmentRecord) -> Result<(), StoreError>;
    /// Assignments are the one entity type that deletes rather than
    /// archives.
    async fn remove_assignment(
        &self,
        user_id: &str,
        project_name: &str,
        role: AssignmentRole,
    ) -> Result<(), StoreError>;

    // -- annotations ----------------------------------------------------
    async fn get_annotation(
        &self,
        video_uid: &str,
        project_name: &str,
        user_id: &str,
        question_text: &str,
    ) -> Result<Option<AnnotationRow>, StoreError>;
    async fn list_annotations(&self) -> Result<Vec<AnnotationRow>, StoreError>;
    async fn insert_annotation(&self, row: &AnnotationRow) -> Result<(), StoreError>;
    async fn update_annotation(&self, row: &AnnotationRow) -> Result<(), StoreError>;

    // -- ground truths --------------------------------------------------
    async fn get_ground_truth(
        &self,
        video_uid: &str,
        project_name: &str,
        question_text: &str,
    ) -> Result<Option<GroundTruthRow>, StoreError>;
    async fn list_ground_truths(&self) -> Result<Vec<GroundTruthRow>, StoreError>;
    async fn insert_ground_truth(&self, row: &GroundTruthRow) -> Result<(), StoreError>;
    async fn update_ground_truth(&self, row: &GroundTruthRow) -> Result<(), StoreError>;
}
