//! Postgres Entity Store backed by sqlx.
//!
//! One repository per table family, in the usual shape: a `COLUMNS` constant
//! shared across queries, `query_as` into a row struct, and a conversion
//! into the core record type. [`PgStore`] stitches the repositories into the
//! [`EntityStore`] trait.

use async_trait::async_trait;

use labelpizza_core::records::{
    AssignmentRecord, AssignmentRole, ProjectGroupRecord, ProjectRecord, QuestionRecord,
    SchemaRecord, UserRecord, VideoRecord,
};

use crate::error::StoreError;
use crate::store::{AnnotationRow, EntityStore, GroundTruthRow, QuestionGroupRow};
use crate::DbPool;

mod annotation_repo;
mod assignment_repo;
mod project_repo;
mod question_repo;
mod schema_repo;
mod user_repo;
mod video_repo;

use annotation_repo::{AnnotationRepo, GroundTruthRepo};
use assignment_repo::AssignmentRepo;
use project_repo::{ProjectGroupRepo, ProjectRepo};
use question_repo::{QuestionGroupRepo, QuestionRepo};
use schema_repo::SchemaRepo;
use user_repo::UserRepo;
use video_repo::VideoRepo;

/// Postgres-backed [`EntityStore`].
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Run pending migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[async_trait]
impl EntityStore for PgStore {
    async fn get_video(&self, video_uid: &str) -> Result<Option<VideoRecord>, StoreError> {
        VideoRepo::find_by_uid(&self.pool, video_uid).await
    }

    async fn get_video_by_url(&self, url: &str) -> Result<Option<VideoRecord>, StoreError> {
        VideoRepo::find_by_url(&self.pool, url).await
    }

    async fn list_videos(&self) -> Result<Vec<VideoRecord>, StoreError> {
        VideoRepo::list(&self.pool).await
    }

    async fn insert_video(&self, video: &VideoRecord) -> Result<(), StoreError> {
        VideoRepo::insert(&self.pool, video).await
    }

    async fn update_video(&self, video: &VideoRecord) -> Result<(), StoreError> {
        VideoRepo::update(&self.pool, video).await
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError> {
        UserRepo::find_by_id(&self.pool, user_id).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        UserRepo::find_by_email(&self.pool, email).await
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        UserRepo::list(&self.pool).await
    }

    async fn insert_user(&self, user: &UserRecord) -> Result<(), StoreError> {
        UserRepo::insert(&self.pool, user).await
    }

    async fn update_user(&self, user: &UserRecord) -> Result<(), StoreError> {
        UserRepo::update(&self.pool, user).await
    }

    async fn get_question(&self, text: &str) -> Result<Option<QuestionRecord>, StoreError> {
        QuestionRepo::find_by_text(&self.pool, text).await
    }

    async fn list_questions(&self) -> Result<Vec<QuestionRecord>, StoreError> {
        QuestionRepo::list(&self.pool).await
    }

    async fn insert_question(&self, question: &QuestionRecord) -> Result<(), StoreError> {
        QuestionRepo::insert(&self.pool, question).await
    }

    async fn update_question(&self, question: &QuestionRecord) -> Result<(), StoreError> {
        QuestionRepo::update(&self.pool, question).await
    }

    async fn get_question_group(
        &self,
        title: &str,
    ) -> Result<Option<QuestionGroupRow>, StoreError> {
        QuestionGroupRepo::find_by_title(&self.pool, title).await
    }

    async fn list_question_groups(&self) -> Result<Vec<QuestionGroupRow>, StoreError> {
        QuestionGroupRepo::list(&self.pool).await
    }

    async fn insert_question_group(&self, group: &QuestionGroupRow) -> Result<(), StoreError> {
        QuestionGroupRepo::insert(&self.pool, group).await
    }

    async fn update_question_group(&self, group: &QuestionGroupRow) -> Result<(), StoreError> {
        QuestionGroupRepo::update(&self.pool, group).await
    }

    async fn get_schema(&self, schema_name: &str) -> Result<Option<SchemaRecord>, StoreError> {
        SchemaRepo::find_by_name(&self.pool, schema_name).await
    }

    async fn list_schemas(&self) -> Result<Vec<SchemaRecord>, StoreError> {
        SchemaRepo::list(&self.pool).await
    }

    async fn insert_schema(&self, schema: &SchemaRecord) -> Result<(), StoreError> {
        SchemaRepo::insert(&self.pool, schema).await
    }

    async fn update_schema(&self, schema: &SchemaRecord) -> Result<(), StoreError> {
        SchemaRepo::update(&self.pool, schema).await
    }

    async fn get_project(&self, project_name: &str) -> Result<Option<ProjectRecord>, StoreError> {
        ProjectRepo::find_by_name(&self.pool, project_name).await
    }

    async fn list_projects(&self) -> Result<Vec<ProjectRecord>, StoreError> {
        ProjectRepo::list(&self.pool).await
    }

    async fn insert_project(&self, project: &ProjectRecord) -> Result<(), StoreError> {
        ProjectRepo::insert(&self.pool, project).await
    }

    async fn update_project(&self, project: &ProjectRecord) -> Result<(), StoreError> {
        ProjectRepo::update(&self.pool, project).await
    }

    async fn get_project_group(
        &self,
        name: &str,
    ) -> Result<Option<ProjectGroupRecord>, StoreError> {
        ProjectGroupRepo::find_by_name(&self.pool, name).await
    }

    async fn list_project_groups(&self) -> Result<Vec<ProjectGroupRecord>, StoreError> {
        ProjectGroupRepo::list(&self.pool).await
    }

    async fn insert_project_group(&self, group: &ProjectGroupRecord) -> Result<(), StoreError> {
        ProjectGroupRepo::insert(&self.pool, group).await
    }

    async fn update_project_group(&self, group: &ProjectGroupRecord) -> Result<(), StoreError> {
        ProjectGroupRepo::update(&self.pool, group).await
    }

    async fn get_assignment(
        &self,
        user_id: &str,
        project_name: &str,
        role: AssignmentRole,
    ) -> Result<Option<AssignmentRecord>, StoreError> {
        AssignmentRepo::find(&self.pool, user_id, project_name, role).await
    }

    async fn list_assignments(&self) -> Result<Vec<AssignmentRecord>, StoreError> {
        AssignmentRepo::list(&self.pool).await
    }

    async fn insert_assignment(&self, assignment: &AssignmentRecord) -> Result<(), StoreError> {
        AssignmentRepo::insert(&self.pool, assignment).await
    }

    async fn update_assignment(&self, assignment: &AssignmentRecord) -> Result<(), StoreError> {
        AssignmentRepo::update(&self.pool, assignment).await
    }

    async fn remove_assignment(
        &self,
        user_id: &str,
        project_name: &str,
        role: AssignmentRole,
    ) -> Result<(), StoreError> {
        AssignmentRepo::remove(&self.pool, user_id, project_name, role).await
    }

    async fn get_annotation(
        &self,
        video_uid: &str,
        project_name: &str,
        user_id: &str,
        question_text: &str,
    ) -> Result<Option<AnnotationRow>, StoreError> {
        AnnotationRepo::find(&self.pool, video_uid, project_name, user_id, question_text).await
    }

    async fn list_annotations(&self) -> Result<Vec<AnnotationRow>, StoreError> {
        AnnotationRepo::list(&self.pool).await
    }

    async fn insert_annotation(&self, row: &AnnotationRow) -> Result<(), StoreError> {
        AnnotationRepo::insert(&self.pool, row).await
    }

    async fn update_annotation(&self, row: &AnnotationRow) -> Result<(), StoreError> {
        AnnotationRepo::update(&self.pool, row).await
    }

    async fn get_ground_truth(
        &self,
        video_uid: &str,
        project_name: &str,
        question_text: &str,
    ) -> Result<Option<GroundTruthRow>, StoreError> {
        GroundTruthRepo::find(&self.pool, video_uid, project_name, question_text).await
    }

    async fn list_ground_truths(&self) -> Result<Vec<GroundTruthRow>, StoreError> {
        GroundTruthRepo::list(&self.pool).await
    }

    async fn insert_ground_truth(&self, row: &GroundTruthRow) -> Result<(), StoreError> {
        GroundTruthRepo::insert(&self.pool, row).await
    }

    async fn update_ground_truth(&self, row: &GroundTruthRow) -> Result<(), StoreError> {
        GroundTruthRepo::update(&self.pool, row).await
    }
}
