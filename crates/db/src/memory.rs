//! In-memory Entity Store: plain tables behind a lock.
//!
//! Used by the test suite and by `--dry-run` syncs. Semantics mirror the
//! Postgres store: inserts conflict on an existing key, updates require the
//! row to exist. A write counter lets tests assert that a failed pipeline
//! never reached the mutation phase.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use labelpizza_core::records::{
    AssignmentRecord, AssignmentRole, ProjectGroupRecord, ProjectRecord, QuestionRecord,
    SchemaRecord, UserRecord, VideoRecord,
};
use labelpizza_core::EntityKey;

use crate::error::StoreError;
use crate::store::{AnnotationRow, EntityStore, GroundTruthRow, QuestionGroupRow};

#[derive(Default)]
struct Tables {
    videos: BTreeMap<String, VideoRecord>,
    users: BTreeMap<String, UserRecord>,
    questions: BTreeMap<String, QuestionRecord>,
    question_groups: BTreeMap<String, QuestionGroupRow>,
    schemas: BTreeMap<String, SchemaRecord>,
    projects: BTreeMap<String, ProjectRecord>,
    project_groups: BTreeMap<String, ProjectGroupRecord>,
    assignments: BTreeMap<(String, String, String), AssignmentRecord>,
    annotations: BTreeMap<(String, String, String, String), AnnotationRow>,
    ground_truths: BTreeMap<(String, String, String), GroundTruthRow>,
}

/// In-memory [`EntityStore`].
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    mutations: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful write calls (inserts, updates, removes) since
    /// creation.
    pub fn mutations(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    fn record_mutation(&self) {
        self.mutations.fetch_add(1, Ordering::SeqCst);
    }
}

fn assignment_key(user_id: &str, project_name: &str, role: AssignmentRole) -> (String, String, String) {
    (
        user_id.to_string(),
        project_name.to_string(),
        role.as_str().to_string(),
    )
}

/// Insert into a map, failing with `Conflict` on an existing key.
fn insert_new<K: Ord + std::fmt::Debug, V>(
    map: &mut BTreeMap<K, V>,
    key: K,
    value: V,
    entity: &'static str,
) -> Result<(), StoreError> {
    if map.contains_key(&key) {
        return Err(StoreError::Conflict(format!(
            "{entity} with key {key:?} already exists"
        )));
    }
    map.insert(key, value);
    Ok(())
}

/// Replace an existing entry, failing with `NotFound` when absent.
fn update_existing<K: Ord, V>(
    map: &mut BTreeMap<K, V>,
    key: K,
    value: V,
    entity: &'static str,
    display_key: EntityKey,
) -> Result<(), StoreError> {
    match map.get_mut(&key) {
        Some(slot) => {
            *slot = value;
            Ok(())
        }
        None => Err(StoreError::NotFound {
            entity,
            key: display_key,
        }),
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    // -- videos ---------------------------------------------------------

    async fn get_video(&self, video_uid: &str) -> Result<Option<VideoRecord>, StoreError> {
        Ok(self.tables.read().unwrap().videos.get(video_uid).cloned())
    }

    async fn get_video_by_url(&self, url: &str) -> Result<Option<VideoRecord>, StoreError> {
        Ok(self
            .tables
            .read()
            .unwrap()
            .videos
            .values()
            .find(|v| v.url == url)
            .cloned())
    }

    async fn list_videos(&self) -> Result<Vec<VideoRecord>, StoreError> {
        Ok(self.tables.read().unwrap().videos.values().cloned().collect())
    }

    async fn insert_video(&self, video: &VideoRecord) -> Result<(), StoreError> {
        let mut tables = self.tables.write().unwrap();
        insert_new(&mut tables.videos, video.video_uid.clone(), video.clone(), "video")?;
        self.record_mutation();
        Ok(())
    }

    async fn update_video(&self, video: &VideoRecord) -> Result<(), StoreError> {
        let mut tables = self.tables.write().unwrap();
        update_existing(
            &mut tables.videos,
            video.video_uid.clone(),
            video.clone(),
            "video",
            video.natural_key(),
        )?;
        self.record_mutation();
        Ok(())
    }

    // -- users ----------------------------------------------------------

    async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.tables.read().unwrap().users.get(user_id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self
            .tables
            .read()
            .unwrap()
            .users
            .values()
            .find(|u| u.email.as_deref() == Some(email))
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        Ok(self.tables.read().unwrap().users.values().cloned().collect())
    }

    async fn insert_user(&self, user: &UserRecord) -> Result<(), StoreError> {
        let mut tables = self.tables.write().unwrap();
        insert_new(&mut tables.users, user.user_id.clone(), user.clone(), "user")?;
        self.record_mutation();
        Ok(())
    }

    async fn update_user(&self, user: &UserRecord) -> Result<(), StoreError> {
        let mut tables = self.tables.write().unwrap();
        update_existing(
            &mut tables.users,
            user.user_id.clone(),
            user.clone(),
            "user",
            user.natural_key(),
        )?;
        self.record_mutation();
        Ok(())
    }

    // -- questions ------------------------------------------------------

    async fn get_question(&self, text: &str) -> Result<Option<QuestionRecord>, StoreError> {
        Ok(self.tables.read().unwrap().questions.get(text).cloned())
    }

    async fn list_questions(&self) -> Result<Vec<QuestionRecord>, StoreError> {
        Ok(self
            .tables
            .read()
            .unwrap()
            .questions
            .values()
            .cloned()
            .collect())
    }

    async fn insert_question(&self, question: &QuestionRecord) -> Result<(), StoreError> {
        let mut tables = self.tables.write().unwrap();
        insert_new(
            &mut tables.questions,
            question.text.clone(),
            question.clone(),
            "question",
        )?;
        self.record_mutation();
        Ok(())
    }

    async fn update_question(&self, question: &QuestionRecord) -> Result<(), StoreError> {
        let mut tables = self.tables.write().unwrap();
        update_existing(
            &mut tables.questions,
            question.text.clone(),
            question.clone(),
            "question",
            question.natural_key(),
        )?;
        self.record_mutation();
        Ok(())
    }

    // -- question groups ------------------------------------------------

    async fn get_question_group(
        &self,
        title: &str,
    ) -> Result<Option<QuestionGroupRow>, StoreError> {
        Ok(self
            .tables
            .read()
            .unwrap()
            .question_groups
            .get(title)
            .cloned())
    }

    async fn list_question_groups(&self) -> Result<Vec<QuestionGroupRow>, StoreError> {
        Ok(self
            .tables
            .read()
            .unwrap()
            .question_groups
            .values()
            .cloned()
            .collect())
    }

    async fn insert_question_group(&self, group: &QuestionGroupRow) -> Result<(), StoreError> {
        let mut tables = self.tables.write().unwrap();
        insert_new(
            &mut tables.question_groups,
            group.title.clone(),
            group.clone(),
            "question_group",
        )?;
        self.record_mutation();
        Ok(())
    }

    async fn update_question_group(&self, group: &QuestionGroupRow) -> Result<(), StoreError> {
        let mut tables = self.tables.write().unwrap();
        update_existing(
            &mut tables.question_groups,
            group.title.clone(),
            group.clone(),
            "question_group",
            EntityKey::single(&group.title),
        )?;
        self.record_mutation();
        Ok(())
    }

    // -- schemas --------------------------------------------------------

    async fn get_schema(&self, schema_name: &str) -> Result<Option<SchemaRecord>, StoreError> {
        Ok(self.tables.read().unwrap().schemas.get(schema_name).cloned())
    }

    async fn list_schemas(&self) -> Result<Vec<SchemaRecord>, StoreError> {
        Ok(self.tables.read().unwrap().schemas.values().cloned().collect())
    }

    async fn insert_schema(&self, schema: &SchemaRecord) -> Result<(), StoreError> {
        let mut tables = self.tables.write().unwrap();
        insert_new(
            &mut tables.schemas,
            schema.schema_name.clone(),
            schema.clone(),
            "schema",
        )?;
        self.record_mutation();
        Ok(())
    }

    async fn update_schema(&self, schema: &SchemaRecord) -> Result<(), StoreError> {
        let mut tables = self.tables.write().unwrap();
        update_existing(
            &mut tables.schemas,
            schema.schema_name.clone(),
            schema.clone(),
            "schema",
            schema.natural_key(),
        )?;
        self.record_mutation();
        Ok(())
    }

    // -- projects -------------------------------------------------------

    async fn get_project(&self, project_name: &str) -> Result<Option<ProjectRecord>, StoreError> {
        Ok(self
            .tables
            .read()
            .unwrap()
            .projects
            .get(project_name)
            .cloned())
    }

    async fn list_projects(&self) -> Result<Vec<ProjectRecord>, StoreError> {
        Ok(self.tables.read().unwrap().projects.values().cloned().collect())
    }

    async fn insert_project(&self, project: &ProjectRecord) -> Result<(), StoreError> {
        let mut tables = self.tables.write().unwrap();
        insert_new(
            &mut tables.projects,
            project.project_name.clone(),
            project.clone(),
            "project",
        )?;
        self.record_mutation();
        Ok(())
    }

    async fn update_project(&self, project: &ProjectRecord) -> Result<(), StoreError> {
        let mut tables = self.tables.write().unwrap();
        update_existing(
            &mut tables.projects,
            project.project_name.clone(),
            project.clone(),
            "project",
            project.natural_key(),
        )?;
        self.record_mutation();
        Ok(())
    }

    // -- project groups -------------------------------------------------

    async fn get_project_group(
        &self,
        name: &str,
    ) -> Result<Option<ProjectGroupRecord>, StoreError> {
        Ok(self
            .tables
            .read()
            .unwrap()
            .project_groups
            .get(name)
            .cloned())
    }

    async fn list_project_groups(&self) -> Result<Vec<ProjectGroupRecord>, StoreError> {
        Ok(self
            .tables
            .read()
            .unwrap()
            .project_groups
            .values()
            .cloned()
            .collect())
    }

    async fn insert_project_group(&self, group: &ProjectGroupRecord) -> Result<(), StoreError> {
        let mut tables = self.tables.write().unwrap();
        insert_new(
            &mut tables.project_groups,
            group.project_group_name.clone(),
            group.clone(),
            "project_group",
        )?;
        self.record_mutation();
        Ok(())
    }

    async fn update_project_group(&self, group: &ProjectGroupRecord) -> Result<(), StoreError> {
        let mut tables = self.tables.write().unwrap();
        update_existing(
            &mut tables.project_groups,
            group.project_group_name.clone(),
            group.clone(),
            "project_group",
            group.natural_key(),
        )?;
        self.record_mutation();
        Ok(())
    }

    // -- assignments ----------------------------------------------------

    async fn get_assignment(
        &self,
        user_id: &str,
        project_name: &str,
        role: AssignmentRole,
    ) -> Result<Option<AssignmentRecord>, StoreError> {
        let key = assignment_key(user_id, project_name, role);
        Ok(self.tables.read().unwrap().assignments.get(&key).cloned())
    }

    async fn list_assignments(&self) -> Result<Vec<AssignmentRecord>, StoreError> {
        Ok(self
            .tables
            .read()
            .unwrap()
            .assignments
            .values()
            .cloned()
            .collect())
    }

    async fn insert_assignment(&self, assignment: &AssignmentRecord) -> Result<(), StoreError> {
        let mut tables = self.tables.write().unwrap();
        insert_new(
            &mut tables.assignments,
            assignment_key(
                &assignment.user_name,
                &assignment.project_name,
                assignment.role,
            ),
            assignment.clone(),
            "assignment",
        )?;
        self.record_mutation();
        Ok(())
    }

    async fn update_assignment(&self, assignment: &AssignmentRecord) -> Result<(), StoreError> {
        let mut tables = self.tables.write().unwrap();
        update_existing(
            &mut tables.assignments,
            assignment_key(
                &assignment.user_name,
                &assignment.project_name,
                assignment.role,
            ),
            assignment.clone(),
            "assignment",
            assignment.natural_key(),
        )?;
        self.record_mutation();
        Ok(())
    }

    async fn remove_assignment(
        &self,
        user_id: &str,
        project_name: &str,
        role: AssignmentRole,
    ) -> Result<(), StoreError> {
        let key = assignment_key(user_id, project_name, role);
        let removed = self.tables.write().unwrap().assignments.remove(&key);
        match removed {
            Some(_) => {
                self.record_mutation();
                Ok(())
            }
            None => Err(StoreError::NotFound {
                entity: "assignment",
                key: EntityKey::composite(&[user_id, project_name, role.as_str()]),
            }),
        }
    }

    // -- annotations ----------------------------------------------------

    async fn get_annotation(
        &self,
        video_uid: &str,
        project_name: &str,
        user_id: &str,
        question_text: &str,
    ) -> Result<Option<AnnotationRow>, StoreError> {
        let key = (
            video_uid.to_string(),
            project_name.to_string(),
            user_id.to_string(),
            question_text.to_string(),
        );
        Ok(self.tables.read().unwrap().annotations.get(&key).cloned())
    }

    async fn list_annotations(&self) -> Result<Vec<AnnotationRow>, StoreError> {
        Ok(self
            .tables
            .read()
            .unwrap()
            .annotations
            .values()
            .cloned()
            .collect())
    }

    async fn insert_annotation(&self, row: &AnnotationRow) -> Result<(), StoreError> {
        let mut tables = self.tables.write().unwrap();
        insert_new(
            &mut tables.annotations,
            (
                row.video_uid.clone(),
                row.project_name.clone(),
                row.user_id.clone(),
                row.question_text.clone(),
            ),
            row.clone(),
            "annotation",
        )?;
        self.record_mutation();
        Ok(())
    }

    async fn update_annotation(&self, row: &AnnotationRow) -> Result<(), StoreError> {
        let mut tables = self.tables.write().unwrap();
        update_existing(
            &mut tables.annotations,
            (
                row.video_uid.clone(),
                row.project_name.clone(),
                row.user_id.clone(),
                row.question_text.clone(),
            ),
            row.clone(),
            "annotation",
            EntityKey::composite(&[
                &row.video_uid,
                &row.user_id,
                &row.question_text,
                &row.project_name,
            ]),
        )?;
        self.record_mutation();
        Ok(())
    }

    // -- ground truths --------------------------------------------------

    async fn get_ground_truth(
        &self,
        video_uid: &str,
        project_name: &str,
        question_text: &str,
    ) -> Result<Option<GroundTruthRow>, StoreError> {
        let key = (
            video_uid.to_string(),
            project_name.to_string(),
            question_text.to_string(),
        );
        Ok(self.tables.read().unwrap().ground_truths.get(&key).cloned())
    }

    async fn list_ground_truths(&self) -> Result<Vec<GroundTruthRow>, StoreError> {
        Ok(self
            .tables
            .read()
            .unwrap()
            .ground_truths
            .values()
            .cloned()
            .collect())
    }

    async fn insert_ground_truth(&self, row: &GroundTruthRow) -> Result<(), StoreError> {
        let mut tables = self.tables.write().unwrap();
        insert_new(
            &mut tables.ground_truths,
            (
                row.video_uid.clone(),
                row.project_name.clone(),
                row.question_text.clone(),
            ),
            row.clone(),
            "ground_truth",
        )?;
        self.record_mutation();
        Ok(())
    }

    async fn update_ground_truth(&self, row: &GroundTruthRow) -> Result<(), StoreError> {
        let mut tables = self.tables.write().unwrap();
        update_existing(
            &mut tables.ground_truths,
            (
                row.video_uid.clone(),
                row.project_name.clone(),
                row.question_text.clone(),
            ),
            row.clone(),
            "ground_truth",
            EntityKey::composite(&[&row.video_uid, &row.question_text, &row.project_name]),
        )?;
        self.record_mutation();
        Ok(())
    }
}
