//! Ground-truth pipeline adapter.
//!
//! Same answer shape as annotations but user-independent: one authoritative
//! row per (video, project, question). The submitting user must be an admin
//! or a reviewer on the project, and rows last written by an admin are
//! locked against non-admin overwrites.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;

use labelpizza_core::fields::parse_batch;
use labelpizza_core::records::{AssignmentRole, GroundTruthRecord, UserRecord, UserType};
use labelpizza_core::{CoreError, EntityKey, EntityType};
use labelpizza_db::{EntityStore, GroundTruthRow};

use super::annotation::verify_answer_refs;
use super::{mutation_err, verification_failure};
use crate::adapter::{EntityAdapter, Planned};
use crate::error::SyncError;

/// Stored context for one ground-truth record: the per-question rows and
/// the submitting user's account (when it exists).
#[derive(Clone, Default)]
pub struct StoredGroundTruth {
    pub rows: BTreeMap<String, GroundTruthRow>,
    pub submitter: Option<UserRecord>,
}

impl StoredGroundTruth {
    fn submitter_is_admin(&self) -> bool {
        self.submitter
            .as_ref()
            .is_some_and(|u| u.user_type == UserType::Admin)
    }
}

pub struct GroundTruthAdapter;

#[async_trait]
impl EntityAdapter for GroundTruthAdapter {
    type Record = GroundTruthRecord;
    type Classified = StoredGroundTruth;

    fn entity_type(&self) -> EntityType {
        EntityType::GroundTruth
    }

    fn parse(&self, values: &[serde_json::Value]) -> Result<Vec<GroundTruthRecord>, CoreError> {
        parse_batch(
            EntityType::GroundTruth,
            values,
            GroundTruthRecord::REQUIRED_FIELDS,
            GroundTruthRecord::OPTIONAL_FIELDS,
        )
    }

    fn validate(&self, record: &GroundTruthRecord) -> Result<(), CoreError> {
        record.validate()
    }

    fn natural_key(&self, record: &GroundTruthRecord) -> EntityKey {
        record.natural_key()
    }

    /// User-independent keys: two reviewers answering the same question in
    /// one batch collide here.
    fn duplicate_keys(&self, record: &GroundTruthRecord) -> Vec<EntityKey> {
        record.answer_keys()
    }

    async fn classify(
        &self,
        store: &dyn EntityStore,
        record: &GroundTruthRecord,
    ) -> Result<StoredGroundTruth, SyncError> {
        let mut rows = BTreeMap::new();
        for question in record.answers.keys() {
            if let Some(row) = store
                .get_ground_truth(&record.video_uid, &record.project_name, question)
                .await?
            {
                rows.insert(question.clone(), row);
            }
        }
        let submitter = store.get_user(&record.user_name).await?;
        Ok(StoredGroundTruth { rows, submitter })
    }

    fn plan(
        &self,
        classified: &StoredGroundTruth,
        desired: &GroundTruthRecord,
    ) -> Result<Planned, CoreError> {
        if classified.rows.is_empty() {
            return Ok(Planned::Create);
        }
        let existing = stored_as_record(desired, &classified.rows);
        let changes = GroundTruthRecord::plan_update(&existing, desired);
        if changes.is_empty() {
            Ok(Planned::skip("no changes"))
        } else {
            Ok(Planned::Update { changes })
        }
    }

    async fn verify(
        &self,
        store: &dyn EntityStore,
        desired: &GroundTruthRecord,
        classified: &StoredGroundTruth,
        _planned: &Planned,
    ) -> Result<(), SyncError> {
        let submitter = match &classified.submitter {
            None => {
                return Err(verification_failure(format!(
                    "ground truth {}: submitting user '{}' does not exist",
                    desired.natural_key(),
                    desired.user_name
                )))
            }
            Some(user) => user,
        };

        if submitter.user_type != UserType::Admin {
            let reviewer = store
                .get_assignment(
                    &desired.user_name,
                    &desired.project_name,
                    AssignmentRole::Reviewer,
                )
                .await?;
            if reviewer.is_none() {
                return Err(verification_failure(format!(
                    "ground truth {}: user '{}' is neither an admin nor a reviewer \
                     on project '{}'",
                    desired.natural_key(),
                    desired.user_name,
                    desired.project_name
                )));
            }
        }

        // Admin lock: a changed row last written by an admin only yields to
        // another admin.
        if !classified.submitter_is_admin() {
            let existing = stored_as_record(desired, &classified.rows);
            for question in GroundTruthRecord::changed_questions(&existing, desired) {
                if let Some(row) = classified.rows.get(&question) {
                    if let (Some(admin), Some(at)) = (&row.admin_user_id, row.admin_modified_at) {
                        return Err(verification_failure(format!(
                            "ground truth {}: answer for '{question}' was set by admin \
                             '{admin}' at {at} and cannot be overridden by '{}'",
                            desired.natural_key(),
                            desired.user_name
                        )));
                    }
                }
            }
        }

        verify_answer_refs(
            store,
            "ground truth",
            &desired.natural_key(),
            &desired.project_name,
            &desired.video_uid,
            &desired.question_group_title,
            &desired.answers,
        )
        .await
    }

    async fn apply(
        &self,
        store: &dyn EntityStore,
        desired: &GroundTruthRecord,
        classified: &StoredGroundTruth,
        planned: &Planned,
    ) -> Result<(), SyncError> {
        if matches!(planned, Planned::Remove | Planned::Skip { .. }) {
            return Ok(());
        }
        let is_admin = classified.submitter_is_admin();
        for (question, answer) in &desired.answers {
            let row = GroundTruthRow {
                video_uid: desired.video_uid.clone(),
                project_name: desired.project_name.clone(),
                question_text: question.clone(),
                answer: answer.clone(),
                confidence: desired
                    .confidence_scores
                    .as_ref()
                    .and_then(|m| m.get(question).copied()),
                note: desired.notes.as_ref().and_then(|m| m.get(question).cloned()),
                submitted_by: desired.user_name.clone(),
                admin_user_id: is_admin.then(|| desired.user_name.clone()),
                admin_modified_at: is_admin.then(Utc::now),
            };
            let err = || mutation_err(EntityType::GroundTruth, desired.natural_key());
            match classified.rows.get(question) {
                None => store.insert_ground_truth(&row).await.map_err(err())?,
                Some(stored) if row_changed(stored, &row) => {
                    store.update_ground_truth(&row).await.map_err(err())?
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

/// Whether a stored row's answer content differs from the incoming one.
/// Admin metadata is write-side bookkeeping, not content.
fn row_changed(stored: &GroundTruthRow, incoming: &GroundTruthRow) -> bool {
    stored.answer != incoming.answer
        || stored.confidence != incoming.confidence
        || stored.note != incoming.note
}

fn stored_as_record(
    desired: &GroundTruthRecord,
    rows: &BTreeMap<String, GroundTruthRow>,
) -> GroundTruthRecord {
    let mut answers = BTreeMap::new();
    let mut confidence = BTreeMap::new();
    let mut notes = BTreeMap::new();
    for (question, row) in rows {
        answers.insert(question.clone(), row.answer.clone());
        if let Some(c) = row.confidence {
            confidence.insert(question.clone(), c);
        }
        if let Some(n) = &row.note {
            notes.insert(question.clone(), n.clone());
        }
    }
    GroundTruthRecord {
        question_group_title: desired.question_group_title.clone(),
        project_name: desired.project_name.clone(),
        user_name: desired.user_name.clone(),
        video_uid: desired.video_uid.clone(),
        answers,
        confidence_scores: (!confidence.is_empty()).then_some(confidence),
        notes: (!notes.is_empty()).then_some(notes),
        is_ground_truth: true,
    }
}
