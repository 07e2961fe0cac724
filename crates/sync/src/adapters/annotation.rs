//! Annotation pipeline adapter.
//!
//! Input records carry one question group's answers; storage is one row per
//! (video, project, user, question). Classification loads the per-question
//! rows and planning diffs answer by answer.

use std::collections::BTreeMap;

use async_trait::async_trait;

use labelpizza_core::fields::parse_batch;
use labelpizza_core::records::{AnnotationRecord, QuestionType};
use labelpizza_core::report::truncated_list;
use labelpizza_core::{CoreError, EntityKey, EntityType};
use labelpizza_db::{AnnotationRow, EntityStore};

use super::{mutation_err, verification_failure};
use crate::adapter::{EntityAdapter, Planned};
use crate::error::SyncError;

/// Stored per-question rows for one annotation record, keyed by question
/// text.
#[derive(Clone, Default)]
pub struct StoredAnswers {
    pub rows: BTreeMap<String, AnnotationRow>,
}

pub struct AnnotationAdapter;

#[async_trait]
impl EntityAdapter for AnnotationAdapter {
    type Record = AnnotationRecord;
    type Classified = StoredAnswers;

    fn entity_type(&self) -> EntityType {
        EntityType::Annotation
    }

    fn parse(&self, values: &[serde_json::Value]) -> Result<Vec<AnnotationRecord>, CoreError> {
        parse_batch(
            EntityType::Annotation,
            values,
            AnnotationRecord::REQUIRED_FIELDS,
            AnnotationRecord::OPTIONAL_FIELDS,
        )
    }

    fn validate(&self, record: &AnnotationRecord) -> Result<(), CoreError> {
        record.validate()
    }

    fn natural_key(&self, record: &AnnotationRecord) -> EntityKey {
        record.natural_key()
    }

    fn duplicate_keys(&self, record: &AnnotationRecord) -> Vec<EntityKey> {
        record.answer_keys()
    }

    async fn classify(
        &self,
        store: &dyn EntityStore,
        record: &AnnotationRecord,
    ) -> Result<StoredAnswers, SyncError> {
        let mut rows = BTreeMap::new();
        for question in record.answers.keys() {
            if let Some(row) = store
                .get_annotation(
                    &record.video_uid,
                    &record.project_name,
                    &record.user_name,
                    question,
                )
                .await?
            {
                rows.insert(question.clone(), row);
            }
        }
        Ok(StoredAnswers { rows })
    }

    fn plan(
        &self,
        classified: &StoredAnswers,
        desired: &AnnotationRecord,
    ) -> Result<Planned, CoreError> {
        if classified.rows.is_empty() {
            return Ok(Planned::Create);
        }
        let existing = stored_as_record(desired, &classified.rows);
        let changes = AnnotationRecord::plan_update(&existing, desired);
        if changes.is_empty() {
            Ok(Planned::skip("no changes"))
        } else {
            Ok(Planned::Update { changes })
        }
    }

    async fn verify(
        &self,
        store: &dyn EntityStore,
        desired: &AnnotationRecord,
        _classified: &StoredAnswers,
        _planned: &Planned,
    ) -> Result<(), SyncError> {
        if store.get_user(&desired.user_name).await?.is_none() {
            return Err(verification_failure(format!(
                "annotation {}: user '{}' does not exist",
                desired.natural_key(),
                desired.user_name
            )));
        }
        verify_answer_refs(
            store,
            "annotation",
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
        desired: &AnnotationRecord,
        classified: &StoredAnswers,
        planned: &Planned,
    ) -> Result<(), SyncError> {
        if matches!(planned, Planned::Remove | Planned::Skip { .. }) {
            return Ok(());
        }
        for (question, answer) in &desired.answers {
            let row = AnnotationRow {
                video_uid: desired.video_uid.clone(),
                project_name: desired.project_name.clone(),
                user_id: desired.user_name.clone(),
                question_text: question.clone(),
                answer: answer.clone(),
                confidence: desired
                    .confidence_scores
                    .as_ref()
                    .and_then(|m| m.get(question).copied()),
                note: desired.notes.as_ref().and_then(|m| m.get(question).cloned()),
            };
            let err = || mutation_err(EntityType::Annotation, desired.natural_key());
            match classified.rows.get(question) {
                None => store.insert_annotation(&row).await.map_err(err())?,
                Some(stored) if *stored != row => {
                    store.update_annotation(&row).await.map_err(err())?
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

/// Reassemble the stored rows into record shape for diffing.
fn stored_as_record(
    desired: &AnnotationRecord,
    rows: &BTreeMap<String, AnnotationRow>,
) -> AnnotationRecord {
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
    AnnotationRecord {
        question_group_title: desired.question_group_title.clone(),
        project_name: desired.project_name.clone(),
        user_name: desired.user_name.clone(),
        video_uid: desired.video_uid.clone(),
        answers,
        confidence_scores: (!confidence.is_empty()).then_some(confidence),
        notes: (!notes.is_empty()).then_some(notes),
        is_ground_truth: false,
    }
}

/// Referential checks shared by the annotation and ground-truth pipelines:
/// the project exists and contains the video, the question group belongs to
/// the project's schema, and the answers cover exactly the group's
/// questions with valid option values.
pub(super) async fn verify_answer_refs(
    store: &dyn EntityStore,
    what: &str,
    key: &EntityKey,
    project_name: &str,
    video_uid: &str,
    question_group_title: &str,
    answers: &BTreeMap<String, String>,
) -> Result<(), SyncError> {
    let project = match store.get_project(project_name).await? {
        None => {
            return Err(verification_failure(format!(
                "{what} {key}: project '{project_name}' does not exist"
            )))
        }
        Some(project) => project,
    };
    if !project.videos.iter().any(|v| v == video_uid) {
        return Err(verification_failure(format!(
            "{what} {key}: video '{video_uid}' is not a member of project '{project_name}'"
        )));
    }

    let group = match store.get_question_group(question_group_title).await? {
        None => {
            return Err(verification_failure(format!(
                "{what} {key}: question group '{question_group_title}' does not exist"
            )))
        }
        Some(group) => group,
    };
    let schema_has_group = store
        .get_schema(&project.schema_name)
        .await?
        .map(|s| s.question_group_names.contains(&group.title))
        .unwrap_or(false);
    if !schema_has_group {
        return Err(verification_failure(format!(
            "{what} {key}: question group '{question_group_title}' is not part of \
             project '{project_name}''s schema '{}'",
            project.schema_name
        )));
    }

    let missing: Vec<String> = group
        .question_texts
        .iter()
        .filter(|q| !answers.contains_key(*q))
        .cloned()
        .collect();
    let extra: Vec<String> = answers
        .keys()
        .filter(|q| !group.question_texts.contains(*q))
        .cloned()
        .collect();
    if !missing.is_empty() || !extra.is_empty() {
        let mut parts = Vec::new();
        if !missing.is_empty() {
            parts.push(format!("unanswered: {}", truncated_list(&missing)));
        }
        if !extra.is_empty() {
            parts.push(format!("not in group: {}", truncated_list(&extra)));
        }
        return Err(verification_failure(format!(
            "{what} {key}: answers must cover exactly the questions of group \
             '{question_group_title}' ({})",
            parts.join("; ")
        )));
    }

    for (question_text, answer) in answers {
        let question = match store.get_question(question_text).await? {
            None => {
                return Err(verification_failure(format!(
                    "{what} {key}: question '{question_text}' does not exist"
                )))
            }
            Some(question) => question,
        };
        if question.qtype == QuestionType::Single && !question.options.contains(answer) {
            return Err(verification_failure(format!(
                "{what} {key}: answer '{answer}' is not an option of question '{question_text}'"
            )));
        }
    }
    Ok(())
}
