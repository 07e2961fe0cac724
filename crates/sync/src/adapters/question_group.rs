//! Question-group pipeline adapter.
//!
//! Groups carry their questions, so this pipeline syncs both: the group row
//! plus each member question (created when missing, updated under the
//! constrained-edit rules when present). Questions are global and may be
//! shared by reusable groups, so question edits are verified against the
//! store, not just against this group's copy.

use async_trait::async_trait;

use labelpizza_core::fields::parse_batch;
use labelpizza_core::records::{QuestionGroupRecord, QuestionRecord};
use labelpizza_core::report::FieldChange;
use labelpizza_core::{CoreError, EntityKey, EntityType};
use labelpizza_db::{EntityStore, QuestionGroupRow, StoreError};

use super::{mutation_err, verification_failure};
use crate::adapter::{EntityAdapter, Planned};
use crate::error::SyncError;

/// Stored group context: the row plus its member questions in stored order.
#[derive(Clone)]
pub struct StoredGroup {
    pub row: QuestionGroupRow,
    pub questions: Vec<QuestionRecord>,
}

impl StoredGroup {
    fn into_record(self) -> QuestionGroupRecord {
        self.row.into_record(self.questions)
    }
}

pub struct QuestionGroupAdapter;

#[async_trait]
impl EntityAdapter for QuestionGroupAdapter {
    type Record = QuestionGroupRecord;
    type Classified = Option<StoredGroup>;

    fn entity_type(&self) -> EntityType {
        EntityType::QuestionGroup
    }

    fn parse(&self, values: &[serde_json::Value]) -> Result<Vec<QuestionGroupRecord>, CoreError> {
        parse_batch(
            EntityType::QuestionGroup,
            values,
            QuestionGroupRecord::REQUIRED_FIELDS,
            QuestionGroupRecord::OPTIONAL_FIELDS,
        )
    }

    fn validate(&self, record: &QuestionGroupRecord) -> Result<(), CoreError> {
        record.validate()
    }

    fn natural_key(&self, record: &QuestionGroupRecord) -> EntityKey {
        record.natural_key()
    }

    async fn classify(
        &self,
        store: &dyn EntityStore,
        record: &QuestionGroupRecord,
    ) -> Result<Option<StoredGroup>, SyncError> {
        let row = match store.get_question_group(&record.title).await? {
            Some(row) => row,
            None => return Ok(None),
        };
        let mut questions = Vec::with_capacity(row.question_texts.len());
        for text in &row.question_texts {
            match store.get_question(text).await? {
                Some(question) => questions.push(question),
                // A group referencing a missing question is store
                // corruption, not a plannable state.
                None => {
                    return Err(SyncError::Store(StoreError::NotFound {
                        entity: "question",
                        key: EntityKey::single(text),
                    }))
                }
            }
        }
        Ok(Some(StoredGroup { row, questions }))
    }

    fn plan(
        &self,
        classified: &Option<StoredGroup>,
        desired: &QuestionGroupRecord,
    ) -> Result<Planned, CoreError> {
        let stored = match classified {
            None => return Ok(Planned::Create),
            Some(stored) => stored.clone().into_record(),
        };

        // Group-level diff first: it rejects member-set changes outright.
        let mut changes = QuestionGroupRecord::plan_update(&stored, desired)?;

        // Then per-question constrained edits. The sets match, so every
        // desired question has a stored counterpart.
        for desired_q in &desired.questions {
            if let Some(stored_q) = stored.questions.iter().find(|q| q.text == desired_q.text) {
                for change in QuestionRecord::plan_update(stored_q, desired_q)? {
                    changes.push(FieldChange {
                        field: format!("question[{}].{}", desired_q.text, change.field),
                        from: change.from,
                        to: change.to,
                    });
                }
            }
        }

        if changes.is_empty() {
            Ok(Planned::skip("no changes"))
        } else {
            Ok(Planned::Update { changes })
        }
    }

    async fn verify(
        &self,
        store: &dyn EntityStore,
        desired: &QuestionGroupRecord,
        _classified: &Option<StoredGroup>,
        _planned: &Planned,
    ) -> Result<(), SyncError> {
        // Questions are shared across groups; a question that already exists
        // globally may only change within the constrained-edit rules, even
        // when this particular group is new.
        for desired_q in &desired.questions {
            if let Some(stored_q) = store.get_question(&desired_q.text).await? {
                QuestionRecord::plan_update(&stored_q, desired_q).map_err(|e| {
                    verification_failure(format!("question group '{}': {e}", desired.title))
                })?;
            }
        }
        Ok(())
    }

    async fn apply(
        &self,
        store: &dyn EntityStore,
        desired: &QuestionGroupRecord,
        _classified: &Option<StoredGroup>,
        planned: &Planned,
    ) -> Result<(), SyncError> {
        let err = || mutation_err(EntityType::QuestionGroup, desired.natural_key());
        match planned {
            Planned::Create => {
                sync_member_questions(store, desired).await?;
                store
                    .insert_question_group(&QuestionGroupRow::from_record(desired))
                    .await
                    .map_err(err())
            }
            Planned::Update { .. } => {
                sync_member_questions(store, desired).await?;
                store
                    .update_question_group(&QuestionGroupRow::from_record(desired))
                    .await
                    .map_err(err())
            }
            Planned::Remove | Planned::Skip { .. } => Ok(()),
        }
    }
}

/// Create missing member questions and apply constrained edits to existing
/// ones.
async fn sync_member_questions(
    store: &dyn EntityStore,
    group: &QuestionGroupRecord,
) -> Result<(), SyncError> {
    for desired_q in &group.questions {
        match store.get_question(&desired_q.text).await? {
            None => store
                .insert_question(desired_q)
                .await
                .map_err(mutation_err(EntityType::QuestionGroup, desired_q.natural_key()))?,
            Some(stored_q) => {
                // Re-planned here because another group in the same batch
                // may have already written this shared question.
                let changes = QuestionRecord::plan_update(&stored_q, desired_q)
                    .map_err(SyncError::Validation)?;
                if !changes.is_empty() {
                    store
                        .update_question(desired_q)
                        .await
                        .map_err(mutation_err(
                            EntityType::QuestionGroup,
                            desired_q.natural_key(),
                        ))?;
                }
            }
        }
    }
    Ok(())
}
