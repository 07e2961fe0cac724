//! Assignment pipeline adapter.
//!
//! The one pipeline that plans `Remove`: `is_active = false` deletes the
//! membership row, and deactivating a row that does not exist is a skip,
//! not an error.

use async_trait::async_trait;

use labelpizza_core::fields::parse_batch;
use labelpizza_core::records::AssignmentRecord;
use labelpizza_core::{CoreError, EntityKey, EntityType};
use labelpizza_db::EntityStore;

use super::{mutation_err, verification_failure};
use crate::adapter::{EntityAdapter, Planned};
use crate::error::SyncError;

pub struct AssignmentAdapter;

#[async_trait]
impl EntityAdapter for AssignmentAdapter {
    type Record = AssignmentRecord;
    type Classified = Option<AssignmentRecord>;

    fn entity_type(&self) -> EntityType {
        EntityType::Assignment
    }

    fn parse(&self, values: &[serde_json::Value]) -> Result<Vec<AssignmentRecord>, CoreError> {
        parse_batch(
            EntityType::Assignment,
            values,
            AssignmentRecord::REQUIRED_FIELDS,
            AssignmentRecord::OPTIONAL_FIELDS,
        )
    }

    fn validate(&self, record: &AssignmentRecord) -> Result<(), CoreError> {
        record.validate()
    }

    fn natural_key(&self, record: &AssignmentRecord) -> EntityKey {
        record.natural_key()
    }

    async fn classify(
        &self,
        store: &dyn EntityStore,
        record: &AssignmentRecord,
    ) -> Result<Option<AssignmentRecord>, SyncError> {
        Ok(store
            .get_assignment(&record.user_name, &record.project_name, record.role)
            .await?)
    }

    fn plan(
        &self,
        classified: &Option<AssignmentRecord>,
        desired: &AssignmentRecord,
    ) -> Result<Planned, CoreError> {
        if !desired.is_active {
            return Ok(match classified {
                Some(_) => Planned::Remove,
                None => Planned::skip("not assigned"),
            });
        }
        match classified {
            None => Ok(Planned::Create),
            Some(existing) => {
                let changes = AssignmentRecord::plan_update(existing, desired);
                if changes.is_empty() {
                    Ok(Planned::skip("no changes"))
                } else {
                    Ok(Planned::Update { changes })
                }
            }
        }
    }

    async fn verify(
        &self,
        store: &dyn EntityStore,
        desired: &AssignmentRecord,
        _classified: &Option<AssignmentRecord>,
        planned: &Planned,
    ) -> Result<(), SyncError> {
        // Removal must stay possible even after the user or project was
        // archived.
        if matches!(planned, Planned::Remove | Planned::Skip { .. }) {
            return Ok(());
        }

        match store.get_user(&desired.user_name).await? {
            None => {
                return Err(verification_failure(format!(
                    "assignment {}: user '{}' does not exist",
                    desired.natural_key(),
                    desired.user_name
                )))
            }
            Some(user) if user.is_archived => {
                return Err(verification_failure(format!(
                    "assignment {}: user '{}' is archived",
                    desired.natural_key(),
                    desired.user_name
                )))
            }
            Some(_) => {}
        }
        match store.get_project(&desired.project_name).await? {
            None => Err(verification_failure(format!(
                "assignment {}: project '{}' does not exist",
                desired.natural_key(),
                desired.project_name
            ))),
            Some(project) if project.is_archived => Err(verification_failure(format!(
                "assignment {}: project '{}' is archived",
                desired.natural_key(),
                desired.project_name
            ))),
            Some(_) => Ok(()),
        }
    }

    async fn apply(
        &self,
        store: &dyn EntityStore,
        desired: &AssignmentRecord,
        _classified: &Option<AssignmentRecord>,
        planned: &Planned,
    ) -> Result<(), SyncError> {
        let err = || mutation_err(EntityType::Assignment, desired.natural_key());
        match planned {
            Planned::Create => store.insert_assignment(desired).await.map_err(err()),
            Planned::Update { .. } => store.update_assignment(desired).await.map_err(err()),
            Planned::Remove => store
                .remove_assignment(&desired.user_name, &desired.project_name, desired.role)
                .await
                .map_err(err()),
            Planned::Skip { .. } => Ok(()),
        }
    }
}
