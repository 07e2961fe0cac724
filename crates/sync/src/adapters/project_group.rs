//! Project-group pipeline adapter.

use async_trait::async_trait;

use labelpizza_core::fields::parse_batch;
use labelpizza_core::records::ProjectGroupRecord;
use labelpizza_core::{CoreError, EntityKey, EntityType};
use labelpizza_db::EntityStore;

use super::{mutation_err, verification_failure};
use crate::adapter::{EntityAdapter, Planned};
use crate::error::SyncError;

pub struct ProjectGroupAdapter;

#[async_trait]
impl EntityAdapter for ProjectGroupAdapter {
    type Record = ProjectGroupRecord;
    type Classified = Option<ProjectGroupRecord>;

    fn entity_type(&self) -> EntityType {
        EntityType::ProjectGroup
    }

    fn parse(&self, values: &[serde_json::Value]) -> Result<Vec<ProjectGroupRecord>, CoreError> {
        parse_batch(
            EntityType::ProjectGroup,
            values,
            ProjectGroupRecord::REQUIRED_FIELDS,
            ProjectGroupRecord::OPTIONAL_FIELDS,
        )
    }

    fn validate(&self, record: &ProjectGroupRecord) -> Result<(), CoreError> {
        record.validate()
    }

    fn natural_key(&self, record: &ProjectGroupRecord) -> EntityKey {
        record.natural_key()
    }

    async fn classify(
        &self,
        store: &dyn EntityStore,
        record: &ProjectGroupRecord,
    ) -> Result<Option<ProjectGroupRecord>, SyncError> {
        Ok(store.get_project_group(&record.project_group_name).await?)
    }

    fn plan(
        &self,
        classified: &Option<ProjectGroupRecord>,
        desired: &ProjectGroupRecord,
    ) -> Result<Planned, CoreError> {
        match classified {
            None => Ok(Planned::Create),
            Some(existing) => {
                let changes = ProjectGroupRecord::plan_update(existing, desired);
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
        desired: &ProjectGroupRecord,
        _classified: &Option<ProjectGroupRecord>,
        _planned: &Planned,
    ) -> Result<(), SyncError> {
        for name in &desired.projects {
            if store.get_project(name).await?.is_none() {
                return Err(verification_failure(format!(
                    "project group '{}': project '{name}' does not exist",
                    desired.project_group_name
                )));
            }
        }
        Ok(())
    }

    async fn apply(
        &self,
        store: &dyn EntityStore,
        desired: &ProjectGroupRecord,
        _classified: &Option<ProjectGroupRecord>,
        planned: &Planned,
    ) -> Result<(), SyncError> {
        let err = || mutation_err(EntityType::ProjectGroup, desired.natural_key());
        match planned {
            Planned::Create => store.insert_project_group(desired).await.map_err(err()),
            Planned::Update { .. } => store.update_project_group(desired).await.map_err(err()),
            Planned::Remove | Planned::Skip { .. } => Ok(()),
        }
    }
}
