//! Schema pipeline adapter.

use async_trait::async_trait;

use labelpizza_core::fields::parse_batch;
use labelpizza_core::records::SchemaRecord;
use labelpizza_core::{CoreError, EntityKey, EntityType};
use labelpizza_db::EntityStore;

use super::{mutation_err, verification_failure};
use crate::adapter::{EntityAdapter, Planned};
use crate::error::SyncError;

pub struct SchemaAdapter;

#[async_trait]
impl EntityAdapter for SchemaAdapter {
    type Record = SchemaRecord;
    type Classified = Option<SchemaRecord>;

    fn entity_type(&self) -> EntityType {
        EntityType::Schema
    }

    fn parse(&self, values: &[serde_json::Value]) -> Result<Vec<SchemaRecord>, CoreError> {
        parse_batch(
            EntityType::Schema,
            values,
            SchemaRecord::REQUIRED_FIELDS,
            SchemaRecord::OPTIONAL_FIELDS,
        )
    }

    fn validate(&self, record: &SchemaRecord) -> Result<(), CoreError> {
        record.validate()
    }

    fn natural_key(&self, record: &SchemaRecord) -> EntityKey {
        record.natural_key()
    }

    async fn classify(
        &self,
        store: &dyn EntityStore,
        record: &SchemaRecord,
    ) -> Result<Option<SchemaRecord>, SyncError> {
        Ok(store.get_schema(&record.schema_name).await?)
    }

    fn plan(
        &self,
        classified: &Option<SchemaRecord>,
        desired: &SchemaRecord,
    ) -> Result<Planned, CoreError> {
        match classified {
            None => Ok(Planned::Create),
            Some(existing) => {
                let changes = SchemaRecord::plan_update(existing, desired)?;
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
        desired: &SchemaRecord,
        _classified: &Option<SchemaRecord>,
        _planned: &Planned,
    ) -> Result<(), SyncError> {
        for title in &desired.question_group_names {
            if store.get_question_group(title).await?.is_none() {
                return Err(verification_failure(format!(
                    "schema '{}': question group '{title}' does not exist",
                    desired.schema_name
                )));
            }
        }
        Ok(())
    }

    async fn apply(
        &self,
        store: &dyn EntityStore,
        desired: &SchemaRecord,
        _classified: &Option<SchemaRecord>,
        planned: &Planned,
    ) -> Result<(), SyncError> {
        let err = || mutation_err(EntityType::Schema, desired.natural_key());
        match planned {
            Planned::Create => store.insert_schema(desired).await.map_err(err()),
            Planned::Update { .. } => store.update_schema(desired).await.map_err(err()),
            Planned::Remove | Planned::Skip { .. } => Ok(()),
        }
    }
}
