//! Project pipeline adapter.
//!
//! Projects reference a schema and freeze their video membership at
//! creation. Custom display entries ride along as a nested three-way
//! reconciliation, and are dropped entirely when the schema does not opt in
//! via `has_custom_display`.

use async_trait::async_trait;

use labelpizza_core::fields::parse_batch;
use labelpizza_core::records::{reconcile_custom_displays, ProjectRecord, SchemaRecord};
use labelpizza_core::report::FieldChange;
use labelpizza_core::{CoreError, EntityKey, EntityType};
use labelpizza_db::EntityStore;

use super::{mutation_err, verification_failure};
use crate::adapter::{EntityAdapter, Planned};
use crate::error::SyncError;

/// Stored context for one project record: the project itself (if present)
/// and the referenced schema (if present).
#[derive(Clone)]
pub struct ProjectContext {
    pub existing: Option<ProjectRecord>,
    pub schema: Option<SchemaRecord>,
}

impl ProjectContext {
    fn custom_displays_enabled(&self) -> bool {
        self.schema.as_ref().is_some_and(|s| s.has_custom_display)
    }
}

pub struct ProjectAdapter;

#[async_trait]
impl EntityAdapter for ProjectAdapter {
    type Record = ProjectRecord;
    type Classified = ProjectContext;

    fn entity_type(&self) -> EntityType {
        EntityType::Project
    }

    fn parse(&self, values: &[serde_json::Value]) -> Result<Vec<ProjectRecord>, CoreError> {
        parse_batch(
            EntityType::Project,
            values,
            ProjectRecord::REQUIRED_FIELDS,
            ProjectRecord::OPTIONAL_FIELDS,
        )
    }

    fn validate(&self, record: &ProjectRecord) -> Result<(), CoreError> {
        record.validate()
    }

    fn natural_key(&self, record: &ProjectRecord) -> EntityKey {
        record.natural_key()
    }

    async fn classify(
        &self,
        store: &dyn EntityStore,
        record: &ProjectRecord,
    ) -> Result<ProjectContext, SyncError> {
        Ok(ProjectContext {
            existing: store.get_project(&record.project_name).await?,
            schema: store.get_schema(&record.schema_name).await?,
        })
    }

    fn plan(
        &self,
        classified: &ProjectContext,
        desired: &ProjectRecord,
    ) -> Result<Planned, CoreError> {
        let existing = match &classified.existing {
            None => return Ok(Planned::Create),
            Some(existing) => existing,
        };

        let mut changes = ProjectRecord::plan_update(existing, desired)?;

        if classified.custom_displays_enabled() {
            let plan = reconcile_custom_displays(
                existing.custom_displays.as_deref().unwrap_or(&[]),
                desired.custom_displays.as_deref().unwrap_or(&[]),
            );
            if !plan.is_noop() {
                changes.push(FieldChange::new(
                    "custom_displays",
                    serde_json::json!(existing.custom_displays),
                    plan.summary(),
                ));
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
        desired: &ProjectRecord,
        classified: &ProjectContext,
        planned: &Planned,
    ) -> Result<(), SyncError> {
        let schema = match &classified.schema {
            None => {
                return Err(verification_failure(format!(
                    "project '{}': schema '{}' does not exist",
                    desired.project_name, desired.schema_name
                )))
            }
            Some(schema) => schema,
        };
        if matches!(planned, Planned::Create) && schema.is_archived {
            return Err(verification_failure(format!(
                "project '{}': schema '{}' is archived",
                desired.project_name, desired.schema_name
            )));
        }
        for uid in &desired.videos {
            if store.get_video(uid).await?.is_none() {
                return Err(verification_failure(format!(
                    "project '{}': video '{uid}' does not exist",
                    desired.project_name
                )));
            }
        }
        Ok(())
    }

    async fn apply(
        &self,
        store: &dyn EntityStore,
        desired: &ProjectRecord,
        classified: &ProjectContext,
        planned: &Planned,
    ) -> Result<(), SyncError> {
        let err = || mutation_err(EntityType::Project, desired.natural_key());

        // Custom displays only persist when the schema opts in.
        let mut record = desired.clone();
        if !classified.custom_displays_enabled() {
            record.custom_displays = None;
        }

        match planned {
            Planned::Create => store.insert_project(&record).await.map_err(err()),
            Planned::Update { .. } => store.update_project(&record).await.map_err(err()),
            Planned::Remove | Planned::Skip { .. } => Ok(()),
        }
    }
}
