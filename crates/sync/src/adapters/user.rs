//! User pipeline adapter.

use std::collections::HashMap;

use async_trait::async_trait;

use labelpizza_core::fields::parse_batch;
use labelpizza_core::records::UserRecord;
use labelpizza_core::report::truncated_list;
use labelpizza_core::{CoreError, EntityKey, EntityType};
use labelpizza_db::EntityStore;

use super::{mutation_err, verification_failure};
use crate::adapter::{EntityAdapter, Planned};
use crate::error::SyncError;

pub struct UserAdapter;

#[async_trait]
impl EntityAdapter for UserAdapter {
    type Record = UserRecord;
    type Classified = Option<UserRecord>;

    fn entity_type(&self) -> EntityType {
        EntityType::User
    }

    fn parse(&self, values: &[serde_json::Value]) -> Result<Vec<UserRecord>, CoreError> {
        parse_batch(
            EntityType::User,
            values,
            UserRecord::REQUIRED_FIELDS,
            UserRecord::OPTIONAL_FIELDS,
        )
    }

    fn validate(&self, record: &UserRecord) -> Result<(), CoreError> {
        record.validate()
    }

    fn validate_batch(&self, records: &[UserRecord]) -> Result<(), CoreError> {
        let mut by_email: HashMap<&str, usize> = HashMap::new();
        let mut duplicated: Vec<String> = Vec::new();
        for record in records {
            if let Some(email) = record.email.as_deref() {
                let count = by_email.entry(email).or_insert(0);
                *count += 1;
                if *count == 2 {
                    duplicated.push(email.to_string());
                }
            }
        }
        if duplicated.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Validation(format!(
                "user batch reuses emails: {}",
                truncated_list(&duplicated)
            )))
        }
    }

    fn natural_key(&self, record: &UserRecord) -> EntityKey {
        record.natural_key()
    }

    async fn classify(
        &self,
        store: &dyn EntityStore,
        record: &UserRecord,
    ) -> Result<Option<UserRecord>, SyncError> {
        Ok(store.get_user(&record.user_id).await?)
    }

    fn plan(
        &self,
        classified: &Option<UserRecord>,
        desired: &UserRecord,
    ) -> Result<Planned, CoreError> {
        match classified {
            None => Ok(Planned::Create),
            Some(existing) => {
                let changes = UserRecord::plan_update(existing, desired);
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
        desired: &UserRecord,
        _classified: &Option<UserRecord>,
        _planned: &Planned,
    ) -> Result<(), SyncError> {
        if let Some(email) = desired.email.as_deref() {
            if let Some(other) = store.get_user_by_email(email).await? {
                if other.user_id != desired.user_id {
                    return Err(verification_failure(format!(
                        "user '{}': email '{email}' is already used by user '{}'",
                        desired.user_id, other.user_id
                    )));
                }
            }
        }
        Ok(())
    }

    async fn apply(
        &self,
        store: &dyn EntityStore,
        desired: &UserRecord,
        _classified: &Option<UserRecord>,
        planned: &Planned,
    ) -> Result<(), SyncError> {
        let err = || mutation_err(EntityType::User, desired.natural_key());
        match planned {
            Planned::Create => store.insert_user(desired).await.map_err(err()),
            Planned::Update { .. } => store.update_user(desired).await.map_err(err()),
            Planned::Remove | Planned::Skip { .. } => Ok(()),
        }
    }
}
