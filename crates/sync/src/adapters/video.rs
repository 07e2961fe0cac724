//! Video pipeline adapter.

use std::collections::HashMap;

use async_trait::async_trait;

use labelpizza_core::fields::parse_batch;
use labelpizza_core::records::VideoRecord;
use labelpizza_core::report::truncated_list;
use labelpizza_core::{CoreError, EntityKey, EntityType};
use labelpizza_db::EntityStore;

use super::{mutation_err, verification_failure};
use crate::adapter::{EntityAdapter, Planned};
use crate::error::SyncError;

pub struct VideoAdapter;

#[async_trait]
impl EntityAdapter for VideoAdapter {
    type Record = VideoRecord;
    type Classified = Option<VideoRecord>;

    fn entity_type(&self) -> EntityType {
        EntityType::Video
    }

    fn parse(&self, values: &[serde_json::Value]) -> Result<Vec<VideoRecord>, CoreError> {
        parse_batch(
            EntityType::Video,
            values,
            VideoRecord::REQUIRED_FIELDS,
            VideoRecord::OPTIONAL_FIELDS,
        )
    }

    fn validate(&self, record: &VideoRecord) -> Result<(), CoreError> {
        record.validate()
    }

    fn validate_batch(&self, records: &[VideoRecord]) -> Result<(), CoreError> {
        let mut by_url: HashMap<&str, usize> = HashMap::new();
        let mut duplicated: Vec<String> = Vec::new();
        for record in records {
            let count = by_url.entry(record.url.as_str()).or_insert(0);
            *count += 1;
            if *count == 2 {
                duplicated.push(record.url.clone());
            }
        }
        if duplicated.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Validation(format!(
                "video batch reuses urls: {}",
                truncated_list(&duplicated)
            )))
        }
    }

    fn natural_key(&self, record: &VideoRecord) -> EntityKey {
        record.natural_key()
    }

    async fn classify(
        &self,
        store: &dyn EntityStore,
        record: &VideoRecord,
    ) -> Result<Option<VideoRecord>, SyncError> {
        Ok(store.get_video(&record.video_uid).await?)
    }

    fn plan(
        &self,
        classified: &Option<VideoRecord>,
        desired: &VideoRecord,
    ) -> Result<Planned, CoreError> {
        match classified {
            None => Ok(Planned::Create),
            Some(existing) => {
                let changes = VideoRecord::plan_update(existing, desired);
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
        desired: &VideoRecord,
        _classified: &Option<VideoRecord>,
        _planned: &Planned,
    ) -> Result<(), SyncError> {
        // The url is unique across the store, not just within the batch.
        if let Some(other) = store.get_video_by_url(&desired.url).await? {
            if other.video_uid != desired.video_uid {
                return Err(verification_failure(format!(
                    "video '{}': url '{}' is already used by video '{}'",
                    desired.video_uid, desired.url, other.video_uid
                )));
            }
        }
        Ok(())
    }

    async fn apply(
        &self,
        store: &dyn EntityStore,
        desired: &VideoRecord,
        _classified: &Option<VideoRecord>,
        planned: &Planned,
    ) -> Result<(), SyncError> {
        let err = || mutation_err(EntityType::Video, desired.natural_key());
        match planned {
            Planned::Create => store.insert_video(desired).await.map_err(err()),
            Planned::Update { .. } => store.update_video(desired).await.map_err(err()),
            Planned::Remove | Planned::Skip { .. } => Ok(()),
        }
    }
}
