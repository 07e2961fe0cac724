//! Video records: the leaf entity every project and annotation refers to.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::keys::EntityKey;
use crate::report::FieldChange;

/// A video in the desired workspace state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VideoRecord {
    /// Stable human-readable identifier, unique across the platform.
    pub video_uid: String,
    /// Source URL. Unique across the platform.
    pub url: String,
    /// Arbitrary metadata (resolution, license, capture notes, ...).
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(default)]
    pub is_archived: bool,
}

impl VideoRecord {
    pub const REQUIRED_FIELDS: &'static [&'static str] = &["video_uid", "url"];
    pub const OPTIONAL_FIELDS: &'static [&'static str] = &["metadata", "is_archived"];

    pub fn natural_key(&self) -> EntityKey {
        EntityKey::single(&self.video_uid)
    }

    /// Record-level validation beyond the field-set check.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.video_uid.trim().is_empty() {
            return Err(CoreError::Validation(
                "video_uid must not be empty".to_string(),
            ));
        }
        if self.url.trim().is_empty() {
            return Err(CoreError::Validation(format!(
                "video '{}' has an empty url",
                self.video_uid
            )));
        }
        Ok(())
    }

    /// Diff the mutable fields against the stored record.
    ///
    /// An empty result means the record is already in the desired state and
    /// the sync engine skips it.
    pub fn plan_update(existing: &VideoRecord, desired: &VideoRecord) -> Vec<FieldChange> {
        let mut changes = Vec::new();
        if existing.url != desired.url {
            changes.push(FieldChange::new(
                "url",
                existing.url.clone(),
                desired.url.clone(),
            ));
        }
        if existing.metadata != desired.metadata {
            changes.push(FieldChange::new(
                "metadata",
                existing.metadata.clone(),
                desired.metadata.clone(),
            ));
        }
        if existing.is_archived != desired.is_archived {
            changes.push(FieldChange::new(
                "is_archived",
                existing.is_archived,
                desired.is_archived,
            ));
        }
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(uid: &str, url: &str) -> VideoRecord {
        VideoRecord {
            video_uid: uid.to_string(),
            url: url.to_string(),
            metadata: serde_json::json!({}),
            is_archived: false,
        }
    }

    #[test]
    fn identical_records_plan_no_changes() {
        let a = video("v1", "http://x/v1.mp4");
        assert!(VideoRecord::plan_update(&a, &a.clone()).is_empty());
    }

    #[test]
    fn changed_url_and_archive_flag_are_both_reported() {
        let old = video("v1", "http://x/v1.mp4");
        let mut new = old.clone();
        new.url = "http://y/v1.mp4".to_string();
        new.is_archived = true;

        let changes = VideoRecord::plan_update(&old, &new);
        let fields: Vec<&str> = changes.iter().map(|c| c.field.as_str()).collect();
        assert_eq!(fields, vec!["url", "is_archived"]);
    }

    #[test]
    fn empty_uid_fails_validation() {
        let v = video("  ", "http://x/v1.mp4");
        assert!(v.validate().is_err());
    }
}
