//! Project records, including the per-video custom-display overlay.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::keys::EntityKey;
use crate::records::member_set_diff;
use crate::report::{truncated_list, FieldChange};

// ---------------------------------------------------------------------------
// Custom display overrides
// ---------------------------------------------------------------------------

/// A per-(video, question) display override inside one project. Only valid
/// when the project's schema declares `has_custom_display`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomDisplayRecord {
    pub video_uid: String,
    pub question_text: String,
    /// Replacement question wording for this video.
    #[serde(default)]
    pub custom_question: Option<String>,
    /// Replacement option labels for this video, keyed by option value.
    #[serde(default)]
    pub custom_options: Option<BTreeMap<String, String>>,
}

impl CustomDisplayRecord {
    /// Key within one project.
    pub fn key(&self) -> EntityKey {
        EntityKey::composite(&[&self.video_uid, &self.question_text])
    }
}

/// Outcome of reconciling a project's stored custom displays against the
/// desired list: its own created/updated/removed/skipped accounting, nested
/// under the project's update.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CustomDisplayPlan {
    pub created: Vec<CustomDisplayRecord>,
    pub updated: Vec<CustomDisplayRecord>,
    pub removed: Vec<CustomDisplayRecord>,
    pub skipped: usize,
}

impl CustomDisplayPlan {
    pub fn is_noop(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }

    /// Count block for reports and log lines.
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "created": self.created.len(),
            "updated": self.updated.len(),
            "removed": self.removed.len(),
            "skipped": self.skipped,
        })
    }
}

/// Three-way reconciliation of custom displays: desired entries absent from
/// the store are created, present-but-different entries updated, stored
/// entries absent from the desired list removed, identical entries skipped.
pub fn reconcile_custom_displays(
    existing: &[CustomDisplayRecord],
    desired: &[CustomDisplayRecord],
) -> CustomDisplayPlan {
    let existing_by_key: BTreeMap<EntityKey, &CustomDisplayRecord> =
        existing.iter().map(|cd| (cd.key(), cd)).collect();
    let desired_keys: std::collections::HashSet<EntityKey> =
        desired.iter().map(|cd| cd.key()).collect();

    let mut plan = CustomDisplayPlan::default();
    for cd in desired {
        match existing_by_key.get(&cd.key()) {
            None => plan.created.push(cd.clone()),
            Some(old) if *old != cd => plan.updated.push(cd.clone()),
            Some(_) => plan.skipped += 1,
        }
    }
    for cd in existing {
        if !desired_keys.contains(&cd.key()) {
            plan.removed.push(cd.clone());
        }
    }
    plan
}

// ---------------------------------------------------------------------------
// Project record
// ---------------------------------------------------------------------------

/// A project in the desired workspace state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectRecord {
    /// Natural key.
    pub project_name: String,
    /// Schema reference, by name.
    pub schema_name: String,
    /// Member videos, by uid. The set is frozen at creation.
    pub videos: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_archived: bool,
    /// Per-video display overrides. Only meaningful when the schema has
    /// `has_custom_display`.
    #[serde(default)]
    pub custom_displays: Option<Vec<CustomDisplayRecord>>,
}

impl ProjectRecord {
    pub const REQUIRED_FIELDS: &'static [&'static str] =
        &["project_name", "schema_name", "videos"];
    pub const OPTIONAL_FIELDS: &'static [&'static str] =
        &["description", "is_archived", "custom_displays"];

    pub fn natural_key(&self) -> EntityKey {
        EntityKey::single(&self.project_name)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.project_name.trim().is_empty() {
            return Err(CoreError::Validation(
                "project_name must not be empty".to_string(),
            ));
        }
        if self.schema_name.trim().is_empty() {
            return Err(CoreError::Validation(format!(
                "project '{}' has an empty schema_name",
                self.project_name
            )));
        }
        let mut seen = std::collections::HashSet::new();
        for uid in &self.videos {
            if !seen.insert(uid.as_str()) {
                return Err(CoreError::Validation(format!(
                    "project '{}' lists video '{uid}' twice",
                    self.project_name
                )));
            }
        }
        if let Some(displays) = &self.custom_displays {
            let mut seen = std::collections::HashSet::new();
            for cd in displays {
                if !seen.insert(cd.key()) {
                    return Err(CoreError::Validation(format!(
                        "project '{}' has duplicate custom display for {}",
                        self.project_name,
                        cd.key()
                    )));
                }
                if !self.videos.contains(&cd.video_uid) {
                    return Err(CoreError::Validation(format!(
                        "project '{}': custom display targets video '{}' which is not a member",
                        self.project_name, cd.video_uid
                    )));
                }
            }
        }
        Ok(())
    }

    /// Diff mutable project fields. Video membership is immutable; the
    /// schema reference cannot change either. Custom displays are planned
    /// separately via [`reconcile_custom_displays`].
    pub fn plan_update(
        existing: &ProjectRecord,
        desired: &ProjectRecord,
    ) -> Result<Vec<FieldChange>, CoreError> {
        if existing.schema_name != desired.schema_name {
            return Err(CoreError::Validation(format!(
                "project '{}': schema cannot change from '{}' to '{}'",
                existing.project_name, existing.schema_name, desired.schema_name
            )));
        }

        let (missing, extra) = member_set_diff(&existing.videos, &desired.videos);
        if !missing.is_empty() || !extra.is_empty() {
            let mut parts = Vec::new();
            if !missing.is_empty() {
                parts.push(format!("missing: {}", truncated_list(&missing)));
            }
            if !extra.is_empty() {
                parts.push(format!("extra: {}", truncated_list(&extra)));
            }
            return Err(CoreError::Validation(format!(
                "project '{}': the video set is immutable ({})",
                existing.project_name,
                parts.join("; ")
            )));
        }

        let mut changes = Vec::new();
        if existing.description != desired.description {
            changes.push(FieldChange::new(
                "description",
                serde_json::json!(existing.description),
                serde_json::json!(desired.description),
            ));
        }
        if existing.is_archived != desired.is_archived {
            changes.push(FieldChange::new(
                "is_archived",
                existing.is_archived,
                desired.is_archived,
            ));
        }
        Ok(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(name: &str, videos: &[&str]) -> ProjectRecord {
        ProjectRecord {
            project_name: name.to_string(),
            schema_name: "s".to_string(),
            videos: videos.iter().map(|s| s.to_string()).collect(),
            description: None,
            is_archived: false,
            custom_displays: None,
        }
    }

    fn display(video: &str, question: &str, wording: &str) -> CustomDisplayRecord {
        CustomDisplayRecord {
            video_uid: video.to_string(),
            question_text: question.to_string(),
            custom_question: Some(wording.to_string()),
            custom_options: None,
        }
    }

    #[test]
    fn video_set_change_is_rejected() {
        let old = project("p", &["v1", "v2"]);
        let new = project("p", &["v1", "v3"]);
        assert!(ProjectRecord::plan_update(&old, &new).is_err());
    }

    #[test]
    fn description_change_is_an_update() {
        let old = project("p", &["v1"]);
        let mut new = old.clone();
        new.description = Some("fresh".to_string());
        let changes = ProjectRecord::plan_update(&old, &new).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "description");
    }

    #[test]
    fn custom_display_reconciliation_partitions_all_four_ways() {
        let existing = vec![
            display("v1", "q1", "old wording"),
            display("v1", "q2", "kept"),
            display("v2", "q1", "to be removed"),
        ];
        let desired = vec![
            display("v1", "q1", "new wording"), // updated
            display("v1", "q2", "kept"),        // skipped
            display("v3", "q1", "brand new"),   // created
        ];

        let plan = reconcile_custom_displays(&existing, &desired);
        assert_eq!(plan.created.len(), 1);
        assert_eq!(plan.updated.len(), 1);
        assert_eq!(plan.removed.len(), 1);
        assert_eq!(plan.skipped, 1);
        assert!(!plan.is_noop());
    }

    #[test]
    fn custom_display_for_non_member_video_is_rejected() {
        let mut p = project("p", &["v1"]);
        p.custom_displays = Some(vec![display("v9", "q1", "x")]);
        assert!(p.validate().is_err());
    }
}
