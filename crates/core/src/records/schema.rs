//! Schema records: an ordered set of question groups that projects attach to.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::keys::EntityKey;
use crate::records::{json_list, member_set_diff};
use crate::report::{truncated_list, FieldChange};

/// A schema in the desired workspace state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaRecord {
    /// Natural key.
    pub schema_name: String,
    /// Ordered member question groups, by title. The set is frozen at
    /// creation; only the order may change.
    pub question_group_names: Vec<String>,
    #[serde(default)]
    pub instructions_url: Option<String>,
    /// Whether projects on this schema may override question display per
    /// video.
    #[serde(default)]
    pub has_custom_display: bool,
    #[serde(default)]
    pub is_archived: bool,
}

impl SchemaRecord {
    pub const REQUIRED_FIELDS: &'static [&'static str] = &["schema_name", "question_group_names"];
    pub const OPTIONAL_FIELDS: &'static [&'static str] =
        &["instructions_url", "has_custom_display", "is_archived"];

    pub fn natural_key(&self) -> EntityKey {
        EntityKey::single(&self.schema_name)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.schema_name.trim().is_empty() {
            return Err(CoreError::Validation(
                "schema_name must not be empty".to_string(),
            ));
        }
        if self.question_group_names.is_empty() {
            return Err(CoreError::Validation(format!(
                "schema '{}' has no question groups",
                self.schema_name
            )));
        }
        let mut seen = std::collections::HashSet::new();
        for title in &self.question_group_names {
            if !seen.insert(title.as_str()) {
                return Err(CoreError::Validation(format!(
                    "schema '{}' lists question group '{title}' twice",
                    self.schema_name
                )));
            }
        }
        Ok(())
    }

    /// Diff mutable fields against the stored schema. The group set is
    /// immutable; a set mismatch is a hard error naming the members.
    pub fn plan_update(
        existing: &SchemaRecord,
        desired: &SchemaRecord,
    ) -> Result<Vec<FieldChange>, CoreError> {
        let (missing, extra) =
            member_set_diff(&existing.question_group_names, &desired.question_group_names);
        if !missing.is_empty() || !extra.is_empty() {
            let mut parts = Vec::new();
            if !missing.is_empty() {
                parts.push(format!("missing: {}", truncated_list(&missing)));
            }
            if !extra.is_empty() {
                parts.push(format!("extra: {}", truncated_list(&extra)));
            }
            return Err(CoreError::Validation(format!(
                "schema '{}': the question-group set is immutable ({})",
                existing.schema_name,
                parts.join("; ")
            )));
        }

        let mut changes = Vec::new();
        if existing.question_group_names != desired.question_group_names {
            changes.push(FieldChange::new(
                "question_group_order",
                json_list(&existing.question_group_names),
                json_list(&desired.question_group_names),
            ));
        }
        if existing.instructions_url != desired.instructions_url {
            changes.push(FieldChange::new(
                "instructions_url",
                serde_json::json!(existing.instructions_url),
                serde_json::json!(desired.instructions_url),
            ));
        }
        if existing.has_custom_display != desired.has_custom_display {
            changes.push(FieldChange::new(
                "has_custom_display",
                existing.has_custom_display,
                desired.has_custom_display,
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

    fn schema(name: &str, groups: &[&str]) -> SchemaRecord {
        SchemaRecord {
            schema_name: name.to_string(),
            question_group_names: groups.iter().map(|s| s.to_string()).collect(),
            instructions_url: None,
            has_custom_display: false,
            is_archived: false,
        }
    }

    #[test]
    fn group_reorder_is_an_update_not_an_error() {
        let old = schema("s", &["g1", "g2"]);
        let new = schema("s", &["g2", "g1"]);
        let changes = SchemaRecord::plan_update(&old, &new).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "question_group_order");
    }

    #[test]
    fn group_set_change_is_rejected() {
        let old = schema("s", &["g1", "g2"]);
        let new = schema("s", &["g1", "g3"]);
        assert!(SchemaRecord::plan_update(&old, &new).is_err());
    }

    #[test]
    fn duplicate_group_title_is_rejected() {
        assert!(schema("s", &["g1", "g1"]).validate().is_err());
    }
}
