//! Project-group records: named buckets of projects with mutable membership.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::keys::EntityKey;
use crate::records::json_list;
use crate::report::FieldChange;

/// A project group in the desired workspace state. Unlike question groups
/// and schemas, membership here may freely grow and shrink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectGroupRecord {
    /// Natural key.
    pub project_group_name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Member projects, by name. Treated as a set.
    #[serde(default)]
    pub projects: Vec<String>,
}

impl ProjectGroupRecord {
    pub const REQUIRED_FIELDS: &'static [&'static str] = &["project_group_name"];
    pub const OPTIONAL_FIELDS: &'static [&'static str] = &["description", "projects"];

    pub fn natural_key(&self) -> EntityKey {
        EntityKey::single(&self.project_group_name)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.project_group_name.trim().is_empty() {
            return Err(CoreError::Validation(
                "project_group_name must not be empty".to_string(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for name in &self.projects {
            if !seen.insert(name.as_str()) {
                return Err(CoreError::Validation(format!(
                    "project group '{}' lists project '{name}' twice",
                    self.project_group_name
                )));
            }
        }
        Ok(())
    }

    pub fn plan_update(
        existing: &ProjectGroupRecord,
        desired: &ProjectGroupRecord,
    ) -> Vec<FieldChange> {
        let mut changes = Vec::new();
        if existing.description != desired.description {
            changes.push(FieldChange::new(
                "description",
                serde_json::json!(existing.description),
                serde_json::json!(desired.description),
            ));
        }

        let mut existing_sorted = existing.projects.clone();
        let mut desired_sorted = desired.projects.clone();
        existing_sorted.sort();
        desired_sorted.sort();
        if existing_sorted != desired_sorted {
            changes.push(FieldChange::new(
                "projects",
                json_list(&existing_sorted),
                json_list(&desired_sorted),
            ));
        }
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(name: &str, projects: &[&str]) -> ProjectGroupRecord {
        ProjectGroupRecord {
            project_group_name: name.to_string(),
            description: None,
            projects: projects.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn membership_change_is_an_update() {
        let old = group("g", &["p1", "p2"]);
        let new = group("g", &["p2", "p3"]);
        let changes = ProjectGroupRecord::plan_update(&old, &new);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "projects");
    }

    #[test]
    fn membership_order_does_not_matter() {
        let old = group("g", &["p1", "p2"]);
        let new = group("g", &["p2", "p1"]);
        assert!(ProjectGroupRecord::plan_update(&old, &new).is_empty());
    }
}
