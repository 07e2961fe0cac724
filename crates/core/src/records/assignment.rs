//! Assignment records: a user's role on a project.
//!
//! Assignments are the one entity type that deletes instead of archiving:
//! `is_active = false` removes the row outright.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::keys::EntityKey;
use crate::report::FieldChange;

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// Role a user holds on a project.
///
/// `Admin` exists so workspace files mentioning it parse far enough to get a
/// useful error: admin access is account-level and cannot be granted through
/// sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentRole {
    Annotator,
    Reviewer,
    Model,
    Admin,
}

impl AssignmentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Annotator => "annotator",
            Self::Reviewer => "reviewer",
            Self::Model => "model",
            Self::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "annotator" => Some(Self::Annotator),
            "reviewer" => Some(Self::Reviewer),
            "model" => Some(Self::Model),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Roles grantable through the sync pipeline.
    pub const SYNCABLE: &'static [&'static str] = &["annotator", "reviewer", "model"];
}

impl std::fmt::Display for AssignmentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Assignment record
// ---------------------------------------------------------------------------

/// One (user, project, role) membership row in the desired state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssignmentRecord {
    pub user_name: String,
    pub project_name: String,
    pub role: AssignmentRole,
    /// Weight applied to this user's answers in consensus calculations.
    #[serde(default)]
    pub user_weight: Option<f64>,
    /// `false` removes the membership row.
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl AssignmentRecord {
    pub const REQUIRED_FIELDS: &'static [&'static str] = &["user_name", "project_name", "role"];
    pub const OPTIONAL_FIELDS: &'static [&'static str] = &["user_weight", "is_active"];

    pub fn natural_key(&self) -> EntityKey {
        EntityKey::composite(&[&self.user_name, &self.project_name, self.role.as_str()])
    }

    /// Weight with the default (1.0) applied.
    pub fn effective_weight(&self) -> f64 {
        self.user_weight.unwrap_or(1.0)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.user_name.trim().is_empty() || self.project_name.trim().is_empty() {
            return Err(CoreError::Validation(
                "assignment user_name and project_name must not be empty".to_string(),
            ));
        }
        if self.role == AssignmentRole::Admin {
            return Err(CoreError::Validation(format!(
                "assignment {}: role 'admin' cannot be granted through sync; valid roles: {}",
                self.natural_key(),
                AssignmentRole::SYNCABLE.join(", ")
            )));
        }
        if let Some(w) = self.user_weight {
            if !w.is_finite() || w < 0.0 {
                return Err(CoreError::Validation(format!(
                    "assignment {}: user_weight must be finite and non-negative",
                    self.natural_key()
                )));
            }
        }
        Ok(())
    }

    pub fn plan_update(existing: &AssignmentRecord, desired: &AssignmentRecord) -> Vec<FieldChange> {
        let mut changes = Vec::new();
        if existing.effective_weight() != desired.effective_weight() {
            changes.push(FieldChange::new(
                "user_weight",
                serde_json::json!(existing.effective_weight()),
                serde_json::json!(desired.effective_weight()),
            ));
        }
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(user: &str, project: &str, role: AssignmentRole) -> AssignmentRecord {
        AssignmentRecord {
            user_name: user.to_string(),
            project_name: project.to_string(),
            role,
            user_weight: None,
            is_active: true,
        }
    }

    #[test]
    fn admin_role_is_rejected() {
        let a = assignment("u1", "p1", AssignmentRole::Admin);
        let err = a.validate().unwrap_err();
        assert!(err.to_string().contains("admin"));
    }

    #[test]
    fn key_distinguishes_roles_on_the_same_project() {
        let a = assignment("u1", "p1", AssignmentRole::Annotator);
        let b = assignment("u1", "p1", AssignmentRole::Reviewer);
        assert_ne!(a.natural_key(), b.natural_key());
    }

    #[test]
    fn weight_defaults_to_one() {
        let a = assignment("u1", "p1", AssignmentRole::Annotator);
        assert_eq!(a.effective_weight(), 1.0);
    }

    #[test]
    fn weight_change_is_the_only_updatable_field() {
        let old = assignment("u1", "p1", AssignmentRole::Annotator);
        let mut new = old.clone();
        new.user_weight = Some(2.0);
        let changes = AssignmentRecord::plan_update(&old, &new);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "user_weight");
    }
}
