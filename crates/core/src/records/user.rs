//! User records and the admin / human / model user-type enum.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::keys::EntityKey;
use crate::report::FieldChange;

// ---------------------------------------------------------------------------
// User type
// ---------------------------------------------------------------------------

/// Kind of account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Admin,
    Human,
    Model,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Human => "human",
            Self::Model => "model",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Self::Admin),
            "human" => Some(Self::Human),
            "model" => Some(Self::Model),
            _ => None,
        }
    }

    pub const ALL: &'static [&'static str] = &["admin", "human", "model"];
}

impl std::fmt::Display for UserType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// User record
// ---------------------------------------------------------------------------

/// A user account in the desired workspace state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserRecord {
    /// Stable handle, unique across the platform.
    pub user_id: String,
    /// Login email. Required for admin and human accounts; model accounts
    /// have no mailbox and may leave it null.
    #[serde(default)]
    pub email: Option<String>,
    /// Login secret. Model accounts never carry a human-chosen password.
    #[serde(default)]
    pub password: Option<String>,
    pub user_type: UserType,
    #[serde(default)]
    pub is_archived: bool,
}

impl UserRecord {
    pub const REQUIRED_FIELDS: &'static [&'static str] = &["user_id", "user_type"];
    pub const OPTIONAL_FIELDS: &'static [&'static str] = &["email", "password", "is_archived"];

    pub fn natural_key(&self) -> EntityKey {
        EntityKey::single(&self.user_id)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.user_id.trim().is_empty() {
            return Err(CoreError::Validation(
                "user_id must not be empty".to_string(),
            ));
        }
        match self.user_type {
            UserType::Model => {
                if self.password.is_some() {
                    return Err(CoreError::Validation(format!(
                        "model user '{}' must not carry a password",
                        self.user_id
                    )));
                }
            }
            UserType::Admin | UserType::Human => {
                if self.email.as_deref().map_or(true, |e| e.trim().is_empty()) {
                    return Err(CoreError::Validation(format!(
                        "{} user '{}' requires an email",
                        self.user_type, self.user_id
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn plan_update(existing: &UserRecord, desired: &UserRecord) -> Vec<FieldChange> {
        let mut changes = Vec::new();
        if existing.email != desired.email {
            changes.push(FieldChange::new(
                "email",
                serde_json::json!(existing.email),
                serde_json::json!(desired.email),
            ));
        }
        if existing.password != desired.password {
            // Never echo secrets into reports.
            changes.push(FieldChange::new("password", "***", "***"));
        }
        if existing.user_type != desired.user_type {
            changes.push(FieldChange::new(
                "user_type",
                existing.user_type.as_str(),
                desired.user_type.as_str(),
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

    fn human(id: &str, email: &str) -> UserRecord {
        UserRecord {
            user_id: id.to_string(),
            email: Some(email.to_string()),
            password: Some("pw".to_string()),
            user_type: UserType::Human,
            is_archived: false,
        }
    }

    #[test]
    fn model_user_with_password_is_rejected() {
        let mut u = human("bot-1", "x@y.z");
        u.user_type = UserType::Model;
        u.email = None;
        assert!(u.validate().is_err());
        u.password = None;
        assert!(u.validate().is_ok());
    }

    #[test]
    fn human_user_without_email_is_rejected() {
        let mut u = human("alice", "alice@example.com");
        u.email = None;
        assert!(u.validate().is_err());
    }

    #[test]
    fn password_change_is_masked_in_report() {
        let old = human("alice", "alice@example.com");
        let mut new = old.clone();
        new.password = Some("new-pw".to_string());

        let changes = UserRecord::plan_update(&old, &new);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "password");
        assert_eq!(changes[0].to, serde_json::json!("***"));
    }

    #[test]
    fn user_type_parses_all_variants() {
        for s in UserType::ALL {
            assert!(UserType::from_str(s).is_some());
        }
        assert_eq!(UserType::from_str("robot"), None);
    }
}
