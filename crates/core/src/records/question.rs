//! Question records and the constrained-edit rules that protect collected
//! answers.
//!
//! A question's `text` is its natural key and never changes after creation.
//! Single-choice questions may only *append* options over time; removing or
//! reordering existing options would silently invalidate answers already
//! collected against them, so both are hard errors.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::keys::EntityKey;
use crate::report::FieldChange;

// ---------------------------------------------------------------------------
// Question type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// Single choice from a fixed option list.
    Single,
    /// Free-text response.
    Description,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Description => "description",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "single" => Some(Self::Single),
            "description" => Some(Self::Description),
            _ => None,
        }
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Question record
// ---------------------------------------------------------------------------

/// One question inside a question group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuestionRecord {
    /// Immutable natural key.
    pub text: String,
    pub qtype: QuestionType,
    /// Answer values for `single` questions. Empty for `description`.
    #[serde(default)]
    pub options: Vec<String>,
    /// Display labels, parallel to `options`. Defaults to the options.
    #[serde(default)]
    pub display_values: Option<Vec<String>>,
    /// Per-option weights, parallel to `options`. Defaults to 1.0 each.
    #[serde(default)]
    pub option_weights: Option<Vec<f64>>,
    /// Pre-selected option (`single`) or pre-filled response (`description`).
    #[serde(default)]
    pub default_option: Option<String>,
    /// UI label. Defaults to `text`.
    #[serde(default)]
    pub display_text: Option<String>,
}

impl QuestionRecord {
    pub const REQUIRED_FIELDS: &'static [&'static str] = &["text", "qtype"];
    pub const OPTIONAL_FIELDS: &'static [&'static str] = &[
        "options",
        "display_values",
        "option_weights",
        "default_option",
        "display_text",
    ];

    pub fn natural_key(&self) -> EntityKey {
        EntityKey::single(&self.text)
    }

    /// Display labels with the default applied.
    pub fn effective_display_values(&self) -> Vec<String> {
        self.display_values
            .clone()
            .unwrap_or_else(|| self.options.clone())
    }

    /// Option weights with the default (1.0 per option) applied.
    pub fn effective_weights(&self) -> Vec<f64> {
        self.option_weights
            .clone()
            .unwrap_or_else(|| vec![1.0; self.options.len()])
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.text.trim().is_empty() {
            return Err(CoreError::Validation(
                "question text must not be empty".to_string(),
            ));
        }
        match self.qtype {
            QuestionType::Single => {
                if self.options.is_empty() {
                    return Err(CoreError::Validation(format!(
                        "single-choice question '{}' has no options",
                        self.text
                    )));
                }
                if let Some(dv) = &self.display_values {
                    if dv.len() != self.options.len() {
                        return Err(CoreError::Validation(format!(
                            "question '{}': {} display_values for {} options",
                            self.text,
                            dv.len(),
                            self.options.len()
                        )));
                    }
                }
                if let Some(w) = &self.option_weights {
                    if w.len() != self.options.len() {
                        return Err(CoreError::Validation(format!(
                            "question '{}': {} option_weights for {} options",
                            self.text,
                            w.len(),
                            self.options.len()
                        )));
                    }
                    if w.iter().any(|x| !x.is_finite() || *x < 0.0) {
                        return Err(CoreError::Validation(format!(
                            "question '{}': option_weights must be finite and non-negative",
                            self.text
                        )));
                    }
                }
                if let Some(default) = &self.default_option {
                    if !self.options.contains(default) {
                        return Err(CoreError::Validation(format!(
                            "question '{}': default_option '{default}' is not one of its options",
                            self.text
                        )));
                    }
                }
            }
            QuestionType::Description => {
                if !self.options.is_empty()
                    || self.display_values.is_some()
                    || self.option_weights.is_some()
                {
                    return Err(CoreError::Validation(format!(
                        "description question '{}' must not define options",
                        self.text
                    )));
                }
            }
        }
        Ok(())
    }

    /// Diff an existing question against the desired one, enforcing the
    /// constrained-edit rules.
    ///
    /// For `single` questions only `display_text`, `display_values`,
    /// `option_weights`, and `default_option` may change, and `options` may
    /// only grow by appending. For `description` questions only
    /// `display_text` and `default_option` may change.
    pub fn plan_update(
        existing: &QuestionRecord,
        desired: &QuestionRecord,
    ) -> Result<Vec<FieldChange>, CoreError> {
        if existing.qtype != desired.qtype {
            return Err(CoreError::Validation(format!(
                "question '{}': qtype cannot change from {} to {}",
                existing.text, existing.qtype, desired.qtype
            )));
        }

        let mut changes = Vec::new();

        if existing.qtype == QuestionType::Single {
            if desired.options.len() < existing.options.len()
                || desired.options[..existing.options.len()] != existing.options[..]
            {
                return Err(CoreError::Validation(format!(
                    "question '{}': existing options may not be removed or reordered; \
                     new options may only be appended",
                    existing.text
                )));
            }
            if desired.options.len() > existing.options.len() {
                changes.push(FieldChange::new(
                    "options",
                    serde_json::json!(existing.options),
                    serde_json::json!(desired.options),
                ));
            }
            if existing.effective_display_values() != desired.effective_display_values() {
                changes.push(FieldChange::new(
                    "display_values",
                    serde_json::json!(existing.effective_display_values()),
                    serde_json::json!(desired.effective_display_values()),
                ));
            }
            if existing.effective_weights() != desired.effective_weights() {
                changes.push(FieldChange::new(
                    "option_weights",
                    serde_json::json!(existing.effective_weights()),
                    serde_json::json!(desired.effective_weights()),
                ));
            }
        }

        if existing.default_option != desired.default_option {
            changes.push(FieldChange::new(
                "default_option",
                serde_json::json!(existing.default_option),
                serde_json::json!(desired.default_option),
            ));
        }
        if existing.display_text != desired.display_text {
            changes.push(FieldChange::new(
                "display_text",
                serde_json::json!(existing.display_text),
                serde_json::json!(desired.display_text),
            ));
        }

        Ok(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(text: &str, options: &[&str]) -> QuestionRecord {
        QuestionRecord {
            text: text.to_string(),
            qtype: QuestionType::Single,
            options: options.iter().map(|s| s.to_string()).collect(),
            display_values: None,
            option_weights: None,
            default_option: None,
            display_text: None,
        }
    }

    #[test]
    fn appending_an_option_is_allowed() {
        let old = single("Is it blurry?", &["yes", "no"]);
        let new = single("Is it blurry?", &["yes", "no", "unsure"]);
        let changes = QuestionRecord::plan_update(&old, &new).unwrap();
        assert_eq!(changes.len(), 2); // options plus the display_values that track them
        assert_eq!(changes[0].field, "options");
    }

    #[test]
    fn removing_an_option_is_rejected() {
        let old = single("Is it blurry?", &["yes", "no"]);
        let new = single("Is it blurry?", &["yes"]);
        assert!(QuestionRecord::plan_update(&old, &new).is_err());
    }

    #[test]
    fn reordering_options_is_rejected() {
        let old = single("Is it blurry?", &["yes", "no"]);
        let new = single("Is it blurry?", &["no", "yes"]);
        assert!(QuestionRecord::plan_update(&old, &new).is_err());
    }

    #[test]
    fn qtype_change_is_rejected() {
        let old = single("Describe the scene", &["a"]);
        let mut new = old.clone();
        new.qtype = QuestionType::Description;
        new.options = Vec::new();
        assert!(QuestionRecord::plan_update(&old, &new).is_err());
    }

    #[test]
    fn default_option_must_be_a_member() {
        let mut q = single("Is it blurry?", &["yes", "no"]);
        q.default_option = Some("maybe".to_string());
        assert!(q.validate().is_err());
        q.default_option = Some("yes".to_string());
        assert!(q.validate().is_ok());
    }

    #[test]
    fn weights_default_to_one_per_option() {
        let q = single("Is it blurry?", &["yes", "no"]);
        assert_eq!(q.effective_weights(), vec![1.0, 1.0]);
    }

    #[test]
    fn description_question_with_options_is_rejected() {
        let mut q = single("Describe it", &["a"]);
        q.qtype = QuestionType::Description;
        assert!(q.validate().is_err());
    }
}
