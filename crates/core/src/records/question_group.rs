//! Question-group records.
//!
//! A group owns an ordered list of questions. The *set* of member questions
//! is frozen at creation; later syncs may reorder them or touch group-level
//! metadata, never add or remove members.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::keys::EntityKey;
use crate::records::question::QuestionRecord;
use crate::records::{json_list, member_set_diff};
use crate::report::{truncated_list, FieldChange};

/// A question group in the desired workspace state. Questions are embedded,
/// matching the one-file-per-group workspace layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuestionGroupRecord {
    /// Natural key.
    pub title: String,
    #[serde(default)]
    pub display_title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Whether the group may appear in more than one schema.
    #[serde(default)]
    pub is_reusable: bool,
    /// Auto-submit groups answer themselves from question defaults, so every
    /// member question must carry a non-null default.
    #[serde(default)]
    pub is_auto_submit: bool,
    /// Name of an externally registered verification callable, run against
    /// submitted answers.
    #[serde(default)]
    pub verification_function: Option<String>,
    /// Ordered member questions.
    pub questions: Vec<QuestionRecord>,
}

impl QuestionGroupRecord {
    pub const REQUIRED_FIELDS: &'static [&'static str] = &["title", "questions"];
    pub const OPTIONAL_FIELDS: &'static [&'static str] = &[
        "display_title",
        "description",
        "is_reusable",
        "is_auto_submit",
        "verification_function",
    ];

    pub fn natural_key(&self) -> EntityKey {
        EntityKey::single(&self.title)
    }

    /// Ordered member question texts.
    pub fn question_texts(&self) -> Vec<String> {
        self.questions.iter().map(|q| q.text.clone()).collect()
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.title.trim().is_empty() {
            return Err(CoreError::Validation(
                "question group title must not be empty".to_string(),
            ));
        }
        if self.questions.is_empty() {
            return Err(CoreError::Validation(format!(
                "question group '{}' has no questions",
                self.title
            )));
        }

        let mut seen = std::collections::HashSet::new();
        for q in &self.questions {
            q.validate()?;
            if !seen.insert(q.text.as_str()) {
                return Err(CoreError::Validation(format!(
                    "question group '{}' contains duplicate question '{}'",
                    self.title, q.text
                )));
            }
            if self.is_auto_submit && q.default_option.is_none() {
                return Err(CoreError::Validation(format!(
                    "auto-submit group '{}': question '{}' must have a non-null default_option",
                    self.title, q.text
                )));
            }
        }
        Ok(())
    }

    /// Diff group-level fields against the stored group.
    ///
    /// The member *set* must match exactly; a mismatch is a hard error
    /// naming the missing and extra questions, never an update. A pure
    /// reorder is reported as a `question_order` change. Member-question
    /// field edits are planned separately per question.
    pub fn plan_update(
        existing: &QuestionGroupRecord,
        desired: &QuestionGroupRecord,
    ) -> Result<Vec<FieldChange>, CoreError> {
        let existing_texts = existing.question_texts();
        let desired_texts = desired.question_texts();

        let (missing, extra) = member_set_diff(&existing_texts, &desired_texts);
        if !missing.is_empty() || !extra.is_empty() {
            let mut parts = Vec::new();
            if !missing.is_empty() {
                parts.push(format!("missing: {}", truncated_list(&missing)));
            }
            if !extra.is_empty() {
                parts.push(format!("extra: {}", truncated_list(&extra)));
            }
            return Err(CoreError::Validation(format!(
                "question group '{}': the question set is immutable ({})",
                existing.title,
                parts.join("; ")
            )));
        }

        let mut changes = Vec::new();
        if existing_texts != desired_texts {
            changes.push(FieldChange::new(
                "question_order",
                json_list(&existing_texts),
                json_list(&desired_texts),
            ));
        }
        if existing.display_title != desired.display_title {
            changes.push(FieldChange::new(
                "display_title",
                serde_json::json!(existing.display_title),
                serde_json::json!(desired.display_title),
            ));
        }
        if existing.description != desired.description {
            changes.push(FieldChange::new(
                "description",
                serde_json::json!(existing.description),
                serde_json::json!(desired.description),
            ));
        }
        if existing.is_reusable != desired.is_reusable {
            changes.push(FieldChange::new(
                "is_reusable",
                existing.is_reusable,
                desired.is_reusable,
            ));
        }
        if existing.is_auto_submit != desired.is_auto_submit {
            changes.push(FieldChange::new(
                "is_auto_submit",
                existing.is_auto_submit,
                desired.is_auto_submit,
            ));
        }
        if existing.verification_function != desired.verification_function {
            changes.push(FieldChange::new(
                "verification_function",
                serde_json::json!(existing.verification_function),
                serde_json::json!(desired.verification_function),
            ));
        }
        Ok(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::question::QuestionType;

    fn question(text: &str) -> QuestionRecord {
        QuestionRecord {
            text: text.to_string(),
            qtype: QuestionType::Single,
            options: vec!["yes".to_string(), "no".to_string()],
            display_values: None,
            option_weights: None,
            default_option: Some("no".to_string()),
            display_text: None,
        }
    }

    fn group(title: &str, texts: &[&str]) -> QuestionGroupRecord {
        QuestionGroupRecord {
            title: title.to_string(),
            display_title: None,
            description: None,
            is_reusable: false,
            is_auto_submit: false,
            verification_function: None,
            questions: texts.iter().map(|t| question(t)).collect(),
        }
    }

    #[test]
    fn reorder_is_reported_as_question_order_change() {
        let old = group("g", &["qA", "qB"]);
        let new = group("g", &["qB", "qA"]);
        let changes = QuestionGroupRecord::plan_update(&old, &new).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "question_order");
    }

    #[test]
    fn member_set_change_is_a_hard_error_naming_members() {
        let old = group("g", &["qA", "qB"]);
        let new = group("g", &["qB", "qC"]);
        let err = QuestionGroupRecord::plan_update(&old, &new).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("qA"), "missing member not named: {msg}");
        assert!(msg.contains("qC"), "extra member not named: {msg}");
    }

    #[test]
    fn identical_groups_plan_no_changes() {
        let g = group("g", &["qA", "qB"]);
        assert!(QuestionGroupRecord::plan_update(&g, &g.clone())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn auto_submit_requires_defaults_on_every_question() {
        let mut g = group("g", &["qA"]);
        g.is_auto_submit = true;
        assert!(g.validate().is_ok());
        g.questions[0].default_option = None;
        assert!(g.validate().is_err());
    }

    #[test]
    fn duplicate_question_text_is_rejected() {
        let g = group("g", &["qA", "qA"]);
        assert!(g.validate().is_err());
    }
}
