//! Annotation and ground-truth records.
//!
//! Both carry one question group's answers for one video in one project.
//! They differ in exactly one way that matters everywhere: annotations are
//! per-user (the composite key includes `user_name`), ground truths are
//! user-independent (at most one authoritative value per question per video
//! per project, no matter which reviewer wrote it).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::keys::EntityKey;
use crate::report::FieldChange;

// ---------------------------------------------------------------------------
// Annotations
// ---------------------------------------------------------------------------

/// One user's answers to a question group for one video in one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnnotationRecord {
    pub question_group_title: String,
    pub project_name: String,
    pub user_name: String,
    pub video_uid: String,
    /// Answer per question text in the group.
    pub answers: BTreeMap<String, String>,
    /// Optional per-question confidence, keyed like `answers`.
    #[serde(default)]
    pub confidence_scores: Option<BTreeMap<String, f64>>,
    /// Optional per-question notes, keyed like `answers`.
    #[serde(default)]
    pub notes: Option<BTreeMap<String, String>>,
    /// Always false for annotations; present so exported files are
    /// self-describing.
    #[serde(default)]
    pub is_ground_truth: bool,
}

impl AnnotationRecord {
    pub const REQUIRED_FIELDS: &'static [&'static str] = &[
        "question_group_title",
        "project_name",
        "user_name",
        "video_uid",
        "answers",
    ];
    pub const OPTIONAL_FIELDS: &'static [&'static str] =
        &["confidence_scores", "notes", "is_ground_truth"];

    /// Key for the record as a whole (reporting granularity).
    pub fn natural_key(&self) -> EntityKey {
        EntityKey::composite(&[
            &self.video_uid,
            &self.user_name,
            &self.question_group_title,
            &self.project_name,
        ])
    }

    /// Duplicate-detection keys: one per answered question, per-user.
    ///
    /// Expanding the answer map means two records that answer overlapping
    /// questions collide even when their group titles differ.
    pub fn answer_keys(&self) -> Vec<EntityKey> {
        self.answers
            .keys()
            .map(|question| {
                EntityKey::composite(&[
                    &self.video_uid,
                    &self.user_name,
                    question,
                    &self.project_name,
                ])
            })
            .collect()
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.is_ground_truth {
            return Err(CoreError::Validation(format!(
                "annotation {}: is_ground_truth must be false (use the ground-truth pipeline)",
                self.natural_key()
            )));
        }
        validate_answer_shape(
            "annotation",
            &self.natural_key(),
            &self.answers,
            self.confidence_scores.as_ref(),
            self.notes.as_ref(),
        )
    }

    /// Question texts whose answer, confidence, or note differs.
    pub fn changed_questions(existing: &Self, desired: &Self) -> Vec<String> {
        changed_questions(
            &existing.answers,
            &desired.answers,
            existing.confidence_scores.as_ref(),
            desired.confidence_scores.as_ref(),
            existing.notes.as_ref(),
            desired.notes.as_ref(),
        )
    }

    pub fn plan_update(existing: &Self, desired: &Self) -> Vec<FieldChange> {
        plan_answer_update(
            &Self::changed_questions(existing, desired),
            &existing.answers,
            &desired.answers,
        )
    }
}

// ---------------------------------------------------------------------------
// Ground truths
// ---------------------------------------------------------------------------

/// The authoritative answers to a question group for one video in one
/// project. `user_name` records who submitted them but is not part of the
/// identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroundTruthRecord {
    pub question_group_title: String,
    pub project_name: String,
    /// Submitting reviewer (or admin). Not part of the natural key.
    pub user_name: String,
    pub video_uid: String,
    pub answers: BTreeMap<String, String>,
    #[serde(default)]
    pub confidence_scores: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    pub notes: Option<BTreeMap<String, String>>,
    #[serde(default = "default_true")]
    pub is_ground_truth: bool,
}

fn default_true() -> bool {
    true
}

impl GroundTruthRecord {
    pub const REQUIRED_FIELDS: &'static [&'static str] = &[
        "question_group_title",
        "project_name",
        "user_name",
        "video_uid",
        "answers",
    ];
    pub const OPTIONAL_FIELDS: &'static [&'static str] =
        &["confidence_scores", "notes", "is_ground_truth"];

    /// Key for the record as a whole. User-independent.
    pub fn natural_key(&self) -> EntityKey {
        EntityKey::composite(&[
            &self.video_uid,
            &self.question_group_title,
            &self.project_name,
        ])
    }

    /// Duplicate-detection keys: one per answered question, with no user
    /// component. Two reviewers submitting the same question in one batch
    /// collide here.
    pub fn answer_keys(&self) -> Vec<EntityKey> {
        self.answers
            .keys()
            .map(|question| {
                EntityKey::composite(&[&self.video_uid, question, &self.project_name])
            })
            .collect()
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if !self.is_ground_truth {
            return Err(CoreError::Validation(format!(
                "ground truth {}: is_ground_truth must be true",
                self.natural_key()
            )));
        }
        if self.user_name.trim().is_empty() {
            return Err(CoreError::Validation(format!(
                "ground truth {}: user_name (submitting reviewer) must not be empty",
                self.natural_key()
            )));
        }
        validate_answer_shape(
            "ground truth",
            &self.natural_key(),
            &self.answers,
            self.confidence_scores.as_ref(),
            self.notes.as_ref(),
        )
    }

    pub fn changed_questions(existing: &Self, desired: &Self) -> Vec<String> {
        changed_questions(
            &existing.answers,
            &desired.answers,
            existing.confidence_scores.as_ref(),
            desired.confidence_scores.as_ref(),
            existing.notes.as_ref(),
            desired.notes.as_ref(),
        )
    }

    pub fn plan_update(existing: &Self, desired: &Self) -> Vec<FieldChange> {
        plan_answer_update(
            &Self::changed_questions(existing, desired),
            &existing.answers,
            &desired.answers,
        )
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn validate_answer_shape(
    what: &str,
    key: &EntityKey,
    answers: &BTreeMap<String, String>,
    confidence: Option<&BTreeMap<String, f64>>,
    notes: Option<&BTreeMap<String, String>>,
) -> Result<(), CoreError> {
    if answers.is_empty() {
        return Err(CoreError::Validation(format!(
            "{what} {key}: answers must not be empty"
        )));
    }
    if let Some(scores) = confidence {
        for (question, score) in scores {
            if !answers.contains_key(question) {
                return Err(CoreError::Validation(format!(
                    "{what} {key}: confidence score for unanswered question '{question}'"
                )));
            }
            if !score.is_finite() || *score < 0.0 || *score > 1.0 {
                return Err(CoreError::Validation(format!(
                    "{what} {key}: confidence for '{question}' must be within 0.0..=1.0"
                )));
            }
        }
    }
    if let Some(notes) = notes {
        for question in notes.keys() {
            if !answers.contains_key(question) {
                return Err(CoreError::Validation(format!(
                    "{what} {key}: note for unanswered question '{question}'"
                )));
            }
        }
    }
    Ok(())
}

fn changed_questions(
    existing_answers: &BTreeMap<String, String>,
    desired_answers: &BTreeMap<String, String>,
    existing_conf: Option<&BTreeMap<String, f64>>,
    desired_conf: Option<&BTreeMap<String, f64>>,
    existing_notes: Option<&BTreeMap<String, String>>,
    desired_notes: Option<&BTreeMap<String, String>>,
) -> Vec<String> {
    let empty_conf = BTreeMap::new();
    let empty_notes = BTreeMap::new();
    let existing_conf = existing_conf.unwrap_or(&empty_conf);
    let desired_conf = desired_conf.unwrap_or(&empty_conf);
    let existing_notes = existing_notes.unwrap_or(&empty_notes);
    let desired_notes = desired_notes.unwrap_or(&empty_notes);

    desired_answers
        .iter()
        .filter(|(question, answer)| {
            existing_answers.get(*question) != Some(answer)
                || existing_conf.get(*question) != desired_conf.get(*question)
                || existing_notes.get(*question) != desired_notes.get(*question)
        })
        .map(|(question, _)| question.clone())
        .collect()
}

fn plan_answer_update(
    changed: &[String],
    existing_answers: &BTreeMap<String, String>,
    desired_answers: &BTreeMap<String, String>,
) -> Vec<FieldChange> {
    changed
        .iter()
        .map(|question| {
            FieldChange::new(
                format!("answers[{question}]"),
                serde_json::json!(existing_answers.get(question)),
                serde_json::json!(desired_answers.get(question)),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotation(user: &str, video: &str) -> AnnotationRecord {
        AnnotationRecord {
            question_group_title: "g".to_string(),
            project_name: "p".to_string(),
            user_name: user.to_string(),
            video_uid: video.to_string(),
            answers: BTreeMap::from([("q1".to_string(), "yes".to_string())]),
            confidence_scores: None,
            notes: None,
            is_ground_truth: false,
        }
    }

    fn ground_truth(user: &str, video: &str) -> GroundTruthRecord {
        GroundTruthRecord {
            question_group_title: "g".to_string(),
            project_name: "p".to_string(),
            user_name: user.to_string(),
            video_uid: video.to_string(),
            answers: BTreeMap::from([("q1".to_string(), "yes".to_string())]),
            confidence_scores: None,
            notes: None,
            is_ground_truth: true,
        }
    }

    #[test]
    fn annotation_keys_differ_per_user() {
        let a = annotation("u1", "v1");
        let b = annotation("u2", "v1");
        assert_ne!(a.answer_keys(), b.answer_keys());
    }

    #[test]
    fn ground_truth_keys_ignore_the_user() {
        let a = ground_truth("u1", "v1");
        let b = ground_truth("u2", "v1");
        assert_eq!(a.answer_keys(), b.answer_keys());
    }

    #[test]
    fn confidence_for_unanswered_question_is_rejected() {
        let mut a = annotation("u1", "v1");
        a.confidence_scores = Some(BTreeMap::from([("q9".to_string(), 0.5)]));
        assert!(a.validate().is_err());
    }

    #[test]
    fn confidence_outside_unit_interval_is_rejected() {
        let mut a = annotation("u1", "v1");
        a.confidence_scores = Some(BTreeMap::from([("q1".to_string(), 1.5)]));
        assert!(a.validate().is_err());
    }

    #[test]
    fn changed_questions_sees_confidence_only_changes() {
        let old = annotation("u1", "v1");
        let mut new = old.clone();
        new.confidence_scores = Some(BTreeMap::from([("q1".to_string(), 0.9)]));
        assert_eq!(
            AnnotationRecord::changed_questions(&old, &new),
            vec!["q1".to_string()]
        );
    }

    #[test]
    fn identical_records_have_no_changed_questions() {
        let a = ground_truth("u1", "v1");
        assert!(GroundTruthRecord::changed_questions(&a, &a.clone()).is_empty());
    }

    #[test]
    fn mislabeled_ground_truth_flag_is_rejected() {
        let mut a = annotation("u1", "v1");
        a.is_ground_truth = true;
        assert!(a.validate().is_err());

        let mut gt = ground_truth("u1", "v1");
        gt.is_ground_truth = false;
        assert!(gt.validate().is_err());
    }
}
