//! Desired-state record types for the nine workspace entity types.
//!
//! Each record type carries:
//!
//! - serde derives matching the workspace JSON layout,
//! - `REQUIRED_FIELDS` / `OPTIONAL_FIELDS` constants consumed by the
//!   structural validator in [`crate::fields`],
//! - a `natural_key()` method — the single definition of that entity
//!   type's key, shared by the diff, merge, and sync engines,
//! - pure validation and update-planning helpers (no I/O).

pub mod annotation;
pub mod assignment;
pub mod project;
pub mod project_group;
pub mod question;
pub mod question_group;
pub mod schema;
pub mod user;
pub mod video;

pub use annotation::{AnnotationRecord, GroundTruthRecord};
pub use assignment::{AssignmentRecord, AssignmentRole};
pub use project::{reconcile_custom_displays, CustomDisplayPlan, CustomDisplayRecord, ProjectRecord};
pub use project_group::ProjectGroupRecord;
pub use question::{QuestionRecord, QuestionType};
pub use question_group::QuestionGroupRecord;
pub use schema::SchemaRecord;
pub use user::{UserRecord, UserType};
pub use video::VideoRecord;

/// Compare two member lists as sets, ignoring order.
///
/// Returns `(missing, extra)`: members present only in `existing` and
/// members present only in `desired`. Both empty means the sets match.
pub(crate) fn member_set_diff(existing: &[String], desired: &[String]) -> (Vec<String>, Vec<String>) {
    let missing: Vec<String> = existing
        .iter()
        .filter(|m| !desired.contains(m))
        .cloned()
        .collect();
    let extra: Vec<String> = desired
        .iter()
        .filter(|m| !existing.contains(m))
        .cloned()
        .collect();
    (missing, extra)
}

/// JSON value for a string list, used when building [`crate::report::FieldChange`]s.
pub(crate) fn json_list(items: &[String]) -> serde_json::Value {
    serde_json::Value::Array(
        items
            .iter()
            .map(|s| serde_json::Value::String(s.clone()))
            .collect(),
    )
}
