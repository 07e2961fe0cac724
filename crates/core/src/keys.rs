//! Entity-type and natural-key identifiers shared by the diff, merge, and
//! sync engines.
//!
//! Every workspace entity is identified by a natural key (a human-meaningful
//! string such as a `video_uid` or a `schema_name`), never by a database
//! surrogate id. Composite keys (assignments, annotations, ground truths)
//! join their parts with a fixed separator so they hash, order, and display
//! consistently everywhere.

use serde::{Deserialize, Serialize};

/// Separator used when joining composite-key parts.
const KEY_SEPARATOR: &str = " / ";

// ---------------------------------------------------------------------------
// Entity types
// ---------------------------------------------------------------------------

/// The nine entity types handled by the workspace sync pipelines, in no
/// particular order. Dependency ordering lives in the workspace pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Video,
    User,
    QuestionGroup,
    Schema,
    Project,
    ProjectGroup,
    Assignment,
    Annotation,
    GroundTruth,
}

impl EntityType {
    /// String form used in reports, log events, and file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::User => "user",
            Self::QuestionGroup => "question_group",
            Self::Schema => "schema",
            Self::Project => "project",
            Self::ProjectGroup => "project_group",
            Self::Assignment => "assignment",
            Self::Annotation => "annotation",
            Self::GroundTruth => "ground_truth",
        }
    }

    /// Parse an entity type string. Returns `None` for unknown values.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "video" => Some(Self::Video),
            "user" => Some(Self::User),
            "question_group" => Some(Self::QuestionGroup),
            "schema" => Some(Self::Schema),
            "project" => Some(Self::Project),
            "project_group" => Some(Self::ProjectGroup),
            "assignment" => Some(Self::Assignment),
            "annotation" => Some(Self::Annotation),
            "ground_truth" => Some(Self::GroundTruth),
            _ => None,
        }
    }

    /// All entity types in workspace dependency order: later types refer to
    /// earlier ones by natural key, so sync must process them in this order.
    pub const SYNC_ORDER: &'static [EntityType] = &[
        Self::Video,
        Self::User,
        Self::QuestionGroup,
        Self::Schema,
        Self::Project,
        Self::ProjectGroup,
        Self::Assignment,
        Self::Annotation,
        Self::GroundTruth,
    ];
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Natural keys
// ---------------------------------------------------------------------------

/// A natural key, possibly composite.
///
/// Defined exactly once per entity type (on the record types in
/// [`crate::records`]) and shared by the diff, merge, and sync engines so
/// duplicate detection can never diverge between them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityKey(String);

impl EntityKey {
    /// Build a single-part key.
    pub fn single(part: &str) -> Self {
        Self(part.to_string())
    }

    /// Build a composite key from ordered parts.
    pub fn composite(parts: &[&str]) -> Self {
        Self(parts.join(KEY_SEPARATOR))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_type_round_trips_through_strings() {
        for et in EntityType::SYNC_ORDER {
            assert_eq!(EntityType::from_str(et.as_str()), Some(*et));
        }
        assert_eq!(EntityType::from_str("nonsense"), None);
    }

    #[test]
    fn sync_order_covers_all_nine_types() {
        assert_eq!(EntityType::SYNC_ORDER.len(), 9);
    }

    #[test]
    fn composite_keys_are_order_sensitive() {
        let a = EntityKey::composite(&["v1", "u1", "p1"]);
        let b = EntityKey::composite(&["u1", "v1", "p1"]);
        assert_ne!(a, b);
        assert_eq!(a.as_str(), "v1 / u1 / p1");
    }

    #[test]
    fn display_matches_as_str() {
        let key = EntityKey::single("alpha");
        assert_eq!(format!("{key}"), "alpha");
    }
}
