//! Sync report types: the per-pipeline outcome summary returned by the
//! orchestrator and rendered by the CLI.

use serde::{Deserialize, Serialize};

use crate::keys::{EntityKey, EntityType};

/// How many offending keys an aggregated error message lists before
/// collapsing the rest into an "…and N more" suffix.
pub const MAX_LISTED_KEYS: usize = 5;

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// Action taken on a single record during a sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    Created,
    Updated,
    Removed,
    Skipped,
}

impl SyncAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Removed => "removed",
            Self::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for SyncAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Per-record outcome
// ---------------------------------------------------------------------------

/// One mutable field that differs between the stored and desired record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    /// Field name, e.g. `"description"` or `"question_order"`.
    pub field: String,
    /// Stored value before the update.
    pub from: serde_json::Value,
    /// Desired value after the update.
    pub to: serde_json::Value,
}

impl FieldChange {
    pub fn new(
        field: impl Into<String>,
        from: impl Into<serde_json::Value>,
        to: impl Into<serde_json::Value>,
    ) -> Self {
        Self {
            field: field.into(),
            from: from.into(),
            to: to.into(),
        }
    }
}

/// The outcome for one desired-state record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordOutcome {
    pub key: EntityKey,
    pub action: SyncAction,
    /// Field-level changes applied by an update. Empty for creates, removes,
    /// and skips.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<FieldChange>,
    /// Why a record was skipped (e.g. `"no changes"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl RecordOutcome {
    pub fn new(key: EntityKey, action: SyncAction) -> Self {
        Self {
            key,
            action,
            changes: Vec::new(),
            reason: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline report
// ---------------------------------------------------------------------------

/// Summary of one entity-type pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    pub entity_type: EntityType,
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
    pub skipped: usize,
    /// Per-record detail, in input order.
    pub outcomes: Vec<RecordOutcome>,
    pub elapsed_ms: u64,
}

impl SyncReport {
    /// Build a report from per-record outcomes, tallying the counters.
    pub fn from_outcomes(
        entity_type: EntityType,
        outcomes: Vec<RecordOutcome>,
        elapsed_ms: u64,
    ) -> Self {
        let mut report = Self {
            entity_type,
            created: 0,
            updated: 0,
            removed: 0,
            skipped: 0,
            outcomes: Vec::new(),
            elapsed_ms,
        };
        for outcome in &outcomes {
            match outcome.action {
                SyncAction::Created => report.created += 1,
                SyncAction::Updated => report.updated += 1,
                SyncAction::Removed => report.removed += 1,
                SyncAction::Skipped => report.skipped += 1,
            }
        }
        report.outcomes = outcomes;
        report
    }

    /// Total number of records that reached the report.
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }
}

impl std::fmt::Display for SyncReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} created, {} updated, {} removed, {} skipped",
            self.entity_type, self.created, self.updated, self.removed, self.skipped
        )
    }
}

// ---------------------------------------------------------------------------
// List truncation
// ---------------------------------------------------------------------------

/// Join `items` with commas, keeping at most [`MAX_LISTED_KEYS`] entries and
/// summarizing the remainder as "…and N more".
pub fn truncated_list<S: AsRef<str>>(items: &[S]) -> String {
    truncated_list_max(items, MAX_LISTED_KEYS)
}

/// As [`truncated_list`], with an explicit cap.
pub fn truncated_list_max<S: AsRef<str>>(items: &[S], max: usize) -> String {
    if items.len() <= max {
        return items
            .iter()
            .map(|s| s.as_ref())
            .collect::<Vec<_>>()
            .join(", ");
    }
    let shown = items[..max]
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(", ");
    format!("{shown}, ...and {} more", items.len() - max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_counts_match_outcomes() {
        let outcomes = vec![
            RecordOutcome::new(EntityKey::single("a"), SyncAction::Created),
            RecordOutcome::new(EntityKey::single("b"), SyncAction::Updated),
            RecordOutcome::new(EntityKey::single("c"), SyncAction::Skipped),
            RecordOutcome::new(EntityKey::single("d"), SyncAction::Skipped),
        ];
        let report = SyncReport::from_outcomes(EntityType::Video, outcomes, 12);
        assert_eq!(report.created, 1);
        assert_eq!(report.updated, 1);
        assert_eq!(report.removed, 0);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.total(), 4);
    }

    #[test]
    fn display_is_one_line_summary() {
        let report = SyncReport::from_outcomes(EntityType::User, Vec::new(), 0);
        assert_eq!(
            format!("{report}"),
            "user: 0 created, 0 updated, 0 removed, 0 skipped"
        );
    }

    #[test]
    fn short_lists_are_not_truncated() {
        assert_eq!(truncated_list(&["a", "b"]), "a, b");
    }

    #[test]
    fn long_lists_get_and_n_more_suffix() {
        let items: Vec<String> = (0..8).map(|i| format!("k{i}")).collect();
        assert_eq!(
            truncated_list(&items),
            "k0, k1, k2, k3, k4, ...and 3 more"
        );
    }
}
