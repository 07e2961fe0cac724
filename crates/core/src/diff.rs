//! Diff engine: key-by-key comparison of two record collections.
//!
//! Pure — no store access, no async. Both the workspace compare report and
//! the merge engine are built on this. Key functions are injected by the
//! caller so the same per-entity-type natural key is used here, in merge,
//! and in sync duplicate detection.

use std::collections::HashMap;

use serde::Serialize;

use crate::keys::EntityKey;

// ---------------------------------------------------------------------------
// Diff status
// ---------------------------------------------------------------------------

/// The status of an item in a diff comparison.
///
/// - `Added`     -- present only in the right/incoming side.
/// - `Removed`   -- present only in the left/current side.
/// - `Changed`   -- present in both sides but with different values.
/// - `Unchanged` -- present in both sides with identical values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffStatus {
    Added,
    Removed,
    Changed,
    Unchanged,
}

impl DiffStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Changed => "changed",
            Self::Unchanged => "unchanged",
        }
    }
}

impl std::fmt::Display for DiffStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Collection diff
// ---------------------------------------------------------------------------

/// A pair of records sharing a key but differing in content.
#[derive(Debug, Clone, Serialize)]
pub struct DiffPair<T> {
    pub key: EntityKey,
    pub left: T,
    pub right: T,
}

/// Count block for a collection diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub identical: usize,
    pub left_only: usize,
    pub right_only: usize,
    pub different: usize,
}

/// Result of diffing two collections by natural key.
///
/// Membership is stable: `left_only` and `different` follow the left
/// collection's input order, `right_only` the right's.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionDiff<T> {
    pub identical: Vec<EntityKey>,
    pub left_only: Vec<T>,
    pub right_only: Vec<T>,
    pub different: Vec<DiffPair<T>>,
}

impl<T> CollectionDiff<T> {
    pub fn summary(&self) -> DiffSummary {
        DiffSummary {
            identical: self.identical.len(),
            left_only: self.left_only.len(),
            right_only: self.right_only.len(),
            different: self.different.len(),
        }
    }

    /// True when both collections hold exactly the same records.
    pub fn is_identical(&self) -> bool {
        self.left_only.is_empty() && self.right_only.is_empty() && self.different.is_empty()
    }
}

/// Deep equality through JSON canonicalization, so records compare the same
/// way they serialize.
fn deep_equal<T: Serialize>(a: &T, b: &T) -> bool {
    serde_json::to_value(a).ok() == serde_json::to_value(b).ok()
}

/// Diff two collections using the injected key function.
pub fn diff_collections<T, F>(key_fn: F, left: &[T], right: &[T]) -> CollectionDiff<T>
where
    T: Clone + Serialize,
    F: Fn(&T) -> EntityKey,
{
    let right_by_key: HashMap<EntityKey, &T> = right.iter().map(|r| (key_fn(r), r)).collect();
    let left_keys: std::collections::HashSet<EntityKey> = left.iter().map(|r| key_fn(r)).collect();

    let mut diff = CollectionDiff {
        identical: Vec::new(),
        left_only: Vec::new(),
        right_only: Vec::new(),
        different: Vec::new(),
    };

    for record in left {
        let key = key_fn(record);
        match right_by_key.get(&key) {
            None => diff.left_only.push(record.clone()),
            Some(other) if deep_equal(record, *other) => diff.identical.push(key),
            Some(other) => diff.different.push(DiffPair {
                key,
                left: record.clone(),
                right: (*other).clone(),
            }),
        }
    }
    for record in right {
        if !left_keys.contains(&key_fn(record)) {
            diff.right_only.push(record.clone());
        }
    }
    diff
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::VideoRecord;

    fn video(uid: &str, url: &str) -> VideoRecord {
        VideoRecord {
            video_uid: uid.to_string(),
            url: url.to_string(),
            metadata: serde_json::json!({}),
            is_archived: false,
        }
    }

    #[test]
    fn partitions_all_four_ways() {
        let left = vec![
            video("v1", "u1"),
            video("v2", "u2"),
            video("v3", "u3-old"),
        ];
        let right = vec![
            video("v2", "u2"),
            video("v3", "u3-new"),
            video("v4", "u4"),
        ];

        let diff = diff_collections(|v: &VideoRecord| v.natural_key(), &left, &right);
        assert_eq!(diff.identical, vec![EntityKey::single("v2")]);
        assert_eq!(diff.left_only.len(), 1);
        assert_eq!(diff.left_only[0].video_uid, "v1");
        assert_eq!(diff.right_only.len(), 1);
        assert_eq!(diff.right_only[0].video_uid, "v4");
        assert_eq!(diff.different.len(), 1);
        assert_eq!(diff.different[0].key, EntityKey::single("v3"));

        let summary = diff.summary();
        assert_eq!(summary.identical, 1);
        assert_eq!(summary.different, 1);
    }

    #[test]
    fn identical_collections_report_clean() {
        let records = vec![video("v1", "u1")];
        let diff = diff_collections(|v: &VideoRecord| v.natural_key(), &records, &records);
        assert!(diff.is_identical());
    }

    #[test]
    fn status_strings_are_stable() {
        assert_eq!(DiffStatus::Added.as_str(), "added");
        assert_eq!(DiffStatus::Removed.as_str(), "removed");
        assert_eq!(DiffStatus::Changed.as_str(), "changed");
        assert_eq!(DiffStatus::Unchanged.as_str(), "unchanged");
    }
}
