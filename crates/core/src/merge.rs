//! Merge engine: combine two record collections into one under a
//! whole-record conflict policy.
//!
//! Pure, like the diff engine, and keyed by the same injected natural-key
//! functions. A conflict is a shared key with differing content; the policy
//! decides which side wins, and every conflict is reported regardless.

use std::collections::HashMap;

use serde::Serialize;

use crate::keys::EntityKey;

/// Which side wins when both collections define a key with different
/// content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Keep the first collection's record.
    PreferFirst,
    /// Keep the second collection's record.
    PreferSecond,
}

impl ConflictPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreferFirst => "prefer_first",
            Self::PreferSecond => "prefer_second",
        }
    }
}

/// One conflicting key, with both records and the side that was kept.
#[derive(Debug, Clone, Serialize)]
pub struct MergeConflict<T> {
    pub key: EntityKey,
    pub first: T,
    pub second: T,
    pub kept: ConflictPolicy,
}

/// The merged collection plus the conflict report.
#[derive(Debug, Clone, Serialize)]
pub struct MergeOutcome<T> {
    /// First collection's records in input order (with conflicts resolved
    /// per policy), then second-only records in input order.
    pub merged: Vec<T>,
    pub conflicts: Vec<MergeConflict<T>>,
}

fn deep_equal<T: Serialize>(a: &T, b: &T) -> bool {
    serde_json::to_value(a).ok() == serde_json::to_value(b).ok()
}

/// Merge two collections using the injected key function.
pub fn merge_collections<T, F>(
    key_fn: F,
    first: &[T],
    second: &[T],
    policy: ConflictPolicy,
) -> MergeOutcome<T>
where
    T: Clone + Serialize,
    F: Fn(&T) -> EntityKey,
{
    let second_by_key: HashMap<EntityKey, &T> = second.iter().map(|r| (key_fn(r), r)).collect();
    let first_keys: std::collections::HashSet<EntityKey> =
        first.iter().map(|r| key_fn(r)).collect();

    let mut merged = Vec::with_capacity(first.len() + second.len());
    let mut conflicts = Vec::new();

    for record in first {
        let key = key_fn(record);
        match second_by_key.get(&key) {
            Some(other) if !deep_equal(record, *other) => {
                let kept = match policy {
                    ConflictPolicy::PreferFirst => record.clone(),
                    ConflictPolicy::PreferSecond => (*other).clone(),
                };
                conflicts.push(MergeConflict {
                    key,
                    first: record.clone(),
                    second: (*other).clone(),
                    kept: policy,
                });
                merged.push(kept);
            }
            _ => merged.push(record.clone()),
        }
    }
    for record in second {
        if !first_keys.contains(&key_fn(record)) {
            merged.push(record.clone());
        }
    }

    MergeOutcome { merged, conflicts }
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

    fn key(v: &VideoRecord) -> EntityKey {
        v.natural_key()
    }

    #[test]
    fn prefer_first_keeps_first_value_and_reports_one_conflict() {
        let first = vec![video("v1", "first-url")];
        let second = vec![video("v1", "second-url")];

        let outcome = merge_collections(key, &first, &second, ConflictPolicy::PreferFirst);
        assert_eq!(outcome.merged.len(), 1);
        assert_eq!(outcome.merged[0].url, "first-url");
        assert_eq!(outcome.conflicts.len(), 1);
        assert_eq!(outcome.conflicts[0].key, EntityKey::single("v1"));
    }

    #[test]
    fn prefer_second_keeps_second_value_for_the_same_key() {
        let first = vec![video("v1", "first-url")];
        let second = vec![video("v1", "second-url")];

        let outcome = merge_collections(key, &first, &second, ConflictPolicy::PreferSecond);
        assert_eq!(outcome.merged[0].url, "second-url");
        assert_eq!(outcome.conflicts.len(), 1);
    }

    #[test]
    fn equal_records_do_not_conflict() {
        let first = vec![video("v1", "u")];
        let second = vec![video("v1", "u"), video("v2", "u2")];

        let outcome = merge_collections(key, &first, &second, ConflictPolicy::PreferFirst);
        assert!(outcome.conflicts.is_empty());
        assert_eq!(outcome.merged.len(), 2);
    }

    #[test]
    fn union_preserves_input_order() {
        let first = vec![video("b", "u1"), video("a", "u2")];
        let second = vec![video("c", "u3")];

        let outcome = merge_collections(key, &first, &second, ConflictPolicy::PreferFirst);
        let uids: Vec<&str> = outcome.merged.iter().map(|v| v.video_uid.as_str()).collect();
        assert_eq!(uids, vec!["b", "a", "c"]);
    }
}
