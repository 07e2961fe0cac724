//! Exact field-set (structural) validation for raw workspace JSON.
//!
//! Every record's key set must equal its entity type's required fields plus
//! a subset of the allowed optional fields. A missing or unexpected field is
//! a hard error for the whole batch: schema drift in input data must
//! surface immediately rather than be silently ignored. Validation runs
//! before any typed deserialization and before any store access.

use serde::de::DeserializeOwned;

use crate::error::CoreError;
use crate::keys::EntityType;
use crate::report::truncated_list;

/// One record whose key set does not match the entity type's field list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSetViolation {
    /// Index of the record within its input batch.
    pub index: usize,
    /// Required fields absent from the record.
    pub missing: Vec<String>,
    /// Fields present on the record but not declared for the entity type.
    pub unexpected: Vec<String>,
}

impl std::fmt::Display for FieldSetViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();
        if !self.missing.is_empty() {
            parts.push(format!("missing {}", truncated_list(&self.missing)));
        }
        if !self.unexpected.is_empty() {
            parts.push(format!("unexpected {}", truncated_list(&self.unexpected)));
        }
        write!(f, "record #{}: {}", self.index, parts.join("; "))
    }
}

/// Check one JSON object's key set against the declared fields.
///
/// Returns `None` when the set is acceptable.
pub fn check_field_set(
    index: usize,
    value: &serde_json::Value,
    required: &[&str],
    optional: &[&str],
) -> Option<FieldSetViolation> {
    let object = match value.as_object() {
        Some(object) => object,
        None => {
            return Some(FieldSetViolation {
                index,
                missing: required.iter().map(|s| s.to_string()).collect(),
                unexpected: vec!["(not a JSON object)".to_string()],
            })
        }
    };

    let missing: Vec<String> = required
        .iter()
        .filter(|f| !object.contains_key(**f))
        .map(|f| f.to_string())
        .collect();
    let unexpected: Vec<String> = object
        .keys()
        .filter(|k| !required.contains(&k.as_str()) && !optional.contains(&k.as_str()))
        .cloned()
        .collect();

    if missing.is_empty() && unexpected.is_empty() {
        None
    } else {
        Some(FieldSetViolation {
            index,
            missing,
            unexpected,
        })
    }
}

/// Structurally validate and deserialize a whole batch.
///
/// All field-set violations are collected and reported together; nothing is
/// deserialized until every record's key set checks out.
pub fn parse_batch<T: DeserializeOwned>(
    entity: EntityType,
    values: &[serde_json::Value],
    required: &[&str],
    optional: &[&str],
) -> Result<Vec<T>, CoreError> {
    let violations: Vec<FieldSetViolation> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| check_field_set(i, v, required, optional))
        .collect();

    if !violations.is_empty() {
        let rendered: Vec<String> = violations.iter().map(|v| v.to_string()).collect();
        return Err(CoreError::Validation(format!(
            "{entity} batch failed structural validation ({} of {} records): {}",
            violations.len(),
            values.len(),
            truncated_list(&rendered)
        )));
    }

    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            serde_json::from_value(v.clone()).map_err(|e| {
                CoreError::Validation(format!("{entity} record #{i} failed to parse: {e}"))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::VideoRecord;
    use serde_json::json;

    #[test]
    fn exact_field_set_passes() {
        let value = json!({"video_uid": "v1", "url": "http://x/v1.mp4"});
        assert!(check_field_set(
            0,
            &value,
            VideoRecord::REQUIRED_FIELDS,
            VideoRecord::OPTIONAL_FIELDS
        )
        .is_none());
    }

    #[test]
    fn unexpected_field_is_a_violation() {
        let value = json!({"video_uid": "v1", "url": "u", "durration": 3});
        let violation = check_field_set(
            0,
            &value,
            VideoRecord::REQUIRED_FIELDS,
            VideoRecord::OPTIONAL_FIELDS,
        )
        .expect("should be rejected");
        assert_eq!(violation.unexpected, vec!["durration".to_string()]);
    }

    #[test]
    fn missing_required_field_is_a_violation() {
        let value = json!({"video_uid": "v1"});
        let violation = check_field_set(
            0,
            &value,
            VideoRecord::REQUIRED_FIELDS,
            VideoRecord::OPTIONAL_FIELDS,
        )
        .expect("should be rejected");
        assert_eq!(violation.missing, vec!["url".to_string()]);
    }

    #[test]
    fn parse_batch_reports_every_violating_index() {
        let values = vec![
            json!({"video_uid": "v1", "url": "u1"}),
            json!({"video_uid": "v2"}),
            json!({"video_uid": "v3", "url": "u3", "bogus": 1}),
        ];
        let err = parse_batch::<VideoRecord>(
            EntityType::Video,
            &values,
            VideoRecord::REQUIRED_FIELDS,
            VideoRecord::OPTIONAL_FIELDS,
        )
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("record #1"), "{msg}");
        assert!(msg.contains("record #2"), "{msg}");
    }

    #[test]
    fn parse_batch_yields_typed_records() {
        let values = vec![json!({"video_uid": "v1", "url": "u1", "is_archived": true})];
        let records = parse_batch::<VideoRecord>(
            EntityType::Video,
            &values,
            VideoRecord::REQUIRED_FIELDS,
            VideoRecord::OPTIONAL_FIELDS,
        )
        .unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].is_archived);
    }

    #[test]
    fn non_object_record_is_a_violation() {
        let values = vec![json!([1, 2, 3])];
        assert!(parse_batch::<VideoRecord>(
            EntityType::Video,
            &values,
            VideoRecord::REQUIRED_FIELDS,
            VideoRecord::OPTIONAL_FIELDS,
        )
        .is_err());
    }
}
