//! Store-contract tests against the in-memory backend.

use assert_matches::assert_matches;

use labelpizza_core::records::{AssignmentRecord, AssignmentRole, UserRecord, UserType, VideoRecord};
use labelpizza_db::{EntityStore, GroundTruthRow, MemoryStore, StoreError};

fn video(uid: &str, url: &str) -> VideoRecord {
    VideoRecord {
        video_uid: uid.to_string(),
        url: url.to_string(),
        metadata: serde_json::json!({}),
        is_archived: false,
    }
}

fn user(id: &str, email: &str) -> UserRecord {
    UserRecord {
        user_id: id.to_string(),
        email: Some(email.to_string()),
        password: Some("pw".to_string()),
        user_type: UserType::Human,
        is_archived: false,
    }
}

#[tokio::test]
async fn insert_then_get_round_trips() {
    let store = MemoryStore::new();
    store.insert_video(&video("v1", "http://a/v1.mp4")).await.unwrap();

    let found = store.get_video("v1").await.unwrap();
    assert_eq!(found, Some(video("v1", "http://a/v1.mp4")));
    assert_eq!(store.get_video("v2").await.unwrap(), None);
}

#[tokio::test]
async fn insert_existing_key_conflicts() {
    let store = MemoryStore::new();
    store.insert_video(&video("v1", "http://a/v1.mp4")).await.unwrap();

    let err = store
        .insert_video(&video("v1", "http://a/other.mp4"))
        .await
        .unwrap_err();
    assert_matches!(err, StoreError::Conflict(_));
}

#[tokio::test]
async fn update_missing_row_is_not_found() {
    let store = MemoryStore::new();
    let err = store.update_video(&video("v1", "http://a/v1.mp4")).await.unwrap_err();
    assert_matches!(err, StoreError::NotFound { entity: "video", .. });
}

#[tokio::test]
async fn secondary_lookups_match_unique_columns() {
    let store = MemoryStore::new();
    store.insert_video(&video("v1", "http://a/v1.mp4")).await.unwrap();
    store.insert_user(&user("alice", "alice@example.com")).await.unwrap();

    let by_url = store.get_video_by_url("http://a/v1.mp4").await.unwrap();
    assert_eq!(by_url.map(|v| v.video_uid), Some("v1".to_string()));

    let by_email = store.get_user_by_email("alice@example.com").await.unwrap();
    assert_eq!(by_email.map(|u| u.user_id), Some("alice".to_string()));
    assert_eq!(store.get_user_by_email("nobody@example.com").await.unwrap(), None);
}

#[tokio::test]
async fn remove_assignment_deletes_the_row() {
    let store = MemoryStore::new();
    let assignment = AssignmentRecord {
        user_name: "alice".to_string(),
        project_name: "proj".to_string(),
        role: AssignmentRole::Annotator,
        user_weight: Some(2.0),
        is_active: true,
    };
    store.insert_assignment(&assignment).await.unwrap();

    store
        .remove_assignment("alice", "proj", AssignmentRole::Annotator)
        .await
        .unwrap();
    let found = store
        .get_assignment("alice", "proj", AssignmentRole::Annotator)
        .await
        .unwrap();
    assert_eq!(found, None);

    let err = store
        .remove_assignment("alice", "proj", AssignmentRole::Annotator)
        .await
        .unwrap_err();
    assert_matches!(err, StoreError::NotFound { entity: "assignment", .. });
}

#[tokio::test]
async fn ground_truth_is_keyed_without_user() {
    let store = MemoryStore::new();
    let first = GroundTruthRow {
        video_uid: "v1".to_string(),
        project_name: "proj".to_string(),
        question_text: "Is there a pizza?".to_string(),
        answer: "yes".to_string(),
        confidence: None,
        note: None,
        submitted_by: "alice".to_string(),
        admin_user_id: None,
        admin_modified_at: None,
    };
    store.insert_ground_truth(&first).await.unwrap();

    // Same (video, project, question) from a different submitter collides.
    let second = GroundTruthRow {
        submitted_by: "bob".to_string(),
        ..first.clone()
    };
    let err = store.insert_ground_truth(&second).await.unwrap_err();
    assert_matches!(err, StoreError::Conflict(_));
}

#[tokio::test]
async fn mutation_counter_ignores_reads_and_failures() {
    let store = MemoryStore::new();
    assert_eq!(store.mutations(), 0);

    store.insert_video(&video("v1", "http://a/v1.mp4")).await.unwrap();
    assert_eq!(store.mutations(), 1);

    store.get_video("v1").await.unwrap();
    store.list_videos().await.unwrap();
    assert_eq!(store.mutations(), 1);

    let _ = store.insert_video(&video("v1", "http://a/v1.mp4")).await;
    let _ = store.update_video(&video("v9", "http://a/v9.mp4")).await;
    assert_eq!(store.mutations(), 1);

    store.update_video(&video("v1", "http://a/moved.mp4")).await.unwrap();
    assert_eq!(store.mutations(), 2);
}
