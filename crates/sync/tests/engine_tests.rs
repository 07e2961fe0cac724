//! Pipeline-level tests against the in-memory store: ordering of the
//! phases, the verify/apply barrier, and idempotency.

use std::sync::Arc;

use assert_matches::assert_matches;
use serde_json::json;

use labelpizza_core::records::{AssignmentRecord, AssignmentRole};
use labelpizza_core::report::SyncAction;
use labelpizza_core::EntityType;
use labelpizza_db::{EntityStore, MemoryStore};
use labelpizza_sync::adapters::{AssignmentAdapter, GroundTruthAdapter, VideoAdapter};
use labelpizza_sync::{run_sync, SyncError, SyncOptions};

fn video(uid: &str, url: &str) -> serde_json::Value {
    json!({ "video_uid": uid, "url": url })
}

fn stores() -> (Arc<MemoryStore>, Arc<dyn EntityStore>) {
    let store = Arc::new(MemoryStore::new());
    let dyn_store: Arc<dyn EntityStore> = store.clone();
    (store, dyn_store)
}

#[tokio::test]
async fn syncing_the_same_batch_twice_skips_everything() {
    let (store, dyn_store) = stores();
    let options = SyncOptions::default();
    let batch = vec![video("v1", "http://cdn/1.mp4"), video("v2", "http://cdn/2.mp4")];

    let report = run_sync(Arc::new(VideoAdapter), Arc::clone(&dyn_store), &batch, &options)
        .await
        .unwrap();
    assert_eq!(report.created, 2);
    assert_eq!(store.mutations(), 2);

    let report = run_sync(Arc::new(VideoAdapter), dyn_store, &batch, &options)
        .await
        .unwrap();
    assert_eq!(report.created, 0);
    assert_eq!(report.skipped, 2);
    assert_eq!(store.mutations(), 2);
}

#[tokio::test]
async fn unknown_field_is_a_structural_error() {
    let (store, dyn_store) = stores();
    let batch = vec![json!({ "video_uid": "v1", "url": "http://cdn/1.mp4", "director": "x" })];

    let err = run_sync(Arc::new(VideoAdapter), dyn_store, &batch, &SyncOptions::default())
        .await
        .unwrap_err();
    assert_matches!(err, SyncError::Validation(_));
    assert!(err.to_string().contains("director"), "field not named: {err}");
    assert_eq!(store.mutations(), 0);
}

#[tokio::test]
async fn validation_reports_every_failing_record() {
    let (store, dyn_store) = stores();
    let batch = vec![video("v1", "  "), video("v2", "")];

    let err = run_sync(Arc::new(VideoAdapter), dyn_store, &batch, &SyncOptions::default())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("2 records"), "not aggregated: {err}");
    assert_eq!(store.mutations(), 0);
}

#[tokio::test]
async fn duplicate_keys_are_rejected_before_any_write() {
    let (store, dyn_store) = stores();
    let batch = vec![video("v1", "http://cdn/1.mp4"), video("v1", "http://cdn/other.mp4")];

    let err = run_sync(Arc::new(VideoAdapter), dyn_store, &batch, &SyncOptions::default())
        .await
        .unwrap_err();
    assert_matches!(
        err,
        SyncError::Duplicate { entity: EntityType::Video, ref duplicates }
            if duplicates.len() == 1
                && duplicates[0].key == "v1"
                && duplicates[0].indices == [0, 1]
    );
    // The message names both the key and the colliding record positions.
    assert!(err.to_string().contains("'v1' (records 0, 1)"), "unhelpful: {err}");
    assert_eq!(store.mutations(), 0);
}

#[tokio::test]
async fn failed_verification_leaves_the_store_untouched() {
    let (store, dyn_store) = stores();
    let options = SyncOptions::default();

    let seeded = vec![video("v1", "http://cdn/1.mp4")];
    run_sync(Arc::new(VideoAdapter), Arc::clone(&dyn_store), &seeded, &options)
        .await
        .unwrap();
    assert_eq!(store.mutations(), 1);

    // v2 collides on url with the stored v1; v3 is fine on its own, but the
    // whole batch must fail verification with no record applied.
    let batch = vec![video("v2", "http://cdn/1.mp4"), video("v3", "http://cdn/3.mp4")];
    let err = run_sync(Arc::new(VideoAdapter), dyn_store, &batch, &options)
        .await
        .unwrap_err();
    assert_matches!(
        err,
        SyncError::Verification { entity: EntityType::Video, ref failures } if failures.len() == 1
    );
    assert_eq!(store.mutations(), 1);
    assert!(store.get_video("v3").await.unwrap().is_none());
}

#[tokio::test]
async fn two_submitters_for_one_ground_truth_question_collide() {
    let (store, dyn_store) = stores();
    let batch = vec![
        json!({
            "question_group_title": "Quality",
            "project_name": "Demo",
            "user_name": "alice",
            "video_uid": "v1",
            "answers": { "Is it blurry?": "yes" }
        }),
        json!({
            "question_group_title": "Quality",
            "project_name": "Demo",
            "user_name": "bob",
            "video_uid": "v1",
            "answers": { "Is it blurry?": "no" }
        }),
    ];

    // Ground truth is user-independent, so the duplicate check fires even
    // though the submitters differ. Nothing is looked up or written.
    let err = run_sync(
        Arc::new(GroundTruthAdapter),
        dyn_store,
        &batch,
        &SyncOptions::default(),
    )
    .await
    .unwrap_err();
    assert_matches!(err, SyncError::Duplicate { entity: EntityType::GroundTruth, .. });
    assert_eq!(store.mutations(), 0);
}

#[tokio::test]
async fn inactive_assignment_removes_the_row_or_skips_when_absent() {
    let (store, dyn_store) = stores();
    store
        .insert_assignment(&AssignmentRecord {
            user_name: "alice".to_string(),
            project_name: "Demo".to_string(),
            role: AssignmentRole::Annotator,
            user_weight: None,
            is_active: true,
        })
        .await
        .unwrap();

    let batch = vec![
        json!({ "user_name": "alice", "project_name": "Demo", "role": "annotator", "is_active": false }),
        json!({ "user_name": "bob", "project_name": "Demo", "role": "annotator", "is_active": false }),
    ];
    let report = run_sync(
        Arc::new(AssignmentAdapter),
        dyn_store,
        &batch,
        &SyncOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(report.removed, 1);
    assert_eq!(report.skipped, 1);
    let skipped = report
        .outcomes
        .iter()
        .find(|o| o.action == SyncAction::Skipped)
        .unwrap();
    assert_eq!(skipped.reason.as_deref(), Some("not assigned"));
    assert!(store
        .get_assignment("alice", "Demo", AssignmentRole::Annotator)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn admin_role_cannot_be_granted_through_sync() {
    let (store, dyn_store) = stores();
    let batch = vec![json!({ "user_name": "alice", "project_name": "Demo", "role": "admin" })];

    let err = run_sync(
        Arc::new(AssignmentAdapter),
        dyn_store,
        &batch,
        &SyncOptions::default(),
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("admin"), "role not named: {err}");
    assert_eq!(store.mutations(), 0);
}
