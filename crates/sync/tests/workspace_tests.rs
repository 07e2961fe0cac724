//! Folder-level tests: loading, dependency-ordered sync, export, compare,
//! and merge against real directories.

use std::path::Path;
use std::sync::Arc;

use serde_json::json;
use tempfile::tempdir;

use labelpizza_core::report::SyncAction;
use labelpizza_core::EntityType;
use labelpizza_db::{EntityStore, MemoryStore};
use labelpizza_sync::compare::compare_workspaces;
use labelpizza_sync::engine::SyncOptions;
use labelpizza_sync::merge::merge_workspaces;
use labelpizza_sync::typed::TypedWorkspace;
use labelpizza_sync::{export_workspace, load_workspace, sync_workspace};

use labelpizza_core::merge::ConflictPolicy;

fn write(path: &Path, value: serde_json::Value) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
}

/// A small but complete workspace: two videos, two users, one two-question
/// group, one schema, one project, annotations and ground truth for v1.
fn write_demo_workspace(dir: &Path) {
    write(
        &dir.join("videos.json"),
        json!([
            { "video_uid": "v1", "url": "http://cdn/1.mp4" },
            { "video_uid": "v2", "url": "http://cdn/2.mp4" },
        ]),
    );
    write(
        &dir.join("users.json"),
        json!([
            { "user_id": "alice", "email": "alice@example.com", "password": "pw", "user_type": "human" },
            { "user_id": "root", "email": "root@example.com", "user_type": "admin" },
        ]),
    );
    write(
        &dir.join("question_groups/Quality.json"),
        json!({
            "title": "Quality",
            "questions": [
                { "text": "Is it blurry?", "qtype": "single", "options": ["yes", "no"] },
                { "text": "Describe the scene", "qtype": "description" },
            ],
        }),
    );
    write(
        &dir.join("schemas.json"),
        json!([{ "schema_name": "Default", "question_group_names": ["Quality"] }]),
    );
    write(
        &dir.join("projects.json"),
        json!([{ "project_name": "Demo", "schema_name": "Default", "videos": ["v1", "v2"] }]),
    );
    write(
        &dir.join("project_groups.json"),
        json!([{ "project_group_name": "Pilot", "projects": ["Demo"] }]),
    );
    write(
        &dir.join("assignments.json"),
        json!([
            { "user_name": "alice", "project_name": "Demo", "role": "annotator" },
            { "user_name": "root", "project_name": "Demo", "role": "reviewer" },
        ]),
    );
    write(
        &dir.join("annotations/Demo.json"),
        json!([{
            "question_group_title": "Quality",
            "project_name": "Demo",
            "user_name": "alice",
            "video_uid": "v1",
            "answers": { "Is it blurry?": "no", "Describe the scene": "A dog on a beach" },
        }]),
    );
    write(
        &dir.join("ground_truths/Demo.json"),
        json!([{
            "question_group_title": "Quality",
            "project_name": "Demo",
            "user_name": "root",
            "video_uid": "v1",
            "answers": { "Is it blurry?": "no", "Describe the scene": "A dog runs on a beach" },
        }]),
    );
}

fn stores() -> (Arc<MemoryStore>, Arc<dyn EntityStore>) {
    let store = Arc::new(MemoryStore::new());
    let dyn_store: Arc<dyn EntityStore> = store.clone();
    (store, dyn_store)
}

#[tokio::test]
async fn empty_folder_loads_as_empty_batches_and_syncs() {
    let dir = tempdir().unwrap();
    let data = load_workspace(dir.path()).unwrap();
    assert_eq!(data.total_records(), 0);

    let (_, dyn_store) = stores();
    let outcome = sync_workspace(dyn_store, &data, &SyncOptions::default()).await;
    assert!(outcome.is_success());
    assert_eq!(outcome.reports.len(), 9);
}

#[tokio::test]
async fn full_workspace_syncs_and_is_idempotent() {
    let dir = tempdir().unwrap();
    write_demo_workspace(dir.path());
    let data = load_workspace(dir.path()).unwrap();

    let (store, dyn_store) = stores();
    let options = SyncOptions::default();
    let outcome = sync_workspace(Arc::clone(&dyn_store), &data, &options).await;
    assert!(outcome.is_success(), "failure: {:?}", outcome.failure);
    let created: Vec<usize> = outcome.reports.iter().map(|r| r.created).collect();
    // videos, users, question groups, schemas, projects, project groups,
    // assignments, annotations, ground truths
    assert_eq!(created, vec![2, 2, 1, 1, 1, 1, 2, 1, 1]);

    let writes_after_first = store.mutations();
    let outcome = sync_workspace(dyn_store, &data, &options).await;
    assert!(outcome.is_success());
    for report in &outcome.reports {
        assert_eq!(report.created, 0, "{report}");
        assert_eq!(report.updated, 0, "{report}");
        assert_eq!(report.removed, 0, "{report}");
    }
    assert_eq!(store.mutations(), writes_after_first);
}

#[tokio::test]
async fn sync_halts_at_the_first_failing_pipeline() {
    let dir = tempdir().unwrap();
    write(
        &dir.path().join("videos.json"),
        json!([{ "video_uid": "v1", "url": "http://cdn/1.mp4" }]),
    );
    // Human account without an email fails user validation.
    write(
        &dir.path().join("users.json"),
        json!([{ "user_id": "alice", "user_type": "human" }]),
    );
    write(
        &dir.path().join("project_groups.json"),
        json!([{ "project_group_name": "Pilot" }]),
    );

    let (_, dyn_store) = stores();
    let data = load_workspace(dir.path()).unwrap();
    let outcome = sync_workspace(dyn_store, &data, &SyncOptions::default()).await;

    assert!(!outcome.is_success());
    let (entity, _) = outcome.failure.unwrap();
    assert_eq!(entity, EntityType::User);
    // Only the video pipeline ran before the halt.
    assert_eq!(outcome.reports.len(), 1);
    assert_eq!(outcome.reports[0].entity_type, EntityType::Video);
}

#[tokio::test]
async fn reordering_question_group_members_is_an_update() {
    let dir = tempdir().unwrap();
    write_demo_workspace(dir.path());
    let (_, dyn_store) = stores();
    let options = SyncOptions::default();
    let data = load_workspace(dir.path()).unwrap();
    assert!(sync_workspace(Arc::clone(&dyn_store), &data, &options).await.is_success());

    write(
        &dir.path().join("question_groups/Quality.json"),
        json!({
            "title": "Quality",
            "questions": [
                { "text": "Describe the scene", "qtype": "description" },
                { "text": "Is it blurry?", "qtype": "single", "options": ["yes", "no"] },
            ],
        }),
    );
    let data = load_workspace(dir.path()).unwrap();
    let outcome = sync_workspace(dyn_store, &data, &options).await;
    assert!(outcome.is_success(), "failure: {:?}", outcome.failure);

    let report = outcome
        .reports
        .iter()
        .find(|r| r.entity_type == EntityType::QuestionGroup)
        .unwrap();
    assert_eq!(report.updated, 1);
    let outcome = report
        .outcomes
        .iter()
        .find(|o| o.action == SyncAction::Updated)
        .unwrap();
    assert!(outcome.changes.iter().any(|c| c.field == "question_order"));
}

#[tokio::test]
async fn changing_the_question_set_halts_the_sync() {
    let dir = tempdir().unwrap();
    write_demo_workspace(dir.path());
    let (_, dyn_store) = stores();
    let options = SyncOptions::default();
    let data = load_workspace(dir.path()).unwrap();
    assert!(sync_workspace(Arc::clone(&dyn_store), &data, &options).await.is_success());

    write(
        &dir.path().join("question_groups/Quality.json"),
        json!({
            "title": "Quality",
            "questions": [
                { "text": "Is it blurry?", "qtype": "single", "options": ["yes", "no"] },
                { "text": "Is it dark?", "qtype": "single", "options": ["yes", "no"] },
            ],
        }),
    );
    let data = load_workspace(dir.path()).unwrap();
    let outcome = sync_workspace(dyn_store, &data, &options).await;

    let (entity, error) = outcome.failure.unwrap();
    assert_eq!(entity, EntityType::QuestionGroup);
    assert!(error.to_string().contains("immutable"), "wrong error: {error}");
}

#[tokio::test]
async fn admin_ground_truth_only_yields_to_another_admin() {
    let dir = tempdir().unwrap();
    write_demo_workspace(dir.path());
    // rita reviews Demo but is not an admin; vera is a second admin.
    write(
        &dir.path().join("users.json"),
        json!([
            { "user_id": "alice", "email": "alice@example.com", "password": "pw", "user_type": "human" },
            { "user_id": "root", "email": "root@example.com", "user_type": "admin" },
            { "user_id": "rita", "email": "rita@example.com", "password": "pw", "user_type": "human" },
            { "user_id": "vera", "email": "vera@example.com", "user_type": "admin" },
        ]),
    );
    write(
        &dir.path().join("assignments.json"),
        json!([
            { "user_name": "alice", "project_name": "Demo", "role": "annotator" },
            { "user_name": "root", "project_name": "Demo", "role": "reviewer" },
            { "user_name": "rita", "project_name": "Demo", "role": "reviewer" },
        ]),
    );

    let (store, dyn_store) = stores();
    let options = SyncOptions::default();
    let data = load_workspace(dir.path()).unwrap();
    let outcome = sync_workspace(Arc::clone(&dyn_store), &data, &options).await;
    assert!(outcome.is_success(), "failure: {:?}", outcome.failure);
    let writes_after_seed = store.mutations();

    // The demo ground truth came from root, an admin, so the stored rows
    // carry the admin stamp. A reviewer changing a stamped answer is
    // refused, with the locking admin and timestamp named.
    write(
        &dir.path().join("ground_truths/Demo.json"),
        json!([{
            "question_group_title": "Quality",
            "project_name": "Demo",
            "user_name": "rita",
            "video_uid": "v1",
            "answers": { "Is it blurry?": "yes", "Describe the scene": "A dog runs on a beach" },
        }]),
    );
    let data = load_workspace(dir.path()).unwrap();
    let outcome = sync_workspace(Arc::clone(&dyn_store), &data, &options).await;
    let (entity, error) = outcome.failure.unwrap();
    assert_eq!(entity, EntityType::GroundTruth);
    let message = error.to_string();
    assert!(message.contains("admin 'root'"), "admin not named: {message}");
    assert!(
        message.contains("cannot be overridden by 'rita'"),
        "submitter not named: {message}"
    );
    assert_eq!(store.mutations(), writes_after_seed);
    let row = store
        .get_ground_truth("v1", "Demo", "Is it blurry?")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.answer, "no");
    assert_eq!(row.admin_user_id.as_deref(), Some("root"));

    // The same change from another admin goes through and restamps the row.
    write(
        &dir.path().join("ground_truths/Demo.json"),
        json!([{
            "question_group_title": "Quality",
            "project_name": "Demo",
            "user_name": "vera",
            "video_uid": "v1",
            "answers": { "Is it blurry?": "yes", "Describe the scene": "A dog runs on a beach" },
        }]),
    );
    let data = load_workspace(dir.path()).unwrap();
    let outcome = sync_workspace(dyn_store, &data, &options).await;
    assert!(outcome.is_success(), "failure: {:?}", outcome.failure);
    let row = store
        .get_ground_truth("v1", "Demo", "Is it blurry?")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.answer, "yes");
    assert_eq!(row.admin_user_id.as_deref(), Some("vera"));
}

#[tokio::test]
async fn export_reproduces_the_synced_workspace() {
    let source = tempdir().unwrap();
    write_demo_workspace(source.path());
    let (store, dyn_store) = stores();
    let data = load_workspace(source.path()).unwrap();
    let outcome = sync_workspace(dyn_store, &data, &SyncOptions::default()).await;
    assert!(outcome.is_success(), "failure: {:?}", outcome.failure);

    let exported = tempdir().unwrap();
    export_workspace(store.as_ref(), exported.path()).await.unwrap();

    let reports = tempdir().unwrap();
    let totals = compare_workspaces(source.path(), exported.path(), reports.path()).unwrap();
    assert!(totals.is_identical(), "export drifted: {totals:?}");
    assert!(reports.path().join("summary.json").exists());
    assert!(reports.path().join("video_diff.json").exists());
}

#[tokio::test]
async fn compare_reports_use_folder_side_keys() {
    let a = tempdir().unwrap();
    write(
        &a.path().join("videos.json"),
        json!([
            { "video_uid": "v1", "url": "http://a/1.mp4" },
            { "video_uid": "v2", "url": "http://a/2.mp4" },
        ]),
    );
    let b = tempdir().unwrap();
    write(
        &b.path().join("videos.json"),
        json!([
            { "video_uid": "v1", "url": "http://b/1.mp4" },
            { "video_uid": "v3", "url": "http://b/3.mp4" },
        ]),
    );

    let out = tempdir().unwrap();
    let totals = compare_workspaces(a.path(), b.path(), out.path()).unwrap();
    assert_eq!(totals.folder1_only, 1);
    assert_eq!(totals.folder2_only, 1);
    assert_eq!(totals.different, 1);

    // The written reports speak folder1/folder2, never the diff engine's
    // internal left/right.
    let report: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(out.path().join("video_diff.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(report["folder1_only"][0]["video_uid"], "v2");
    assert_eq!(report["folder2_only"][0]["video_uid"], "v3");
    assert_eq!(report["summary"]["folder1_only"], 1);
    assert_eq!(report["summary"]["folder2_only"], 1);
    assert!(report.get("left_only").is_none());
    assert!(report.get("right_only").is_none());
}

#[tokio::test]
async fn merge_resolves_conflicts_by_policy() {
    let a = tempdir().unwrap();
    write(
        &a.path().join("videos.json"),
        json!([
            { "video_uid": "v1", "url": "http://a/1.mp4" },
            { "video_uid": "v2", "url": "http://a/2.mp4" },
        ]),
    );
    let b = tempdir().unwrap();
    write(
        &b.path().join("videos.json"),
        json!([
            { "video_uid": "v1", "url": "http://b/1.mp4" },
            { "video_uid": "v3", "url": "http://b/3.mp4" },
        ]),
    );

    let out = tempdir().unwrap();
    let summary =
        merge_workspaces(a.path(), b.path(), out.path(), ConflictPolicy::PreferFirst).unwrap();
    assert_eq!(summary.total_conflicts, 1);
    assert!(out.path().join("merge_conflicts.json").exists());

    let merged = TypedWorkspace::parse(&load_workspace(out.path()).unwrap()).unwrap();
    assert_eq!(merged.videos.len(), 3);
    let v1 = merged.videos.iter().find(|v| v.video_uid == "v1").unwrap();
    assert_eq!(v1.url, "http://a/1.mp4");

    let out = tempdir().unwrap();
    merge_workspaces(a.path(), b.path(), out.path(), ConflictPolicy::PreferSecond).unwrap();
    let merged = TypedWorkspace::parse(&load_workspace(out.path()).unwrap()).unwrap();
    let v1 = merged.videos.iter().find(|v| v.video_uid == "v1").unwrap();
    assert_eq!(v1.url, "http://b/1.mp4");
}
