//! Controller scenarios against the in-memory store.

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect

use record_lifecycle_core::store::{
    ListQuery, NewRecord, Page, RecordStore, RecordUpdate, StoreFuture,
};
use record_lifecycle_core::{
    Envelope, LifecycleController, LifecycleError, Resource, Status, StoredRecord,
};
use record_lifecycle_testing::fixtures::{Harness, Note, Notebook, editor, params, superadmin};
use record_lifecycle_testing::{InMemoryRecordStore, init_tracing, test_clock};
use serde_json::{Map, Value, json};
use std::sync::Arc;

async fn create_note(harness: &Harness<Note>, name: &str) -> i64 {
    let envelope = harness
        .controller
        .create(&editor(), params(json!({ "name": name })))
        .await
        .expect("create should succeed");
    data(&envelope)["id"].as_i64().expect("id is an integer")
}

fn data(envelope: &Envelope) -> &Value {
    envelope.data.as_ref().expect("envelope carries data")
}

/// Offending field names, sorted.
fn fields(err: &LifecycleError) -> Vec<&str> {
    let mut fields: Vec<&str> = err.field_errors().iter().map(|e| e.field.as_str()).collect();
    fields.sort_unstable();
    fields
}

// ═══════════════════════════════════════════════════════════
// Create
// ═══════════════════════════════════════════════════════════

#[tokio::test]
async fn create_defaults_to_draft_with_first_lock_version() {
    init_tracing();
    let harness = Harness::<Note>::new();

    let envelope = harness
        .controller
        .create(&editor(), params(json!({"name": "A", "tags": ["x"]})))
        .await
        .unwrap();

    assert_eq!(envelope.code, 200);
    assert!(envelope.success);
    assert_eq!(envelope.message, "Record created successfully.");
    let data = data(&envelope);
    assert_eq!(data["status"], 2);
    assert_eq!(data["lockVersion"], 1);
    assert_eq!(data["name"], "A");
    assert_eq!(data["changeLog"]["createdAt"], "2025-01-01T00:00:00Z");
    assert_eq!(data["changeLog"]["createdAtLocal"], "2025-01-01 00:00:00");
    assert_eq!(data["changeLog"]["createdBy"], "editor-1");
    assert!(data["changeLog"].get("updatedAt").is_none());

    let row = harness.row(1).unwrap();
    assert_eq!(row.lock_version, 1);
    assert_eq!(row.status, Status::Draft);
    assert_eq!(harness.mirror.writes(), 1);
    assert!(harness.mirror.document("note", "1").is_some());
}

#[tokio::test]
async fn create_with_undeclared_field_lists_it() {
    let harness = Harness::<Note>::new();

    let err = harness
        .controller
        .create(&editor(), params(json!({"name": "A", "bogusField": "x"})))
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 422);
    assert_eq!(fields(&err), vec!["bogusField"]);
    assert!(harness.store.is_empty("note"));
}

#[tokio::test]
async fn create_cannot_set_lock_version_or_change_log() {
    let harness = Harness::<Note>::new();

    let err = harness
        .controller
        .create(&editor(), params(json!({"name": "A", "lockVersion": 7, "changeLog": {}})))
        .await
        .unwrap_err();

    assert_eq!(fields(&err), vec!["changeLog", "lockVersion"]);
}

#[tokio::test]
async fn create_accumulates_value_errors() {
    let harness = Harness::<Note>::new();

    let err = harness
        .controller
        .create(&editor(), params(json!({"name": null, "tags": "x", "notebookId": "one"})))
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 422);
    assert_eq!(fields(&err), vec!["name", "notebookId", "tags"]);
}

#[tokio::test]
async fn create_requires_declared_required_fields() {
    let harness = Harness::<Note>::new();

    let err = harness
        .controller
        .create(&editor(), params(json!({"description": "no name"})))
        .await
        .unwrap_err();

    assert_eq!(err.field_errors()[0].message, "name is required.");
}

#[tokio::test]
async fn business_validation_runs_after_merge() {
    let harness = Harness::<Note>::new();

    let err = harness
        .controller
        .create(&editor(), params(json!({"name": "A", "tags": ["ok", ""]})))
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 422);
    assert_eq!(fields(&err), vec!["tags"]);
}

#[tokio::test]
async fn restricted_initial_status_requires_superadmin() {
    let harness = Harness::<Notebook>::new();

    let err = harness
        .controller
        .create(&editor(), params(json!({"name": "N", "status": 6})))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 403);
    assert_eq!(err.message(), "This operation requires superadmin.");

    let envelope = harness
        .controller
        .create(&superadmin(), params(json!({"name": "N", "status": 6})))
        .await
        .unwrap();
    assert_eq!(data(&envelope)["status"], 6);
}

// ═══════════════════════════════════════════════════════════
// Update
// ═══════════════════════════════════════════════════════════

#[tokio::test]
async fn round_trip_through_the_lifecycle() {
    let harness = Harness::<Note>::new();
    let controller = &harness.controller;
    let id = create_note(&harness, "A").await;

    let envelope = controller
        .update(&editor(), params(json!({"id": id, "lockVersion": 1, "status": 1})))
        .await
        .unwrap();
    assert_eq!(envelope.message, "Record updated successfully.");
    assert_eq!(data(&envelope)["lockVersion"], 2);
    assert_eq!(harness.row(id).unwrap().lock_version, 2);

    let stale = controller
        .update(&editor(), params(json!({"id": id, "lockVersion": 1, "status": 1})))
        .await
        .unwrap_err();
    assert_eq!(stale.status_code(), 409);
    assert_eq!(stale.message(), "The record has been modified by someone else. Refresh and retry.");

    let envelope = controller
        .update(&editor(), params(json!({"id": id, "lockVersion": 2, "status": 3})))
        .await
        .unwrap();
    assert_eq!(data(&envelope)["status"], 3);
    assert_eq!(data(&envelope)["lockVersion"], 3);

    let err = controller
        .update(&editor(), params(json!({"id": id, "lockVersion": 3, "status": 1})))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 422);
    assert_eq!(err.message(), "Status already Completed.");
    assert_eq!(fields(&err), vec!["status"]);
    assert_eq!(harness.row(id).unwrap().lock_version, 3);
}

#[tokio::test]
async fn update_refreshes_updated_stamp() {
    let harness = Harness::<Note>::new();
    let id = create_note(&harness, "A").await;

    let envelope = harness
        .controller
        .update(&editor(), params(json!({"id": id, "lockVersion": 1, "name": "B"})))
        .await
        .unwrap();

    let data = data(&envelope);
    assert_eq!(data["name"], "B");
    assert_eq!(data["changeLog"]["updatedBy"], "editor-1");
    assert_eq!(data["changeLog"]["createdBy"], "editor-1");
    assert!(data["changeLog"].get("deletedAt").is_none());
    assert_eq!(harness.mirror.document("note", "1").unwrap()["name"], "B");
}

#[tokio::test]
async fn no_op_update_is_rejected() {
    let harness = Harness::<Note>::new();
    let id = create_note(&harness, "A").await;

    let err = harness
        .controller
        .update(&editor(), params(json!({"id": id, "lockVersion": 1, "name": "A", "status": 2})))
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 400);
    assert_eq!(err.message(), "No record updated.");
    assert_eq!(harness.row(id).unwrap().lock_version, 1);
}

#[tokio::test]
async fn stale_version_wins_over_no_op() {
    let harness = Harness::<Note>::new();
    harness.seed(1, Status::Active, 5, json!({"name": "A", "tags": []}));

    let err = harness
        .controller
        .update(&editor(), params(json!({"id": 1, "lockVersion": 4, "name": "A"})))
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 409);
}

#[tokio::test]
async fn id_is_validated_before_anything_else() {
    let harness = Harness::<Note>::new();

    let missing = harness
        .controller
        .update(&editor(), params(json!({"lockVersion": 1, "bogus": 1})))
        .await
        .unwrap_err();
    assert_eq!(missing.status_code(), 400);
    assert_eq!(fields(&missing), vec!["id"]);

    let malformed = harness
        .controller
        .update(&editor(), params(json!({"id": "abc", "lockVersion": 1})))
        .await
        .unwrap_err();
    assert_eq!(malformed.status_code(), 400);

    let unknown = harness
        .controller
        .update(&editor(), params(json!({"id": 99, "lockVersion": 1})))
        .await
        .unwrap_err();
    assert_eq!(unknown.status_code(), 404);
    assert_eq!(unknown.message(), "Note with id 99 not found.");
}

#[tokio::test]
async fn empty_update_is_a_bad_request() {
    let harness = Harness::<Note>::new();
    let id = create_note(&harness, "A").await;

    let err = harness
        .controller
        .update(&editor(), params(json!({ "id": id })))
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 400);
    assert_eq!(err.message(), "Request parameters cannot be empty.");
}

#[tokio::test]
async fn update_requires_lock_version() {
    let harness = Harness::<Note>::new();
    let id = create_note(&harness, "A").await;

    let err = harness
        .controller
        .update(&editor(), params(json!({"id": id, "name": "B"})))
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 422);
    assert_eq!(fields(&err), vec!["lockVersion"]);
}

#[tokio::test]
async fn shape_failure_short_circuits_transition_checks() {
    let harness = Harness::<Note>::new();
    harness.seed(1, Status::Completed, 1, json!({"name": "A"}));

    let err = harness
        .controller
        .update(&editor(), params(json!({"id": 1, "lockVersion": 1, "status": 1, "x": 1, "y": 2})))
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 422);
    assert_eq!(fields(&err), vec!["x", "y"]);
}

#[tokio::test]
async fn leaving_deleted_requires_superadmin() {
    let harness = Harness::<Note>::new();
    harness.seed(1, Status::Deleted, 1, json!({"name": "A"}));

    let err = harness
        .controller
        .update(&editor(), params(json!({"id": 1, "lockVersion": 1, "status": 1})))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 422);
    assert_eq!(err.message(), "A deleted record requires superadmin to change status.");

    let envelope = harness
        .controller
        .update(&superadmin(), params(json!({"id": 1, "lockVersion": 1, "status": 1})))
        .await
        .unwrap();
    assert_eq!(data(&envelope)["status"], 1);
    assert_eq!(data(&envelope)["lockVersion"], 2);
    assert_eq!(data(&envelope)["changeLog"]["updatedBy"], "admin-1");
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_updates_with_same_version_admit_one_writer() {
    let harness = Arc::new(Harness::<Note>::new());
    let id = create_note(&harness, "A").await;

    let handles: Vec<_> = ["B", "C"]
        .into_iter()
        .map(|name| {
            let harness = Arc::clone(&harness);
            tokio::spawn(async move {
                harness
                    .controller
                    .update(&editor(), params(json!({"id": id, "lockVersion": 1, "name": name})))
                    .await
            })
        })
        .collect();

    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.unwrap());
    }

    let successes = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    let conflicts = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, Err(LifecycleError::LockVersionOutdated { .. })))
        .count();
    assert_eq!((successes, conflicts), (1, 1));
    assert_eq!(harness.row(id).unwrap().lock_version, 2);
}

/// Store where another writer commits right after every read by id, so the
/// loaded lock version is already stale when the conditional write runs.
struct InterleavedWriterStore {
    inner: InMemoryRecordStore,
}

impl RecordStore for InterleavedWriterStore {
    fn insert<'a>(&'a self, table: &'a str, record: NewRecord) -> StoreFuture<'a, StoredRecord> {
        self.inner.insert(table, record)
    }

    fn find_by_id<'a>(&'a self, table: &'a str, id: i64) -> StoreFuture<'a, Option<StoredRecord>> {
        Box::pin(async move {
            let loaded = self.inner.find_by_id(table, id).await?;
            if let Some(row) = &loaded {
                let bumped = StoredRecord { lock_version: row.lock_version + 1, ..row.clone() };
                self.inner.seed(table, bumped);
            }
            Ok(loaded)
        })
    }

    fn find_one<'a>(
        &'a self,
        table: &'a str,
        filters: Map<String, Value>,
    ) -> StoreFuture<'a, Option<StoredRecord>> {
        self.inner.find_one(table, filters)
    }

    fn update_if_version<'a>(
        &'a self,
        table: &'a str,
        update: RecordUpdate,
    ) -> StoreFuture<'a, u64> {
        self.inner.update_if_version(table, update)
    }

    fn exists<'a>(&'a self, table: &'a str, field: &'a str, value: Value) -> StoreFuture<'a, bool> {
        self.inner.exists(table, field, value)
    }

    fn list<'a>(&'a self, table: &'a str, query: ListQuery) -> StoreFuture<'a, Page> {
        self.inner.list(table, query)
    }

    fn mark_sync_failed<'a>(&'a self, table: &'a str, id: i64) -> StoreFuture<'a, ()> {
        self.inner.mark_sync_failed(table, id)
    }

    fn list_sync_failed<'a>(
        &'a self,
        table: &'a str,
        limit: u32,
    ) -> StoreFuture<'a, Vec<StoredRecord>> {
        self.inner.list_sync_failed(table, limit)
    }

    fn clear_sync_failed<'a>(&'a self, table: &'a str, ids: Vec<i64>) -> StoreFuture<'a, ()> {
        self.inner.clear_sync_failed(table, ids)
    }
}

#[tokio::test]
async fn write_between_load_and_conditional_update_is_a_conflict() {
    let store = InMemoryRecordStore::new();
    let harness = Harness::<Note>::with_store(store.clone());
    let id = create_note(&harness, "A").await;

    let controller = LifecycleController::<Note>::builder(Arc::new(InterleavedWriterStore {
        inner: store.clone(),
    }))
    .clock(Arc::new(test_clock()))
    .build();

    let err = controller
        .update(&editor(), params(json!({"id": id, "lockVersion": 1, "name": "B"})))
        .await
        .unwrap_err();

    assert!(matches!(err, LifecycleError::LockVersionOutdated { .. }));
    assert_eq!(err.status_code(), 409);
    let row = store.get(Note::TABLE, id).unwrap();
    assert_eq!(row.attributes["name"], "A");
    assert_eq!(row.lock_version, 2);
}

// ═══════════════════════════════════════════════════════════
// Delete
// ═══════════════════════════════════════════════════════════

#[tokio::test]
async fn delete_moves_to_deleted_and_stamps() {
    let harness = Harness::<Note>::new();
    let id = create_note(&harness, "A").await;

    let envelope = harness
        .controller
        .delete(&editor(), params(json!({"id": id, "lockVersion": 1})))
        .await
        .unwrap();

    assert_eq!(envelope.message, "Record deleted successfully.");
    let data = data(&envelope);
    assert_eq!(data["status"], 4);
    assert_eq!(data["lockVersion"], 2);
    assert_eq!(data["changeLog"]["deletedBy"], "editor-1");
    assert!(data["changeLog"].get("updatedAt").is_none());
    assert_eq!(harness.store.len("note"), 1);
}

#[tokio::test]
async fn deleting_a_deleted_record_is_rejected() {
    let harness = Harness::<Note>::new();
    harness.seed(1, Status::Deleted, 3, json!({"name": "A"}));

    let err = harness
        .controller
        .delete(&editor(), params(json!({"id": 1, "lockVersion": 3})))
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 400);
    assert_eq!(err.message(), "No record deleted.");
}

#[tokio::test]
async fn delete_only_accepts_delete_scenario_keys() {
    let harness = Harness::<Note>::new();
    let id = create_note(&harness, "A").await;

    let err = harness
        .controller
        .delete(&editor(), params(json!({"id": id, "lockVersion": 1, "status": 1})))
        .await
        .unwrap_err();

    assert_eq!(fields(&err), vec!["status"]);
}

// ═══════════════════════════════════════════════════════════
// Dependencies
// ═══════════════════════════════════════════════════════════

#[tokio::test]
async fn referenced_notebook_cannot_be_renamed_or_deleted() {
    let store = InMemoryRecordStore::new();
    let notebooks = Harness::<Notebook>::with_store(store.clone());
    let notes = Harness::<Note>::with_store(store);

    notebooks
        .controller
        .create(&editor(), params(json!({"name": "Work"})))
        .await
        .unwrap();
    notes
        .controller
        .create(&editor(), params(json!({"name": "A", "notebookId": 1})))
        .await
        .unwrap();

    let err = notebooks
        .controller
        .update(&editor(), params(json!({"id": 1, "lockVersion": 1, "name": "Home", "status": 1})))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 422);
    assert!(matches!(err, LifecycleError::UpdatePermission { .. }));
    assert_eq!(fields(&err), vec!["name", "status"]);
    assert_eq!(err.message(), "status cannot be changed because it is used in note.");

    let err = notebooks
        .controller
        .delete(&editor(), params(json!({"id": 1, "lockVersion": 1})))
        .await
        .unwrap_err();
    assert_eq!(fields(&err), vec!["status"]);
}

#[tokio::test]
async fn unreferenced_notebook_can_be_renamed() {
    let store = InMemoryRecordStore::new();
    let notebooks = Harness::<Notebook>::with_store(store.clone());
    let notes = Harness::<Note>::with_store(store);

    notebooks
        .controller
        .create(&editor(), params(json!({"name": "Work"})))
        .await
        .unwrap();
    notes
        .controller
        .create(&editor(), params(json!({"name": "A", "notebookId": 2})))
        .await
        .unwrap();

    let envelope = notebooks
        .controller
        .update(&editor(), params(json!({"id": 1, "lockVersion": 1, "name": "Home"})))
        .await
        .unwrap();
    assert_eq!(data(&envelope)["name"], "Home");
}

// ═══════════════════════════════════════════════════════════
// Reads
// ═══════════════════════════════════════════════════════════

#[tokio::test]
async fn find_one_hides_lock_version() {
    let harness = Harness::<Note>::new();
    let id = create_note(&harness, "A").await;

    let envelope = harness
        .controller
        .find_one(&editor(), params(json!({ "id": id.to_string() })))
        .await
        .unwrap();

    assert_eq!(envelope.message, "Success.");
    assert_eq!(data(&envelope)["name"], "A");
    assert!(data(&envelope).get("lockVersion").is_none());
}

#[tokio::test]
async fn list_pages_sorts_and_filters() {
    let harness = Harness::<Note>::new();
    for name in ["b", "d", "a", "c", "e"] {
        create_note(&harness, name).await;
    }
    harness
        .controller
        .update(&editor(), params(json!({"id": 5, "lockVersion": 1, "status": 1})))
        .await
        .unwrap();

    let envelope = harness
        .controller
        .list(&editor(), params(json!({"status": "2", "sort": "-name", "perPage": "3"})))
        .await
        .unwrap();

    let items = data(&envelope).as_array().unwrap();
    let names: Vec<_> = items.iter().map(|item| item["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["d", "c", "b"]);
    assert!(items.iter().all(|item| item.get("lockVersion").is_none()));

    let pagination = envelope.pagination.unwrap();
    assert_eq!(pagination.page, 1);
    assert_eq!(pagination.total_count, 4);
    assert_eq!(pagination.total, 2);
    assert_eq!(pagination.display, 3);
}

#[tokio::test]
async fn list_rejects_unknown_filters_and_sort_keys() {
    let harness = Harness::<Note>::new();

    let err = harness
        .controller
        .list(&editor(), params(json!({"lockVersion": 1})))
        .await
        .unwrap_err();
    assert_eq!(fields(&err), vec!["lockVersion"]);

    let err = harness
        .controller
        .list(&editor(), params(json!({"sort": "-secret"})))
        .await
        .unwrap_err();
    assert_eq!(fields(&err), vec!["secret"]);

    let err = harness
        .controller
        .list(&editor(), params(json!({"page": "first"})))
        .await
        .unwrap_err();
    assert_eq!(fields(&err), vec!["page"]);
}

#[tokio::test]
async fn list_clamps_page_size() {
    let harness = Harness::<Note>::new();
    create_note(&harness, "a").await;

    let envelope = harness
        .controller
        .list(&editor(), params(json!({"perPage": 100_000, "page": 0})))
        .await
        .unwrap();

    let pagination = envelope.pagination.unwrap();
    assert_eq!(pagination.page, 1);
    assert_eq!(pagination.total, 1);
}

#[tokio::test]
async fn list_with_zero_per_page_uses_default_page_size() {
    let harness = Harness::<Note>::new();
    for name in ["a", "b", "c"] {
        create_note(&harness, name).await;
    }

    let envelope = harness
        .controller
        .list(&editor(), params(json!({"perPage": 0})))
        .await
        .unwrap();

    let pagination = envelope.pagination.unwrap();
    assert_eq!(pagination.display, 3);
    assert_eq!(pagination.total_count, 3);
    assert_eq!(pagination.total, 1);
    assert_eq!(data(&envelope).as_array().unwrap().len(), 3);
}

// ═══════════════════════════════════════════════════════════
// Collaborator failures
// ═══════════════════════════════════════════════════════════

#[tokio::test]
async fn mirror_failure_never_fails_the_write() {
    let harness = Harness::<Note>::new();
    harness.mirror.set_failing(true);

    let id = create_note(&harness, "A").await;

    assert!(harness.row(id).unwrap().sync_failed);
    assert!(harness.mirror.is_empty("note"));
}

#[tokio::test]
async fn resync_reconciles_flagged_records() {
    let harness = Harness::<Note>::new();
    harness.mirror.set_failing(true);
    let first = create_note(&harness, "A").await;
    let second = create_note(&harness, "B").await;
    harness.mirror.set_failing(false);

    let err = harness.controller.resync_failed(&editor(), 100).await.unwrap_err();
    assert_eq!(err.status_code(), 403);

    let envelope = harness.controller.resync_failed(&superadmin(), 100).await.unwrap();
    assert_eq!(data(&envelope)["resynced"], 2);
    assert_eq!(harness.mirror.bulk_writes(), 1);
    assert_eq!(harness.mirror.len("note"), 2);
    assert!(!harness.row(first).unwrap().sync_failed);
    assert!(!harness.row(second).unwrap().sync_failed);

    let envelope = harness.controller.resync_failed(&superadmin(), 100).await.unwrap();
    assert_eq!(data(&envelope)["resynced"], 0);
}

#[tokio::test]
async fn store_failure_is_an_opaque_server_error() {
    let harness = Harness::<Note>::new();
    harness.store.set_failing(true);

    let err = harness
        .controller
        .create(&editor(), params(json!({"name": "A"})))
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 500);
    assert_eq!(err.message(), "An unknown error occurred.");
    assert_eq!(Envelope::from_error(&err, false).trace, None);
    assert_eq!(
        Envelope::from_error(&err, true).trace.as_deref(),
        Some("Database error: injected failure")
    );
}

// ═══════════════════════════════════════════════════════════
// Search
// ═══════════════════════════════════════════════════════════

#[tokio::test]
async fn search_queries_the_mirror_without_lock_versions() {
    use record_lifecycle_core::mirror::{DocumentFilter, SearchQuery};

    let harness = Harness::<Note>::new();
    for name in ["a", "b", "c"] {
        create_note(&harness, name).await;
    }

    let query = SearchQuery {
        filter: DocumentFilter::new().terms("name", ["a", "c"]),
        sort: Some("-id".to_string()),
        ..SearchQuery::default()
    };
    let envelope = harness.controller.search(&editor(), query).await.unwrap();

    let items = data(&envelope).as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["name"], "c");
    assert!(items.iter().all(|item| item.get("lockVersion").is_none()));
    assert_eq!(envelope.pagination.unwrap().total_count, 2);
}

#[tokio::test]
async fn search_rejects_undeclared_fields() {
    use record_lifecycle_core::mirror::{DocumentFilter, SearchQuery};

    let harness = Harness::<Note>::new();
    let query = SearchQuery {
        filter: DocumentFilter::new().exists("secret"),
        fields: vec!["lockVersion".to_string()],
        ..SearchQuery::default()
    };

    let err = harness.controller.search(&editor(), query).await.unwrap_err();
    assert_eq!(err.status_code(), 422);
    assert_eq!(fields(&err), vec!["secret"]);
}

#[tokio::test]
async fn search_without_mirror_is_a_bad_request() {
    use record_lifecycle_core::mirror::SearchQuery;

    let controller =
        LifecycleController::<Note>::builder(Arc::new(InMemoryRecordStore::new())).build();

    let err = controller.search(&editor(), SearchQuery::default()).await.unwrap_err();
    assert_eq!(err.status_code(), 400);
    assert_eq!(err.message(), "Search is not available for this resource.");
}

// ═══════════════════════════════════════════════════════════
// Composition
// ═══════════════════════════════════════════════════════════

#[test]
fn guards_run_in_pipeline_order() {
    let harness = Harness::<Note>::new();
    assert_eq!(
        harness.controller.guard_names(),
        vec!["optimistic_lock", "status_transition", "change_tracking", "dependency"]
    );
}
