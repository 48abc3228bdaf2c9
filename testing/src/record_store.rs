//! In-memory record store.
//!
//! Every operation runs under a single lock, so the conditional write is
//! atomic exactly like the `UPDATE ... WHERE lock_version = $n` of the
//! Postgres store.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on a poisoned lock

use record_lifecycle_core::record::{INITIAL_LOCK_VERSION, StoredRecord};
use record_lifecycle_core::resource::{ID_FIELD, STATUS_FIELD};
use record_lifecycle_core::store::{
    ListQuery, NewRecord, Page, RecordStore, RecordUpdate, SortKey, StoreError, StoreFuture,
};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, RwLock};

#[derive(Debug, Default)]
struct Table {
    last_id: i64,
    rows: BTreeMap<i64, StoredRecord>,
}

/// `HashMap`-backed [`RecordStore`] for fast, deterministic tests.
///
/// # Example
///
/// ```
/// use record_lifecycle_testing::InMemoryRecordStore;
/// use record_lifecycle_core::store::{NewRecord, RecordStore};
/// use record_lifecycle_core::{ChangeLog, Map, Status};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = InMemoryRecordStore::new();
/// let record = store
///     .insert("note", NewRecord {
///         status: Status::Draft,
///         attributes: Map::new(),
///         change_log: ChangeLog::default(),
///     })
///     .await?;
///
/// assert_eq!(record.lock_version, 1);
/// assert_eq!(store.len("note"), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryRecordStore {
    tables: Arc<RwLock<HashMap<String, Table>>>,
    failing: Arc<AtomicBool>,
}

impl InMemoryRecordStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with a database error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, AtomicOrdering::SeqCst);
    }

    /// Put a row in place as-is, bypassing the lifecycle.
    ///
    /// Useful for arranging records in terminal statuses or with a given
    /// lock version.
    pub fn seed(&self, table: &str, record: StoredRecord) {
        let mut tables = self.tables.write().unwrap();
        let table = tables.entry(table.to_string()).or_default();
        table.last_id = table.last_id.max(record.id);
        table.rows.insert(record.id, record);
    }

    /// Current state of a row.
    #[must_use]
    pub fn get(&self, table: &str, id: i64) -> Option<StoredRecord> {
        self.tables
            .read()
            .unwrap()
            .get(table)
            .and_then(|table| table.rows.get(&id).cloned())
    }

    /// Number of rows in `table`.
    #[must_use]
    pub fn len(&self, table: &str) -> usize {
        self.tables
            .read()
            .unwrap()
            .get(table)
            .map_or(0, |table| table.rows.len())
    }

    /// Whether `table` has no rows.
    #[must_use]
    pub fn is_empty(&self, table: &str) -> bool {
        self.len(table) == 0
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.failing.load(AtomicOrdering::SeqCst) {
            Err(StoreError::Database("injected failure".to_string()))
        } else {
            Ok(())
        }
    }

    fn with_table<R>(&self, table: &str, f: impl FnOnce(&mut Table) -> R) -> Result<R, StoreError> {
        self.check_available()?;
        let mut tables = self.tables.write().unwrap();
        Ok(f(tables.entry(table.to_string()).or_default()))
    }
}

/// Value of `field` in a row, framework columns included.
#[must_use]
pub fn field_value(record: &StoredRecord, field: &str) -> Value {
    match field {
        ID_FIELD => Value::from(record.id),
        STATUS_FIELD => Value::from(record.status.code()),
        _ => record.attributes.get(field).cloned().unwrap_or(Value::Null),
    }
}

fn matches_filters(record: &StoredRecord, filters: &Map<String, Value>) -> bool {
    filters
        .iter()
        .all(|(field, expected)| &field_value(record, field) == expected)
}

/// Total order over JSON values used for sorting: nulls first, then
/// booleans, numbers, strings; anything else by its text.
#[must_use]
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => {
            let (a, b) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        },
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

fn sort_rows(rows: &mut [StoredRecord], sort: &[SortKey]) {
    rows.sort_by(|a, b| {
        sort.iter()
            .map(|key| {
                let ordering = compare_values(&field_value(a, &key.field), &field_value(b, &key.field));
                if key.descending { ordering.reverse() } else { ordering }
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| a.id.cmp(&b.id))
    });
}

impl RecordStore for InMemoryRecordStore {
    fn insert<'a>(&'a self, table: &'a str, record: NewRecord) -> StoreFuture<'a, StoredRecord> {
        Box::pin(async move {
            self.with_table(table, |table| {
                table.last_id += 1;
                let stored = StoredRecord {
                    id: table.last_id,
                    status: record.status,
                    lock_version: INITIAL_LOCK_VERSION,
                    attributes: record.attributes,
                    change_log: record.change_log,
                    sync_failed: false,
                };
                table.rows.insert(stored.id, stored.clone());
                stored
            })
        })
    }

    fn find_by_id<'a>(&'a self, table: &'a str, id: i64) -> StoreFuture<'a, Option<StoredRecord>> {
        Box::pin(async move { self.with_table(table, |table| table.rows.get(&id).cloned()) })
    }

    fn find_one<'a>(
        &'a self,
        table: &'a str,
        filters: Map<String, Value>,
    ) -> StoreFuture<'a, Option<StoredRecord>> {
        Box::pin(async move {
            self.with_table(table, |table| {
                table
                    .rows
                    .values()
                    .find(|record| matches_filters(record, &filters))
                    .cloned()
            })
        })
    }

    fn update_if_version<'a>(&'a self, table: &'a str, update: RecordUpdate) -> StoreFuture<'a, u64> {
        Box::pin(async move {
            self.with_table(table, |table| match table.rows.get_mut(&update.id) {
                Some(row) if row.lock_version == update.expected_lock_version => {
                    row.status = update.status;
                    row.attributes = update.attributes;
                    row.change_log = update.change_log;
                    row.lock_version += 1;
                    1
                },
                _ => 0,
            })
        })
    }

    fn exists<'a>(&'a self, table: &'a str, field: &'a str, value: Value) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            self.with_table(table, |table| {
                table
                    .rows
                    .values()
                    .any(|record| field_value(record, field) == value)
            })
        })
    }

    fn list<'a>(&'a self, table: &'a str, query: ListQuery) -> StoreFuture<'a, Page> {
        Box::pin(async move {
            self.with_table(table, |table| {
                let mut rows: Vec<StoredRecord> = table
                    .rows
                    .values()
                    .filter(|record| matches_filters(record, &query.filters))
                    .cloned()
                    .collect();
                sort_rows(&mut rows, &query.sort);
                let total_count = rows.len() as u64;
                let items = rows
                    .into_iter()
                    .skip(usize::try_from(query.offset()).unwrap_or(usize::MAX))
                    .take(query.per_page as usize)
                    .collect();
                Page { items, total_count }
            })
        })
    }

    fn mark_sync_failed<'a>(&'a self, table: &'a str, id: i64) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.with_table(table, |table| {
                if let Some(row) = table.rows.get_mut(&id) {
                    row.sync_failed = true;
                }
            })
        })
    }

    fn list_sync_failed<'a>(
        &'a self,
        table: &'a str,
        limit: u32,
    ) -> StoreFuture<'a, Vec<StoredRecord>> {
        Box::pin(async move {
            self.with_table(table, |table| {
                table
                    .rows
                    .values()
                    .filter(|record| record.sync_failed)
                    .take(limit as usize)
                    .cloned()
                    .collect()
            })
        })
    }

    fn clear_sync_failed<'a>(&'a self, table: &'a str, ids: Vec<i64>) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.with_table(table, |table| {
                for id in ids {
                    if let Some(row) = table.rows.get_mut(&id) {
                        row.sync_failed = false;
                    }
                }
            })
        })
    }
}
