//! Persistence collaborator.
//!
//! The [`RecordStore`] trait is untyped: it moves
//! [`StoredRecord`]s keyed by table name, so one store instance serves every
//! resource type. The controller does the typing.
//!
//! # Conditional Writes
//!
//! [`RecordStore::update_if_version`] is the only concurrency-control
//! primitive of the system. Implementations must apply it as a single atomic
//! compare-and-write (`UPDATE ... WHERE id = $1 AND lock_version = $2`), never
//! as a read followed by a separate write.

use crate::record::{ChangeLog, StoredRecord};
use crate::status::Status;
use serde_json::{Map, Value};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Boxed future returned by [`RecordStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Errors that can occur during store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Database connection or query error.
    #[error("Database error: {0}")]
    Database(String),

    /// A stored row could not be decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A table or field name is not a safe identifier.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
}

/// A row to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    /// Initial status.
    pub status: Status,
    /// Business fields.
    pub attributes: Map<String, Value>,
    /// Initial change log.
    pub change_log: ChangeLog,
}

/// A conditional update.
///
/// Applied only if the stored lock version still equals
/// `expected_lock_version`; the stored version then becomes
/// `expected_lock_version + 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordUpdate {
    /// Target row.
    pub id: i64,
    /// Lock version the caller last observed.
    pub expected_lock_version: i64,
    /// New status.
    pub status: Status,
    /// Full set of business fields after the merge.
    pub attributes: Map<String, Value>,
    /// Recomputed change log.
    pub change_log: ChangeLog,
}

/// One sort key of a list query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    /// Field to sort by (`id`, `status` or a business field).
    pub field: String,
    /// Descending order.
    pub descending: bool,
}

impl SortKey {
    /// Ascending sort on `field`.
    #[must_use]
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    /// Descending sort on `field`.
    #[must_use]
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }

    /// Parse a comma-separated sort expression such as `-createdAt,name`.
    ///
    /// # Examples
    ///
    /// ```
    /// use record_lifecycle_core::store::SortKey;
    ///
    /// let keys = SortKey::parse_list("-name, id");
    /// assert_eq!(keys, vec![SortKey::desc("name"), SortKey::asc("id")]);
    /// ```
    #[must_use]
    pub fn parse_list(expression: &str) -> Vec<Self> {
        expression
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| match part.strip_prefix('-') {
                Some(field) => Self::desc(field),
                None => Self::asc(part.trim_start_matches('+')),
            })
            .filter(|key| !key.field.is_empty())
            .collect()
    }
}

/// Paginated, sorted, filtered listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    /// Equality filters on `id`, `status` or business fields.
    pub filters: Map<String, Value>,
    /// 1-based page number.
    pub page: u32,
    /// Page size.
    pub per_page: u32,
    /// Sort keys; an empty list means ascending `id`.
    pub sort: Vec<SortKey>,
}

impl ListQuery {
    /// Rows to skip.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            filters: Map::new(),
            page: 1,
            per_page: 20,
            sort: Vec::new(),
        }
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Page {
    /// Rows on this page.
    pub items: Vec<StoredRecord>,
    /// Rows matching the filters across all pages.
    pub total_count: u64,
}

/// Persistence collaborator.
///
/// # Dyn Compatibility
///
/// Methods return boxed futures so controllers can hold an
/// `Arc<dyn RecordStore>`.
pub trait RecordStore: Send + Sync {
    /// Insert a row with lock version 1 and a freshly assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend fails.
    fn insert<'a>(&'a self, table: &'a str, record: NewRecord) -> StoreFuture<'a, StoredRecord>;

    /// Load a row by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend fails.
    fn find_by_id<'a>(&'a self, table: &'a str, id: i64) -> StoreFuture<'a, Option<StoredRecord>>;

    /// First row (by id) matching every equality filter.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend fails.
    fn find_one<'a>(
        &'a self,
        table: &'a str,
        filters: Map<String, Value>,
    ) -> StoreFuture<'a, Option<StoredRecord>>;

    /// Atomic compare-and-write keyed by id and expected lock version.
    ///
    /// Returns the number of rows affected: `0` when the version is stale or
    /// the row is gone, `1` on success.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend fails.
    fn update_if_version<'a>(&'a self, table: &'a str, update: RecordUpdate) -> StoreFuture<'a, u64>;

    /// Whether any row of `table` has `field == value`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend fails.
    fn exists<'a>(&'a self, table: &'a str, field: &'a str, value: Value) -> StoreFuture<'a, bool>;

    /// Paginated, sorted listing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend fails.
    fn list<'a>(&'a self, table: &'a str, query: ListQuery) -> StoreFuture<'a, Page>;

    /// Flag a row whose document-mirror write failed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend fails.
    fn mark_sync_failed<'a>(&'a self, table: &'a str, id: i64) -> StoreFuture<'a, ()>;

    /// Up to `limit` rows flagged as sync-failed, by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend fails.
    fn list_sync_failed<'a>(&'a self, table: &'a str, limit: u32)
    -> StoreFuture<'a, Vec<StoredRecord>>;

    /// Clear the sync-failed flag of `ids`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend fails.
    fn clear_sync_failed<'a>(&'a self, table: &'a str, ids: Vec<i64>) -> StoreFuture<'a, ()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_expression_parsing() {
        assert_eq!(
            SortKey::parse_list("-status,,name,+id"),
            vec![SortKey::desc("status"), SortKey::asc("name"), SortKey::asc("id")]
        );
        assert!(SortKey::parse_list(" , -").is_empty());
    }

    #[test]
    fn offset_is_zero_based() {
        let query = ListQuery {
            page: 3,
            per_page: 10,
            ..ListQuery::default()
        };
        assert_eq!(query.offset(), 20);
        assert_eq!(ListQuery { page: 0, ..ListQuery::default() }.offset(), 0);
    }

    #[test]
    fn error_display() {
        let err = StoreError::Database("connection refused".to_string());
        assert_eq!(err.to_string(), "Database error: connection refused");
    }
}
