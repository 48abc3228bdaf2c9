//! `PostgreSQL` record store for the record lifecycle controller.
//!
//! Every resource type gets one table, created by
//! [`PostgresRecordStore::ensure_table`]:
//!
//! ```sql
//! CREATE TABLE note (
//!     id BIGSERIAL PRIMARY KEY,
//!     status SMALLINT NOT NULL,
//!     lock_version BIGINT NOT NULL DEFAULT 1,
//!     attributes JSONB NOT NULL DEFAULT '{}',
//!     change_log JSONB NOT NULL DEFAULT '{}',
//!     sync_failed BOOLEAN NOT NULL DEFAULT FALSE
//! );
//! ```
//!
//! Business fields live in `attributes`, keyed by wire name. Equality
//! filters on them compare the whole value (`attributes -> $1 = $2`), so an
//! array filter matches only an identical array.
//!
//! # Example
//!
//! ```ignore
//! use record_lifecycle_postgres::PostgresRecordStore;
//!
//! let store = PostgresRecordStore::connect("postgres://localhost/app", 10).await?;
//! store.ensure_table("note").await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use record_lifecycle_core::Status;
use record_lifecycle_core::record::{ChangeLog, INITIAL_LOCK_VERSION, StoredRecord};
use record_lifecycle_core::resource::{ID_FIELD, STATUS_FIELD};
use record_lifecycle_core::store::{
    ListQuery, NewRecord, Page, RecordStore, RecordUpdate, SortKey, StoreError, StoreFuture,
};
use serde_json::{Map, Value};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder, Row};

const COLUMNS: &str = "id, status, lock_version, attributes, change_log, sync_failed";

/// Longest identifier `PostgreSQL` accepts without truncation.
const MAX_IDENTIFIER_LEN: usize = 63;

/// PostgreSQL-backed [`RecordStore`].
///
/// Table names come from resource declarations and are spliced into SQL, so
/// each one is checked against `[a-z_][a-z0-9_]*` before use. Everything
/// else is bound.
#[derive(Clone, Debug)]
pub struct PostgresRecordStore {
    pool: PgPool,
}

impl PostgresRecordStore {
    /// Create a store over an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a new pool.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the connection fails.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Database(format!("Failed to connect: {e}")))?;
        Ok(Self::new(pool))
    }

    /// Get the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the table for a resource type and its indexes if missing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidIdentifier`] for an unsafe table name and
    /// [`StoreError::Database`] if a statement fails.
    pub async fn ensure_table(&self, table: &str) -> Result<(), StoreError> {
        let table = identifier(table)?;
        let statements = [
            format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    id BIGSERIAL PRIMARY KEY,
                    status SMALLINT NOT NULL,
                    lock_version BIGINT NOT NULL DEFAULT {INITIAL_LOCK_VERSION},
                    attributes JSONB NOT NULL DEFAULT '{{}}',
                    change_log JSONB NOT NULL DEFAULT '{{}}',
                    sync_failed BOOLEAN NOT NULL DEFAULT FALSE
                )"
            ),
            format!("CREATE INDEX IF NOT EXISTS {table}_status_idx ON {table} (status)"),
            format!(
                "CREATE INDEX IF NOT EXISTS {table}_sync_failed_idx ON {table} (id) WHERE sync_failed"
            ),
        ];
        for statement in &statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(database)?;
        }

        tracing::info!(table, "record table ready");
        Ok(())
    }
}

impl RecordStore for PostgresRecordStore {
    fn insert<'a>(&'a self, table: &'a str, record: NewRecord) -> StoreFuture<'a, StoredRecord> {
        Box::pin(async move {
            let table = identifier(table)?;
            let query = format!(
                "INSERT INTO {table} (status, lock_version, attributes, change_log)
                 VALUES ($1, $2, $3, $4)
                 RETURNING {COLUMNS}"
            );
            let row = sqlx::query(&query)
                .bind(status_column(record.status))
                .bind(INITIAL_LOCK_VERSION)
                .bind(Value::Object(record.attributes))
                .bind(Json(record.change_log))
                .fetch_one(&self.pool)
                .await
                .map_err(database)?;
            decode_row(&row)
        })
    }

    fn find_by_id<'a>(&'a self, table: &'a str, id: i64) -> StoreFuture<'a, Option<StoredRecord>> {
        Box::pin(async move {
            let table = identifier(table)?;
            let query = format!("SELECT {COLUMNS} FROM {table} WHERE id = $1");
            let row = sqlx::query(&query)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(database)?;
            row.as_ref().map(decode_row).transpose()
        })
    }

    fn find_one<'a>(
        &'a self,
        table: &'a str,
        filters: Map<String, Value>,
    ) -> StoreFuture<'a, Option<StoredRecord>> {
        Box::pin(async move {
            let table = identifier(table)?;
            let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM {table}"));
            push_filters(&mut builder, filters);
            builder.push(" ORDER BY id ASC LIMIT 1");
            let row = builder
                .build()
                .fetch_optional(&self.pool)
                .await
                .map_err(database)?;
            row.as_ref().map(decode_row).transpose()
        })
    }

    fn update_if_version<'a>(&'a self, table: &'a str, update: RecordUpdate) -> StoreFuture<'a, u64> {
        Box::pin(async move {
            let table = identifier(table)?;
            let query = format!(
                "UPDATE {table}
                 SET status = $1,
                     attributes = $2,
                     change_log = $3,
                     lock_version = lock_version + 1
                 WHERE id = $4 AND lock_version = $5"
            );
            let result = sqlx::query(&query)
                .bind(status_column(update.status))
                .bind(Value::Object(update.attributes))
                .bind(Json(update.change_log))
                .bind(update.id)
                .bind(update.expected_lock_version)
                .execute(&self.pool)
                .await
                .map_err(database)?;

            tracing::debug!(
                table,
                record_id = update.id,
                expected_lock_version = update.expected_lock_version,
                rows = result.rows_affected(),
                "conditional write"
            );
            Ok(result.rows_affected())
        })
    }

    fn exists<'a>(&'a self, table: &'a str, field: &'a str, value: Value) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            let table = identifier(table)?;
            let mut filters = Map::new();
            filters.insert(field.to_string(), value);

            let mut builder =
                QueryBuilder::<Postgres>::new(format!("SELECT EXISTS (SELECT 1 FROM {table}"));
            push_filters(&mut builder, filters);
            builder.push(")");
            let found: bool = builder
                .build_query_scalar()
                .fetch_one(&self.pool)
                .await
                .map_err(database)?;
            Ok(found)
        })
    }

    fn list<'a>(&'a self, table: &'a str, query: ListQuery) -> StoreFuture<'a, Page> {
        Box::pin(async move {
            let table = identifier(table)?;
            let offset = i64::try_from(query.offset()).unwrap_or(i64::MAX);

            let mut count = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) FROM {table}"));
            push_filters(&mut count, query.filters.clone());
            let total: i64 = count
                .build_query_scalar()
                .fetch_one(&self.pool)
                .await
                .map_err(database)?;

            let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM {table}"));
            push_filters(&mut select, query.filters);
            push_order(&mut select, query.sort);
            select
                .push(" LIMIT ")
                .push_bind(i64::from(query.per_page))
                .push(" OFFSET ")
                .push_bind(offset);
            let rows = select
                .build()
                .fetch_all(&self.pool)
                .await
                .map_err(database)?;

            Ok(Page {
                items: rows.iter().map(decode_row).collect::<Result<Vec<_>, _>>()?,
                total_count: u64::try_from(total).unwrap_or_default(),
            })
        })
    }

    fn mark_sync_failed<'a>(&'a self, table: &'a str, id: i64) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let table = identifier(table)?;
            let query = format!("UPDATE {table} SET sync_failed = TRUE WHERE id = $1");
            sqlx::query(&query)
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(database)?;
            Ok(())
        })
    }

    fn list_sync_failed<'a>(
        &'a self,
        table: &'a str,
        limit: u32,
    ) -> StoreFuture<'a, Vec<StoredRecord>> {
        Box::pin(async move {
            let table = identifier(table)?;
            let query = format!(
                "SELECT {COLUMNS} FROM {table} WHERE sync_failed ORDER BY id ASC LIMIT $1"
            );
            let rows = sqlx::query(&query)
                .bind(i64::from(limit))
                .fetch_all(&self.pool)
                .await
                .map_err(database)?;
            rows.iter().map(decode_row).collect()
        })
    }

    fn clear_sync_failed<'a>(&'a self, table: &'a str, ids: Vec<i64>) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let table = identifier(table)?;
            let query = format!("UPDATE {table} SET sync_failed = FALSE WHERE id = ANY($1)");
            sqlx::query(&query)
                .bind(ids)
                .execute(&self.pool)
                .await
                .map_err(database)?;
            Ok(())
        })
    }
}

/// Check a name that will be spliced into SQL.
fn identifier(name: &str) -> Result<&str, StoreError> {
    let mut chars = name.chars();
    let valid = name.len() <= MAX_IDENTIFIER_LEN
        && chars
            .next()
            .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(name)
    } else {
        Err(StoreError::InvalidIdentifier(name.to_string()))
    }
}

#[allow(clippy::cast_possible_truncation)] // Status codes are 0..=7
const fn status_column(status: Status) -> i16 {
    status.code() as i16
}

#[allow(clippy::needless_pass_by_value)] // Used as a map_err adapter
fn database(e: sqlx::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

fn decode_row(row: &PgRow) -> Result<StoredRecord, StoreError> {
    let code: i16 = row.try_get("status").map_err(database)?;
    let status = Status::from_code(i64::from(code))
        .ok_or_else(|| StoreError::Serialization(format!("unknown status code {code}")))?;
    let attributes = match row.try_get::<Value, _>("attributes").map_err(database)? {
        Value::Object(attributes) => attributes,
        other => {
            return Err(StoreError::Serialization(format!(
                "attributes must be a JSON object, got {other}"
            )));
        },
    };
    let Json(change_log) = row
        .try_get::<Json<ChangeLog>, _>("change_log")
        .map_err(|e| StoreError::Serialization(e.to_string()))?;

    Ok(StoredRecord {
        id: row.try_get("id").map_err(database)?,
        status,
        lock_version: row.try_get("lock_version").map_err(database)?,
        attributes,
        change_log,
        sync_failed: row.try_get("sync_failed").map_err(database)?,
    })
}

/// Append a `WHERE` clause. `id` and `status` compare against their columns,
/// everything else compares the whole JSON value under its key, with a
/// missing key reading as `null`.
fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filters: Map<String, Value>) {
    builder.push(" WHERE TRUE");
    for (field, value) in filters {
        match field.as_str() {
            ID_FIELD | STATUS_FIELD => match value.as_i64() {
                Some(number) => {
                    builder.push(format!(" AND {field} = ")).push_bind(number);
                },
                None => {
                    builder.push(" AND FALSE");
                },
            },
            _ => {
                builder
                    .push(" AND COALESCE(attributes -> ")
                    .push_bind(field)
                    .push(", 'null'::jsonb) = ")
                    .push_bind(Json(value));
            },
        }
    }
}

/// Append `ORDER BY`, always ending on `id` so pages are stable.
fn push_order(builder: &mut QueryBuilder<'_, Postgres>, sort: Vec<SortKey>) {
    builder.push(" ORDER BY ");
    for key in sort {
        match key.field.as_str() {
            ID_FIELD | STATUS_FIELD => {
                builder.push(&key.field);
            },
            _ => {
                builder.push("attributes -> ").push_bind(key.field);
            },
        }
        builder.push(if key.descending { " DESC, " } else { " ASC, " });
    }
    builder.push("id ASC");
}
