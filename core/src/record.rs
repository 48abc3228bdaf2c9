//! Record types.
//!
//! [`StoredRecord`] is the untyped row exchanged with storage collaborators;
//! [`Record`] is its typed counterpart with the business fields decoded into
//! the resource struct.

use crate::actor::ActorContext;
use crate::config::LifecycleConfig;
use crate::resource::{CHANGE_LOG_FIELD, ID_FIELD, LOCK_VERSION_FIELD, Resource, STATUS_FIELD};
use crate::status::Status;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Lock version of a freshly inserted record.
pub const INITIAL_LOCK_VERSION: i64 = 1;

/// When and by whom a write happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stamp {
    /// UTC instant.
    pub at: DateTime<Utc>,
    /// Same instant rendered in the configured local zone and format.
    pub local: String,
    /// Acting user.
    pub by: Option<String>,
}

impl Stamp {
    /// Stamp `at` for `actor`, rendering the local time per `config`.
    #[must_use]
    pub fn new(at: DateTime<Utc>, config: &LifecycleConfig, actor: &ActorContext) -> Self {
        let local = at
            .with_timezone(&config.local_offset)
            .format(&config.local_format)
            .to_string();
        Self {
            at,
            local,
            by: actor.user_id.clone(),
        }
    }
}

/// Write metadata of a record.
///
/// Recomputed by the controller on every write; never settable by clients.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChangeLog {
    /// Insert time (UTC).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Insert time (local).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at_local: Option<String>,
    /// Inserting user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    /// Last update time (UTC).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Last update time (local).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at_local: Option<String>,
    /// Last updating user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    /// Deletion time (UTC).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    /// Deletion time (local).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at_local: Option<String>,
    /// Deleting user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_by: Option<String>,
}

impl ChangeLog {
    /// Change log of a new record.
    #[must_use]
    pub fn created(stamp: Stamp) -> Self {
        Self {
            created_at: Some(stamp.at),
            created_at_local: Some(stamp.local),
            created_by: stamp.by,
            ..Self::default()
        }
    }

    /// Record an update.
    pub fn touch_updated(&mut self, stamp: Stamp) {
        self.updated_at = Some(stamp.at);
        self.updated_at_local = Some(stamp.local);
        self.updated_by = stamp.by;
    }

    /// Record a transition to `Deleted`.
    pub fn touch_deleted(&mut self, stamp: Stamp) {
        self.deleted_at = Some(stamp.at);
        self.deleted_at_local = Some(stamp.local);
        self.deleted_by = stamp.by;
    }
}

/// Untyped persisted row.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    /// Primary key.
    pub id: i64,
    /// Current status.
    pub status: Status,
    /// Optimistic lock counter.
    pub lock_version: i64,
    /// Business fields, keyed by wire name.
    pub attributes: Map<String, Value>,
    /// Write metadata.
    pub change_log: ChangeLog,
    /// Set when mirroring this record to the document store failed.
    pub sync_failed: bool,
}

/// Which framework fields a rendered record exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exposure {
    /// Write results: include `lockVersion`.
    Write,
    /// Read results: hide `lockVersion`.
    Read,
}

/// Typed record.
#[derive(Debug, Clone, PartialEq)]
pub struct Record<T> {
    /// Primary key, immutable.
    pub id: i64,
    /// Current status.
    pub status: Status,
    /// Optimistic lock counter.
    pub lock_version: i64,
    /// Write metadata.
    pub change_log: ChangeLog,
    /// Business fields.
    pub fields: T,
}

impl<T: Resource> Record<T> {
    /// Decode a stored row.
    ///
    /// # Errors
    ///
    /// Returns a `serde_json` error if the attributes do not decode into `T`.
    pub fn from_stored(stored: StoredRecord) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: stored.id,
            status: stored.status,
            lock_version: stored.lock_version,
            change_log: stored.change_log,
            fields: serde_json::from_value(Value::Object(stored.attributes))?,
        })
    }

    /// Business fields as a JSON object.
    ///
    /// # Errors
    ///
    /// Returns a `serde_json` error if `T` does not serialize to an object.
    pub fn attributes(&self) -> Result<Map<String, Value>, serde_json::Error> {
        attributes_of(&self.fields)
    }

    /// Render the record for a response or the document mirror.
    ///
    /// # Errors
    ///
    /// Returns a `serde_json` error if `T` does not serialize to an object.
    pub fn to_json(&self, exposure: Exposure) -> Result<Value, serde_json::Error> {
        let mut object = self.attributes()?;
        object.insert(ID_FIELD.to_string(), Value::from(self.id));
        object.insert(STATUS_FIELD.to_string(), Value::from(self.status.code()));
        if exposure == Exposure::Write {
            object.insert(LOCK_VERSION_FIELD.to_string(), Value::from(self.lock_version));
        }
        object.insert(CHANGE_LOG_FIELD.to_string(), serde_json::to_value(&self.change_log)?);
        Ok(Value::Object(object))
    }
}

/// Serialize resource fields to a JSON object.
///
/// # Errors
///
/// Returns a `serde_json` error if `fields` does not serialize to an object.
pub fn attributes_of<T: Serialize>(fields: &T) -> Result<Map<String, Value>, serde_json::Error> {
    match serde_json::to_value(fields)? {
        Value::Object(map) => Ok(map),
        other => Err(<serde_json::Error as serde::ser::Error>::custom(format!(
            "resource must serialize to an object, got {other}"
        ))),
    }
}
