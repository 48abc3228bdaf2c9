//! Fixture resources and builders shared by the test suites.

use crate::mocks::test_clock;
use crate::mirror::RecordingMirror;
use crate::record_store::InMemoryRecordStore;
use record_lifecycle_core::error::FieldErrors;
use record_lifecycle_core::messages::{MessageKey, Translator};
use record_lifecycle_core::record::StoredRecord;
use record_lifecycle_core::resource::{Dependency, FieldSpec, Resource};
use record_lifecycle_core::{
    ActorContext, ChangeLog, LifecycleConfig, LifecycleController, Params, Status, TransitionTable,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// A note filed in a notebook.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Note {
    /// Title, required on create.
    pub name: String,
    /// Free text.
    pub description: Option<String>,
    /// Labels.
    pub tags: Vec<String>,
    /// Owning notebook.
    pub notebook_id: Option<i64>,
}

impl Resource for Note {
    const TABLE: &'static str = "note";
    const LABEL: &'static str = "Note";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::string("name").required().not_null(),
        FieldSpec::string("description"),
        FieldSpec::array("tags").not_null(),
        FieldSpec::integer("notebookId"),
    ];

    fn validate(&self, translator: &dyn Translator, errors: &mut FieldErrors) {
        if self.tags.iter().any(String::is_empty) {
            errors.push(
                "tags",
                translator.translate(
                    MessageKey::FieldType,
                    &[("field", "tags"), ("value", "non-empty string")],
                ),
            );
        }
    }
}

/// A notebook; its status and name are protected while notes reference it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Notebook {
    /// Display name.
    pub name: String,
}

impl Resource for Notebook {
    const TABLE: &'static str = "notebook";
    const LABEL: &'static str = "Notebook";
    const FIELDS: &'static [FieldSpec] = &[FieldSpec::string("name").required().not_null()];
    const PROTECTED_FIELDS: &'static [&'static str] = &["status", "name"];
    const DEPENDENTS: &'static [Dependency] = &[Dependency::new("note", "notebookId")];

    fn transitions() -> TransitionTable {
        TransitionTable::standard().superadmin_only(Status::Approved)
    }
}

/// Controller, store and mirror wired together for one resource type.
pub struct Harness<T: Resource> {
    /// Controller under test.
    pub controller: LifecycleController<T>,
    /// Backing store.
    pub store: InMemoryRecordStore,
    /// Backing mirror.
    pub mirror: RecordingMirror,
}

impl<T: Resource> Harness<T> {
    /// Controller with a fresh store, a mirror and the fixed test clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_store(InMemoryRecordStore::new())
    }

    /// Controller over an existing store, so several resource types can
    /// share it.
    #[must_use]
    pub fn with_store(store: InMemoryRecordStore) -> Self {
        let mirror = RecordingMirror::new();
        let controller = LifecycleController::<T>::builder(Arc::new(store.clone()))
            .mirror(Arc::new(mirror.clone()))
            .clock(Arc::new(test_clock()))
            .config(LifecycleConfig::new().with_dev_mode(true))
            .build();
        Self { controller, store, mirror }
    }

    /// Stored row of `T` with `id`.
    #[must_use]
    pub fn row(&self, id: i64) -> Option<StoredRecord> {
        self.store.get(T::TABLE, id)
    }

    /// Put a row in place with the given status and lock version.
    pub fn seed(&self, id: i64, status: Status, lock_version: i64, attributes: Value) {
        self.store.seed(
            T::TABLE,
            StoredRecord {
                id,
                status,
                lock_version,
                attributes: attributes.as_object().cloned().unwrap_or_default(),
                change_log: ChangeLog::default(),
                sync_failed: false,
            },
        );
    }
}

impl<T: Resource> Default for Harness<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Request parameters from a JSON object literal.
///
/// Anything but an object yields empty parameters.
#[must_use]
pub fn params(value: Value) -> Params {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Actor without privileges.
#[must_use]
pub fn editor() -> ActorContext {
    ActorContext::new("editor-1", ["editor"])
}

/// Actor holding the superadmin capability.
#[must_use]
pub fn superadmin() -> ActorContext {
    ActorContext::new("admin-1", ["superadmin"])
}
