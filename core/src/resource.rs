//! Resource declarations.
//!
//! A resource is a typed struct holding the business fields of one record
//! type. It declares, per [`Scenario`], which fields a request may set; the
//! framework fields (`id`, `status`, `lockVersion`, `changeLog`) are owned by
//! the controller and never part of the resource struct.
//!
//! # Example
//!
//! ```
//! use record_lifecycle_core::{FieldSpec, Resource, Scenario};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
//! #[serde(rename_all = "camelCase")]
//! struct Article {
//!     title: String,
//!     body: Option<String>,
//! }
//!
//! impl Resource for Article {
//!     const TABLE: &'static str = "article";
//!     const LABEL: &'static str = "Article";
//!     const FIELDS: &'static [FieldSpec] = &[
//!         FieldSpec::string("title").required().not_null(),
//!         FieldSpec::string("body"),
//!     ];
//! }
//!
//! assert!(record_lifecycle_core::resource::settable_fields::<Article>(Scenario::Create).contains("title"));
//! ```

use crate::error::FieldErrors;
use crate::messages::Translator;
use crate::status::TransitionTable;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeSet;

/// Routing metadata key; never a settable field.
pub const ID_FIELD: &str = "id";
/// Status key.
pub const STATUS_FIELD: &str = "status";
/// Optimistic lock key.
pub const LOCK_VERSION_FIELD: &str = "lockVersion";
/// Change log key.
pub const CHANGE_LOG_FIELD: &str = "changeLog";

/// Named operation context determining the settable-field allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scenario {
    /// Insert a new record.
    Create,
    /// Modify an existing record.
    Update,
    /// Soft-delete an existing record.
    Delete,
    /// Read: filters and sort keys of list requests.
    View,
}

impl Scenario {
    /// Framework keys a request may carry in this scenario.
    #[must_use]
    pub const fn framework_fields(self) -> &'static [&'static str] {
        match self {
            Self::Create => &[STATUS_FIELD],
            Self::Update => &[STATUS_FIELD, LOCK_VERSION_FIELD],
            Self::Delete => &[LOCK_VERSION_FIELD],
            Self::View => &[ID_FIELD, STATUS_FIELD],
        }
    }
}

/// JSON type of a business field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// JSON string
    String,
    /// JSON integer
    Integer,
    /// Any JSON number
    Number,
    /// JSON boolean
    Boolean,
    /// JSON array
    Array,
    /// JSON object
    Object,
    /// Anything
    Any,
}

impl FieldKind {
    /// Whether a non-null `value` has this kind.
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::Any => true,
        }
    }

    /// Name used in the `{value}` placeholder of type errors.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Any => "any",
        }
    }
}

/// Declaration of one business field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Wire name (matches the serde name in the resource struct).
    pub name: &'static str,
    /// Expected JSON type.
    pub kind: FieldKind,
    /// Must be present on create.
    pub required: bool,
    /// May be set to `null`.
    pub nullable: bool,
    /// Scenarios in which the field is settable (or filterable, for `View`).
    pub scenarios: &'static [Scenario],
}

const DEFAULT_SCENARIOS: &[Scenario] = &[Scenario::Create, Scenario::Update, Scenario::View];

impl FieldSpec {
    /// Optional, nullable field settable on create and update.
    #[must_use]
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            nullable: true,
            scenarios: DEFAULT_SCENARIOS,
        }
    }

    /// String field.
    #[must_use]
    pub const fn string(name: &'static str) -> Self {
        Self::new(name, FieldKind::String)
    }

    /// Integer field.
    #[must_use]
    pub const fn integer(name: &'static str) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    /// Number field.
    #[must_use]
    pub const fn number(name: &'static str) -> Self {
        Self::new(name, FieldKind::Number)
    }

    /// Boolean field.
    #[must_use]
    pub const fn boolean(name: &'static str) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    /// Array field.
    #[must_use]
    pub const fn array(name: &'static str) -> Self {
        Self::new(name, FieldKind::Array)
    }

    /// Object field.
    #[must_use]
    pub const fn object(name: &'static str) -> Self {
        Self::new(name, FieldKind::Object)
    }

    /// Must be present on create.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Reject `null`.
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Restrict the scenarios in which the field is settable.
    #[must_use]
    pub const fn on(mut self, scenarios: &'static [Scenario]) -> Self {
        self.scenarios = scenarios;
        self
    }

    /// Whether the field is settable in `scenario`.
    #[must_use]
    pub fn settable_in(&self, scenario: Scenario) -> bool {
        self.scenarios.contains(&scenario)
    }
}

/// A record type referencing this resource through `field`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dependency {
    /// Table of the referencing resource.
    pub table: &'static str,
    /// Field of the referencing resource holding this resource's id.
    pub field: &'static str,
}

impl Dependency {
    /// Declare a dependency.
    #[must_use]
    pub const fn new(table: &'static str, field: &'static str) -> Self {
        Self { table, field }
    }
}

/// A resource type managed by the lifecycle controller.
pub trait Resource:
    Default + Clone + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Storage table (and mirror index) name.
    const TABLE: &'static str;

    /// Human label, used in messages.
    const LABEL: &'static str;

    /// Business field declarations.
    const FIELDS: &'static [FieldSpec];

    /// Fields that cannot change while dependents reference the record.
    const PROTECTED_FIELDS: &'static [&'static str] = &[];

    /// Resources referencing this one.
    const DEPENDENTS: &'static [Dependency] = &[];

    /// Status transition table for this resource.
    fn transitions() -> TransitionTable {
        TransitionTable::standard()
    }

    /// Business validation run after the request has been merged.
    ///
    /// Push every violation into `errors`; the controller raises them
    /// together.
    fn validate(&self, translator: &dyn Translator, errors: &mut FieldErrors) {
        let _ = (translator, errors);
    }
}

/// Declaration of a business field by wire name.
#[must_use]
pub fn field_spec<T: Resource>(name: &str) -> Option<&'static FieldSpec> {
    T::FIELDS.iter().find(|spec| spec.name == name)
}

/// Full allow-list for `scenario`: framework keys plus declared fields.
#[must_use]
pub fn settable_fields<T: Resource>(scenario: Scenario) -> BTreeSet<&'static str> {
    scenario
        .framework_fields()
        .iter()
        .copied()
        .chain(
            T::FIELDS
                .iter()
                .filter(|spec| spec.settable_in(scenario))
                .map(|spec| spec.name),
        )
        .collect()
}
