//! Message keys and the translation collaborator.
//!
//! The core never formats user-facing text itself. It calls a
//! [`Translator`] with a [`MessageKey`] and named placeholders
//! (`{label}`, `{field}`, `{value}`, `{newValue}`, `{id}`). The string
//! tables live outside the core; [`MessageCatalog`] is the default
//! implementation, seeded with English text and overridable per key.

use std::collections::HashMap;

/// Every message the core can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    /// Generic success.
    Success,
    /// Record created.
    Created,
    /// Record updated.
    Updated,
    /// Record deleted.
    Deleted,
    /// Records re-synchronized with the document mirror.
    Resynced,
    /// Generic validation failure headline.
    ValidationFailed,
    /// `{field}` is not a settable parameter.
    InvalidParameter,
    /// `{field}` is required.
    FieldRequired,
    /// `{field}` cannot be null.
    FieldNotNull,
    /// `{field}` must be of type `{value}`.
    FieldType,
    /// `{field}` must be an array.
    FieldArray,
    /// `{field}` has an unknown status value.
    InvalidStatus,
    /// Numeric id required.
    IdRequired,
    /// No parameters besides the id.
    EmptyParams,
    /// Request body is not a JSON object.
    InvalidBody,
    /// Record `{id}` of `{label}` not found.
    NotFound,
    /// Stale lock version; refresh and retry.
    LockVersionOutdated,
    /// The update changed nothing.
    NoRecordUpdated,
    /// The record is already deleted.
    NoRecordDeleted,
    /// Deleted record requires superadmin to change status.
    DeletedRequiresSuperadmin,
    /// Transition table has no entry for the current status.
    InvalidTransition,
    /// Status already `{label}`.
    StatusAlready,
    /// Cannot change status from `{value}` to `{newValue}`.
    CannotChangeStatus,
    /// Superadmin capability required.
    SuperadminRequired,
    /// `{field}` cannot change while `{label}` records reference it.
    UpdatePermission,
    /// No document mirror is configured.
    MirrorUnavailable,
    /// Authentication required.
    Unauthorized,
    /// Unexpected failure.
    UnknownError,
}

impl MessageKey {
    /// Every key, for catalog completeness checks.
    pub const ALL: [Self; 28] = [
        Self::Success,
        Self::Created,
        Self::Updated,
        Self::Deleted,
        Self::Resynced,
        Self::ValidationFailed,
        Self::InvalidParameter,
        Self::FieldRequired,
        Self::FieldNotNull,
        Self::FieldType,
        Self::FieldArray,
        Self::InvalidStatus,
        Self::IdRequired,
        Self::EmptyParams,
        Self::InvalidBody,
        Self::NotFound,
        Self::LockVersionOutdated,
        Self::NoRecordUpdated,
        Self::NoRecordDeleted,
        Self::DeletedRequiresSuperadmin,
        Self::InvalidTransition,
        Self::StatusAlready,
        Self::CannotChangeStatus,
        Self::SuperadminRequired,
        Self::UpdatePermission,
        Self::MirrorUnavailable,
        Self::Unauthorized,
        Self::UnknownError,
    ];

    /// Stable key used by external string tables.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "response.success",
            Self::Created => "response.created",
            Self::Updated => "response.updated",
            Self::Deleted => "response.deleted",
            Self::Resynced => "response.resynced",
            Self::ValidationFailed => "validation.failed",
            Self::InvalidParameter => "param.invalid",
            Self::FieldRequired => "field.required",
            Self::FieldNotNull => "field.not_null",
            Self::FieldType => "field.type",
            Self::FieldArray => "field.array",
            Self::InvalidStatus => "field.invalid_status",
            Self::IdRequired => "request.id_required",
            Self::EmptyParams => "request.empty_params",
            Self::InvalidBody => "request.invalid_body",
            Self::NotFound => "record.not_found",
            Self::LockVersionOutdated => "lock.outdated",
            Self::NoRecordUpdated => "record.no_update",
            Self::NoRecordDeleted => "record.no_delete",
            Self::DeletedRequiresSuperadmin => "status.deleted_requires_superadmin",
            Self::InvalidTransition => "status.invalid_transition",
            Self::StatusAlready => "status.already",
            Self::CannotChangeStatus => "status.cannot_change",
            Self::SuperadminRequired => "permission.superadmin_required",
            Self::UpdatePermission => "dependency.update_permission",
            Self::MirrorUnavailable => "mirror.unavailable",
            Self::Unauthorized => "auth.unauthorized",
            Self::UnknownError => "error.unknown",
        }
    }

    const fn default_text(self) -> &'static str {
        match self {
            Self::Success => "Success.",
            Self::Created => "Record created successfully.",
            Self::Updated => "Record updated successfully.",
            Self::Deleted => "Record deleted successfully.",
            Self::Resynced => "Records re-synchronized.",
            Self::ValidationFailed => "Validation failed.",
            Self::InvalidParameter => "{field} is not a valid parameter.",
            Self::FieldRequired => "{field} is required.",
            Self::FieldNotNull => "{field} cannot be null.",
            Self::FieldType => "{field} must be of type {value}.",
            Self::FieldArray => "{field} must be an array.",
            Self::InvalidStatus => "{field} has an invalid status value.",
            Self::IdRequired => "A numeric id is required.",
            Self::EmptyParams => "Request parameters cannot be empty.",
            Self::InvalidBody => "Request body must be a JSON object.",
            Self::NotFound => "{label} with id {id} not found.",
            Self::LockVersionOutdated => {
                "The record has been modified by someone else. Refresh and retry."
            },
            Self::NoRecordUpdated => "No record updated.",
            Self::NoRecordDeleted => "No record deleted.",
            Self::DeletedRequiresSuperadmin => {
                "A deleted record requires superadmin to change status."
            },
            Self::InvalidTransition => "Invalid status transition.",
            Self::StatusAlready => "Status already {label}.",
            Self::CannotChangeStatus => "Cannot change status from {value} to {newValue}.",
            Self::SuperadminRequired => "This operation requires superadmin.",
            Self::UpdatePermission => "{field} cannot be changed because it is used in {label}.",
            Self::MirrorUnavailable => "Search is not available for this resource.",
            Self::Unauthorized => "Authentication required.",
            Self::UnknownError => "An unknown error occurred.",
        }
    }
}

/// Translation collaborator.
///
/// Resolves a key plus named placeholders to a human string.
pub trait Translator: Send + Sync {
    /// Resolve `key`, substituting each `(name, value)` placeholder.
    fn translate(&self, key: MessageKey, params: &[(&str, &str)]) -> String;
}

/// Key-value message catalog with English defaults.
///
/// # Examples
///
/// ```
/// use record_lifecycle_core::{MessageCatalog, MessageKey, Translator};
///
/// let catalog = MessageCatalog::new().with_override("status.already", "Ya está {label}.");
/// assert_eq!(
///     catalog.translate(MessageKey::StatusAlready, &[("label", "Completed")]),
///     "Ya está Completed."
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct MessageCatalog {
    overrides: HashMap<String, String>,
}

impl MessageCatalog {
    /// Catalog with only the built-in defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog overriding the defaults with `entries` (keyed by
    /// [`MessageKey::as_str`]). Unknown keys are kept but never used.
    #[must_use]
    pub fn from_entries(entries: HashMap<String, String>) -> Self {
        Self { overrides: entries }
    }

    /// Override a single key.
    #[must_use]
    pub fn with_override(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.overrides.insert(key.into(), text.into());
        self
    }

    fn template(&self, key: MessageKey) -> &str {
        self.overrides
            .get(key.as_str())
            .map_or_else(|| key.default_text(), String::as_str)
    }
}

impl Translator for MessageCatalog {
    fn translate(&self, key: MessageKey, params: &[(&str, &str)]) -> String {
        let mut text = self.template(key).to_string();
        for (name, value) in params {
            text = text.replace(&format!("{{{name}}}"), value);
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn placeholders_are_substituted() {
        let catalog = MessageCatalog::new();
        assert_eq!(
            catalog.translate(
                MessageKey::CannotChangeStatus,
                &[("value", "Completed"), ("newValue", "Active")]
            ),
            "Cannot change status from Completed to Active."
        );
    }

    #[test]
    fn unknown_placeholders_are_left_alone() {
        let catalog = MessageCatalog::new();
        assert_eq!(
            catalog.translate(MessageKey::InvalidParameter, &[("label", "x")]),
            "{field} is not a valid parameter."
        );
    }

    #[test]
    fn keys_are_unique() {
        let keys: HashSet<_> = MessageKey::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(keys.len(), MessageKey::ALL.len());
    }

    #[test]
    fn overrides_win_over_defaults() {
        let mut entries = HashMap::new();
        entries.insert("record.no_update".to_string(), "Nothing changed".to_string());
        let catalog = MessageCatalog::from_entries(entries);
        assert_eq!(catalog.translate(MessageKey::NoRecordUpdated, &[]), "Nothing changed");
        assert_eq!(catalog.translate(MessageKey::NoRecordDeleted, &[]), "No record deleted.");
    }
}
