//! The uniform error taxonomy of the lifecycle core.
//!
//! Every guard failure is a [`LifecycleError`]. Each variant carries an
//! HTTP-equivalent status code, an already-localized message and, where it
//! applies, a list of `(field, message)` pairs. The controller never catches
//! these; they propagate to the boundary, which renders them through
//! [`crate::Envelope::from_error`].

use crate::messages::{MessageKey, Translator};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias for lifecycle operations.
pub type Result<T> = std::result::Result<T, LifecycleError>;

/// A single field-level error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Wire name of the offending field.
    pub field: String,
    /// Localized message.
    pub message: String,
}

impl FieldError {
    /// Create a new field error.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Collector for the field errors of a single guard.
///
/// Guards accumulate every applicable error before raising, so a request
/// with three undeclared fields reports all three.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    /// Create an empty collector.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Record an error for `field`.
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError::new(field, message));
    }

    /// Whether no error has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of recorded errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether an error has been recorded for `field`.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    /// Iterate over the recorded errors.
    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// Consume the collector.
    #[must_use]
    pub fn into_vec(self) -> Vec<FieldError> {
        self.0
    }

    /// `Ok(())` when empty, otherwise the error built by `raise`.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `raise` when at least one field error
    /// was recorded.
    pub fn into_result<F>(self, raise: F) -> Result<()>
    where
        F: FnOnce(Vec<FieldError>) -> LifecycleError,
    {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(raise(self.0))
        }
    }
}

impl Extend<FieldError> for FieldErrors {
    fn extend<I: IntoIterator<Item = FieldError>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

/// Lifecycle error taxonomy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    // ═══════════════════════════════════════════════════════════
    // Request Errors
    // ═══════════════════════════════════════════════════════════

    /// Malformed or missing id, empty parameters.
    #[error("Bad request: {message}")]
    BadRequest {
        /// Localized message
        message: String,
        /// Offending fields, if any
        errors: Vec<FieldError>,
    },

    /// No or invalid credential. Produced by the authentication layer.
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Localized message
        message: String,
    },

    /// Superadmin-only operation attempted by a non-privileged actor.
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Localized message
        message: String,
    },

    /// Id lookup miss.
    #[error("Not found: {message}")]
    NotFound {
        /// Localized message
        message: String,
    },

    // ═══════════════════════════════════════════════════════════
    // Guard Errors
    // ═══════════════════════════════════════════════════════════

    /// Optimistic lock mismatch.
    #[error("Lock version outdated: {message}")]
    LockVersionOutdated {
        /// Localized "refresh and retry" message
        message: String,
    },

    /// Field shape, status transition, required/array/null violations.
    #[error("Validation failed: {message}")]
    ValidationFailed {
        /// Localized message
        message: String,
        /// Every offending field
        errors: Vec<FieldError>,
    },

    /// A protected field cannot change while other records reference this one.
    #[error("Update not permitted: {message}")]
    UpdatePermission {
        /// Localized message
        message: String,
        /// One entry per changed protected attribute
        errors: Vec<FieldError>,
    },

    /// The update would not change persisted state.
    #[error("No record updated: {message}")]
    NoRecordUpdated {
        /// Localized message
        message: String,
    },

    /// The record is already deleted.
    #[error("No record deleted: {message}")]
    NoRecordDeleted {
        /// Localized message
        message: String,
    },

    // ═══════════════════════════════════════════════════════════
    // System Errors
    // ═══════════════════════════════════════════════════════════

    /// Unexpected failure from a collaborator.
    ///
    /// `trace` holds internal detail and is only rendered in dev mode.
    #[error("Server error: {message}")]
    ServerError {
        /// Generic, localized message
        message: String,
        /// Internal detail (never rendered in production)
        trace: Option<String>,
    },
}

impl LifecycleError {
    /// Create a 400 error without field errors.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            errors: Vec::new(),
        }
    }

    /// Create a 422 validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>, errors: Vec<FieldError>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
            errors,
        }
    }

    /// Create a 500 error carrying internal detail.
    #[must_use]
    pub fn server(message: impl Into<String>, trace: impl Into<String>) -> Self {
        Self::ServerError {
            message: message.into(),
            trace: Some(trace.into()),
        }
    }

    /// Create a 500 error for an unexpected collaborator failure.
    ///
    /// The client sees the localized "unknown error" message; `detail` is
    /// kept as the internal trace.
    #[must_use]
    pub fn unexpected(translator: &dyn Translator, detail: impl fmt::Display) -> Self {
        Self::server(translator.translate(MessageKey::UnknownError, &[]), detail.to_string())
    }

    /// HTTP-equivalent status code.
    ///
    /// # Examples
    ///
    /// ```
    /// # use record_lifecycle_core::LifecycleError;
    /// let err = LifecycleError::LockVersionOutdated { message: "stale".into() };
    /// assert_eq!(err.status_code(), 409);
    /// ```
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest { .. } | Self::NoRecordUpdated { .. } | Self::NoRecordDeleted { .. } => {
                400
            },
            Self::Unauthorized { .. } => 401,
            Self::Forbidden { .. } => 403,
            Self::NotFound { .. } => 404,
            Self::LockVersionOutdated { .. } => 409,
            Self::ValidationFailed { .. } | Self::UpdatePermission { .. } => 422,
            Self::ServerError { .. } => 500,
        }
    }

    /// The localized message.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest { message, .. }
            | Self::Unauthorized { message }
            | Self::Forbidden { message }
            | Self::NotFound { message }
            | Self::LockVersionOutdated { message }
            | Self::ValidationFailed { message, .. }
            | Self::UpdatePermission { message, .. }
            | Self::NoRecordUpdated { message }
            | Self::NoRecordDeleted { message }
            | Self::ServerError { message, .. } => message,
        }
    }

    /// Field-level errors, empty for variants that carry none.
    #[must_use]
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Self::BadRequest { errors, .. }
            | Self::ValidationFailed { errors, .. }
            | Self::UpdatePermission { errors, .. } => errors,
            _ => &[],
        }
    }

    /// Internal trace of a server error.
    #[must_use]
    pub fn trace(&self) -> Option<&str> {
        match self {
            Self::ServerError { trace, .. } => trace.as_deref(),
            _ => None,
        }
    }

    /// Returns `true` for 5xx errors.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(self, Self::ServerError { .. })
    }
}
