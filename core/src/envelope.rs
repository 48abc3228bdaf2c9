//! Response envelope builder.
//!
//! Every operation, successful or not, produces the same wire shape:
//!
//! ```json
//! {
//!   "code": 200,
//!   "success": true,
//!   "message": "Record updated successfully.",
//!   "data": { "id": 1, "status": 1, "lockVersion": 2 }
//! }
//! ```
//!
//! Failures carry `errors` instead of `data`; lists add `pagination`.

use crate::error::{FieldError, LifecycleError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Pagination block of list responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// 1-based page number.
    pub page: u32,
    /// Matching items across all pages.
    pub total_count: u64,
    /// Number of pages.
    pub total: u64,
    /// Items on this page.
    pub display: u64,
}

impl Pagination {
    /// Pagination for `display` items on `page` of `total_count`.
    ///
    /// # Examples
    ///
    /// ```
    /// use record_lifecycle_core::Pagination;
    ///
    /// let pagination = Pagination::new(2, 20, 45, 20);
    /// assert_eq!(pagination.total, 3);
    /// ```
    #[must_use]
    pub fn new(page: u32, per_page: u32, total_count: u64, display: usize) -> Self {
        let per_page = u64::from(per_page.max(1));
        Self {
            page,
            total_count,
            total: total_count.div_ceil(per_page),
            display: u64::try_from(display).unwrap_or(u64::MAX),
        }
    }
}

/// The canonical response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// HTTP-equivalent status code.
    pub code: u16,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Localized message.
    pub message: String,
    /// Field errors, on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
    /// Payload, on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Present on list responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    /// Internal detail of a 500, only in dev mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

impl Envelope {
    /// 200 with a payload.
    #[must_use]
    pub fn ok(message: impl Into<String>, data: Value) -> Self {
        Self {
            code: 200,
            success: true,
            message: message.into(),
            errors: None,
            data: Some(data),
            pagination: None,
            trace: None,
        }
    }

    /// 200 with a page of items.
    #[must_use]
    pub fn list(message: impl Into<String>, items: Vec<Value>, pagination: Pagination) -> Self {
        Self {
            pagination: Some(pagination),
            ..Self::ok(message, Value::Array(items))
        }
    }

    /// Render a failure.
    ///
    /// The trace of a server error is attached only when `dev_mode` is set.
    #[must_use]
    pub fn from_error(error: &LifecycleError, dev_mode: bool) -> Self {
        Self {
            code: error.status_code(),
            success: false,
            message: error.message().to_string(),
            errors: Some(error.field_errors().to_vec()),
            data: None,
            pagination: None,
            trace: if dev_mode { error.trace().map(str::to_string) } else { None },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_has_data_and_no_errors() {
        let json = serde_json::to_value(Envelope::ok("done", json!({"id": 1}))).unwrap();
        assert_eq!(json, json!({"code": 200, "success": true, "message": "done", "data": {"id": 1}}));
    }

    #[test]
    fn failure_lists_field_errors() {
        let err = LifecycleError::validation(
            "Validation failed.",
            vec![FieldError::new("bogusField", "bogusField is not a valid parameter.")],
        );
        let json = serde_json::to_value(Envelope::from_error(&err, false)).unwrap();

        assert_eq!(json["code"], 422);
        assert_eq!(json["success"], false);
        assert_eq!(json["errors"][0]["field"], "bogusField");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn trace_only_in_dev_mode() {
        let err = LifecycleError::server("An unknown error occurred.", "connection reset");
        assert_eq!(Envelope::from_error(&err, false).trace, None);
        assert_eq!(Envelope::from_error(&err, true).trace.as_deref(), Some("connection reset"));
    }

    #[test]
    fn list_pagination_is_camel_case() {
        let envelope = Envelope::list("ok", vec![json!({"id": 1})], Pagination::new(1, 20, 1, 1));
        let json = serde_json::to_value(envelope).unwrap();
        assert_eq!(json["pagination"], json!({"page": 1, "totalCount": 1, "total": 1, "display": 1}));
    }

    #[test]
    fn empty_listing_has_zero_pages() {
        assert_eq!(Pagination::new(1, 20, 0, 0).total, 0);
    }
}
