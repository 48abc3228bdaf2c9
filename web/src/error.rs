//! Error type for web handlers.
//!
//! Bridges [`LifecycleError`] to HTTP: the status code comes from the
//! error's taxonomy and the body is always an [`Envelope`].

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use record_lifecycle_core::messages::{MessageCatalog, MessageKey, Translator};
use record_lifecycle_core::{Envelope, LifecycleError};
use std::fmt;

/// Application error type for web handlers.
///
/// Carries whether internal traces may be attached to the rendered envelope.
///
/// # Examples
///
/// ```ignore
/// async fn handler(State(state): State<ResourceState<Note>>) -> ApiResult {
///     let envelope = state.controller().list(&actor, params).await.map_err(|e| state.error(e))?;
///     Ok(Json(envelope))
/// }
/// ```
#[derive(Debug)]
pub struct ApiError {
    error: LifecycleError,
    dev_mode: bool,
}

impl ApiError {
    /// Wrap a lifecycle error.
    #[must_use]
    pub const fn new(error: LifecycleError, dev_mode: bool) -> Self {
        Self { error, dev_mode }
    }

    /// 400 with a localized message.
    #[must_use]
    pub fn bad_request(translator: &dyn Translator, key: MessageKey, dev_mode: bool) -> Self {
        Self::new(LifecycleError::bad_request(translator.translate(key, &[])), dev_mode)
    }

    /// 401 with the localized "authentication required" message.
    #[must_use]
    pub fn unauthorized(translator: &dyn Translator, dev_mode: bool) -> Self {
        Self::new(
            LifecycleError::Unauthorized {
                message: translator.translate(MessageKey::Unauthorized, &[]),
            },
            dev_mode,
        )
    }

    /// The wrapped error.
    #[must_use]
    pub const fn error(&self) -> &LifecycleError {
        &self.error
    }

    /// HTTP status of the response.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.error.status_code(), self.error.message())
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(
                status = %status,
                message = %self.error.message(),
                trace = self.error.trace().unwrap_or_default(),
                "Internal server error"
            );
        }

        (status, Json(Envelope::from_error(&self.error, self.dev_mode))).into_response()
    }
}

impl From<LifecycleError> for ApiError {
    fn from(error: LifecycleError) -> Self {
        Self::new(error, false)
    }
}

/// Anything unrecognised renders as a 500 "unknown error".
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(LifecycleError::unexpected(&MessageCatalog::new(), format!("{err:#}")), false)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn display_includes_code() {
        let err = ApiError::from(LifecycleError::bad_request("Invalid input"));
        assert_eq!(err.to_string(), "[400] Invalid input");
    }

    #[tokio::test]
    async fn renders_envelope_with_status() {
        let err = ApiError::unauthorized(&MessageCatalog::new(), false);
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body(response).await;
        assert_eq!(body["code"], 401);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Authentication required.");
    }

    #[tokio::test]
    async fn anyhow_errors_are_opaque_500s() {
        let err = ApiError::from(anyhow::anyhow!("pool exhausted"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body(err.into_response()).await;
        assert_eq!(body["message"], "An unknown error occurred.");
        assert!(body.get("trace").is_none());
    }

    #[tokio::test]
    async fn dev_mode_attaches_trace() {
        let err = ApiError::new(
            LifecycleError::unexpected(&MessageCatalog::new(), "Database error: timeout"),
            true,
        );

        let body = body(err.into_response()).await;
        assert_eq!(body["trace"], "Database error: timeout");
    }
}
