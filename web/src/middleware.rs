//! Axum middleware for request tracking and the HTTP boundary.
//!
//! - [`correlation_id_layer`]: reads or generates `X-Correlation-ID`, opens a
//!   request span with it and echoes it on the response
//! - [`trusted_actor_headers`]: builds an [`ActorContext`] from
//!   `X-Actor-Id` / `X-Actor-Roles`, for deployments behind a trusted proxy
//!   and for local development
//! - [`with_boundary`]: correlation IDs, `tower-http` tracing and panic
//!   recovery rendered as a 500 envelope
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, middleware::from_fn};
//! use record_lifecycle_web::middleware::{trusted_actor_headers, with_boundary};
//!
//! let app = Router::new()
//!     .nest("/api/notes", resource_router(notes))
//!     .layer(from_fn(trusted_actor_headers));
//! let app = with_boundary(app);
//! ```

use crate::error::ApiError;
use axum::{
    Router,
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use record_lifecycle_core::ActorContext;
use std::any::Any;
use std::fmt;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use uuid::Uuid;

/// Header name for correlation ID.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Header carrying the acting user's id.
pub const ACTOR_ID_HEADER: &str = "X-Actor-Id";

/// Header carrying the acting user's roles, comma-separated.
pub const ACTOR_ROLES_HEADER: &str = "X-Actor-Roles";

/// Correlation ID of the current request, stored in request extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationId(pub Uuid);

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Create a layer that adds correlation ID tracking to all requests.
#[must_use]
pub const fn correlation_id_layer() -> CorrelationIdLayer {
    CorrelationIdLayer
}

/// Layer for correlation ID tracking.
#[derive(Clone, Debug)]
pub struct CorrelationIdLayer;

impl<S> Layer<S> for CorrelationIdLayer {
    type Service = CorrelationIdMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationIdMiddleware { inner }
    }
}

/// Middleware service for correlation ID tracking.
#[derive(Clone, Debug)]
pub struct CorrelationIdMiddleware<S> {
    inner: S,
}

impl<S> Service<Request> for CorrelationIdMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let correlation_id = CorrelationId(
            req.headers()
                .get(CORRELATION_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| Uuid::parse_str(s).ok())
                .unwrap_or_else(Uuid::new_v4),
        );
        req.extensions_mut().insert(correlation_id);

        let span = tracing::info_span!(
            "http_request",
            correlation_id = %correlation_id,
            method = %req.method(),
            path = %req.uri().path(),
        );
        let fut = self.inner.call(req);

        Box::pin(async move {
            let mut response = fut.instrument(span).await?;
            if let Ok(value) = HeaderValue::from_str(&correlation_id.to_string()) {
                response.headers_mut().insert(CORRELATION_ID_HEADER, value);
            }
            Ok(response)
        })
    }
}

/// Build the request's [`ActorContext`] from trusted headers.
///
/// Requests without `X-Actor-Id` pass through without an actor, so resource
/// handlers answer 401. Only install this behind a proxy that strips these
/// headers from client traffic.
pub async fn trusted_actor_headers(mut req: Request, next: Next) -> Response {
    let (user_id, roles) = {
        let header = |name: &str| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
        };
        (header(ACTOR_ID_HEADER), header(ACTOR_ROLES_HEADER).unwrap_or_default())
    };

    if let Some(user_id) = user_id {
        let actor = ActorContext::new(
            user_id,
            roles.split(',').map(str::trim).filter(|role| !role.is_empty()),
        );
        req.extensions_mut().insert(actor);
    }
    next.run(req).await
}

/// Wrap `router` in the boundary layers: correlation IDs, HTTP tracing and
/// panic recovery.
#[must_use]
pub fn with_boundary(router: Router) -> Router {
    router
        .layer(correlation_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(panic_response))
}

#[allow(clippy::needless_pass_by_value)] // Signature required by CatchPanicLayer
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| panic.downcast_ref::<&str>().map(|s| (*s).to_string()))
        .unwrap_or_else(|| "unknown panic payload".to_string());
    ApiError::from(anyhow::anyhow!("handler panicked: {detail}")).into_response()
}
