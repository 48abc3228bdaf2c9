//! Axum integration for the record lifecycle controller.
//!
//! The HTTP layer is a thin shell: it turns requests into controller calls
//! and renders whatever comes back as an [`Envelope`](record_lifecycle_core::Envelope),
//! errors included.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              Axum shell                 │  ← routing, extraction
//! │  - correlation IDs, tracing             │  ← panic recovery
//! │  - actor from the auth layer            │
//! ├─────────────────────────────────────────┤
//! │        LifecycleController<T>           │
//! │  - shape validation, guards             │  ← one pipeline for every
//! │  - conditional writes, mirroring        │    resource type
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, middleware::from_fn, routing::get};
//! use record_lifecycle_web::{handlers, middleware, resource_router};
//!
//! let app = Router::new()
//!     .nest("/api/notes", resource_router(Arc::new(notes)))
//!     .route("/health", get(handlers::health_check))
//!     .layer(from_fn(middleware::trusted_actor_headers));
//! let app = middleware::with_boundary(app);
//! ```

#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

// Re-export key types for convenience
pub use error::ApiError;
pub use extractors::{Actor, JsonParams, QueryParams, SearchBody};
pub use handlers::records::ApiResult;
pub use middleware::{CORRELATION_ID_HEADER, CorrelationId, correlation_id_layer, with_boundary};
pub use router::resource_router;
pub use state::ResourceState;
