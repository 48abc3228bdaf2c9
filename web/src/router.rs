//! Router construction.

use crate::handlers::records;
use crate::state::ResourceState;
use axum::{
    Router,
    routing::{get, post},
};
use record_lifecycle_core::LifecycleController;
use record_lifecycle_core::resource::Resource;
use std::sync::Arc;

/// Routes for one resource type, ready to be nested under its path.
///
/// The router expects an [`ActorContext`](record_lifecycle_core::ActorContext)
/// in request extensions, placed there by the authentication layer.
///
/// # Examples
///
/// ```ignore
/// let app = Router::new()
///     .nest("/api/notes", resource_router(Arc::new(notes)))
///     .nest("/api/notebooks", resource_router(Arc::new(notebooks)));
/// ```
pub fn resource_router<T: Resource>(controller: Arc<LifecycleController<T>>) -> Router {
    Router::new()
        .route("/", get(records::list::<T>).post(records::create::<T>))
        .route("/search", post(records::search::<T>))
        .route("/resync", post(records::resync::<T>))
        .route(
            "/:id",
            get(records::find_one::<T>)
                .put(records::update::<T>)
                .delete(records::delete::<T>),
        )
        .with_state(ResourceState::new(controller))
}
