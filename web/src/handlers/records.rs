//! Resource handlers.
//!
//! Each handler is generic over the [`Resource`] its router serves. They
//! translate HTTP into controller calls and nothing else: every rule lives
//! in the controller.
//!
//! | Route            | Method | Controller operation |
//! |------------------|--------|----------------------|
//! | `/`              | GET    | `list`               |
//! | `/`              | POST   | `create`             |
//! | `/search`        | POST   | `search`             |
//! | `/resync`        | POST   | `resync_failed`      |
//! | `/:id`           | GET    | `find_one`           |
//! | `/:id`           | PUT    | `update`             |
//! | `/:id`           | DELETE | `delete`             |

use crate::error::ApiError;
use crate::extractors::{Actor, JsonParams, QueryParams, SearchBody};
use crate::state::ResourceState;
use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
};
use record_lifecycle_core::resource::Resource;
use record_lifecycle_core::{Envelope, LifecycleError, Params};
use serde::Deserialize;
use serde_json::Value;

/// Result type of resource handlers.
pub type ApiResult = Result<Json<Envelope>, ApiError>;

/// Records re-mirrored per resync call when no limit is given.
pub const DEFAULT_RESYNC_LIMIT: u32 = 100;

/// Query string of the resync endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ResyncParams {
    /// Maximum records to re-mirror.
    pub limit: Option<u32>,
}

fn respond<T: Resource>(
    state: &ResourceState<T>,
    outcome: Result<Envelope, LifecycleError>,
) -> ApiResult {
    outcome.map(Json).map_err(|error| state.error(error))
}

/// The path id wins over any `id` in the body. It stays a string so the
/// controller reports malformed ids as field errors.
fn with_path_id(mut params: Params, id: String) -> Params {
    params.insert("id".to_string(), Value::String(id));
    params
}

/// `GET /`
pub async fn list<T: Resource>(
    State(state): State<ResourceState<T>>,
    Actor(actor): Actor,
    QueryParams(params): QueryParams,
) -> ApiResult {
    respond(&state, state.controller().list(&actor, params).await)
}

/// `POST /`
pub async fn create<T: Resource>(
    State(state): State<ResourceState<T>>,
    Actor(actor): Actor,
    JsonParams(params): JsonParams,
) -> ApiResult {
    respond(&state, state.controller().create(&actor, params).await)
}

/// `GET /:id`
pub async fn find_one<T: Resource>(
    State(state): State<ResourceState<T>>,
    Actor(actor): Actor,
    Path(id): Path<String>,
) -> ApiResult {
    let params = with_path_id(Params::new(), id);
    respond(&state, state.controller().find_one(&actor, params).await)
}

/// `PUT /:id`
pub async fn update<T: Resource>(
    State(state): State<ResourceState<T>>,
    Actor(actor): Actor,
    Path(id): Path<String>,
    JsonParams(params): JsonParams,
) -> ApiResult {
    let params = with_path_id(params, id);
    respond(&state, state.controller().update(&actor, params).await)
}

/// `DELETE /:id`
///
/// The body carries the `lockVersion` the client last read.
pub async fn delete<T: Resource>(
    State(state): State<ResourceState<T>>,
    Actor(actor): Actor,
    Path(id): Path<String>,
    JsonParams(params): JsonParams,
) -> ApiResult {
    let params = with_path_id(params, id);
    respond(&state, state.controller().delete(&actor, params).await)
}

/// `POST /search`
pub async fn search<T: Resource>(
    State(state): State<ResourceState<T>>,
    Actor(actor): Actor,
    SearchBody(query): SearchBody,
) -> ApiResult {
    respond(&state, state.controller().search(&actor, query).await)
}

/// `POST /resync?limit=N`
pub async fn resync<T: Resource>(
    State(state): State<ResourceState<T>>,
    Actor(actor): Actor,
    query: Result<Query<ResyncParams>, QueryRejection>,
) -> ApiResult {
    let Query(query) = query
        .map_err(|rejection| state.error(LifecycleError::bad_request(rejection.body_text())))?;
    let limit = query.limit.unwrap_or(DEFAULT_RESYNC_LIMIT);
    respond(&state, state.controller().resync_failed(&actor, limit).await)
}
