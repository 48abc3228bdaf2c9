//! Axum extractors for resource handlers.
//!
//! Every rejection renders as an [`Envelope`](record_lifecycle_core::Envelope)
//! through [`ApiError`], never as axum's plain-text rejections:
//!
//! - [`Actor`]: the authenticated [`ActorContext`], or 401
//! - [`JsonParams`]: a JSON object body, or 400
//! - [`QueryParams`]: query string pairs as string-valued parameters
//! - [`SearchBody`]: a [`SearchQuery`] body, or 400
//!
//! # Examples
//!
//! ```ignore
//! async fn create(
//!     State(state): State<ResourceState<Note>>,
//!     Actor(actor): Actor,
//!     JsonParams(params): JsonParams,
//! ) -> ApiResult {
//!     let envelope = state.controller().create(&actor, params).await.map_err(|e| state.error(e))?;
//!     Ok(Json(envelope))
//! }
//! ```

use crate::error::ApiError;
use crate::state::ResourceState;
use axum::{
    Json, async_trait,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
};
use record_lifecycle_core::messages::MessageKey;
use record_lifecycle_core::mirror::SearchQuery;
use record_lifecycle_core::resource::Resource;
use record_lifecycle_core::{ActorContext, LifecycleError, Params};
use serde_json::Value;
use std::collections::HashMap;

/// The acting user, placed in request extensions by the authentication
/// layer.
#[derive(Debug, Clone)]
pub struct Actor(pub ActorContext);

#[async_trait]
impl<T: Resource> FromRequestParts<ResourceState<T>> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ResourceState<T>,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ActorContext>()
            .cloned()
            .map(Self)
            .ok_or_else(|| {
                tracing::debug!("request carries no actor");
                state.unauthorized()
            })
    }
}

/// Request parameters from a JSON object body.
#[derive(Debug, Clone)]
pub struct JsonParams(pub Params);

#[async_trait]
impl<T: Resource> FromRequest<ResourceState<T>> for JsonParams {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &ResourceState<T>) -> Result<Self, Self::Rejection> {
        match Json::<Value>::from_request(req, state).await {
            Ok(Json(Value::Object(params))) => Ok(Self(params)),
            Ok(Json(other)) => {
                tracing::debug!(kind = json_kind(&other), "request body is not an object");
                Err(state.bad_request(MessageKey::InvalidBody))
            },
            Err(rejection) => {
                tracing::debug!(%rejection, "unreadable request body");
                Err(state.bad_request(MessageKey::InvalidBody))
            },
        }
    }
}

/// Query string pairs as request parameters.
///
/// Every value arrives as a JSON string; the controller converts filters to
/// the declared field kinds.
#[derive(Debug, Clone, Default)]
pub struct QueryParams(pub Params);

#[async_trait]
impl<T: Resource> FromRequestParts<ResourceState<T>> for QueryParams {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ResourceState<T>,
    ) -> Result<Self, Self::Rejection> {
        let Query(pairs) = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
            .map_err(|rejection| state.error(LifecycleError::bad_request(rejection.body_text())))?;
        Ok(Self(
            pairs
                .into_iter()
                .map(|(key, value)| (key, Value::String(value)))
                .collect(),
        ))
    }
}

/// A mirror search request body.
#[derive(Debug, Clone)]
pub struct SearchBody(pub SearchQuery);

#[async_trait]
impl<T: Resource> FromRequest<ResourceState<T>> for SearchBody {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &ResourceState<T>) -> Result<Self, Self::Rejection> {
        Json::<SearchQuery>::from_request(req, state)
            .await
            .map(|Json(query)| Self(query))
            .map_err(|rejection| state.error(LifecycleError::bad_request(rejection.body_text())))
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
