//! Router state for one resource type.

use crate::error::ApiError;
use record_lifecycle_core::messages::MessageKey;
use record_lifecycle_core::resource::Resource;
use record_lifecycle_core::{LifecycleController, LifecycleError};
use std::sync::Arc;

/// State shared by the handlers of a resource router.
#[derive(Clone)]
pub struct ResourceState<T: Resource> {
    controller: Arc<LifecycleController<T>>,
}

impl<T: Resource> ResourceState<T> {
    /// Wrap a controller.
    #[must_use]
    pub const fn new(controller: Arc<LifecycleController<T>>) -> Self {
        Self { controller }
    }

    /// The resource's controller.
    #[must_use]
    pub fn controller(&self) -> &LifecycleController<T> {
        &self.controller
    }

    /// Render `error` with the controller's dev-mode setting.
    #[must_use]
    pub fn error(&self, error: LifecycleError) -> ApiError {
        ApiError::new(error, self.controller.config().dev_mode)
    }

    pub(crate) fn bad_request(&self, key: MessageKey) -> ApiError {
        ApiError::bad_request(
            self.controller.translator(),
            key,
            self.controller.config().dev_mode,
        )
    }

    pub(crate) fn unauthorized(&self) -> ApiError {
        ApiError::unauthorized(self.controller.translator(), self.controller.config().dev_mode)
    }
}
