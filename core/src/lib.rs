//! # Record Lifecycle Core
//!
//! The record lifecycle controller and the guards it composes.
//!
//! Every resource type exposed over the REST surface goes through the same
//! fixed pipeline. The controller enforces optimistic locking, the status
//! state machine and request-shape validation uniformly, then produces the
//! canonical response envelope.
//!
//! ## Components
//!
//! - **Field/Shape Validator** ([`validation`]): rejects undeclared parameters
//! - **Status Transition Engine** ([`status`]): table-driven state machine
//! - **Optimistic Lock Guard** ([`guards::lock`]): stale-write detection
//! - **Change-Tracking Guard** ([`guards::change`]): rejects no-op mutations
//! - **Dependency Guard** ([`guards::dependency`]): referential integrity
//! - **Record Lifecycle Controller** ([`controller`]): the pipeline
//! - **Response Envelope Builder** ([`envelope`]): uniform wire format
//!
//! ## Request Flow
//!
//! ```text
//! raw params ──▶ shape validator ──▶ load record ──▶ lock pre-check
//!                                                        │
//!        envelope ◀── mirror ◀── conditional write ◀── guards
//! ```
//!
//! ## Collaborators
//!
//! Storage ([`store::RecordStore`]), the document mirror
//! ([`mirror::DocumentMirror`]), the message catalog
//! ([`messages::Translator`]) and the clock ([`environment::Clock`]) are
//! injected. The core never reaches for ambient state: the acting user is an
//! explicit [`ActorContext`].
//!
//! ## Example
//!
//! ```ignore
//! use record_lifecycle_core::{ActorContext, LifecycleController};
//!
//! let controller = LifecycleController::<Article>::builder(store)
//!     .clock(clock)
//!     .build();
//!
//! let actor = ActorContext::new("42", ["editor"]);
//! let envelope = controller.create(&actor, params).await?;
//! assert_eq!(envelope.code, 200);
//! ```

pub mod actor;
pub mod config;
pub mod controller;
pub mod envelope;
pub mod error;
pub mod guards;
pub mod messages;
pub mod mirror;
pub mod record;
pub mod resource;
pub mod status;
pub mod store;
pub mod validation;

pub use actor::ActorContext;
pub use config::LifecycleConfig;
pub use controller::{LifecycleController, LifecycleControllerBuilder};
pub use envelope::{Envelope, Pagination};
pub use error::{FieldError, FieldErrors, LifecycleError, Result};
pub use messages::{MessageCatalog, MessageKey, Translator};
pub use record::{ChangeLog, Record, StoredRecord};
pub use resource::{Dependency, FieldKind, FieldSpec, Resource, Scenario};
pub use status::{Status, TransitionDenied, TransitionTable};

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde_json::{Map, Value};

/// Raw request parameters, prior to validation.
pub type Params = serde_json::Map<String, serde_json::Value>;

/// Environment module - injected dependencies that are not storage.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use record_lifecycle_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let before = clock.now();
    /// assert!(clock.now() >= before);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
