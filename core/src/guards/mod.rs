//! Mutation guards.
//!
//! A guard inspects a prepared mutation and either lets it through or
//! raises a [`LifecycleError`](crate::LifecycleError). The controller runs
//! its guards in order and stops at the first failure; a guard reports all
//! of its own field errors at once.
//!
//! The default chain for updates and deletes is:
//!
//! 1. [`OptimisticLockGuard`]: stale lock version → 409
//! 2. [`StatusTransitionGuard`]: transition table → 422
//! 3. [`ChangeTrackingGuard`]: no-op mutation → 400
//! 4. [`DependencyGuard`]: referenced record → 422
//!
//! The lock guard also owns the conditional write, which re-checks the
//! version atomically at the storage layer.

pub mod change;
pub mod dependency;
pub mod lock;
pub mod transition;

pub use change::ChangeTrackingGuard;
pub use dependency::DependencyGuard;
pub use lock::OptimisticLockGuard;
pub use transition::StatusTransitionGuard;

use crate::actor::ActorContext;
use crate::error::Result;
use crate::messages::Translator;
use crate::resource::Scenario;
use crate::status::Status;
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by [`Guard::check`].
pub type GuardFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// A prepared update or delete, after the request has been merged onto the
/// stored record.
#[derive(Clone, Copy)]
pub struct MutationContext<'a> {
    /// `Update` or `Delete`.
    pub scenario: Scenario,
    /// Storage table of the resource.
    pub table: &'static str,
    /// Human label of the resource.
    pub label: &'static str,
    /// Acting user.
    pub actor: &'a ActorContext,
    /// Target record.
    pub record_id: i64,
    /// Lock version currently stored.
    pub stored_lock_version: i64,
    /// Lock version supplied by the caller.
    pub supplied_lock_version: i64,
    /// Stored status.
    pub old_status: Status,
    /// Status after the merge.
    pub new_status: Status,
    /// Attributes (including `status`) whose value differs from the stored
    /// record.
    pub changed: &'a [String],
    /// Message catalog.
    pub translator: &'a dyn Translator,
}

impl MutationContext<'_> {
    /// Whether the mutation changes the status.
    #[must_use]
    pub fn status_changes(&self) -> bool {
        self.old_status != self.new_status
    }

    /// Whether `field` is among the changed attributes.
    #[must_use]
    pub fn has_changed(&self, field: &str) -> bool {
        self.changed.iter().any(|changed| changed == field)
    }
}

impl std::fmt::Debug for MutationContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationContext")
            .field("scenario", &self.scenario)
            .field("table", &self.table)
            .field("record_id", &self.record_id)
            .field("stored_lock_version", &self.stored_lock_version)
            .field("supplied_lock_version", &self.supplied_lock_version)
            .field("old_status", &self.old_status)
            .field("new_status", &self.new_status)
            .field("changed", &self.changed)
            .finish_non_exhaustive()
    }
}

/// A single check in the mutation pipeline.
///
/// # Dyn Compatibility
///
/// `check` returns a boxed future so the controller can hold
/// `Arc<dyn Guard>`s; synchronous guards return a ready future.
pub trait Guard: Send + Sync {
    /// Short name, used in logs.
    fn name(&self) -> &'static str;

    /// Inspect the mutation.
    ///
    /// # Errors
    ///
    /// Returns the guard's [`LifecycleError`](crate::LifecycleError) when the
    /// mutation must not proceed.
    fn check<'a>(&'a self, ctx: &'a MutationContext<'a>) -> GuardFuture<'a>;
}
