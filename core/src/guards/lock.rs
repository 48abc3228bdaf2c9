//! Optimistic lock guard.
//!
//! Callers echo the `lockVersion` they last observed. The guard rejects a
//! stale value twice: once against the loaded record, so the caller gets a
//! 409 before any other work, and again atomically at the storage layer,
//! which is what actually closes the race between two concurrent writers.

use super::{Guard, GuardFuture, MutationContext};
use crate::error::{FieldError, LifecycleError, Result};
use crate::messages::{MessageKey, Translator};
use crate::Params;
use crate::resource::LOCK_VERSION_FIELD;
use crate::store::{RecordStore, RecordUpdate};

/// Stale-write detection.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptimisticLockGuard;

impl OptimisticLockGuard {
    /// Create the guard.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// The lock version carried by `params`.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::ValidationFailed`] when `lockVersion` is
    /// missing or not an integer.
    pub fn supplied(params: &Params, translator: &dyn Translator) -> Result<i64> {
        let message = match params.get(LOCK_VERSION_FIELD) {
            Some(value) => match value.as_i64() {
                Some(version) => return Ok(version),
                None => translator.translate(
                    MessageKey::FieldType,
                    &[("field", LOCK_VERSION_FIELD), ("value", "integer")],
                ),
            },
            None => translator.translate(MessageKey::FieldRequired, &[("field", LOCK_VERSION_FIELD)]),
        };
        Err(LifecycleError::validation(
            translator.translate(MessageKey::ValidationFailed, &[]),
            vec![FieldError::new(LOCK_VERSION_FIELD, message)],
        ))
    }

    /// Compare the supplied version with the stored one.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::LockVersionOutdated`] on mismatch.
    pub fn verify(supplied: i64, stored: i64, translator: &dyn Translator) -> Result<()> {
        if supplied == stored {
            Ok(())
        } else {
            Err(outdated(translator))
        }
    }

    /// Apply `update` as a conditional write and return the new version.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::LockVersionOutdated`] when no row matched
    /// the id and expected version, or [`LifecycleError::ServerError`] when
    /// the store fails.
    pub async fn write(
        store: &dyn RecordStore,
        table: &'static str,
        update: RecordUpdate,
        translator: &dyn Translator,
    ) -> Result<i64> {
        let id = update.id;
        let expected = update.expected_lock_version;
        let rows = store
            .update_if_version(table, update)
            .await
            .map_err(|e| LifecycleError::unexpected(translator, e))?;

        if rows == 0 {
            tracing::warn!(table, record_id = id, expected, "conditional write lost the race");
            metrics::counter!("lifecycle.lock_conflict", "table" => table).increment(1);
            return Err(outdated(translator));
        }
        Ok(expected + 1)
    }
}

fn outdated(translator: &dyn Translator) -> LifecycleError {
    LifecycleError::LockVersionOutdated {
        message: translator.translate(MessageKey::LockVersionOutdated, &[]),
    }
}

impl Guard for OptimisticLockGuard {
    fn name(&self) -> &'static str {
        "optimistic_lock"
    }

    fn check<'a>(&'a self, ctx: &'a MutationContext<'a>) -> GuardFuture<'a> {
        let result = Self::verify(ctx.supplied_lock_version, ctx.stored_lock_version, ctx.translator)
            .inspect_err(|_| {
                tracing::warn!(
                    table = ctx.table,
                    record_id = ctx.record_id,
                    supplied = ctx.supplied_lock_version,
                    stored = ctx.stored_lock_version,
                    "stale lock version"
                );
                metrics::counter!("lifecycle.lock_conflict", "table" => ctx.table).increment(1);
            });
        Box::pin(std::future::ready(result))
    }
}
