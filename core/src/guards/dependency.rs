//! Dependency guard: referential integrity in application code.

use super::{Guard, GuardFuture, MutationContext};
use crate::error::{FieldErrors, LifecycleError, Result};
use crate::messages::MessageKey;
use crate::resource::{Dependency, STATUS_FIELD};
use crate::status::{Status, TransitionTable};
use crate::store::RecordStore;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Blocks changes to protected fields while other records reference the
/// current one.
///
/// The guard runs only when a protected field changes or the record moves
/// into a disallowed-for-update status, and stops at the first dependent
/// table with a match.
pub struct DependencyGuard {
    store: Arc<dyn RecordStore>,
    protected: &'static [&'static str],
    dependents: &'static [Dependency],
    final_statuses: BTreeSet<Status>,
}

impl DependencyGuard {
    /// Guard for a resource's protected fields and dependents.
    ///
    /// The disallowed-for-update set is taken from `table`.
    #[must_use]
    pub fn new(
        store: Arc<dyn RecordStore>,
        protected: &'static [&'static str],
        dependents: &'static [Dependency],
        table: &TransitionTable,
    ) -> Self {
        Self {
            store,
            protected,
            dependents,
            final_statuses: Status::ALL
                .into_iter()
                .filter(|status| table.is_disallowed_for_update(*status))
                .collect(),
        }
    }

    async fn evaluate(&self, ctx: &MutationContext<'_>) -> Result<()> {
        let changed: Vec<&str> = self
            .protected
            .iter()
            .copied()
            .filter(|field| ctx.has_changed(field))
            .collect();
        let finalizing = ctx.status_changes() && self.final_statuses.contains(&ctx.new_status);
        if changed.is_empty() && !finalizing {
            return Ok(());
        }

        for dependency in self.dependents {
            let referenced = self
                .store
                .exists(dependency.table, dependency.field, Value::from(ctx.record_id))
                .await
                .map_err(|e| LifecycleError::unexpected(ctx.translator, e))?;
            if !referenced {
                continue;
            }

            tracing::debug!(
                table = ctx.table,
                record_id = ctx.record_id,
                dependent = dependency.table,
                "record is referenced by dependents"
            );
            let fields = if changed.is_empty() { vec![STATUS_FIELD] } else { changed };
            let mut errors = FieldErrors::new();
            for field in fields {
                errors.push(
                    field,
                    ctx.translator.translate(
                        MessageKey::UpdatePermission,
                        &[("field", field), ("label", dependency.table)],
                    ),
                );
            }
            return errors.into_result(|errors| LifecycleError::UpdatePermission {
                message: errors.first().map(|e| e.message.clone()).unwrap_or_default(),
                errors,
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for DependencyGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyGuard")
            .field("protected", &self.protected)
            .field("dependents", &self.dependents)
            .field("final_statuses", &self.final_statuses)
            .finish_non_exhaustive()
    }
}

impl Guard for DependencyGuard {
    fn name(&self) -> &'static str {
        "dependency"
    }

    fn check<'a>(&'a self, ctx: &'a MutationContext<'a>) -> GuardFuture<'a> {
        Box::pin(self.evaluate(ctx))
    }
}
