//! Status transition guard.

use super::{Guard, GuardFuture, MutationContext};
use crate::error::{FieldError, LifecycleError, Result};
use crate::messages::{MessageKey, Translator};
use crate::resource::STATUS_FIELD;
use crate::status::{TransitionDenied, TransitionTable};

/// Runs the [`TransitionTable`] when a mutation changes the status.
///
/// Same-status requests are not re-validated against the table.
#[derive(Debug, Clone, Default)]
pub struct StatusTransitionGuard {
    table: TransitionTable,
}

impl StatusTransitionGuard {
    /// Guard enforcing `table`.
    #[must_use]
    pub const fn new(table: TransitionTable) -> Self {
        Self { table }
    }

    /// The enforced table.
    #[must_use]
    pub const fn table(&self) -> &TransitionTable {
        &self.table
    }

    fn evaluate(&self, ctx: &MutationContext<'_>) -> Result<()> {
        if !ctx.status_changes() {
            return Ok(());
        }
        self.table
            .check(ctx.old_status, ctx.new_status, ctx.actor.is_superadmin())
            .map_err(|denied| {
                tracing::debug!(
                    table = ctx.table,
                    record_id = ctx.record_id,
                    from = %ctx.old_status,
                    to = %ctx.new_status,
                    ?denied,
                    "status transition rejected"
                );
                let message = denial_message(denied, ctx.translator);
                LifecycleError::validation(
                    message.clone(),
                    vec![FieldError::new(STATUS_FIELD, message)],
                )
            })
    }
}

impl Guard for StatusTransitionGuard {
    fn name(&self) -> &'static str {
        "status_transition"
    }

    fn check<'a>(&'a self, ctx: &'a MutationContext<'a>) -> GuardFuture<'a> {
        Box::pin(std::future::ready(self.evaluate(ctx)))
    }
}

/// Localized message for a rejected transition.
#[must_use]
pub fn denial_message(denied: TransitionDenied, translator: &dyn Translator) -> String {
    match denied {
        TransitionDenied::DeletedRequiresSuperadmin => {
            translator.translate(MessageKey::DeletedRequiresSuperadmin, &[])
        },
        TransitionDenied::UnknownOrigin { .. } => {
            translator.translate(MessageKey::InvalidTransition, &[])
        },
        TransitionDenied::AlreadyFinal { from } => {
            translator.translate(MessageKey::StatusAlready, &[("label", from.label())])
        },
        TransitionDenied::NotAllowed { from, to } => translator.translate(
            MessageKey::CannotChangeStatus,
            &[("value", from.label()), ("newValue", to.label())],
        ),
    }
}
