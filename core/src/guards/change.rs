//! Change-tracking (no-op) guard.

use super::{Guard, GuardFuture, MutationContext};
use crate::error::{LifecycleError, Result};
use crate::messages::MessageKey;
use crate::resource::{ID_FIELD, LOCK_VERSION_FIELD, STATUS_FIELD, Scenario};
use crate::status::Status;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Rejects mutations that would not change persisted state.
///
/// An update with no changed attribute fails with `NoRecordUpdated`; a
/// delete of an already-deleted record fails with `NoRecordDeleted`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeTrackingGuard;

impl ChangeTrackingGuard {
    /// Create the guard.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn evaluate(ctx: &MutationContext<'_>) -> Result<()> {
        match ctx.scenario {
            Scenario::Delete if ctx.old_status == Status::Deleted => {
                Err(LifecycleError::NoRecordDeleted {
                    message: ctx.translator.translate(MessageKey::NoRecordDeleted, &[]),
                })
            },
            Scenario::Update if ctx.changed.is_empty() => Err(LifecycleError::NoRecordUpdated {
                message: ctx.translator.translate(MessageKey::NoRecordUpdated, &[]),
            }),
            _ => Ok(()),
        }
    }
}

impl Guard for ChangeTrackingGuard {
    fn name(&self) -> &'static str {
        "change_tracking"
    }

    fn check<'a>(&'a self, ctx: &'a MutationContext<'a>) -> GuardFuture<'a> {
        Box::pin(std::future::ready(Self::evaluate(ctx)))
    }
}

/// Attributes whose value differs between the stored and merged record.
///
/// A missing key and an explicit `null` compare equal. `status` is reported
/// when it changes; `id` and `lockVersion` never are.
#[must_use]
pub fn changed_attributes(
    old: &Map<String, Value>,
    new: &Map<String, Value>,
    old_status: Status,
    new_status: Status,
) -> Vec<String> {
    let keys: BTreeSet<&String> = old.keys().chain(new.keys()).collect();
    let mut changed: Vec<String> = keys
        .into_iter()
        .filter(|key| !matches!(key.as_str(), ID_FIELD | LOCK_VERSION_FIELD | STATUS_FIELD))
        .filter(|key| {
            old.get(key.as_str()).unwrap_or(&Value::Null) != new.get(key.as_str()).unwrap_or(&Value::Null)
        })
        .cloned()
        .collect();
    if old_status != new_status {
        changed.insert(0, STATUS_FIELD.to_string());
    }
    changed
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use crate::actor::ActorContext;
    use crate::guards::test_support::context;
    use crate::messages::MessageCatalog;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn diff_ignores_framework_keys_and_null_vs_missing() {
        let old = map(json!({"name": "a", "note": null, "lockVersion": 1}));
        let new = map(json!({"name": "a", "lockVersion": 2, "id": 9}));
        assert!(changed_attributes(&old, &new, Status::Draft, Status::Draft).is_empty());
    }

    #[test]
    fn diff_reports_status_first() {
        let old = map(json!({"name": "a", "tags": ["x"]}));
        let new = map(json!({"name": "b", "tags": ["x"]}));
        assert_eq!(
            changed_attributes(&old, &new, Status::Draft, Status::Active),
            vec!["status".to_string(), "name".to_string()]
        );
    }

    #[tokio::test]
    async fn empty_update_is_rejected() {
        let actor = ActorContext::system();
        let catalog = MessageCatalog::new();
        let ctx = context(&actor, &catalog, (Status::Active, Status::Active), &[]);

        let err = ChangeTrackingGuard::new().check(&ctx).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.message(), "No record updated.");
    }

    #[tokio::test]
    async fn deleting_twice_is_rejected() {
        let actor = ActorContext::system();
        let catalog = MessageCatalog::new();
        let mut ctx = context(&actor, &catalog, (Status::Deleted, Status::Deleted), &[]);
        ctx.scenario = Scenario::Delete;

        let err = ChangeTrackingGuard::new().check(&ctx).await.unwrap_err();
        assert_eq!(err, LifecycleError::NoRecordDeleted { message: "No record deleted.".into() });
    }

    #[tokio::test]
    async fn real_change_passes() {
        let actor = ActorContext::system();
        let catalog = MessageCatalog::new();
        let changed = vec!["name".to_string()];
        let ctx = context(&actor, &catalog, (Status::Active, Status::Active), &changed);
        assert!(ChangeTrackingGuard::new().check(&ctx).await.is_ok());
    }
}
