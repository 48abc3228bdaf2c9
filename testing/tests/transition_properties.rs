//! Property tests: the controller enforces exactly what the transition
//! table and the allow-lists say.

#![allow(clippy::unwrap_used)] // Test code can use unwrap

use proptest::prelude::*;
use record_lifecycle_core::resource::Scenario;
use record_lifecycle_core::{LifecycleError, Status, TransitionTable};
use record_lifecycle_testing::fixtures::{Harness, Note, editor, params, superadmin};
use record_lifecycle_testing::properties::{
    any_status, any_transition, final_status, undeclared_keys,
};
use serde_json::{Value, json};

fn status_update(from: Status, to: Status, as_superadmin: bool) -> Result<Value, LifecycleError> {
    let harness = Harness::<Note>::new();
    harness.seed(1, from, 1, json!({"name": "A"}));
    let actor = if as_superadmin { superadmin() } else { editor() };
    tokio_test::block_on(harness.controller.update(
        &actor,
        params(json!({"id": 1, "lockVersion": 1, "status": to.code()})),
    ))
    .map(|envelope| envelope.data.unwrap_or_default())
}

proptest! {
    #[test]
    fn status_changes_follow_the_table((from, to) in any_transition(), as_superadmin in any::<bool>()) {
        let admitted = TransitionTable::standard().can_transition(from, to, as_superadmin);
        let outcome = status_update(from, to, as_superadmin);

        prop_assert_eq!(outcome.is_ok(), admitted);
        match outcome {
            Ok(data) => {
                prop_assert_eq!(&data["status"], &json!(to.code()));
                prop_assert_eq!(&data["lockVersion"], &json!(2));
            },
            Err(err) => prop_assert_eq!(err.status_code(), 422),
        }
    }

    #[test]
    fn final_statuses_reject_every_non_superadmin_change(from in final_status(), to in any_status()) {
        prop_assume!(from != to);
        let err = status_update(from, to, false).unwrap_err();
        let is_validation_failed = matches!(err, LifecycleError::ValidationFailed { .. });
        prop_assert!(is_validation_failed);
    }

    #[test]
    fn only_deleted_can_be_left_by_a_superadmin(from in final_status(), to in any_status()) {
        prop_assume!(from != to);
        let outcome = status_update(from, to, true);
        let restorable = from == Status::Deleted
            && matches!(to, Status::Draft | Status::Active | Status::Inactive);
        prop_assert_eq!(outcome.is_ok(), restorable);
    }

    #[test]
    fn undeclared_keys_are_all_reported(keys in undeclared_keys::<Note>(Scenario::Create)) {
        let harness = Harness::<Note>::new();
        let mut request = params(json!({"name": "A"}));
        for key in &keys {
            request.insert(key.clone(), json!(1));
        }

        let err = tokio_test::block_on(harness.controller.create(&editor(), request)).unwrap_err();

        let mut reported: Vec<String> = err.field_errors().iter().map(|e| e.field.clone()).collect();
        reported.sort();
        prop_assert_eq!(err.status_code(), 422);
        prop_assert_eq!(reported, keys);
        prop_assert!(harness.store.is_empty("note"));
    }

    #[test]
    fn stale_versions_never_write(stored in 1_i64..50, supplied in 1_i64..50) {
        prop_assume!(stored != supplied);
        let harness = Harness::<Note>::new();
        harness.seed(1, Status::Active, stored, json!({"name": "A"}));

        let err = tokio_test::block_on(harness.controller.update(
            &editor(),
            params(json!({"id": 1, "lockVersion": supplied, "name": "B"})),
        ))
        .unwrap_err();

        prop_assert_eq!(err.status_code(), 409);
        prop_assert_eq!(harness.row(1).unwrap().lock_version, stored);
    }
}
