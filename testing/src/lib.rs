//! # Record Lifecycle Testing
//!
//! Testing utilities for the record lifecycle controller.
//!
//! This crate provides:
//! - [`InMemoryRecordStore`]: atomic in-memory [`RecordStore`](record_lifecycle_core::store::RecordStore)
//! - [`RecordingMirror`]: in-memory document mirror with failure injection
//! - [`FixedClock`]: deterministic time
//! - [`fixtures`]: sample resources and a ready-wired [`Harness`]
//! - [`properties`]: proptest strategies for lifecycle types
//!
//! ## Example
//!
//! ```ignore
//! use record_lifecycle_testing::fixtures::{Harness, Note, editor, params};
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn creates_draft() {
//!     let harness = Harness::<Note>::new();
//!     let envelope = harness
//!         .controller
//!         .create(&editor(), params(json!({"name": "A"})))
//!         .await
//!         .unwrap();
//!     assert_eq!(envelope.data.unwrap()["status"], 2);
//! }
//! ```

use chrono::{DateTime, Utc};
use record_lifecycle_core::environment::Clock;

pub mod fixtures;
pub mod mirror;
pub mod record_store;

/// Mock implementations of Environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use chrono::{Duration, TimeZone};
    use std::sync::{Arc, Mutex};

    /// Manually driven clock.
    ///
    /// Time stands still until a test moves it, so change-log stamps are
    /// reproducible. Clones share the same time.
    ///
    /// # Example
    ///
    /// ```
    /// use record_lifecycle_testing::mocks::FixedClock;
    /// use record_lifecycle_core::environment::Clock;
    /// use chrono::{Duration, Utc};
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let start = clock.now();
    /// clock.clone().advance(Duration::minutes(5));
    /// assert_eq!(clock.now() - start, Duration::minutes(5));
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl FixedClock {
        /// Clock stopped at `time`.
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Move the clock forward by `by`.
        #[allow(clippy::unwrap_used)] // Poisoning only follows a panicking test
        pub fn advance(&self, by: Duration) {
            let mut time = self.time.lock().unwrap();
            *time += by;
        }

        /// Jump to `time`.
        #[allow(clippy::unwrap_used)] // Poisoning only follows a panicking test
        pub fn set(&self, time: DateTime<Utc>) {
            *self.time.lock().unwrap() = time;
        }
    }

    impl Clock for FixedClock {
        #[allow(clippy::unwrap_used)] // Poisoning only follows a panicking test
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap()
        }
    }

    /// Clock stopped at 2025-01-01 00:00:00 UTC.
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).single().unwrap_or_default())
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;
    use record_lifecycle_core::resource::{Resource, Scenario, settable_fields};
    use record_lifecycle_core::Status;

    /// Any status.
    pub fn any_status() -> impl Strategy<Value = Status> {
        prop::sample::select(Status::ALL.to_vec())
    }

    /// Any ordered pair of distinct statuses.
    pub fn any_transition() -> impl Strategy<Value = (Status, Status)> {
        (any_status(), any_status()).prop_filter("status must change", |(from, to)| from != to)
    }

    /// A status in the default disallowed-for-update set.
    pub fn final_status() -> impl Strategy<Value = Status> {
        prop::sample::select(vec![Status::Completed, Status::Deleted, Status::Rejected])
    }

    /// Between one and four distinct keys that `T` does not accept in
    /// `scenario`.
    pub fn undeclared_keys<T: Resource>(scenario: Scenario) -> impl Strategy<Value = Vec<String>> {
        let allowed = settable_fields::<T>(scenario);
        prop::collection::btree_set("[a-z][a-zA-Z]{2,10}", 1..5)
            .prop_map(move |keys| {
                keys.into_iter()
                    .filter(|key| key != "id" && !allowed.contains(key.as_str()))
                    .collect::<Vec<_>>()
            })
            .prop_filter("at least one undeclared key", |keys| !keys.is_empty())
    }
}

// Re-export commonly used items
pub use fixtures::Harness;
pub use mirror::RecordingMirror;
pub use mocks::{FixedClock, test_clock};
pub use record_store::InMemoryRecordStore;

/// Install a test subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_clock_starts_at_new_year_and_only_moves_when_told() {
        let clock = test_clock();
        assert_eq!(clock.now().to_rfc3339(), "2025-01-01T00:00:00+00:00");
        assert_eq!(clock.now(), clock.now());

        clock.advance(Duration::hours(1));
        assert_eq!(clock.now().to_rfc3339(), "2025-01-01T01:00:00+00:00");
    }
}
