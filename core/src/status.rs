//! Status enumeration and the status transition engine.
//!
//! The engine is table-driven: a [`TransitionTable`] maps every origin status
//! to the set of statuses it may move to. The table is plain data, built once
//! per resource type; only the mechanism is fixed:
//!
//! 1. Leaving `Deleted` requires the superadmin capability.
//! 2. An origin without a table entry is rejected.
//! 3. An origin in the disallowed-for-update set is rejected
//!    (except the superadmin un-delete path).
//! 4. A target outside the origin's allowed set is rejected.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Record status.
///
/// Serialized as its integer code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Status {
    /// Switched off, recoverable.
    Inactive,
    /// Live.
    Active,
    /// Initial status of every new record.
    #[default]
    Draft,
    /// Finished; no further status changes.
    Completed,
    /// Soft-deleted; only a superadmin may bring it back.
    Deleted,
    /// Temporarily unavailable.
    Maintenance,
    /// Approved by a reviewer.
    Approved,
    /// Rejected by a reviewer; no further status changes.
    Rejected,
}

impl Status {
    /// Every status, in code order.
    pub const ALL: [Self; 8] = [
        Self::Inactive,
        Self::Active,
        Self::Draft,
        Self::Completed,
        Self::Deleted,
        Self::Maintenance,
        Self::Approved,
        Self::Rejected,
    ];

    /// Integer code stored and sent over the wire.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Inactive => 0,
            Self::Active => 1,
            Self::Draft => 2,
            Self::Completed => 3,
            Self::Deleted => 4,
            Self::Maintenance => 5,
            Self::Approved => 6,
            Self::Rejected => 7,
        }
    }

    /// Status for an integer code.
    #[must_use]
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Inactive),
            1 => Some(Self::Active),
            2 => Some(Self::Draft),
            3 => Some(Self::Completed),
            4 => Some(Self::Deleted),
            5 => Some(Self::Maintenance),
            6 => Some(Self::Approved),
            7 => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Human label used as the `{label}` / `{value}` placeholder.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Inactive => "Inactive",
            Self::Active => "Active",
            Self::Draft => "Draft",
            Self::Completed => "Completed",
            Self::Deleted => "Deleted",
            Self::Maintenance => "Maintenance",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<Status> for i64 {
    fn from(status: Status) -> Self {
        status.code()
    }
}

impl TryFrom<i64> for Status {
    type Error = String;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or_else(|| format!("unknown status code {code}"))
    }
}

/// Why a transition was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionDenied {
    /// Leaving `Deleted` without the superadmin capability.
    DeletedRequiresSuperadmin,
    /// The origin status has no entry in the table.
    UnknownOrigin {
        /// Current status
        from: Status,
    },
    /// The origin status is disallowed-for-update.
    AlreadyFinal {
        /// Current status
        from: Status,
    },
    /// The target is not in the origin's allowed set.
    NotAllowed {
        /// Current status
        from: Status,
        /// Requested status
        to: Status,
    },
}

/// Directed transition table plus the status sets that gate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionTable {
    allowed: BTreeMap<Status, BTreeSet<Status>>,
    disallowed_for_update: BTreeSet<Status>,
    superadmin_targets: BTreeSet<Status>,
}

impl TransitionTable {
    /// A table with no entries and the default disallowed-for-update set
    /// (`Completed`, `Deleted`, `Rejected`).
    #[must_use]
    pub fn empty() -> Self {
        Self {
            allowed: BTreeMap::new(),
            disallowed_for_update: [Status::Completed, Status::Deleted, Status::Rejected]
                .into_iter()
                .collect(),
            superadmin_targets: BTreeSet::new(),
        }
    }

    /// The table used when a resource does not provide its own.
    #[must_use]
    pub fn standard() -> Self {
        use Status::{
            Active, Approved, Completed, Deleted, Draft, Inactive, Maintenance, Rejected,
        };

        Self::empty()
            .allow(Draft, &[Active, Inactive, Approved, Rejected, Deleted])
            .allow(Active, &[Inactive, Maintenance, Approved, Rejected, Completed, Deleted])
            .allow(Inactive, &[Active, Draft, Maintenance, Deleted])
            .allow(Maintenance, &[Active, Inactive, Deleted])
            .allow(Approved, &[Active, Completed, Deleted])
            .allow(Completed, &[])
            .allow(Rejected, &[])
            .allow(Deleted, &[Draft, Active, Inactive])
    }

    /// Allow `from` to move to each of `to`. Creates the entry for `from`
    /// even when `to` is empty.
    #[must_use]
    pub fn allow(mut self, from: Status, to: &[Status]) -> Self {
        self.allowed.entry(from).or_default().extend(to.iter().copied());
        self
    }

    /// Replace the disallowed-for-update set.
    #[must_use]
    pub fn with_disallowed_for_update(mut self, statuses: &[Status]) -> Self {
        self.disallowed_for_update = statuses.iter().copied().collect();
        self
    }

    /// Require the superadmin capability to request `status` as a target.
    #[must_use]
    pub fn superadmin_only(mut self, status: Status) -> Self {
        self.superadmin_targets.insert(status);
        self
    }

    /// Whether `status` blocks further status changes.
    #[must_use]
    pub fn is_disallowed_for_update(&self, status: Status) -> bool {
        self.disallowed_for_update.contains(&status)
    }

    /// Whether requesting `status` requires the superadmin capability.
    #[must_use]
    pub fn requires_superadmin(&self, status: Status) -> bool {
        self.superadmin_targets.contains(&status)
    }

    /// Allowed targets for `from`, if the table has an entry.
    #[must_use]
    pub fn targets(&self, from: Status) -> Option<&BTreeSet<Status>> {
        self.allowed.get(&from)
    }

    /// Check a transition.
    ///
    /// Callers only invoke this when the status actually changes; a
    /// same-status "transition" is not a transition.
    ///
    /// # Errors
    ///
    /// Returns the first rule the transition violates.
    pub fn check(&self, from: Status, to: Status, is_superadmin: bool) -> Result<(), TransitionDenied> {
        let undeleting = from == Status::Deleted && to != Status::Deleted;
        if undeleting && !is_superadmin {
            return Err(TransitionDenied::DeletedRequiresSuperadmin);
        }

        let Some(targets) = self.allowed.get(&from) else {
            return Err(TransitionDenied::UnknownOrigin { from });
        };

        // The superadmin un-delete path is the one carve-out from the
        // disallowed-for-update rule.
        if self.is_disallowed_for_update(from) && !undeleting {
            return Err(TransitionDenied::AlreadyFinal { from });
        }

        if !targets.contains(&to) {
            return Err(TransitionDenied::NotAllowed { from, to });
        }

        Ok(())
    }

    /// Boolean form of [`check`](Self::check).
    #[must_use]
    pub fn can_transition(&self, from: Status, to: Status, is_superadmin: bool) -> bool {
        self.check(from, to, is_superadmin).is_ok()
    }
}

impl Default for TransitionTable {
    fn default() -> Self {
        Self::standard()
    }
}
