//! The acting user, passed explicitly into every guard.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Role granting the superadmin capability.
pub const SUPERADMIN_ROLE: &str = "superadmin";

/// Who is performing the request.
///
/// Built by the authentication layer and handed to the controller; the core
/// never looks up sessions on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorContext {
    /// User identifier, recorded in the change log.
    pub user_id: Option<String>,
    /// Granted roles.
    pub roles: BTreeSet<String>,
}

impl ActorContext {
    /// Create an actor with the given roles.
    #[must_use]
    pub fn new<I, R>(user_id: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self {
            user_id: Some(user_id.into()),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    /// Actor without a user, used for internal jobs.
    #[must_use]
    pub fn system() -> Self {
        Self::default()
    }

    /// Whether the actor holds `role`.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Whether the actor holds the superadmin capability.
    ///
    /// # Examples
    ///
    /// ```
    /// # use record_lifecycle_core::ActorContext;
    /// assert!(ActorContext::new("1", ["superadmin"]).is_superadmin());
    /// assert!(!ActorContext::new("2", ["editor"]).is_superadmin());
    /// ```
    #[must_use]
    pub fn is_superadmin(&self) -> bool {
        self.has_role(SUPERADMIN_ROLE)
    }
}
