//! Caller identity supplied per call by the hosting boundary.
//!
//! The engine never reads ambient session state. Whoever hosts it (HTTP
//! handler, CLI, test) resolves the session and passes a [`Caller`] in.

use serde::{Deserialize, Serialize};

use crate::ids::UserId;

/// Name recorded in audit entries when the caller has no nickname.
pub const UNKNOWN_OPERATOR: &str = "unknown";

/// The authenticated user on whose behalf an operation runs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    /// User row id.
    pub user_id: UserId,
    /// Display nickname. Tickets are assigned by nickname.
    pub nickname: String,
    /// Privileged callers bypass ticket visibility scoping.
    pub is_admin: bool,
}

impl Caller {
    /// A non-privileged caller.
    pub fn new(user_id: UserId, nickname: impl Into<String>) -> Self {
        Self {
            user_id,
            nickname: nickname.into(),
            is_admin: false,
        }
    }

    /// A privileged caller.
    pub fn admin(user_id: UserId, nickname: impl Into<String>) -> Self {
        Self {
            is_admin: true,
            ..Self::new(user_id, nickname)
        }
    }

    /// Name to attribute audit entries to.
    pub fn operator_name(&self) -> &str {
        let trimmed = self.nickname.trim();
        if trimmed.is_empty() {
            UNKNOWN_OPERATOR
        } else {
            trimmed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_not_admin() {
        let caller = Caller::new(UserId::new(1), "mia");
        assert!(!caller.is_admin);
    }

    #[test]
    fn admin_is_admin() {
        let caller = Caller::admin(UserId::new(1), "root");
        assert!(caller.is_admin);
        assert_eq!(caller.nickname, "root");
    }

    #[test]
    fn blank_nickname_falls_back_to_unknown() {
        let caller = Caller::new(UserId::new(9), "   ");
        assert_eq!(caller.operator_name(), UNKNOWN_OPERATOR);
    }
}
