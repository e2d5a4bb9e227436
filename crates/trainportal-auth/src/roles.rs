//! Role model and access checks.

use serde::{Deserialize, Serialize};

use crate::AuthError;

/// Portal role.
///
/// Access is decided by a fixed reachability table, not by ordering:
///
/// | actor \ required | employee | admin | trainer |
/// |------------------|----------|-------|---------|
/// | admin            | yes      | yes   | yes     |
/// | trainer          | yes      | no    | yes     |
/// | employee         | yes      | no    | no      |
///
/// `Manager` and `Guest` are reserved. They can be stored and parsed but are
/// not assignable, cannot act, and are not reached by any role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular learner.
    Employee,
    /// Full administrative access.
    Admin,
    /// Course author and instructor.
    Trainer,
    /// Reserved.
    Manager,
    /// Reserved.
    Guest,
}

impl Role {
    /// Roles that can be granted to an account.
    pub const ASSIGNABLE: [Self; 3] = [Self::Employee, Self::Admin, Self::Trainer];

    /// Whether an actor holding `self` may act where `required` is needed.
    #[must_use]
    pub const fn can_act(self, required: Self) -> bool {
        match (self, required) {
            (Self::Admin, Self::Employee | Self::Admin | Self::Trainer)
            | (Self::Trainer, Self::Employee | Self::Trainer)
            | (Self::Employee, Self::Employee) => true,
            _ => false,
        }
    }

    /// Whether this role may be granted to an account.
    #[must_use]
    pub const fn is_assignable(self) -> bool {
        matches!(self, Self::Employee | Self::Admin | Self::Trainer)
    }

    /// Check if this role has admin privileges.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        self.can_act(Self::Admin)
    }

    /// Require that this role reaches `required`.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` if it does not.
    pub fn require(self, required: Self) -> Result<(), AuthError> {
        if self.can_act(required) {
            Ok(())
        } else {
            Err(AuthError::PermissionDenied(format!(
                "{required} role required"
            )))
        }
    }

    /// Lowercase name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Employee => "employee",
            Self::Admin => "admin",
            Self::Trainer => "trainer",
            Self::Manager => "manager",
            Self::Guest => "guest",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "employee" => Ok(Self::Employee),
            "admin" => Ok(Self::Admin),
            "trainer" => Ok(Self::Trainer),
            "manager" => Ok(Self::Manager),
            "guest" => Ok(Self::Guest),
            _ => Err(AuthError::Validation(format!("unknown role: {s}"))),
        }
    }
}
