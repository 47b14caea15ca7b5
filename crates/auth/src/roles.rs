use core::str::FromStr;

use serde::{Deserialize, Serialize};

use fixtrack_core::DomainError;

/// Role granted to a user, used for route-level RBAC.
///
/// Roles are a closed set in this system: staff roles (`Manager`,
/// `Technician`) and the device-owning `Customer` role.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Manager,
    Technician,
    Customer,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Manager => "MANAGER",
            UserRole::Technician => "TECHNICIAN",
            UserRole::Customer => "CUSTOMER",
        }
    }
}

impl core::fmt::Display for UserRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MANAGER" => Ok(UserRole::Manager),
            "TECHNICIAN" => Ok(UserRole::Technician),
            "CUSTOMER" => Ok(UserRole::Customer),
            other => Err(DomainError::validation(format!(
                "invalid role: {other}. Must be one of: MANAGER, TECHNICIAN, CUSTOMER"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_strings() {
        for role in [UserRole::Manager, UserRole::Technician, UserRole::Customer] {
            assert_eq!(role.as_str().parse::<UserRole>().unwrap(), role);
        }
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!("ADMIN".parse::<UserRole>().is_err());
    }
}
