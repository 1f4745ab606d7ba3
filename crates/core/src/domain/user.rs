use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Approver,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Approver => "APPROVER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown role `{0}` (expected ADMIN|APPROVER)")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Self::Admin),
            "APPROVER" => Ok(Self::Approver),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Public profile of a user as returned by the identity endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub name: String,
    pub role: Role,
}

/// The authenticated user a call runs on behalf of.
///
/// Built per request from the bearer token and passed explicitly into every
/// workflow operation; nothing about the caller is held in ambient state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub username: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: UserId, username: impl Into<String>, role: Role) -> Self {
        Self { id, username: username.into(), role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self { id: user.id, username: user.username.clone(), role: user.role }
    }
}

#[cfg(test)]
mod tests {
    use super::{Actor, Role, User, UserId};

    #[test]
    fn role_parses_case_insensitively_and_serializes_upper_case() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!(" Approver ".parse::<Role>(), Ok(Role::Approver));
        assert!("driver".parse::<Role>().is_err());

        let json = serde_json::to_string(&Role::Approver).expect("serialize role");
        assert_eq!(json, "\"APPROVER\"");
    }

    #[test]
    fn actor_from_user_keeps_identity_and_role() {
        let user = User {
            id: UserId(7),
            username: "admin".to_string(),
            name: "Site Administrator".to_string(),
            role: Role::Admin,
        };

        let actor = Actor::from(&user);
        assert_eq!(actor.id, UserId(7));
        assert!(actor.is_admin());
    }
}
