use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

use crate::model::ids::UserId;

/// Capability level of a registered user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserRole {
    #[default]
    Learner,
    /// May append uploaded batches to the word catalog.
    Admin,
}

impl UserRole {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Learner => "learner",
            UserRole::Admin => "admin",
        }
    }

    #[must_use]
    pub fn can_edit_catalog(self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "learner" => Ok(UserRole::Learner),
            "admin" => Ok(UserRole::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// A learner identity.
///
/// Registered users carry a PHC password hash; guests have none and are never
/// stored in the credential table.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    id: UserId,
    password_hash: Option<String>,
    role: UserRole,
    created_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn registered(id: UserId, password_hash: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            password_hash: Some(password_hash),
            role: UserRole::Learner,
            created_at,
        }
    }

    #[must_use]
    pub fn guest(id: UserId, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            password_hash: None,
            role: UserRole::Learner,
            created_at,
        }
    }

    #[must_use]
    pub fn from_persisted(
        id: UserId,
        password_hash: Option<String>,
        role: UserRole,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            password_hash,
            role,
            created_at,
        }
    }

    #[must_use]
    pub fn with_role(mut self, role: UserRole) -> Self {
        self.role = role;
        self
    }

    #[must_use]
    pub fn id(&self) -> &UserId {
        &self.id
    }

    #[must_use]
    pub fn password_hash(&self) -> Option<&str> {
        self.password_hash.as_deref()
    }

    #[must_use]
    pub fn role(&self) -> UserRole {
        self.role
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn is_guest(&self) -> bool {
        self.id.is_guest()
    }
}

// Keeps the hash out of logs.
impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{fixed_clock, fixed_now};

    #[test]
    fn role_round_trips_through_str() {
        for role in [UserRole::Learner, UserRole::Admin] {
            assert_eq!(role.as_str().parse::<UserRole>().unwrap(), role);
        }
        assert!("root".parse::<UserRole>().is_err());
    }

    #[test]
    fn only_admin_edits_catalog() {
        assert!(UserRole::Admin.can_edit_catalog());
        assert!(!UserRole::Learner.can_edit_catalog());
    }

    #[test]
    fn guest_has_no_hash() {
        let user = User::guest(UserId::guest(&fixed_clock()), fixed_now());
        assert!(user.is_guest());
        assert!(user.password_hash().is_none());
    }

    #[test]
    fn debug_hides_password_hash() {
        let user = User::registered(
            UserId::registered("anna").unwrap(),
            "$argon2id$secret".into(),
            fixed_now(),
        );
        assert!(!format!("{user:?}").contains("secret"));
    }
}
