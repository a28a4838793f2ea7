use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::time::Clock;

/// Prefix reserved for ephemeral guest identities.
pub const GUEST_PREFIX: &str = "guest_";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UserIdError {
    #[error("username cannot be empty")]
    Empty,
    #[error("username cannot start with the reserved prefix `{GUEST_PREFIX}`")]
    ReservedPrefix,
}

/// Identifier of a learner, registered or guest.
///
/// Progress rows and history records are keyed by this value. Guests are
/// distinguished from registered users only by the `guest_` prefix.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Validates a username chosen at registration.
    ///
    /// Surrounding whitespace is stripped.
    ///
    /// # Errors
    ///
    /// Returns `UserIdError::Empty` for blank input and
    /// `UserIdError::ReservedPrefix` when the name looks like a guest id.
    pub fn registered(name: impl AsRef<str>) -> Result<Self, UserIdError> {
        let name = name.as_ref().trim();
        if name.is_empty() {
            return Err(UserIdError::Empty);
        }
        if name.starts_with(GUEST_PREFIX) {
            return Err(UserIdError::ReservedPrefix);
        }
        Ok(Self(name.to_owned()))
    }

    /// Generates a guest id from the clock: `guest_<epoch seconds>`.
    #[must_use]
    pub fn guest(clock: &Clock) -> Self {
        Self(format!("{GUEST_PREFIX}{}", clock.epoch_seconds()))
    }

    /// Rehydrates an id read back from storage without validation.
    #[must_use]
    pub fn from_persisted(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_guest(&self) -> bool {
        self.0.starts_with(GUEST_PREFIX)
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UserId {
    type Err = UserIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(UserIdError::Empty);
        }
        Ok(Self(s.to_owned()))
    }
}
