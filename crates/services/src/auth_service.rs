use std::sync::Arc;

use drill_core::model::{User, UserId, UserRole};
use storage::repository::{StorageError, UserRepository};

use crate::Clock;
use crate::error::AuthError;
use crate::password::{hash_password, verify_password};

/// Registration, login and guest identities.
#[derive(Clone)]
pub struct CredentialService {
    clock: Clock,
    users: Arc<dyn UserRepository>,
}

impl CredentialService {
    #[must_use]
    pub fn new(clock: Clock, users: Arc<dyn UserRepository>) -> Self {
        Self { clock, users }
    }

    /// Register a new learner.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` for blank credentials, a reserved
    /// username or a confirmation mismatch, `AuthError::DuplicateUser` if the
    /// name is taken, and `AuthError::StoreUnavailable` if the store fails.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        confirm: &str,
    ) -> Result<User, AuthError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(AuthError::Validation(
                "username and password are required".into(),
            ));
        }
        if password != confirm {
            return Err(AuthError::Validation("passwords do not match".into()));
        }
        let id = UserId::registered(username).map_err(|e| AuthError::Validation(e.to_string()))?;

        let hash = hash_password(password).map_err(|e| AuthError::Hash(e.to_string()))?;
        let user = User::registered(id, hash, self.clock.now());

        match self.users.insert_user(&user).await {
            Ok(()) => {
                tracing::info!(user = %user.id(), "registered user");
                Ok(user)
            }
            Err(StorageError::Conflict) => Err(AuthError::DuplicateUser),
            Err(e) => {
                tracing::warn!(error = %e, "registration could not reach the credential store");
                Err(AuthError::StoreUnavailable(e))
            }
        }
    }

    /// Look up a user and check the password.
    ///
    /// Returns `None` for unknown users, wrong passwords, guests and store
    /// failures; failures are logged.
    pub async fn login(&self, username: &str, password: &str) -> Option<User> {
        let id: UserId = username.parse().ok()?;
        let user = match self.users.get_user(&id).await {
            Ok(Some(user)) => user,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = %e, user = %id, "login could not reach the credential store");
                return None;
            }
        };
        let hash = user.password_hash()?;
        match verify_password(password, hash) {
            Ok(true) => Some(user),
            Ok(false) => None,
            Err(e) => {
                tracing::warn!(error = %e, user = %id, "stored password hash is unreadable");
                None
            }
        }
    }

    /// Fetch a registered user. Store failures read as unknown and are logged.
    pub async fn get_user(&self, username: &str) -> Option<User> {
        let id: UserId = username.parse().ok()?;
        match self.users.get_user(&id).await {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(error = %e, user = %id, "could not read user");
                None
            }
        }
    }

    /// True iff a stored hash exists for `username` and matches `password`.
    pub async fn authenticate(&self, username: &str, password: &str) -> bool {
        self.login(username, password).await.is_some()
    }

    /// Start an ephemeral guest identity. Nothing is written to the credential store.
    #[must_use]
    pub fn guest(&self) -> User {
        let now = self.clock.now();
        User::guest(UserId::guest(&self.clock), now)
    }

    /// Change the role of a registered user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UnknownUser` if no such user exists and
    /// `AuthError::StoreUnavailable` on store failures.
    pub async fn set_role(&self, username: &str, role: UserRole) -> Result<(), AuthError> {
        let id: UserId = username
            .parse()
            .map_err(|e: drill_core::model::UserIdError| AuthError::Validation(e.to_string()))?;
        match self.users.set_role(&id, role).await {
            Ok(()) => {
                tracing::info!(user = %id, %role, "role updated");
                Ok(())
            }
            Err(StorageError::NotFound) => Err(AuthError::UnknownUser),
            Err(e) => Err(AuthError::StoreUnavailable(e)),
        }
    }
}
