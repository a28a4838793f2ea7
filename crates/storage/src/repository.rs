use async_trait::async_trait;
use drill_core::model::{ProgressMap, SessionHistoryRecord, User, UserId, UserRole};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Per-user aggregate used by the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressTotals {
    pub user: UserId,
    pub words_practiced: u32,
    pub perfect: u32,
}

/// A persisted history record with its row id.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionHistoryRow {
    pub id: i64,
    pub record: SessionHistoryRecord,
}

impl SessionHistoryRow {
    #[must_use]
    pub fn new(id: i64, record: SessionHistoryRecord) -> Self {
        Self { id, record }
    }
}

/// Credential table access.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the username is taken.
    async fn insert_user(&self, user: &User) -> Result<(), StorageError>;

    /// Fetch a user by id. Returns `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on connection or decoding failures.
    async fn get_user(&self, id: &UserId) -> Result<Option<User>, StorageError>;

    /// Change the role of an existing user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user does not exist.
    async fn set_role(&self, id: &UserId, role: UserRole) -> Result<(), StorageError>;
}

/// Word progress keyed by `(user, word)`.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Load every progress entry for a user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on connection or decoding failures.
    async fn load_progress(&self, user: &UserId) -> Result<ProgressMap, StorageError>;

    /// Upsert every entry of `progress` for `user`; last write per word wins.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn save_progress(&self, user: &UserId, progress: &ProgressMap)
    -> Result<(), StorageError>;

    /// Distinct words and perfect words per user, for every user with progress.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on connection or decoding failures.
    async fn progress_totals(&self) -> Result<Vec<ProgressTotals>, StorageError>;
}

/// Append-only session history.
#[async_trait]
pub trait SessionHistoryRepository: Send + Sync {
    /// Append a record and return its row id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the insert fails.
    async fn append_record(&self, record: &SessionHistoryRecord) -> Result<i64, StorageError>;

    /// Most recent records for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on connection or decoding failures.
    async fn list_records(
        &self,
        user: &UserId,
        limit: u32,
    ) -> Result<Vec<SessionHistoryRow>, StorageError>;
}

/// Simple in-memory repository for tests and prototyping.
///
/// `set_offline(true)` makes every call fail with `StorageError::Connection`,
/// which lets callers exercise their degraded paths.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    users: Arc<Mutex<HashMap<UserId, User>>>,
    progress: Arc<Mutex<HashMap<UserId, ProgressMap>>>,
    history: Arc<Mutex<Vec<SessionHistoryRow>>>,
    offline: Arc<AtomicBool>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<(), StorageError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("store offline".into()));
        }
        Ok(())
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn insert_user(&self, user: &User) -> Result<(), StorageError> {
        self.ensure_online()?;
        let mut guard = self.users.lock().map_err(poisoned)?;
        if guard.contains_key(user.id()) {
            return Err(StorageError::Conflict);
        }
        guard.insert(user.id().clone(), user.clone());
        Ok(())
    }

    async fn get_user(&self, id: &UserId) -> Result<Option<User>, StorageError> {
        self.ensure_online()?;
        let guard = self.users.lock().map_err(poisoned)?;
        Ok(guard.get(id).cloned())
    }

    async fn set_role(&self, id: &UserId, role: UserRole) -> Result<(), StorageError> {
        self.ensure_online()?;
        let mut guard = self.users.lock().map_err(poisoned)?;
        let user = guard.remove(id).ok_or(StorageError::NotFound)?;
        guard.insert(id.clone(), user.with_role(role));
        Ok(())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn load_progress(&self, user: &UserId) -> Result<ProgressMap, StorageError> {
        self.ensure_online()?;
        let guard = self.progress.lock().map_err(poisoned)?;
        Ok(guard.get(user).cloned().unwrap_or_default())
    }

    async fn save_progress(
        &self,
        user: &UserId,
        progress: &ProgressMap,
    ) -> Result<(), StorageError> {
        self.ensure_online()?;
        let mut guard = self.progress.lock().map_err(poisoned)?;
        let stored = guard.entry(user.clone()).or_default();
        for entry in progress.entries() {
            stored.record(entry.word.clone(), entry.attempts, entry.last_practiced);
        }
        Ok(())
    }

    async fn progress_totals(&self) -> Result<Vec<ProgressTotals>, StorageError> {
        self.ensure_online()?;
        let guard = self.progress.lock().map_err(poisoned)?;
        let mut out: Vec<_> = guard
            .iter()
            .filter(|(_, map)| !map.is_empty())
            .map(|(user, map)| ProgressTotals {
                user: user.clone(),
                words_practiced: u32::try_from(map.len()).unwrap_or(u32::MAX),
                perfect: u32::try_from(map.perfect_count()).unwrap_or(u32::MAX),
            })
            .collect();
        out.sort_by(|a, b| a.user.cmp(&b.user));
        Ok(out)
    }
}

#[async_trait]
impl SessionHistoryRepository for InMemoryRepository {
    async fn append_record(&self, record: &SessionHistoryRecord) -> Result<i64, StorageError> {
        self.ensure_online()?;
        let mut guard = self.history.lock().map_err(poisoned)?;
        let id = i64::try_from(guard.len())
            .map_err(|_| StorageError::Serialization("history id overflow".into()))?
            + 1;
        guard.push(SessionHistoryRow::new(id, record.clone()));
        Ok(id)
    }

    async fn list_records(
        &self,
        user: &UserId,
        limit: u32,
    ) -> Result<Vec<SessionHistoryRow>, StorageError> {
        self.ensure_online()?;
        let guard = self.history.lock().map_err(poisoned)?;
        let mut rows: Vec<_> = guard
            .iter()
            .filter(|row| row.record.user() == user)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.record
                .recorded_at()
                .cmp(&a.record.recorded_at())
                .then(b.id.cmp(&a.id))
        });
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(rows)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub users: Arc<dyn UserRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub history: Arc<dyn SessionHistoryRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_in_memory(&InMemoryRepository::new())
    }

    /// Wraps an existing in-memory repository so tests can keep a handle to it.
    #[must_use]
    pub fn from_in_memory(repo: &InMemoryRepository) -> Self {
        let users: Arc<dyn UserRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let history: Arc<dyn SessionHistoryRepository> = Arc::new(repo.clone());
        Self {
            users,
            progress,
            history,
        }
    }
}
