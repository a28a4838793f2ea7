//! Shared error types for the services crate.

use thiserror::Error;

use drill_core::model::{HistoryRecordError, PracticeMode, WordPairError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `CredentialService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("username already exists")]
    DuplicateUser,
    #[error("unknown user")]
    UnknownUser,
    #[error("credential store unavailable: {0}")]
    StoreUnavailable(#[source] StorageError),
    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// Errors emitted by `CatalogService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("only admins may change the word list")]
    Forbidden,
    #[error("word list must have `prompt` and `answer` columns, found: {found}")]
    MissingColumns { found: String },
    #[error("invalid word on line {line}: {source}")]
    InvalidRow {
        line: u64,
        #[source]
        source: WordPairError,
    },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Persist(#[from] tempfile::PersistError),
}

/// Errors emitted by the practice session state machine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no words to practice in {mode} mode")]
    NothingToPractice { mode: PracticeMode },
    #[error("a practice session is already running")]
    AlreadyRunning,
    #[error("no practice session is running")]
    NotRunning,
    #[error(transparent)]
    History(#[from] HistoryRecordError),
}

/// Errors emitted by the pronunciation collaborator.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PronunciationError {
    #[error("pronunciation request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("pronunciation service returned no audio")]
    EmptyResponse,
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
