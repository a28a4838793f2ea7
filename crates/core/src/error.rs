use thiserror::Error;

use crate::model::{AttemptsError, HistoryRecordError, UserIdError, WordPairError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    UserId(#[from] UserIdError),
    #[error(transparent)]
    WordPair(#[from] WordPairError),
    #[error(transparent)]
    Attempts(#[from] AttemptsError),
    #[error(transparent)]
    HistoryRecord(#[from] HistoryRecordError),
}
