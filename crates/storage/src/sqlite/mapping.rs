use drill_core::model::{
    Attempts, PracticeMode, ProgressEntry, SessionEnd, SessionHistoryRecord, SessionTally, User,
    UserId, UserRole,
};
use sqlx::Row;

use crate::repository::{ProgressTotals, SessionHistoryRow, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn parse_role(s: &str) -> Result<UserRole, StorageError> {
    s.parse::<UserRole>().map_err(StorageError::Serialization)
}

pub(crate) fn map_user_row(row: &sqlx::sqlite::SqliteRow) -> Result<User, StorageError> {
    let username: String = row.try_get("username").map_err(ser)?;
    let role: String = row.try_get("role").map_err(ser)?;
    Ok(User::from_persisted(
        UserId::from_persisted(username),
        row.try_get("password_hash").map_err(ser)?,
        parse_role(&role)?,
        row.try_get("created_at").map_err(ser)?,
    ))
}

pub(crate) fn map_progress_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<ProgressEntry, StorageError> {
    let attempts: i64 = row.try_get("attempts").map_err(ser)?;
    Ok(ProgressEntry {
        word: row.try_get("word").map_err(ser)?,
        attempts: Attempts::from_persisted(attempts).map_err(ser)?,
        last_practiced: row.try_get("last_practiced").map_err(ser)?,
    })
}

pub(crate) fn map_totals_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<ProgressTotals, StorageError> {
    let user: String = row.try_get("user_id").map_err(ser)?;
    Ok(ProgressTotals {
        user: UserId::from_persisted(user),
        words_practiced: u32_from_i64(
            "words_practiced",
            row.try_get::<i64, _>("words_practiced").map_err(ser)?,
        )?,
        perfect: u32_from_i64("perfect", row.try_get::<i64, _>("perfect").map_err(ser)?)?,
    })
}

pub(crate) fn map_history_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<SessionHistoryRow, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    let user: String = row.try_get("user_id").map_err(ser)?;
    let mode: String = row.try_get("mode").map_err(ser)?;
    let ended: String = row.try_get("ended").map_err(ser)?;
    let tally = SessionTally {
        attempted: u32_from_i64(
            "words_attempted",
            row.try_get::<i64, _>("words_attempted").map_err(ser)?,
        )?,
        correct: u32_from_i64(
            "words_correct",
            row.try_get::<i64, _>("words_correct").map_err(ser)?,
        )?,
        perfect: u32_from_i64(
            "perfect_words",
            row.try_get::<i64, _>("perfect_words").map_err(ser)?,
        )?,
    };

    let record = SessionHistoryRecord::new(
        UserId::from_persisted(user),
        row.try_get("session_date").map_err(ser)?,
        mode.parse::<PracticeMode>().map_err(ser)?,
        ended.parse::<SessionEnd>().map_err(ser)?,
        tally,
        row.try_get("rating").map_err(ser)?,
    )
    .map_err(ser)?;

    Ok(SessionHistoryRow::new(id, record))
}
