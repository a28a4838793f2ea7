use drill_core::model::{SessionHistoryRecord, UserId};

use super::SqliteRepository;
use super::mapping::{conn, map_history_row};
use crate::repository::{SessionHistoryRepository, SessionHistoryRow, StorageError};

#[async_trait::async_trait]
impl SessionHistoryRepository for SqliteRepository {
    async fn append_record(&self, record: &SessionHistoryRecord) -> Result<i64, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO session_history (
                    user_id, session_date, mode, ended,
                    words_attempted, words_correct, perfect_words, rating
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(record.user().as_str())
        .bind(record.recorded_at())
        .bind(record.mode().as_str())
        .bind(record.end().as_str())
        .bind(i64::from(record.words_attempted()))
        .bind(i64::from(record.words_correct()))
        .bind(i64::from(record.perfect_words()))
        .bind(record.rating())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(res.last_insert_rowid())
    }

    async fn list_records(
        &self,
        user: &UserId,
        limit: u32,
    ) -> Result<Vec<SessionHistoryRow>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    id, user_id, session_date, mode, ended,
                    words_attempted, words_correct, perfect_words, rating
                FROM session_history
                WHERE user_id = ?1
                ORDER BY session_date DESC, id DESC
                LIMIT ?2
            ",
        )
        .bind(user.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_history_row).collect()
    }
}
