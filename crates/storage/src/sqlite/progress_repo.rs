use drill_core::model::{ProgressMap, UserId};

use super::SqliteRepository;
use super::mapping::{conn, map_progress_row, map_totals_row};
use crate::repository::{ProgressRepository, ProgressTotals, StorageError};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn load_progress(&self, user: &UserId) -> Result<ProgressMap, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT word, attempts, last_practiced
                FROM progress
                WHERE user_id = ?1
            ",
        )
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            entries.push(map_progress_row(row)?);
        }
        Ok(ProgressMap::from_entries(entries))
    }

    async fn save_progress(
        &self,
        user: &UserId,
        progress: &ProgressMap,
    ) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        for entry in progress.entries() {
            sqlx::query(
                r"
                    INSERT INTO progress (user_id, word, attempts, last_practiced)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(user_id, word) DO UPDATE SET
                        attempts = excluded.attempts,
                        last_practiced = excluded.last_practiced
                ",
            )
            .bind(user.as_str())
            .bind(entry.word.as_str())
            .bind(i64::from(entry.attempts.value()))
            .bind(entry.last_practiced)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        tracing::debug!(user = %user, words = progress.len(), "progress saved");
        Ok(())
    }

    async fn progress_totals(&self) -> Result<Vec<ProgressTotals>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    user_id,
                    COUNT(*) AS words_practiced,
                    SUM(CASE WHEN attempts = 1 THEN 1 ELSE 0 END) AS perfect
                FROM progress
                GROUP BY user_id
                ORDER BY user_id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_totals_row).collect()
    }
}
