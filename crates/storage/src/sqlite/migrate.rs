use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Applies the schema: users, progress, session history and indexes.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if is_applied(pool, 1).await? {
        return Ok(());
    }

    let mut tx = pool.begin().await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS users (
                username TEXT PRIMARY KEY,
                password_hash TEXT,
                role TEXT NOT NULL DEFAULT 'learner' CHECK (role IN ('learner', 'admin')),
                created_at TEXT NOT NULL
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    // Guest ids have no users row, so user_id is deliberately not a foreign key.
    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS progress (
                user_id TEXT NOT NULL,
                word TEXT NOT NULL,
                attempts INTEGER NOT NULL CHECK (attempts BETWEEN 1 AND 2),
                last_practiced TEXT NOT NULL,
                PRIMARY KEY (user_id, word)
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS session_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                session_date TEXT NOT NULL,
                mode TEXT NOT NULL,
                ended TEXT NOT NULL,
                words_attempted INTEGER NOT NULL CHECK (words_attempted >= 0),
                words_correct INTEGER NOT NULL CHECK (words_correct >= 0),
                perfect_words INTEGER NOT NULL CHECK (perfect_words >= 0),
                rating REAL NOT NULL
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE INDEX IF NOT EXISTS idx_session_history_user_date
                ON session_history (user_id, session_date);
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            INSERT INTO schema_migrations (version, applied_at)
            VALUES (?1, ?2)
            ON CONFLICT(version) DO NOTHING
        ",
    )
    .bind(1_i64)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::info!("applied schema migration 1");

    Ok(())
}
