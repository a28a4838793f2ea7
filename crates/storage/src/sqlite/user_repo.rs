use drill_core::model::{User, UserId, UserRole};

use super::SqliteRepository;
use super::mapping::{conn, map_user_row};
use crate::repository::{StorageError, UserRepository};

#[async_trait::async_trait]
impl UserRepository for SqliteRepository {
    async fn insert_user(&self, user: &User) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO users (username, password_hash, role, created_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(username) DO NOTHING
            ",
        )
        .bind(user.id().as_str())
        .bind(user.password_hash())
        .bind(user.role().as_str())
        .bind(user.created_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }
        Ok(())
    }

    async fn get_user(&self, id: &UserId) -> Result<Option<User>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT username, password_hash, role, created_at
                FROM users
                WHERE username = ?1
            ",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_user_row).transpose()
    }

    async fn set_role(&self, id: &UserId, role: UserRole) -> Result<(), StorageError> {
        let res = sqlx::query("UPDATE users SET role = ?1 WHERE username = ?2")
            .bind(role.as_str())
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
