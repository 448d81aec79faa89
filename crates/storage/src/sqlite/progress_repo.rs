use quest_core::model::{ModuleId, ModuleProgress, UserId, UserProgress};

use super::SqliteRepository;
use super::mapping::{bool_to_i64, db_err, map_joined_module_row, map_progress_row};
use crate::repository::{ProgressRepository, StorageError};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn list_progress(&self, user_id: UserId) -> Result<Vec<UserProgress>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    user_id, module_id, completed, progress_percentage, completed_at,
                    points_awarded
                FROM user_progress
                WHERE user_id = ?1
                ORDER BY module_id ASC
            ",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_progress_row).collect()
    }

    async fn list_progress_with_modules(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ModuleProgress>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    p.user_id, p.module_id, p.completed, p.progress_percentage, p.completed_at,
                    p.points_awarded,
                    m.title AS m_title,
                    m.description AS m_description,
                    m.content AS m_content,
                    m.points_reward AS m_points_reward,
                    m.order_index AS m_order_index,
                    m.is_active AS m_is_active
                FROM user_progress p
                JOIN learning_modules m ON m.id = p.module_id
                WHERE p.user_id = ?1
                ORDER BY m.order_index ASC, m.id ASC
            ",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(ModuleProgress {
                progress: map_progress_row(&row)?,
                module: map_joined_module_row(&row)?,
            });
        }
        Ok(out)
    }

    async fn get_progress(
        &self,
        user_id: UserId,
        module_id: ModuleId,
    ) -> Result<Option<UserProgress>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT
                    user_id, module_id, completed, progress_percentage, completed_at,
                    points_awarded
                FROM user_progress
                WHERE user_id = ?1 AND module_id = ?2
            ",
        )
        .bind(user_id.to_string())
        .bind(module_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_progress_row).transpose()
    }

    async fn insert_progress_if_absent(&self, row: &UserProgress) -> Result<bool, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO user_progress (
                    user_id, module_id, completed, progress_percentage, completed_at,
                    points_awarded
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(user_id, module_id) DO NOTHING
            ",
        )
        .bind(row.user_id.to_string())
        .bind(row.module_id.to_string())
        .bind(bool_to_i64(row.completed))
        .bind(i64::from(row.progress_percentage))
        .bind(row.completed_at)
        .bind(bool_to_i64(row.points_awarded))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(res.rows_affected() > 0)
    }

    async fn upsert_progress(&self, row: &UserProgress) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO user_progress (
                    user_id, module_id, completed, progress_percentage, completed_at,
                    points_awarded
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(user_id, module_id) DO UPDATE SET
                    completed = excluded.completed,
                    progress_percentage = excluded.progress_percentage,
                    completed_at = excluded.completed_at,
                    points_awarded = excluded.points_awarded
            ",
        )
        .bind(row.user_id.to_string())
        .bind(row.module_id.to_string())
        .bind(bool_to_i64(row.completed))
        .bind(i64::from(row.progress_percentage))
        .bind(row.completed_at)
        .bind(bool_to_i64(row.points_awarded))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn mark_points_awarded(
        &self,
        user_id: UserId,
        module_id: ModuleId,
    ) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
                UPDATE user_progress
                SET points_awarded = 1
                WHERE user_id = ?1 AND module_id = ?2
            ",
        )
        .bind(user_id.to_string())
        .bind(module_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
