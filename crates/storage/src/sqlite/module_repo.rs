use quest_core::model::{LearningModule, ModuleId};

use super::SqliteRepository;
use super::mapping::{bool_to_i64, db_err, map_module_row};
use crate::repository::{ModuleRepository, StorageError};

#[async_trait::async_trait]
impl ModuleRepository for SqliteRepository {
    async fn list_modules(&self, active_only: bool) -> Result<Vec<LearningModule>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, title, description, content, points_reward, order_index, is_active
                FROM learning_modules
                WHERE (?1 = 0 OR is_active = 1)
                ORDER BY order_index ASC, id ASC
            ",
        )
        .bind(bool_to_i64(active_only))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_module_row).collect()
    }

    async fn get_module(&self, id: ModuleId) -> Result<Option<LearningModule>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, title, description, content, points_reward, order_index, is_active
                FROM learning_modules
                WHERE id = ?1
            ",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_module_row).transpose()
    }

    async fn upsert_module(&self, module: &LearningModule) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO learning_modules (
                    id, title, description, content, points_reward, order_index, is_active
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    description = excluded.description,
                    content = excluded.content,
                    points_reward = excluded.points_reward,
                    order_index = excluded.order_index,
                    is_active = excluded.is_active
            ",
        )
        .bind(module.id.to_string())
        .bind(&module.title)
        .bind(module.description.as_deref())
        .bind(&module.content)
        .bind(i64::from(module.points_reward))
        .bind(i64::from(module.order_index))
        .bind(bool_to_i64(module.is_active))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }
}
