use chrono::{DateTime, Utc};
use quest_core::model::{Profile, UserId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{db_err, i64_from_u64, map_profile_row, ser, u64_from_i64};
use crate::repository::{ProfileRepository, ProfileUpdate, StorageError};

const PROFILE_COLUMNS: &str = r"
    user_id, display_name, username, level, total_points,
    character_type, created_at, updated_at
";

#[async_trait::async_trait]
impl ProfileRepository for SqliteRepository {
    async fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>, StorageError> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = ?1");
        let row = sqlx::query(&sql)
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(map_profile_row).transpose()
    }

    async fn insert_profile(&self, profile: &Profile) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO profiles (
                    user_id, display_name, username, level, total_points,
                    character_type, created_at, updated_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(profile.user_id.to_string())
        .bind(profile.display_name.as_deref())
        .bind(profile.username.as_deref())
        .bind(i64::from(profile.level))
        .bind(i64_from_u64("total_points", profile.total_points)?)
        .bind(profile.character_type.as_str())
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn update_profile(
        &self,
        user_id: UserId,
        update: &ProfileUpdate,
        updated_at: DateTime<Utc>,
    ) -> Result<Profile, StorageError> {
        let sql = format!(
            r"
                UPDATE profiles SET
                    display_name = COALESCE(?1, display_name),
                    character_type = COALESCE(?2, character_type),
                    updated_at = ?3
                WHERE user_id = ?4
                RETURNING {PROFILE_COLUMNS}
            "
        );
        let row = sqlx::query(&sql)
            .bind(update.display_name.as_deref())
            .bind(update.character_type.map(|c| c.as_str()))
            .bind(updated_at)
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or(StorageError::NotFound)?;
        map_profile_row(&row)
    }

    async fn set_total_points(
        &self,
        user_id: UserId,
        total_points: u64,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
                UPDATE profiles SET total_points = ?1, updated_at = ?2
                WHERE user_id = ?3
            ",
        )
        .bind(i64_from_u64("total_points", total_points)?)
        .bind(updated_at)
        .bind(user_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn increment_total_points(
        &self,
        user_id: UserId,
        delta: u64,
        updated_at: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        let row = sqlx::query(
            r"
                UPDATE profiles
                SET total_points = COALESCE(total_points, 0) + ?1, updated_at = ?2
                WHERE user_id = ?3
                RETURNING total_points
            ",
        )
        .bind(i64_from_u64("delta", delta)?)
        .bind(updated_at)
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(StorageError::NotFound)?;

        u64_from_i64("total_points", row.try_get::<i64, _>("total_points").map_err(ser)?)
    }
}
