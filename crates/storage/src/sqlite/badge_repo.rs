use quest_core::model::{Badge, EarnedBadge, UserBadge, UserId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{bool_to_i64, db_err, i64_from_u64, map_badge_row, ser};
use crate::repository::{BadgeRepository, StorageError};

#[async_trait::async_trait]
impl BadgeRepository for SqliteRepository {
    async fn list_badges(&self) -> Result<Vec<Badge>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, name, description, icon_url, points_required, is_active
                FROM badges
                WHERE is_active = 1
                ORDER BY name ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_badge_row).collect()
    }

    async fn list_user_badges(&self, user_id: UserId) -> Result<Vec<EarnedBadge>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    b.id, b.name, b.description, b.icon_url, b.points_required, b.is_active,
                    ub.earned_at
                FROM user_badges ub
                JOIN badges b ON b.id = ub.badge_id
                WHERE ub.user_id = ?1
                ORDER BY ub.earned_at DESC, ub.id DESC
            ",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(EarnedBadge {
                badge: map_badge_row(&row)?,
                earned_at: row.try_get("earned_at").map_err(ser)?,
            });
        }
        Ok(out)
    }

    async fn upsert_badge(&self, badge: &Badge) -> Result<(), StorageError> {
        let points_required = badge
            .points_required
            .map(|p| i64_from_u64("points_required", p))
            .transpose()?;
        sqlx::query(
            r"
                INSERT INTO badges (id, name, description, icon_url, points_required, is_active)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    description = excluded.description,
                    icon_url = excluded.icon_url,
                    points_required = excluded.points_required,
                    is_active = excluded.is_active
            ",
        )
        .bind(badge.id.to_string())
        .bind(&badge.name)
        .bind(badge.description.as_deref())
        .bind(badge.icon_url.as_deref())
        .bind(points_required)
        .bind(bool_to_i64(badge.is_active))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn grant_badge(&self, grant: &UserBadge) -> Result<bool, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO user_badges (user_id, badge_id, earned_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(user_id, badge_id) DO NOTHING
            ",
        )
        .bind(grant.user_id.to_string())
        .bind(grant.badge_id.to_string())
        .bind(grant.earned_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(res.rows_affected() > 0)
    }
}
