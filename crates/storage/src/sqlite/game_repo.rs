use quest_core::model::{Game, GameScore};

use super::SqliteRepository;
use super::mapping::{bool_to_i64, db_err, map_game_row};
use crate::repository::{GameRepository, StorageError};

#[async_trait::async_trait]
impl GameRepository for SqliteRepository {
    async fn list_games(&self, active_only: bool) -> Result<Vec<Game>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, name, description, game_type, points_reward, is_active
                FROM games
                WHERE (?1 = 0 OR is_active = 1)
                ORDER BY name ASC
            ",
        )
        .bind(bool_to_i64(active_only))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_game_row).collect()
    }

    async fn upsert_game(&self, game: &Game) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO games (id, name, description, game_type, points_reward, is_active)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    description = excluded.description,
                    game_type = excluded.game_type,
                    points_reward = excluded.points_reward,
                    is_active = excluded.is_active
            ",
        )
        .bind(game.id.to_string())
        .bind(&game.name)
        .bind(game.description.as_deref())
        .bind(&game.game_type)
        .bind(i64::from(game.points_reward))
        .bind(bool_to_i64(game.is_active))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn insert_game_score(&self, score: &GameScore) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO game_scores (game_id, user_id, score, level_reached, played_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(score.game_id.to_string())
        .bind(score.user_id.to_string())
        .bind(i64::from(score.score))
        .bind(score.level_reached.map(i64::from))
        .bind(score.played_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }
}
