use std::sync::Arc;

use quest_core::model::{Game, GameId, GameScore};
use storage::repository::GameRepository;

use crate::Clock;
use crate::error::ProfileError;
use crate::identity::SessionContext;

/// Mini-game catalog and score log. Games award no points.
#[derive(Clone)]
pub struct GameCenter {
    clock: Clock,
    games: Arc<dyn GameRepository>,
}

impl GameCenter {
    #[must_use]
    pub fn new(clock: Clock, games: Arc<dyn GameRepository>) -> Self {
        Self { clock, games }
    }

    /// Active games ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::Remote` if the store call fails.
    pub async fn list_games(&self) -> Result<Vec<Game>, ProfileError> {
        Ok(self.games.list_games(true).await?)
    }

    /// Append a played-game record for the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::Unauthenticated` without a session and
    /// `ProfileError::Remote` if the game is unknown or the insert fails.
    pub async fn record_score(
        &self,
        ctx: &SessionContext,
        game_id: GameId,
        score: u32,
        level_reached: Option<u32>,
    ) -> Result<GameScore, ProfileError> {
        let user_id = ctx.user_id().ok_or(ProfileError::Unauthenticated)?;
        let record = GameScore {
            game_id,
            user_id,
            score,
            level_reached,
            played_at: self.clock.now(),
        };
        self.games.insert_game_score(&record).await.map_err(|err| {
            tracing::error!(game = %game_id, error = %err, "failed to record game score");
            err
        })?;
        tracing::info!(user = %user_id, game = %game_id, score, "game score recorded");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quest_core::model::UserId;
    use quest_core::time::{fixed_clock, fixed_now};
    use storage::repository::{InMemoryRepository, StorageError};

    use crate::identity::{AuthSession, AuthUser};

    fn ctx(user: UserId) -> SessionContext {
        SessionContext::fixed(Some(AuthSession {
            access_token: "t".into(),
            refresh_token: None,
            expires_at: None,
            user: AuthUser {
                id: user,
                email: "dev@example.com".into(),
                username: None,
            },
        }))
    }

    #[tokio::test]
    async fn scores_are_appended() {
        let repo = InMemoryRepository::new();
        let game = Game::new(GameId::random(), "Preamble Puzzle", "matching", 4);
        repo.upsert_game(&game).await.unwrap();
        let center = GameCenter::new(fixed_clock(), Arc::new(repo.clone()));
        let user = UserId::random();

        center.record_score(&ctx(user), game.id, 70, Some(2)).await.unwrap();
        let second = center.record_score(&ctx(user), game.id, 90, None).await.unwrap();
        assert_eq!(second.played_at, fixed_now());

        let scores = repo.game_scores(user).unwrap();
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0].level_reached, Some(2));
    }

    #[tokio::test]
    async fn unknown_game_is_remote_not_found() {
        let center = GameCenter::new(fixed_clock(), Arc::new(InMemoryRepository::new()));
        let err = center
            .record_score(&ctx(UserId::random()), GameId::random(), 10, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ProfileError::Remote(StorageError::NotFound)));
    }
}
