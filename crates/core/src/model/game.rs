use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{GameId, UserId};

/// Mini-game listed in the game center.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub name: String,
    pub description: Option<String>,
    pub game_type: String,
    pub points_reward: u32,
    pub is_active: bool,
}

impl Game {
    #[must_use]
    pub fn new(
        id: GameId,
        name: impl Into<String>,
        game_type: impl Into<String>,
        points_reward: u32,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            game_type: game_type.into(),
            points_reward,
            is_active: true,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Append-only record of one game played.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameScore {
    pub game_id: GameId,
    pub user_id: UserId,
    pub score: u32,
    pub level_reached: Option<u32>,
    pub played_at: DateTime<Utc>,
}
