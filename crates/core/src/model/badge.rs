use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{BadgeId, UserId};

/// Catalog entry for an achievement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub id: BadgeId,
    pub name: String,
    pub description: Option<String>,
    pub icon_url: Option<String>,
    pub points_required: Option<u64>,
    pub is_active: bool,
}

impl Badge {
    #[must_use]
    pub fn new(id: BadgeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            icon_url: None,
            points_required: None,
            is_active: true,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_points_required(mut self, points: u64) -> Self {
        self.points_required = Some(points);
        self
    }
}

/// Join row recording that a user earned a badge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBadge {
    pub user_id: UserId,
    pub badge_id: BadgeId,
    pub earned_at: DateTime<Utc>,
}

/// `UserBadge` joined with its catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EarnedBadge {
    pub badge: Badge,
    pub earned_at: DateTime<Utc>,
}
