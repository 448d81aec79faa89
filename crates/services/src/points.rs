use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use quest_core::model::UserId;
use storage::repository::{ProfileRepository, StorageError};

use crate::Clock;

/// How a points award reaches `profiles.total_points`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AwardStrategy {
    /// One store-side `total_points = total_points + delta` update.
    #[default]
    AtomicIncrement,
    /// Read the total, add locally, write it back. Concurrent awards for the
    /// same user can lose updates.
    ReadModifyWrite,
}

impl AwardStrategy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AwardStrategy::AtomicIncrement => "atomic",
            AwardStrategy::ReadModifyWrite => "read-modify-write",
        }
    }
}

impl fmt::Display for AwardStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AwardStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "atomic" | "increment" => Ok(Self::AtomicIncrement),
            "read-modify-write" | "rmw" => Ok(Self::ReadModifyWrite),
            other => Err(other.to_owned()),
        }
    }
}

/// Adds earned points to a user's profile.
#[derive(Clone)]
pub struct PointsAwarder {
    clock: Clock,
    profiles: Arc<dyn ProfileRepository>,
    strategy: AwardStrategy,
}

impl PointsAwarder {
    #[must_use]
    pub fn new(clock: Clock, profiles: Arc<dyn ProfileRepository>) -> Self {
        Self::with_strategy(clock, profiles, AwardStrategy::default())
    }

    #[must_use]
    pub fn with_strategy(
        clock: Clock,
        profiles: Arc<dyn ProfileRepository>,
        strategy: AwardStrategy,
    ) -> Self {
        Self {
            clock,
            profiles,
            strategy,
        }
    }

    #[must_use]
    pub fn strategy(&self) -> AwardStrategy {
        self.strategy
    }

    /// Add `points` to the user's total and return the new total.
    ///
    /// Zero-point awards write nothing and return `None`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user has no profile, or any
    /// other storage failure.
    pub async fn award(&self, user_id: UserId, points: u64) -> Result<Option<u64>, StorageError> {
        if points == 0 {
            return Ok(None);
        }
        let now = self.clock.now();
        let total = match self.strategy {
            AwardStrategy::AtomicIncrement => {
                self.profiles
                    .increment_total_points(user_id, points, now)
                    .await?
            }
            AwardStrategy::ReadModifyWrite => {
                let current = self
                    .profiles
                    .get_profile(user_id)
                    .await?
                    .ok_or(StorageError::NotFound)?
                    .total_points;
                let total = current.saturating_add(points);
                self.profiles.set_total_points(user_id, total, now).await?;
                total
            }
        };
        tracing::info!(user = %user_id, points, total, strategy = %self.strategy, "points awarded");
        Ok(Some(total))
    }
}
