use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{ModuleId, UserId};
use crate::model::module::LearningModule;

/// Percentage recorded when a module is first opened.
pub const STARTED_PERCENTAGE: u8 = 10;

/// Percentage recorded when a module is finished.
pub const COMPLETED_PERCENTAGE: u8 = 100;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressRecordError {
    #[error("progress percentage must be within 0..=100, got {0}")]
    PercentageOutOfRange(i64),

    #[error("completed progress is missing its completion time")]
    MissingCompletedAt,
}

/// Per (user, module) progress row. Conceptually unique on that pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProgress {
    pub user_id: UserId,
    pub module_id: ModuleId,
    pub completed: bool,
    pub progress_percentage: u8,
    pub completed_at: Option<DateTime<Utc>>,
    /// The module's reward has been added to the profile total.
    #[serde(default)]
    pub points_awarded: bool,
}

impl UserProgress {
    /// Row written when a module is started for the first time.
    #[must_use]
    pub fn started(user_id: UserId, module_id: ModuleId) -> Self {
        Self {
            user_id,
            module_id,
            completed: false,
            progress_percentage: STARTED_PERCENTAGE,
            completed_at: None,
            points_awarded: false,
        }
    }

    /// Row upserted when a module is finished, before its reward is paid.
    #[must_use]
    pub fn completed(user_id: UserId, module_id: ModuleId, at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            module_id,
            completed: true,
            progress_percentage: COMPLETED_PERCENTAGE,
            completed_at: Some(at),
            points_awarded: false,
        }
    }

    /// Rehydrate a row read from storage.
    ///
    /// # Errors
    ///
    /// Returns `ProgressRecordError::PercentageOutOfRange` for values outside 0..=100
    /// and `ProgressRecordError::MissingCompletedAt` for completed rows without a timestamp.
    pub fn from_persisted(
        user_id: UserId,
        module_id: ModuleId,
        completed: bool,
        progress_percentage: i64,
        completed_at: Option<DateTime<Utc>>,
        points_awarded: bool,
    ) -> Result<Self, ProgressRecordError> {
        let progress_percentage = u8::try_from(progress_percentage)
            .ok()
            .filter(|p| *p <= COMPLETED_PERCENTAGE)
            .ok_or(ProgressRecordError::PercentageOutOfRange(progress_percentage))?;
        if completed && completed_at.is_none() {
            return Err(ProgressRecordError::MissingCompletedAt);
        }
        Ok(Self {
            user_id,
            module_id,
            completed,
            progress_percentage,
            completed_at,
            points_awarded,
        })
    }
}

/// Progress row joined with the module it refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleProgress {
    pub progress: UserProgress,
    pub module: LearningModule,
}
