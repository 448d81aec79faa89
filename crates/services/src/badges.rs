use std::sync::Arc;

use quest_core::model::{Badge, EarnedBadge};
use storage::repository::BadgeRepository;

use crate::error::ProfileError;
use crate::identity::SessionContext;

/// Read-only view of the badge catalog and the user's earned badges.
///
/// Nothing in the service layer grants badges.
#[derive(Clone)]
pub struct BadgeService {
    badges: Arc<dyn BadgeRepository>,
}

impl BadgeService {
    #[must_use]
    pub fn new(badges: Arc<dyn BadgeRepository>) -> Self {
        Self { badges }
    }

    /// # Errors
    ///
    /// Returns `ProfileError::Remote` if the store call fails.
    pub async fn list_catalog(&self) -> Result<Vec<Badge>, ProfileError> {
        Ok(self.badges.list_badges().await?)
    }

    /// Badges earned by the signed-in user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::Unauthenticated` without a session and
    /// `ProfileError::Remote` if the store call fails.
    pub async fn earned(&self, ctx: &SessionContext) -> Result<Vec<EarnedBadge>, ProfileError> {
        let user_id = ctx.user_id().ok_or(ProfileError::Unauthenticated)?;
        Ok(self.badges.list_user_badges(user_id).await?)
    }
}
