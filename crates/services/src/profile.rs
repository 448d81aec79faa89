use std::sync::Arc;

use quest_core::model::{CharacterType, Profile, UserId};
use storage::repository::{ProfileRepository, ProfileUpdate, StorageError};

use crate::Clock;
use crate::error::{ProfileError, ValidationError};
use crate::identity::SessionContext;

/// Reads and edits the signed-in user's profile row.
#[derive(Clone)]
pub struct ProfileService {
    clock: Clock,
    profiles: Arc<dyn ProfileRepository>,
}

impl ProfileService {
    #[must_use]
    pub fn new(clock: Clock, profiles: Arc<dyn ProfileRepository>) -> Self {
        Self { clock, profiles }
    }

    /// Return the user's profile, creating an empty one on first use.
    ///
    /// The display name defaults to the auth username when there is one.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::Unauthenticated` without a session and
    /// `ProfileError::Remote` if a store call fails.
    pub async fn ensure_profile(&self, ctx: &SessionContext) -> Result<Profile, ProfileError> {
        let user = ctx.user().ok_or(ProfileError::Unauthenticated)?;
        if let Some(profile) = self.profiles.get_profile(user.id).await? {
            return Ok(profile);
        }

        let mut profile = Profile::new(user.id, user.username.clone(), self.clock.now());
        profile.username = user.username;
        match self.profiles.insert_profile(&profile).await {
            Ok(()) => {
                tracing::info!(user = %profile.user_id, "profile created");
                Ok(profile)
            }
            // Lost a race with another session creating the same row.
            Err(StorageError::Conflict) => self
                .profiles
                .get_profile(profile.user_id)
                .await?
                .ok_or(ProfileError::Remote(StorageError::NotFound)),
            Err(err) => Err(err.into()),
        }
    }

    /// # Errors
    ///
    /// Returns `ProfileError::Unauthenticated` without a session and
    /// `ProfileError::Remote` if the store call fails.
    pub async fn get_profile(&self, ctx: &SessionContext) -> Result<Option<Profile>, ProfileError> {
        let user_id = ctx.user_id().ok_or(ProfileError::Unauthenticated)?;
        Ok(self.profiles.get_profile(user_id).await?)
    }

    /// Set a new display name. Surrounding whitespace is trimmed.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::Validation` for a blank name and
    /// `ProfileError::Remote` if the update fails.
    pub async fn update_display_name(
        &self,
        ctx: &SessionContext,
        display_name: &str,
    ) -> Result<Profile, ProfileError> {
        let user_id = ctx.user_id().ok_or(ProfileError::Unauthenticated)?;
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(ValidationError::Required("display name").into());
        }
        let update = ProfileUpdate {
            display_name: Some(display_name.to_owned()),
            ..ProfileUpdate::default()
        };
        self.apply(user_id, &update).await
    }

    /// # Errors
    ///
    /// Returns `ProfileError::Remote` if the update fails.
    pub async fn set_character_type(
        &self,
        ctx: &SessionContext,
        character_type: CharacterType,
    ) -> Result<Profile, ProfileError> {
        let user_id = ctx.user_id().ok_or(ProfileError::Unauthenticated)?;
        let update = ProfileUpdate {
            character_type: Some(character_type),
            ..ProfileUpdate::default()
        };
        self.apply(user_id, &update).await
    }

    async fn apply(&self, user_id: UserId, update: &ProfileUpdate) -> Result<Profile, ProfileError> {
        let profile = self
            .profiles
            .update_profile(user_id, update, self.clock.now())
            .await
            .map_err(|err| {
                tracing::error!(user = %user_id, error = %err, "failed to update profile");
                err
            })?;
        tracing::info!(user = %user_id, "profile updated");
        Ok(profile)
    }
}
