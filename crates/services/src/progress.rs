use std::collections::HashSet;
use std::sync::Arc;

use quest_core::model::{LearningModule, ModuleId, ModuleProgress, UserProgress};
use quest_core::scoring::Completion;
use storage::repository::{ModuleRepository, ProgressRepository};

use crate::Clock;
use crate::error::ProgressError;
use crate::identity::SessionContext;
use crate::points::PointsAwarder;

/// Result of starting a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleStart {
    pub module: LearningModule,
    /// `false` when the user had already started (or finished) the module.
    pub created: bool,
}

/// Result of completing a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleCompletion {
    pub module: LearningModule,
    pub points_awarded: u64,
    pub new_total: Option<u64>,
    /// The module was already complete and paid; nothing was written.
    pub already_completed: bool,
}

/// Records per-module progress and awards module points.
#[derive(Clone)]
pub struct ProgressTracker {
    clock: Clock,
    modules: Arc<dyn ModuleRepository>,
    progress: Arc<dyn ProgressRepository>,
    points: PointsAwarder,
}

impl ProgressTracker {
    #[must_use]
    pub fn new(
        clock: Clock,
        modules: Arc<dyn ModuleRepository>,
        progress: Arc<dyn ProgressRepository>,
        points: PointsAwarder,
    ) -> Self {
        Self {
            clock,
            modules,
            progress,
            points,
        }
    }

    /// Active modules in display order.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Remote` if the store call fails.
    pub async fn list_modules(&self) -> Result<Vec<LearningModule>, ProgressError> {
        Ok(self.modules.list_modules(true).await?)
    }

    /// Progress rows joined with their modules.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Unauthenticated` without a session and
    /// `ProgressError::Remote` if the store call fails.
    pub async fn progress_with_modules(
        &self,
        ctx: &SessionContext,
    ) -> Result<Vec<ModuleProgress>, ProgressError> {
        let user_id = ctx.user_id().ok_or(ProgressError::Unauthenticated)?;
        Ok(self.progress.list_progress_with_modules(user_id).await?)
    }

    /// Record that the user opened a module. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::UnknownModule` for a missing module and
    /// `ProgressError::Remote` if a store call fails.
    pub async fn start_module(
        &self,
        ctx: &SessionContext,
        module_id: ModuleId,
    ) -> Result<ModuleStart, ProgressError> {
        let user_id = ctx.user_id().ok_or(ProgressError::Unauthenticated)?;
        let module = self.module(module_id).await?;

        let created = self
            .progress
            .insert_progress_if_absent(&UserProgress::started(user_id, module_id))
            .await
            .map_err(|err| {
                tracing::error!(module = %module_id, error = %err, "failed to start module");
                err
            })?;
        if created {
            tracing::info!(user = %user_id, module = %module_id, "module started");
        }
        Ok(ModuleStart { module, created })
    }

    /// Mark a module complete and award its points.
    ///
    /// There is no rollback: if the award fails the progress row stays
    /// completed with its reward unpaid, and the next call pays it without
    /// touching the row again.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::UnknownModule` for a missing module and
    /// `ProgressError::Remote` if the progress write or the award fails.
    pub async fn complete_module(
        &self,
        ctx: &SessionContext,
        module_id: ModuleId,
    ) -> Result<ModuleCompletion, ProgressError> {
        let user_id = ctx.user_id().ok_or(ProgressError::Unauthenticated)?;
        let module = self.module(module_id).await?;

        let unpaid = match self.progress.get_progress(user_id, module_id).await? {
            Some(row) if row.completed && row.points_awarded => {
                return Ok(ModuleCompletion {
                    module,
                    points_awarded: 0,
                    new_total: None,
                    already_completed: true,
                });
            }
            Some(row) => row.completed,
            None => false,
        };

        if unpaid {
            tracing::info!(
                user = %user_id,
                module = %module_id,
                "paying outstanding module reward"
            );
        } else {
            let row = UserProgress::completed(user_id, module_id, self.clock.now());
            self.progress.upsert_progress(&row).await.map_err(|err| {
                tracing::error!(module = %module_id, error = %err, "failed to complete module");
                err
            })?;
            tracing::info!(user = %user_id, module = %module_id, "module completed");
        }

        let points_awarded = u64::from(module.points_reward);
        let new_total = self
            .points
            .award(user_id, points_awarded)
            .await
            .map_err(|err| {
                tracing::error!(module = %module_id, error = %err, "failed to award module points");
                err
            })?;

        // The points are already paid; a failure here only loses the marker.
        if let Err(err) = self.progress.mark_points_awarded(user_id, module_id).await {
            tracing::error!(
                module = %module_id,
                error = %err,
                "failed to record paid module reward"
            );
        }

        Ok(ModuleCompletion {
            module,
            points_awarded,
            new_total,
            already_completed: false,
        })
    }

    /// Completed active modules over all active modules.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Unauthenticated` without a session and
    /// `ProgressError::Remote` if a store call fails.
    pub async fn completion(&self, ctx: &SessionContext) -> Result<Completion, ProgressError> {
        let user_id = ctx.user_id().ok_or(ProgressError::Unauthenticated)?;
        let modules = self.modules.list_modules(true).await?;
        let rows = self.progress.list_progress(user_id).await?;
        Ok(completion_of(&modules, &rows))
    }

    async fn module(&self, module_id: ModuleId) -> Result<LearningModule, ProgressError> {
        self.modules
            .get_module(module_id)
            .await?
            .ok_or(ProgressError::UnknownModule(module_id))
    }
}

/// Count completed rows that belong to one of `modules`.
#[must_use]
pub fn completion_of(modules: &[LearningModule], rows: &[UserProgress]) -> Completion {
    let active: HashSet<ModuleId> = modules.iter().map(|m| m.id).collect();
    let completed = rows
        .iter()
        .filter(|row| row.completed && active.contains(&row.module_id))
        .count();
    Completion::new(completed, modules.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{AuthSession, AuthUser};
    use quest_core::model::{COMPLETED_PERCENTAGE, Profile, UserId};
    use quest_core::time::fixed_now;
    use storage::repository::{InMemoryRepository, ProfileRepository, Storage, StorageError};

    fn ctx_for(user: UserId) -> SessionContext {
        SessionContext::fixed(Some(AuthSession {
            access_token: "t".into(),
            refresh_token: None,
            expires_at: None,
            user: AuthUser {
                id: user,
                email: "ravi@example.com".into(),
                username: None,
            },
        }))
    }

    fn tracker(repo: &InMemoryRepository) -> ProgressTracker {
        let storage = Storage::from_adapter(repo.clone());
        let clock = Clock::fixed(fixed_now());
        ProgressTracker::new(
            clock,
            storage.modules,
            storage.progress,
            PointsAwarder::new(clock, storage.profiles),
        )
    }

    #[tokio::test]
    async fn completing_twice_awards_once() {
        let repo = InMemoryRepository::new();
        let user = UserId::random();
        repo.insert_profile(&Profile::new(user, None, fixed_now()))
            .await
            .unwrap();
        let module = LearningModule::new(ModuleId::random(), "Duties", "text", 8, 1);
        repo.upsert_module(&module).await.unwrap();

        let tracker = tracker(&repo);
        let ctx = ctx_for(user);
        let first = tracker.complete_module(&ctx, module.id).await.unwrap();
        assert_eq!(first.new_total, Some(8));
        assert!(!first.already_completed);

        let second = tracker.complete_module(&ctx, module.id).await.unwrap();
        assert!(second.already_completed);
        assert_eq!(second.points_awarded, 0);
        assert_eq!(repo.get_profile(user).await.unwrap().unwrap().total_points, 8);

        let row = repo.get_progress(user, module.id).await.unwrap().unwrap();
        assert_eq!(row.progress_percentage, COMPLETED_PERCENTAGE);
        assert_eq!(row.completed_at, Some(fixed_now()));
    }

    #[tokio::test]
    async fn failed_award_is_paid_on_the_next_completion() {
        let repo = InMemoryRepository::new();
        let user = UserId::random();
        let module = LearningModule::new(ModuleId::random(), "Preamble", "text", 6, 1);
        repo.upsert_module(&module).await.unwrap();
        let tracker = tracker(&repo);
        let ctx = ctx_for(user);

        // No profile row yet, so the award has nothing to update.
        let err = tracker.complete_module(&ctx, module.id).await.unwrap_err();
        assert!(matches!(err, ProgressError::Remote(StorageError::NotFound)));
        let row = repo.get_progress(user, module.id).await.unwrap().unwrap();
        assert!(row.completed);
        assert_eq!(row.progress_percentage, COMPLETED_PERCENTAGE);
        assert!(!row.points_awarded);

        repo.insert_profile(&Profile::new(user, None, fixed_now()))
            .await
            .unwrap();
        let retry = tracker.complete_module(&ctx, module.id).await.unwrap();
        assert!(!retry.already_completed);
        assert_eq!(retry.points_awarded, 6);
        assert_eq!(retry.new_total, Some(6));
        let paid = repo.get_progress(user, module.id).await.unwrap().unwrap();
        assert!(paid.points_awarded);

        let again = tracker.complete_module(&ctx, module.id).await.unwrap();
        assert!(again.already_completed);
        assert_eq!(repo.get_profile(user).await.unwrap().unwrap().total_points, 6);
    }

    #[tokio::test]
    async fn starting_after_completion_keeps_the_completed_row() {
        let repo = InMemoryRepository::new();
        let user = UserId::random();
        repo.insert_profile(&Profile::new(user, None, fixed_now()))
            .await
            .unwrap();
        let module = LearningModule::new(ModuleId::random(), "Rights", "text", 0, 1);
        repo.upsert_module(&module).await.unwrap();

        let tracker = tracker(&repo);
        let ctx = ctx_for(user);
        tracker.complete_module(&ctx, module.id).await.unwrap();
        let start = tracker.start_module(&ctx, module.id).await.unwrap();
        assert!(!start.created);
        assert!(repo.get_progress(user, module.id).await.unwrap().unwrap().completed);
    }

    #[tokio::test]
    async fn unknown_module_is_reported() {
        let repo = InMemoryRepository::new();
        let tracker = tracker(&repo);
        let id = ModuleId::random();
        let err = tracker
            .start_module(&ctx_for(UserId::random()), id)
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressError::UnknownModule(missing) if missing == id));
    }

    #[tokio::test]
    async fn completion_ignores_inactive_modules() {
        let repo = InMemoryRepository::new();
        let user = UserId::random();
        let live = LearningModule::new(ModuleId::random(), "Live", "text", 1, 1);
        let retired = LearningModule::new(ModuleId::random(), "Retired", "text", 1, 2).inactive();
        let other = LearningModule::new(ModuleId::random(), "Other", "text", 1, 3);
        for m in [&live, &retired, &other] {
            repo.upsert_module(m).await.unwrap();
        }
        repo.upsert_progress(&UserProgress::completed(user, live.id, fixed_now()))
            .await
            .unwrap();
        repo.upsert_progress(&UserProgress::completed(user, retired.id, fixed_now()))
            .await
            .unwrap();

        let completion = tracker(&repo).completion(&ctx_for(user)).await.unwrap();
        assert_eq!(completion, Completion::new(1, 2));
        assert_eq!(completion.percent(), 50);
    }

    #[tokio::test]
    async fn signed_out_context_is_rejected() {
        let repo = InMemoryRepository::new();
        let err = tracker(&repo)
            .completion(&SessionContext::fixed(None))
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressError::Unauthenticated));
    }
}
