use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::badges::BadgeService;
use crate::config::QuestConfig;
use crate::dashboard::DashboardShell;
use crate::error::AppServicesError;
use crate::games::GameCenter;
use crate::identity::{IdentityProvider, SessionContext};
use crate::points::{AwardStrategy, PointsAwarder};
use crate::profile::ProfileService;
use crate::progress::ProgressTracker;
use crate::quiz::QuizService;

/// Assembles app-facing services over one storage backend and identity provider.
#[derive(Clone)]
pub struct AppServices {
    identity: Arc<dyn IdentityProvider>,
    points: PointsAwarder,
    profiles: Arc<ProfileService>,
    badges: Arc<BadgeService>,
    progress: Arc<ProgressTracker>,
    quizzes: Arc<QuizService>,
    games: Arc<GameCenter>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the database cannot be opened or migrated.
    pub async fn new_sqlite(
        config: &QuestConfig,
        clock: Clock,
        identity: Arc<dyn IdentityProvider>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(&config.db_url).await?;
        tracing::info!(strategy = %config.points_strategy, "storage ready");
        Ok(Self::from_storage(
            &storage,
            clock,
            identity,
            config.points_strategy,
        ))
    }

    /// Build services over any storage backend.
    #[must_use]
    pub fn from_storage(
        storage: &Storage,
        clock: Clock,
        identity: Arc<dyn IdentityProvider>,
        strategy: AwardStrategy,
    ) -> Self {
        let points = PointsAwarder::with_strategy(clock, Arc::clone(&storage.profiles), strategy);
        let profiles = Arc::new(ProfileService::new(clock, Arc::clone(&storage.profiles)));
        let badges = Arc::new(BadgeService::new(Arc::clone(&storage.badges)));
        let progress = Arc::new(ProgressTracker::new(
            clock,
            Arc::clone(&storage.modules),
            Arc::clone(&storage.progress),
            points.clone(),
        ));
        let quizzes = Arc::new(QuizService::new(
            clock,
            Arc::clone(&storage.quizzes),
            Arc::clone(&storage.attempts),
            points.clone(),
        ));
        let games = Arc::new(GameCenter::new(clock, Arc::clone(&storage.games)));

        Self {
            identity,
            points,
            profiles,
            badges,
            progress,
            quizzes,
            games,
        }
    }

    /// Subscribe a session context to the identity provider.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Identity` if the session lookup fails.
    pub async fn session_context(&self) -> Result<SessionContext, AppServicesError> {
        Ok(SessionContext::attach(self.identity.as_ref()).await?)
    }

    /// A dashboard shell bound to `ctx`.
    #[must_use]
    pub fn dashboard(&self, ctx: SessionContext) -> DashboardShell {
        DashboardShell::new(ctx, self.clone())
    }

    #[must_use]
    pub fn identity(&self) -> Arc<dyn IdentityProvider> {
        Arc::clone(&self.identity)
    }

    #[must_use]
    pub fn points(&self) -> &PointsAwarder {
        &self.points
    }

    #[must_use]
    pub fn profiles(&self) -> Arc<ProfileService> {
        Arc::clone(&self.profiles)
    }

    #[must_use]
    pub fn badges(&self) -> Arc<BadgeService> {
        Arc::clone(&self.badges)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressTracker> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn quizzes(&self) -> Arc<QuizService> {
        Arc::clone(&self.quizzes)
    }

    #[must_use]
    pub fn games(&self) -> Arc<GameCenter> {
        Arc::clone(&self.games)
    }
}
