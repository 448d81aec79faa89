//! Tabbed dashboard: cached view-state re-fetched in full after every
//! mutation made through the shell.

use quest_core::model::{
    CharacterType, DEFAULT_LEVEL, EarnedBadge, LearningModule, ModuleId, ModuleProgress, Profile,
};
use quest_core::scoring::Completion;

use crate::app_services::AppServices;
use crate::error::DashboardError;
use crate::identity::{AuthUser, SessionContext};
use crate::progress::{ModuleCompletion, ModuleStart, completion_of};
use crate::quiz::{QuizOutcome, QuizSession};

const GREETING_FALLBACK: &str = "Constitutional Scholar";

/// Dashboard tabs. Selection is local state and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Tab {
    #[default]
    Overview,
    Modules,
    Quizzes,
    Games,
    Profile,
}

impl Tab {
    pub const ALL: [Tab; 5] = [
        Tab::Overview,
        Tab::Modules,
        Tab::Quizzes,
        Tab::Games,
        Tab::Profile,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Tab::Overview => "Overview",
            Tab::Modules => "Modules",
            Tab::Quizzes => "Quizzes",
            Tab::Games => "Games",
            Tab::Profile => "Profile",
        }
    }
}

/// Headline numbers for the overview tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overview {
    pub level: u32,
    pub total_points: u64,
    /// Completed progress rows, whatever the module's state.
    pub completed_modules: usize,
    /// Completed active modules over all active modules.
    pub completion: Completion,
    pub character: CharacterType,
    pub greeting: String,
}

impl Overview {
    #[must_use]
    pub fn build(
        profile: Option<&Profile>,
        modules: &[LearningModule],
        progress: &[ModuleProgress],
    ) -> Self {
        let rows: Vec<_> = progress.iter().map(|p| p.progress.clone()).collect();
        let name = profile.map_or(GREETING_FALLBACK, |p| p.greeting_name(GREETING_FALLBACK));
        Self {
            level: profile.map_or(DEFAULT_LEVEL, |p| p.level),
            total_points: profile.map_or(0, |p| p.total_points),
            completed_modules: rows.iter().filter(|row| row.completed).count(),
            completion: completion_of(modules, &rows),
            character: profile.map(|p| p.character_type).unwrap_or_default(),
            greeting: format!("Welcome back, {name}!"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardView {
    pub user: AuthUser,
    /// `None` until the profile row exists or when it could not be fetched.
    pub profile: Option<Profile>,
    pub badges: Vec<EarnedBadge>,
    pub progress: Vec<ModuleProgress>,
    pub modules: Vec<LearningModule>,
    pub overview: Overview,
}

pub struct DashboardShell {
    ctx: SessionContext,
    services: AppServices,
    tab: Tab,
    view: Option<DashboardView>,
}

impl DashboardShell {
    #[must_use]
    pub fn new(ctx: SessionContext, services: AppServices) -> Self {
        Self {
            ctx,
            services,
            tab: Tab::default(),
            view: None,
        }
    }

    /// Make sure the user has a profile, then load the view.
    ///
    /// # Errors
    ///
    /// Returns `DashboardError::Unauthenticated` without a session and
    /// `DashboardError::Profile` if the profile cannot be created.
    pub async fn open(&mut self) -> Result<&DashboardView, DashboardError> {
        self.services.profiles().ensure_profile(&self.ctx).await?;
        self.refresh().await
    }

    #[must_use]
    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    #[must_use]
    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn set_tab(&mut self, tab: Tab) {
        self.tab = tab;
    }

    #[must_use]
    pub fn view(&self) -> Option<&DashboardView> {
        self.view.as_ref()
    }

    /// Re-fetch every section.
    ///
    /// A failed section is logged and left empty so the rest still shows.
    ///
    /// # Errors
    ///
    /// Returns `DashboardError::Unauthenticated` without a session.
    pub async fn refresh(&mut self) -> Result<&DashboardView, DashboardError> {
        let Some(user) = self.ctx.user() else {
            self.view = None;
            return Err(DashboardError::Unauthenticated);
        };

        let profile = self
            .services
            .profiles()
            .get_profile(&self.ctx)
            .await
            .unwrap_or_else(|err| {
                tracing::warn!(error = %err, "failed to load profile");
                None
            });
        let badges = self
            .services
            .badges()
            .earned(&self.ctx)
            .await
            .unwrap_or_else(|err| {
                tracing::warn!(error = %err, "failed to load badges");
                Vec::new()
            });
        let tracker = self.services.progress();
        let progress = tracker
            .progress_with_modules(&self.ctx)
            .await
            .unwrap_or_else(|err| {
                tracing::warn!(error = %err, "failed to load progress");
                Vec::new()
            });
        let modules = tracker.list_modules().await.unwrap_or_else(|err| {
            tracing::warn!(error = %err, "failed to load modules");
            Vec::new()
        });

        let overview = Overview::build(profile.as_ref(), &modules, &progress);
        tracing::debug!(
            user = %user.id,
            points = overview.total_points,
            completed = overview.completed_modules,
            "dashboard refreshed"
        );
        Ok(&*self.view.insert(DashboardView {
            user,
            profile,
            badges,
            progress,
            modules,
            overview,
        }))
    }

    /// # Errors
    ///
    /// Returns the tracker's error; the view is only refreshed on success.
    pub async fn start_module(&mut self, module_id: ModuleId) -> Result<ModuleStart, DashboardError> {
        let start = self
            .services
            .progress()
            .start_module(&self.ctx, module_id)
            .await?;
        self.refresh().await?;
        Ok(start)
    }

    /// # Errors
    ///
    /// Returns the tracker's error; the view is only refreshed on success.
    pub async fn complete_module(
        &mut self,
        module_id: ModuleId,
    ) -> Result<ModuleCompletion, DashboardError> {
        let completion = self
            .services
            .progress()
            .complete_module(&self.ctx, module_id)
            .await?;
        self.refresh().await?;
        Ok(completion)
    }

    /// Submit a quiz waiting to be scored.
    ///
    /// # Errors
    ///
    /// Returns the quiz service's error; the view is only refreshed on success.
    pub async fn submit_quiz(
        &mut self,
        session: &mut QuizSession,
    ) -> Result<QuizOutcome, DashboardError> {
        let outcome = self.services.quizzes().submit(&self.ctx, session).await?;
        self.refresh().await?;
        Ok(outcome)
    }

    /// # Errors
    ///
    /// Returns `DashboardError::Profile` for a blank name or a failed update.
    pub async fn update_display_name(&mut self, name: &str) -> Result<Profile, DashboardError> {
        let profile = self
            .services
            .profiles()
            .update_display_name(&self.ctx, name)
            .await?;
        self.refresh().await?;
        Ok(profile)
    }

    /// # Errors
    ///
    /// Returns `DashboardError::Profile` if the update fails.
    pub async fn set_character_type(
        &mut self,
        character: CharacterType,
    ) -> Result<Profile, DashboardError> {
        let profile = self
            .services
            .profiles()
            .set_character_type(&self.ctx, character)
            .await?;
        self.refresh().await?;
        Ok(profile)
    }

    /// Sign out and drop the cached view.
    ///
    /// The view and tab are cleared even if the provider call fails.
    ///
    /// # Errors
    ///
    /// Returns `DashboardError::Identity` if the provider rejects the request.
    pub async fn sign_out(&mut self) -> Result<(), DashboardError> {
        let result = self.services.identity().sign_out().await;
        self.view = None;
        self.tab = Tab::default();
        if let Err(err) = &result {
            tracing::error!(error = %err, "sign out failed");
        }
        result.map_err(DashboardError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quest_core::model::{UserId, UserProgress};
    use quest_core::time::fixed_now;

    fn module(order: i32) -> LearningModule {
        LearningModule::new(ModuleId::random(), format!("Module {order}"), "text", 5, order)
    }

    fn joined(user: UserId, module: &LearningModule, completed: bool) -> ModuleProgress {
        let progress = if completed {
            UserProgress::completed(user, module.id, fixed_now())
        } else {
            UserProgress::started(user, module.id)
        };
        ModuleProgress {
            progress,
            module: module.clone(),
        }
    }

    #[test]
    fn overview_without_profile_uses_defaults() {
        let overview = Overview::build(None, &[], &[]);
        assert_eq!(overview.level, DEFAULT_LEVEL);
        assert_eq!(overview.total_points, 0);
        assert_eq!(overview.character, CharacterType::Citizen);
        assert_eq!(overview.greeting, "Welcome back, Constitutional Scholar!");
        assert_eq!(overview.completion.ratio(), 0.0);
    }

    #[test]
    fn overview_counts_completed_rows() {
        let user = UserId::random();
        let modules = vec![module(1), module(2), module(3)];
        let progress = vec![
            joined(user, &modules[0], true),
            joined(user, &modules[1], false),
        ];
        let mut profile = Profile::new(user, Some("Asha".into()), fixed_now());
        profile.total_points = 42;
        profile.character_type = CharacterType::Advocate;

        let overview = Overview::build(Some(&profile), &modules, &progress);
        assert_eq!(overview.completed_modules, 1);
        assert_eq!(overview.completion, Completion::new(1, 3));
        assert_eq!(overview.total_points, 42);
        assert_eq!(overview.character.title(), "Justice Advocate");
        assert_eq!(overview.greeting, "Welcome back, Asha!");
    }

    #[test]
    fn tabs_have_labels() {
        assert_eq!(Tab::default(), Tab::Overview);
        let labels: Vec<&str> = Tab::ALL.iter().map(|t| t.label()).collect();
        assert_eq!(labels, ["Overview", "Modules", "Quizzes", "Games", "Profile"]);
    }
}
