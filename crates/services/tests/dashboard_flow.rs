use std::sync::Arc;

use async_trait::async_trait;
use quest_core::model::{
    Badge, BadgeId, CharacterType, EarnedBadge, LearningModule, ModuleId, UserBadge, UserId,
};
use quest_core::time::{fixed_clock, fixed_now};
use services::identity::{
    IdentityProvider, InMemoryIdentity, SessionContext, SignInForm, SignUpForm,
};
use services::{
    AppServices, AwardStrategy, DashboardError, Notice, NoticeKind, ProfileError, QuestConfig,
    SignUpOutcome, Tab, ValidationError,
};
use storage::repository::{BadgeRepository, ModuleRepository, Storage, StorageError};

/// Badge table that is always unreachable.
struct DownBadges;

#[async_trait]
impl BadgeRepository for DownBadges {
    async fn list_badges(&self) -> Result<Vec<Badge>, StorageError> {
        Err(StorageError::Connection("badges offline".into()))
    }

    async fn list_user_badges(&self, _user_id: UserId) -> Result<Vec<EarnedBadge>, StorageError> {
        Err(StorageError::Connection("badges offline".into()))
    }

    async fn upsert_badge(&self, _badge: &Badge) -> Result<(), StorageError> {
        Err(StorageError::Connection("badges offline".into()))
    }

    async fn grant_badge(&self, _grant: &UserBadge) -> Result<bool, StorageError> {
        Err(StorageError::Connection("badges offline".into()))
    }
}

async fn sign_up(identity: &InMemoryIdentity) -> SessionContext {
    let ctx = SessionContext::attach(identity).await.unwrap();
    let outcome = identity
        .sign_up(&SignUpForm {
            email: "meera@example.com".into(),
            password: "secret99".into(),
            confirm_password: "secret99".into(),
            username: "meera".into(),
        })
        .await
        .unwrap();
    assert!(matches!(outcome, SignUpOutcome::SignedIn(_)));
    assert_eq!(Notice::signed_up(&outcome).title, "Account created!");
    ctx
}

#[tokio::test]
async fn open_creates_profile_and_shows_earned_badges() {
    let storage = Storage::in_memory();
    let badge = Badge::new(BadgeId::random(), "First Steps").with_description("Sign up");
    storage.badges.upsert_badge(&badge).await.unwrap();

    let identity = InMemoryIdentity::new();
    let ctx = sign_up(&identity).await;
    let user = ctx.user_id().unwrap();
    storage
        .badges
        .grant_badge(&UserBadge {
            user_id: user,
            badge_id: badge.id,
            earned_at: fixed_now(),
        })
        .await
        .unwrap();

    let services = AppServices::from_storage(
        &storage,
        fixed_clock(),
        Arc::new(identity),
        AwardStrategy::default(),
    );
    let mut dashboard = services.dashboard(ctx);
    let view = dashboard.open().await.unwrap();

    let profile = view.profile.as_ref().unwrap();
    assert_eq!(profile.user_id, user);
    assert_eq!(profile.total_points, 0);
    assert_eq!(view.user.email, "meera@example.com");
    assert_eq!(view.badges.len(), 1);
    assert_eq!(view.badges[0].badge.name, "First Steps");
    assert_eq!(view.overview.greeting, "Welcome back, meera!");
    assert_eq!(services.badges().list_catalog().await.unwrap().len(), 1);
}

#[tokio::test]
async fn refresh_survives_a_failing_section() {
    let mut storage = Storage::in_memory();
    storage.badges = Arc::new(DownBadges);
    let module = LearningModule::new(ModuleId::random(), "Preamble", "text", 3, 1);
    storage.modules.upsert_module(&module).await.unwrap();

    let identity = InMemoryIdentity::new();
    let ctx = sign_up(&identity).await;
    let services = AppServices::from_storage(
        &storage,
        fixed_clock(),
        Arc::new(identity),
        AwardStrategy::default(),
    );
    let mut dashboard = services.dashboard(ctx);
    dashboard.open().await.unwrap();

    let done = dashboard.complete_module(module.id).await.unwrap();
    assert_eq!(done.new_total, Some(3));
    let view = dashboard.view().unwrap();
    assert!(view.badges.is_empty());
    assert_eq!(view.overview.total_points, 3);
    assert_eq!(view.modules.len(), 1);
}

#[tokio::test]
async fn profile_edits_refresh_the_view() {
    let storage = Storage::in_memory();
    let identity = InMemoryIdentity::new();
    let ctx = sign_up(&identity).await;
    let services = AppServices::from_storage(
        &storage,
        fixed_clock(),
        Arc::new(identity),
        AwardStrategy::default(),
    );
    let mut dashboard = services.dashboard(ctx);
    dashboard.open().await.unwrap();
    dashboard.set_tab(Tab::Profile);

    dashboard.update_display_name("  Meera K ").await.unwrap();
    dashboard
        .set_character_type(CharacterType::Scholar)
        .await
        .unwrap();
    let overview = &dashboard.view().unwrap().overview;
    assert_eq!(overview.greeting, "Welcome back, Meera K!");
    assert_eq!(overview.character.title(), "Legal Scholar");
    assert_eq!(Notice::profile_updated().kind, NoticeKind::Success);

    let err = dashboard.update_display_name(" ").await.unwrap_err();
    let DashboardError::Profile(profile_err) = &err else {
        panic!("unexpected error {err:?}");
    };
    assert!(matches!(
        profile_err,
        ProfileError::Validation(ValidationError::Required("display name"))
    ));
    assert_eq!(
        Notice::profile_failed(profile_err).description,
        "display name is required"
    );
}

#[tokio::test]
async fn sign_out_clears_view_and_context() {
    let storage = Storage::in_memory();
    let identity = InMemoryIdentity::new();
    let ctx = sign_up(&identity).await;
    let services = AppServices::from_storage(
        &storage,
        fixed_clock(),
        Arc::new(identity.clone()),
        AwardStrategy::default(),
    );
    let mut dashboard = services.dashboard(ctx.clone());
    dashboard.open().await.unwrap();
    dashboard.set_tab(Tab::Games);

    dashboard.sign_out().await.unwrap();
    assert!(dashboard.view().is_none());
    assert_eq!(dashboard.tab(), Tab::Overview);
    assert!(!ctx.is_authenticated());
    assert_eq!(identity.get_session().await.unwrap(), None);

    let err = dashboard.refresh().await.unwrap_err();
    assert!(matches!(err, DashboardError::Unauthenticated));
}

#[tokio::test]
async fn session_context_from_app_services_tracks_sign_in() {
    let storage = Storage::in_memory();
    let identity = InMemoryIdentity::new();
    identity.register("kiran@example.com", "pass1234", None);
    let services = AppServices::from_storage(
        &storage,
        fixed_clock(),
        Arc::new(identity.clone()),
        AwardStrategy::default(),
    );
    let ctx = services.session_context().await.unwrap();
    assert!(!ctx.is_authenticated());

    services
        .identity()
        .sign_in_with_password(&SignInForm::new("kiran@example.com", "pass1234"))
        .await
        .unwrap();
    assert_eq!(ctx.user().unwrap().email, "kiran@example.com");

    let mut dashboard = services.dashboard(ctx);
    let view = dashboard.open().await.unwrap();
    assert_eq!(view.overview.greeting, "Welcome back, Constitutional Scholar!");
}

#[tokio::test]
async fn sqlite_wiring_from_config() {
    let config = QuestConfig::from_lookup(|key| match key {
        "QUEST_DB_URL" => Some("sqlite:file:memdb_app_wiring?mode=memory&cache=shared".into()),
        "QUEST_POINTS_STRATEGY" => Some("read-modify-write".into()),
        _ => None,
    })
    .unwrap();
    assert!(config.auth.is_none());

    let services = AppServices::new_sqlite(&config, fixed_clock(), config.identity())
        .await
        .unwrap();
    assert_eq!(services.points().strategy(), AwardStrategy::ReadModifyWrite);
    assert!(services.quizzes().list_quizzes().await.unwrap().is_empty());
    assert!(services.games().list_games().await.unwrap().is_empty());
}
