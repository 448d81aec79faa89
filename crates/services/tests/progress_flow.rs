use std::sync::Arc;

use quest_core::model::{
    COMPLETED_PERCENTAGE, LearningModule, ModuleId, Profile, STARTED_PERCENTAGE, UserId,
};
use quest_core::time::{fixed_clock, fixed_now};
use services::identity::{AuthSession, AuthUser, InMemoryIdentity, SessionContext};
use services::{AppServices, AwardStrategy, DashboardError, Notice, ProgressError, Tab};
use storage::repository::{
    ModuleRepository, ProfileRepository, ProgressRepository, Storage, StorageError,
};

fn ctx() -> SessionContext {
    SessionContext::fixed(Some(AuthSession {
        access_token: "local".into(),
        refresh_token: None,
        expires_at: None,
        user: AuthUser {
            id: UserId::random(),
            email: "ravi@example.com".into(),
            username: Some("ravi".into()),
        },
    }))
}

fn services_over(storage: &Storage) -> AppServices {
    AppServices::from_storage(
        storage,
        fixed_clock(),
        Arc::new(InMemoryIdentity::new()),
        AwardStrategy::AtomicIncrement,
    )
}

#[tokio::test]
async fn start_then_complete_awards_module_reward() {
    let storage = Storage::sqlite("sqlite:file:memdb_progress_flow?mode=memory&cache=shared")
        .await
        .unwrap();
    let module = LearningModule::new(ModuleId::random(), "Preamble", "We, the people", 6, 1);
    storage.modules.upsert_module(&module).await.unwrap();
    let other = LearningModule::new(ModuleId::random(), "Fundamental Duties", "Article 51A", 4, 2);
    storage.modules.upsert_module(&other).await.unwrap();

    let services = services_over(&storage);
    let ctx = ctx();
    let user = ctx.user_id().unwrap();
    let mut dashboard = services.dashboard(ctx.clone());
    dashboard.open().await.unwrap();
    dashboard.set_tab(Tab::Modules);

    let start = dashboard.start_module(module.id).await.unwrap();
    assert!(start.created);
    assert_eq!(
        Notice::module_started(&start.module).description,
        "You've started learning: Preamble"
    );
    let row = storage.progress.get_progress(user, module.id).await.unwrap().unwrap();
    assert_eq!(row.progress_percentage, STARTED_PERCENTAGE);
    assert!(!row.completed);

    let done = dashboard.complete_module(module.id).await.unwrap();
    assert_eq!(done.points_awarded, 6);
    assert_eq!(done.new_total, Some(6));

    let row = storage.progress.get_progress(user, module.id).await.unwrap().unwrap();
    assert!(row.completed);
    assert_eq!(row.progress_percentage, COMPLETED_PERCENTAGE);
    assert_eq!(row.completed_at, Some(fixed_now()));

    let view = dashboard.view().unwrap();
    assert_eq!(view.overview.total_points, 6);
    assert_eq!(view.overview.completed_modules, 1);
    assert_eq!(view.overview.completion.percent(), 50);
    assert_eq!(view.progress.len(), 1);
    assert_eq!(view.modules.len(), 2);
    assert_eq!(dashboard.tab(), Tab::Modules);
}

#[tokio::test]
async fn starting_twice_leaves_one_row() {
    let storage = Storage::in_memory();
    let module = LearningModule::new(ModuleId::random(), "Preamble", "text", 6, 1);
    storage.modules.upsert_module(&module).await.unwrap();
    let services = services_over(&storage);
    let ctx = ctx();
    services.profiles().ensure_profile(&ctx).await.unwrap();
    let tracker = services.progress();

    assert!(tracker.start_module(&ctx, module.id).await.unwrap().created);
    assert!(!tracker.start_module(&ctx, module.id).await.unwrap().created);

    let rows = storage
        .progress
        .list_progress(ctx.user_id().unwrap())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn completion_is_zero_without_modules() {
    let storage = Storage::in_memory();
    let services = services_over(&storage);
    let completion = services.progress().completion(&ctx()).await.unwrap();
    assert_eq!(completion.total, 0);
    assert_eq!(completion.ratio(), 0.0);
}

#[tokio::test]
async fn missing_module_fails_without_refreshing() {
    let storage = Storage::in_memory();
    let services = services_over(&storage);
    let mut dashboard = services.dashboard(ctx());
    let missing = ModuleId::random();

    let err = dashboard.start_module(missing).await.unwrap_err();
    assert!(matches!(
        err,
        DashboardError::Progress(ProgressError::UnknownModule(id)) if id == missing
    ));
    assert!(dashboard.view().is_none());
}

#[tokio::test]
async fn unpaid_module_reward_survives_and_is_paid_on_retry() {
    let storage = Storage::sqlite("sqlite:file:memdb_progress_unpaid?mode=memory&cache=shared")
        .await
        .unwrap();
    let module = LearningModule::new(ModuleId::random(), "Preamble", "We, the people", 6, 1);
    storage.modules.upsert_module(&module).await.unwrap();

    let services = services_over(&storage);
    let ctx = ctx();
    let user = ctx.user_id().unwrap();
    let tracker = services.progress();

    // The profile row is missing, so the award fails after the progress write.
    let err = tracker.complete_module(&ctx, module.id).await.unwrap_err();
    assert!(matches!(err, ProgressError::Remote(StorageError::NotFound)));
    assert!(Notice::complete_module_failed(&err).is_failure());

    let row = storage.progress.get_progress(user, module.id).await.unwrap().unwrap();
    assert!(row.completed);
    assert_eq!(row.progress_percentage, COMPLETED_PERCENTAGE);
    assert!(!row.points_awarded);

    storage
        .profiles
        .insert_profile(&Profile::new(user, None, fixed_now()))
        .await
        .unwrap();
    let retry = tracker.complete_module(&ctx, module.id).await.unwrap();
    assert!(!retry.already_completed);
    assert_eq!(retry.new_total, Some(6));

    let again = tracker.complete_module(&ctx, module.id).await.unwrap();
    assert!(again.already_completed);
    assert_eq!(again.points_awarded, 0);
    let profile = storage.profiles.get_profile(user).await.unwrap().unwrap();
    assert_eq!(profile.total_points, 6);
}
