use chrono::Duration;
use quest_core::model::{
    Badge, BadgeId, CharacterType, Game, GameId, GameScore, LearningModule, ModuleId, Profile,
    Question, Quiz, QuizId, STARTED_PERCENTAGE, UserBadge, UserId, UserProgress,
    builtin_questions,
};
use quest_core::time::fixed_now;
use storage::repository::{
    BadgeRepository, GameRepository, ModuleRepository, NewQuizAttempt, ProfileRepository,
    ProfileUpdate, ProgressRepository, QuizAttemptRepository, QuizRepository, Storage,
    StorageError,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn module(order: i32, reward: u32) -> LearningModule {
    LearningModule::new(ModuleId::random(), format!("Module {order}"), "content", reward, order)
}

#[tokio::test]
async fn sqlite_profile_roundtrip_and_atomic_increment() {
    let repo = connect("memdb_profiles").await;
    let user = UserId::random();
    let profile = Profile::new(user, Some("  Asha ".into()), fixed_now()).with_username("asha");
    repo.insert_profile(&profile).await.unwrap();

    let fetched = repo.get_profile(user).await.unwrap().expect("profile");
    assert_eq!(fetched.display_name.as_deref(), Some("Asha"));
    assert_eq!(fetched.username.as_deref(), Some("asha"));
    assert_eq!(fetched.level, 1);
    assert_eq!(fetched.character_type, CharacterType::Citizen);

    assert_eq!(
        repo.insert_profile(&profile).await.unwrap_err(),
        StorageError::Conflict
    );

    let later = fixed_now() + Duration::minutes(1);
    assert_eq!(repo.increment_total_points(user, 5, later).await.unwrap(), 5);
    assert_eq!(repo.increment_total_points(user, 6, later).await.unwrap(), 11);

    repo.set_total_points(user, 40, later).await.unwrap();
    let fetched = repo.get_profile(user).await.unwrap().expect("profile");
    assert_eq!(fetched.total_points, 40);
    assert_eq!(fetched.updated_at, later);

    let missing = repo
        .increment_total_points(UserId::random(), 1, later)
        .await
        .unwrap_err();
    assert_eq!(missing, StorageError::NotFound);
}

#[tokio::test]
async fn sqlite_update_profile_keeps_untouched_columns() {
    let repo = connect("memdb_profile_update").await;
    let user = UserId::random();
    repo.insert_profile(&Profile::new(user, Some("Ravi".into()), fixed_now()))
        .await
        .unwrap();

    let update = ProfileUpdate {
        display_name: None,
        character_type: Some(CharacterType::Scholar),
    };
    let updated = repo
        .update_profile(user, &update, fixed_now())
        .await
        .unwrap();
    assert_eq!(updated.display_name.as_deref(), Some("Ravi"));
    assert_eq!(updated.character_type, CharacterType::Scholar);

    let err = repo
        .update_profile(UserId::random(), &update, fixed_now())
        .await
        .unwrap_err();
    assert_eq!(err, StorageError::NotFound);
}

#[tokio::test]
async fn sqlite_modules_are_ordered_and_progress_is_unique() {
    let repo = connect("memdb_progress").await;
    let second = module(2, 6);
    let first = module(1, 10);
    repo.upsert_module(&second).await.unwrap();
    repo.upsert_module(&first).await.unwrap();
    repo.upsert_module(&module(3, 4).inactive()).await.unwrap();

    let active = repo.list_modules(true).await.unwrap();
    assert_eq!(
        active.iter().map(|m| m.id).collect::<Vec<_>>(),
        vec![first.id, second.id]
    );
    assert_eq!(repo.list_modules(false).await.unwrap().len(), 3);

    let user = UserId::random();
    let started = UserProgress::started(user, second.id);
    assert!(repo.insert_progress_if_absent(&started).await.unwrap());
    assert!(!repo.insert_progress_if_absent(&started).await.unwrap());

    let rows = repo.list_progress(user).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].progress_percentage, STARTED_PERCENTAGE);
    assert!(!rows[0].completed);

    let done = UserProgress::completed(user, second.id, fixed_now());
    repo.upsert_progress(&done).await.unwrap();
    let stored = repo
        .get_progress(user, second.id)
        .await
        .unwrap()
        .expect("row");
    assert_eq!(stored, done);

    let joined = repo.list_progress_with_modules(user).await.unwrap();
    assert_eq!(joined.len(), 1);
    assert_eq!(joined[0].module, second);
    assert_eq!(joined[0].progress, done);
    assert!(!joined[0].progress.points_awarded);

    repo.mark_points_awarded(user, second.id).await.unwrap();
    let paid = repo.get_progress(user, second.id).await.unwrap().expect("row");
    assert!(paid.points_awarded);
    assert_eq!(paid.completed_at, done.completed_at);
    assert_eq!(
        repo.mark_points_awarded(user, first.id).await.unwrap_err(),
        StorageError::NotFound
    );
}

#[tokio::test]
async fn sqlite_progress_for_unknown_module_is_not_found() {
    let repo = connect("memdb_progress_fk").await;
    let row = UserProgress::started(UserId::random(), ModuleId::random());
    let err = repo.insert_progress_if_absent(&row).await.unwrap_err();
    assert_eq!(err, StorageError::NotFound);
}

#[tokio::test]
async fn sqlite_quizzes_and_attempts_roundtrip() {
    let repo = connect("memdb_quizzes").await;
    let custom = Quiz::new(
        QuizId::random(),
        "Amendments",
        vec![Question::new("How many amendments so far?", ["95", "106"], 1).unwrap()],
    )
    .with_points_reward(12);
    let basics = Quiz::new(QuizId::random(), "Basics", builtin_questions())
        .with_description("Start here");
    let retired = Quiz::new(QuizId::random(), "Retired", Vec::new()).inactive();
    for quiz in [&basics, &custom, &retired] {
        repo.upsert_quiz(quiz).await.unwrap();
    }

    let listed = repo.list_quizzes(true).await.unwrap();
    assert_eq!(
        listed.iter().map(|q| q.title.as_str()).collect::<Vec<_>>(),
        vec!["Amendments", "Basics"]
    );
    let fetched = repo.get_quiz(custom.id).await.unwrap().expect("quiz");
    assert_eq!(fetched, custom);

    let user = UserId::random();
    for (score, minutes) in [(20_u8, 0), (100, 3)] {
        repo.insert_attempt(&NewQuizAttempt {
            user_id: user,
            quiz_id: basics.id,
            score,
            answers: vec![0, 2, 1, 1, 2],
            completed_at: fixed_now() + Duration::minutes(minutes),
        })
        .await
        .unwrap();
    }
    let attempts = repo.list_attempts(user).await.unwrap();
    assert_eq!(
        attempts.iter().map(|a| a.score).collect::<Vec<_>>(),
        vec![100, 20]
    );
    assert_eq!(attempts[0].answers, vec![0, 2, 1, 1, 2]);

    let orphan = repo
        .insert_attempt(&NewQuizAttempt {
            user_id: user,
            quiz_id: QuizId::random(),
            score: 0,
            answers: Vec::new(),
            completed_at: fixed_now(),
        })
        .await
        .unwrap_err();
    assert_eq!(orphan, StorageError::NotFound);
}

#[tokio::test]
async fn sqlite_null_quiz_reward_reads_as_default() {
    let repo = connect("memdb_quiz_null_reward").await;
    let id = QuizId::random();
    sqlx::query("INSERT INTO quizzes (id, title, questions) VALUES (?1, 'Legacy', '[]')")
        .bind(id.to_string())
        .execute(repo.pool())
        .await
        .unwrap();

    let quiz = repo.get_quiz(id).await.unwrap().expect("quiz");
    assert_eq!(quiz.points_reward, 5);
    assert!(quiz.questions.is_empty());
    assert!(quiz.is_active);
}

#[tokio::test]
async fn sqlite_badges_join_catalog_and_grant_once() {
    let repo = connect("memdb_badges").await;
    let badge = Badge::new(BadgeId::random(), "Rights Defender").with_points_required(50);
    repo.upsert_badge(&badge).await.unwrap();

    let grant = UserBadge {
        user_id: UserId::random(),
        badge_id: badge.id,
        earned_at: fixed_now(),
    };
    assert!(repo.grant_badge(&grant).await.unwrap());
    assert!(!repo.grant_badge(&grant).await.unwrap());

    let earned = repo.list_user_badges(grant.user_id).await.unwrap();
    assert_eq!(earned.len(), 1);
    assert_eq!(earned[0].badge, badge);
    assert_eq!(earned[0].earned_at, fixed_now());
    assert_eq!(repo.list_badges().await.unwrap(), vec![badge]);
}

#[tokio::test]
async fn sqlite_games_and_scores() {
    let repo = connect("memdb_games").await;
    let trivia = Game::new(GameId::random(), "Constitution Trivia", "trivia", 5);
    repo.upsert_game(&trivia).await.unwrap();

    let listed = repo.list_games(true).await.unwrap();
    assert_eq!(listed, vec![trivia.clone()]);

    let score = GameScore {
        game_id: trivia.id,
        user_id: UserId::random(),
        score: 420,
        level_reached: Some(3),
        played_at: fixed_now(),
    };
    repo.insert_game_score(&score).await.unwrap();

    let unknown = GameScore {
        game_id: GameId::random(),
        ..score
    };
    assert_eq!(
        repo.insert_game_score(&unknown).await.unwrap_err(),
        StorageError::NotFound
    );
}

#[tokio::test]
async fn storage_sqlite_wires_every_table() {
    let storage = Storage::sqlite("sqlite:file:memdb_storage?mode=memory&cache=shared")
        .await
        .expect("storage");
    let m = module(1, 6);
    storage.modules.upsert_module(&m).await.unwrap();
    assert_eq!(storage.modules.list_modules(true).await.unwrap(), vec![m]);
    assert!(storage.quizzes.list_quizzes(true).await.unwrap().is_empty());
    assert!(storage.games.list_games(true).await.unwrap().is_empty());
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let repo = connect("memdb_migrate_twice").await;
    repo.migrate().await.expect("second migrate");
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM schema_migrations")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!(row.0, 2);
}
