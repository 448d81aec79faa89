use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quest_core::model::{
    AttemptId, Badge, CharacterType, EarnedBadge, Game, GameScore, LearningModule, ModuleId,
    ModuleProgress, Profile, Quiz, QuizAttempt, QuizId, UserBadge, UserId, UserProgress,
};
use std::sync::Arc;
use thiserror::Error;

pub use crate::memory::InMemoryRepository;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Insert shape for `quiz_attempts`; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuizAttempt {
    pub user_id: UserId,
    pub quiz_id: QuizId,
    pub score: u8,
    pub answers: Vec<usize>,
    pub completed_at: DateTime<Utc>,
}

impl NewQuizAttempt {
    #[must_use]
    pub fn into_attempt(self, id: AttemptId) -> QuizAttempt {
        QuizAttempt {
            id,
            user_id: self.user_id,
            quiz_id: self.quiz_id,
            score: self.score,
            answers: self.answers,
            completed_at: self.completed_at,
        }
    }
}

/// Partial update for a profile row. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub character_type: Option<CharacterType>,
}

//
// ─── PROFILES ─────────────────────────────────────────────────────────────────
//

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Fetch the profile keyed by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures; a missing row is `Ok(None)`.
    async fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>, StorageError>;

    /// Insert a new profile.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the user already has a profile.
    async fn insert_profile(&self, profile: &Profile) -> Result<(), StorageError>;

    /// Apply a partial update and return the stored row.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the profile does not exist.
    async fn update_profile(
        &self,
        user_id: UserId,
        update: &ProfileUpdate,
        updated_at: DateTime<Utc>,
    ) -> Result<Profile, StorageError>;

    /// Overwrite `total_points` with a value computed by the caller.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the profile does not exist.
    async fn set_total_points(
        &self,
        user_id: UserId,
        total_points: u64,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Add `delta` to `total_points` in a single store-side update and return the new total.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the profile does not exist.
    async fn increment_total_points(
        &self,
        user_id: UserId,
        delta: u64,
        updated_at: DateTime<Utc>,
    ) -> Result<u64, StorageError>;
}

//
// ─── LEARNING MODULES ─────────────────────────────────────────────────────────
//

#[async_trait]
pub trait ModuleRepository: Send + Sync {
    /// List modules ordered by `order_index`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn list_modules(&self, active_only: bool) -> Result<Vec<LearningModule>, StorageError>;

    /// Fetch one module by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures; a missing row is `Ok(None)`.
    async fn get_module(&self, id: ModuleId) -> Result<Option<LearningModule>, StorageError>;

    /// Insert or replace a catalog module.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the module cannot be stored.
    async fn upsert_module(&self, module: &LearningModule) -> Result<(), StorageError>;
}

//
// ─── USER PROGRESS ────────────────────────────────────────────────────────────
//

#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// All progress rows for a user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn list_progress(&self, user_id: UserId) -> Result<Vec<UserProgress>, StorageError>;

    /// Progress rows joined with their modules, ordered by `order_index`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn list_progress_with_modules(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ModuleProgress>, StorageError>;

    /// Fetch the row for one (user, module) pair.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures; a missing row is `Ok(None)`.
    async fn get_progress(
        &self,
        user_id: UserId,
        module_id: ModuleId,
    ) -> Result<Option<UserProgress>, StorageError>;

    /// Insert the row unless one already exists for the pair.
    ///
    /// Returns `true` when a row was written.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the module does not exist, or other
    /// storage errors.
    async fn insert_progress_if_absent(&self, row: &UserProgress) -> Result<bool, StorageError>;

    /// Insert or overwrite the row for the pair.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the module does not exist, or other
    /// storage errors.
    async fn upsert_progress(&self, row: &UserProgress) -> Result<(), StorageError>;

    /// Record that the module's reward was paid for this pair.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no row exists for the pair.
    async fn mark_points_awarded(
        &self,
        user_id: UserId,
        module_id: ModuleId,
    ) -> Result<(), StorageError>;
}

//
// ─── QUIZZES ──────────────────────────────────────────────────────────────────
//

#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// List quizzes ordered by title.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn list_quizzes(&self, active_only: bool) -> Result<Vec<Quiz>, StorageError>;

    /// Fetch one quiz by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures; a missing row is `Ok(None)`.
    async fn get_quiz(&self, id: QuizId) -> Result<Option<Quiz>, StorageError>;

    /// Insert or replace a quiz.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the quiz cannot be stored.
    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError>;
}

/// Append-only quiz attempts. There is no update path.
#[async_trait]
pub trait QuizAttemptRepository: Send + Sync {
    /// Append an attempt and return its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the quiz does not exist, or other
    /// storage errors.
    async fn insert_attempt(&self, attempt: &NewQuizAttempt) -> Result<AttemptId, StorageError>;

    /// Attempts for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn list_attempts(&self, user_id: UserId) -> Result<Vec<QuizAttempt>, StorageError>;
}

//
// ─── BADGES ───────────────────────────────────────────────────────────────────
//

#[async_trait]
pub trait BadgeRepository: Send + Sync {
    /// Active catalog badges ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn list_badges(&self) -> Result<Vec<Badge>, StorageError>;

    /// Badges earned by a user joined with the catalog, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn list_user_badges(&self, user_id: UserId) -> Result<Vec<EarnedBadge>, StorageError>;

    /// Insert or replace a catalog badge.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the badge cannot be stored.
    async fn upsert_badge(&self, badge: &Badge) -> Result<(), StorageError>;

    /// Record an earned badge; returns `false` if it was already granted.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the badge does not exist.
    async fn grant_badge(&self, grant: &UserBadge) -> Result<bool, StorageError>;
}

//
// ─── GAMES ────────────────────────────────────────────────────────────────────
//

#[async_trait]
pub trait GameRepository: Send + Sync {
    /// List games ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn list_games(&self, active_only: bool) -> Result<Vec<Game>, StorageError>;

    /// Insert or replace a game.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the game cannot be stored.
    async fn upsert_game(&self, game: &Game) -> Result<(), StorageError>;

    /// Append a played-game record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the game does not exist.
    async fn insert_game_score(&self, score: &GameScore) -> Result<(), StorageError>;
}

/// Aggregates table repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub profiles: Arc<dyn ProfileRepository>,
    pub modules: Arc<dyn ModuleRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub quizzes: Arc<dyn QuizRepository>,
    pub attempts: Arc<dyn QuizAttemptRepository>,
    pub badges: Arc<dyn BadgeRepository>,
    pub games: Arc<dyn GameRepository>,
}

impl Storage {
    /// Build a `Storage` where every table is served by the same adapter.
    #[must_use]
    pub fn from_adapter<R>(repo: R) -> Self
    where
        R: ProfileRepository
            + ModuleRepository
            + ProgressRepository
            + QuizRepository
            + QuizAttemptRepository
            + BadgeRepository
            + GameRepository
            + Clone
            + 'static,
    {
        Self {
            profiles: Arc::new(repo.clone()),
            modules: Arc::new(repo.clone()),
            progress: Arc::new(repo.clone()),
            quizzes: Arc::new(repo.clone()),
            attempts: Arc::new(repo.clone()),
            badges: Arc::new(repo.clone()),
            games: Arc::new(repo),
        }
    }
}
