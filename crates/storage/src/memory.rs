use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quest_core::model::{
    AttemptId, Badge, BadgeId, EarnedBadge, Game, GameId, GameScore, LearningModule, ModuleId,
    ModuleProgress, Profile, Quiz, QuizAttempt, QuizId, UserBadge, UserId, UserProgress,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::repository::{
    BadgeRepository, GameRepository, ModuleRepository, NewQuizAttempt, ProfileRepository,
    ProfileUpdate, ProgressRepository, QuizAttemptRepository, QuizRepository, Storage,
    StorageError,
};

#[derive(Default)]
struct Tables {
    profiles: HashMap<UserId, Profile>,
    modules: HashMap<ModuleId, LearningModule>,
    progress: HashMap<(UserId, ModuleId), UserProgress>,
    quizzes: HashMap<QuizId, Quiz>,
    attempts: Vec<QuizAttempt>,
    badges: HashMap<BadgeId, Badge>,
    user_badges: Vec<UserBadge>,
    games: HashMap<GameId, Game>,
    game_scores: Vec<GameScore>,
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// Every method holds one lock for its whole body, so each call is atomic.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StorageError> {
        self.tables
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    /// Number of attempts stored, across all users.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn attempt_count(&self) -> Result<usize, StorageError> {
        Ok(self.lock()?.attempts.len())
    }

    /// Played-game records for a user, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn game_scores(&self, user_id: UserId) -> Result<Vec<GameScore>, StorageError> {
        Ok(self
            .lock()?
            .game_scores
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_adapter(InMemoryRepository::new())
    }
}

#[async_trait]
impl ProfileRepository for InMemoryRepository {
    async fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>, StorageError> {
        Ok(self.lock()?.profiles.get(&user_id).cloned())
    }

    async fn insert_profile(&self, profile: &Profile) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if guard.profiles.contains_key(&profile.user_id) {
            return Err(StorageError::Conflict);
        }
        guard.profiles.insert(profile.user_id, profile.clone());
        Ok(())
    }

    async fn update_profile(
        &self,
        user_id: UserId,
        update: &ProfileUpdate,
        updated_at: DateTime<Utc>,
    ) -> Result<Profile, StorageError> {
        let mut guard = self.lock()?;
        let profile = guard
            .profiles
            .get_mut(&user_id)
            .ok_or(StorageError::NotFound)?;
        if let Some(name) = &update.display_name {
            profile.display_name = Some(name.clone());
        }
        if let Some(character) = update.character_type {
            profile.character_type = character;
        }
        profile.updated_at = updated_at;
        Ok(profile.clone())
    }

    async fn set_total_points(
        &self,
        user_id: UserId,
        total_points: u64,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let profile = guard
            .profiles
            .get_mut(&user_id)
            .ok_or(StorageError::NotFound)?;
        profile.total_points = total_points;
        profile.updated_at = updated_at;
        Ok(())
    }

    async fn increment_total_points(
        &self,
        user_id: UserId,
        delta: u64,
        updated_at: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        let mut guard = self.lock()?;
        let profile = guard
            .profiles
            .get_mut(&user_id)
            .ok_or(StorageError::NotFound)?;
        profile.total_points = profile.total_points.saturating_add(delta);
        profile.updated_at = updated_at;
        Ok(profile.total_points)
    }
}

#[async_trait]
impl ModuleRepository for InMemoryRepository {
    async fn list_modules(&self, active_only: bool) -> Result<Vec<LearningModule>, StorageError> {
        let guard = self.lock()?;
        let mut modules: Vec<LearningModule> = guard
            .modules
            .values()
            .filter(|m| !active_only || m.is_active)
            .cloned()
            .collect();
        modules.sort_by_key(|m| (m.order_index, m.id));
        Ok(modules)
    }

    async fn get_module(&self, id: ModuleId) -> Result<Option<LearningModule>, StorageError> {
        Ok(self.lock()?.modules.get(&id).cloned())
    }

    async fn upsert_module(&self, module: &LearningModule) -> Result<(), StorageError> {
        self.lock()?.modules.insert(module.id, module.clone());
        Ok(())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn list_progress(&self, user_id: UserId) -> Result<Vec<UserProgress>, StorageError> {
        let guard = self.lock()?;
        let mut rows: Vec<UserProgress> = guard
            .progress
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by_key(|p| p.module_id);
        Ok(rows)
    }

    async fn list_progress_with_modules(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ModuleProgress>, StorageError> {
        let guard = self.lock()?;
        let mut rows: Vec<ModuleProgress> = guard
            .progress
            .values()
            .filter(|p| p.user_id == user_id)
            .filter_map(|p| {
                guard.modules.get(&p.module_id).map(|m| ModuleProgress {
                    progress: p.clone(),
                    module: m.clone(),
                })
            })
            .collect();
        rows.sort_by_key(|r| (r.module.order_index, r.module.id));
        Ok(rows)
    }

    async fn get_progress(
        &self,
        user_id: UserId,
        module_id: ModuleId,
    ) -> Result<Option<UserProgress>, StorageError> {
        Ok(self.lock()?.progress.get(&(user_id, module_id)).cloned())
    }

    async fn insert_progress_if_absent(&self, row: &UserProgress) -> Result<bool, StorageError> {
        let mut guard = self.lock()?;
        if !guard.modules.contains_key(&row.module_id) {
            return Err(StorageError::NotFound);
        }
        let key = (row.user_id, row.module_id);
        if guard.progress.contains_key(&key) {
            return Ok(false);
        }
        guard.progress.insert(key, row.clone());
        Ok(true)
    }

    async fn upsert_progress(&self, row: &UserProgress) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.modules.contains_key(&row.module_id) {
            return Err(StorageError::NotFound);
        }
        guard
            .progress
            .insert((row.user_id, row.module_id), row.clone());
        Ok(())
    }

    async fn mark_points_awarded(
        &self,
        user_id: UserId,
        module_id: ModuleId,
    ) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let row = guard
            .progress
            .get_mut(&(user_id, module_id))
            .ok_or(StorageError::NotFound)?;
        row.points_awarded = true;
        Ok(())
    }
}

#[async_trait]
impl QuizRepository for InMemoryRepository {
    async fn list_quizzes(&self, active_only: bool) -> Result<Vec<Quiz>, StorageError> {
        let guard = self.lock()?;
        let mut quizzes: Vec<Quiz> = guard
            .quizzes
            .values()
            .filter(|q| !active_only || q.is_active)
            .cloned()
            .collect();
        quizzes.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(quizzes)
    }

    async fn get_quiz(&self, id: QuizId) -> Result<Option<Quiz>, StorageError> {
        Ok(self.lock()?.quizzes.get(&id).cloned())
    }

    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError> {
        self.lock()?.quizzes.insert(quiz.id, quiz.clone());
        Ok(())
    }
}

#[async_trait]
impl QuizAttemptRepository for InMemoryRepository {
    async fn insert_attempt(&self, attempt: &NewQuizAttempt) -> Result<AttemptId, StorageError> {
        let mut guard = self.lock()?;
        if !guard.quizzes.contains_key(&attempt.quiz_id) {
            return Err(StorageError::NotFound);
        }
        let id = AttemptId::random();
        guard.attempts.push(attempt.clone().into_attempt(id));
        Ok(id)
    }

    async fn list_attempts(&self, user_id: UserId) -> Result<Vec<QuizAttempt>, StorageError> {
        let guard = self.lock()?;
        // Reverse insertion order so equal timestamps still list newest first.
        let mut attempts: Vec<QuizAttempt> = guard
            .attempts
            .iter()
            .rev()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        attempts.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        Ok(attempts)
    }
}

#[async_trait]
impl BadgeRepository for InMemoryRepository {
    async fn list_badges(&self) -> Result<Vec<Badge>, StorageError> {
        let guard = self.lock()?;
        let mut badges: Vec<Badge> = guard
            .badges
            .values()
            .filter(|b| b.is_active)
            .cloned()
            .collect();
        badges.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(badges)
    }

    async fn list_user_badges(&self, user_id: UserId) -> Result<Vec<EarnedBadge>, StorageError> {
        let guard = self.lock()?;
        let mut earned: Vec<EarnedBadge> = guard
            .user_badges
            .iter()
            .filter(|ub| ub.user_id == user_id)
            .filter_map(|ub| {
                guard.badges.get(&ub.badge_id).map(|badge| EarnedBadge {
                    badge: badge.clone(),
                    earned_at: ub.earned_at,
                })
            })
            .collect();
        earned.sort_by(|a, b| b.earned_at.cmp(&a.earned_at));
        Ok(earned)
    }

    async fn upsert_badge(&self, badge: &Badge) -> Result<(), StorageError> {
        self.lock()?.badges.insert(badge.id, badge.clone());
        Ok(())
    }

    async fn grant_badge(&self, grant: &UserBadge) -> Result<bool, StorageError> {
        let mut guard = self.lock()?;
        if !guard.badges.contains_key(&grant.badge_id) {
            return Err(StorageError::NotFound);
        }
        let exists = guard
            .user_badges
            .iter()
            .any(|ub| ub.user_id == grant.user_id && ub.badge_id == grant.badge_id);
        if exists {
            return Ok(false);
        }
        guard.user_badges.push(grant.clone());
        Ok(true)
    }
}

#[async_trait]
impl GameRepository for InMemoryRepository {
    async fn list_games(&self, active_only: bool) -> Result<Vec<Game>, StorageError> {
        let guard = self.lock()?;
        let mut games: Vec<Game> = guard
            .games
            .values()
            .filter(|g| !active_only || g.is_active)
            .cloned()
            .collect();
        games.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(games)
    }

    async fn upsert_game(&self, game: &Game) -> Result<(), StorageError> {
        self.lock()?.games.insert(game.id, game.clone());
        Ok(())
    }

    async fn insert_game_score(&self, score: &GameScore) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.games.contains_key(&score.game_id) {
            return Err(StorageError::NotFound);
        }
        guard.game_scores.push(score.clone());
        Ok(())
    }
}
