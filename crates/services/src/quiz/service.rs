use std::sync::Arc;

use quest_core::model::{AttemptId, Quiz, QuizAttempt, QuizId};
use quest_core::scoring::{self, ScoreTier};
use storage::repository::{NewQuizAttempt, QuizAttemptRepository, QuizRepository};

use crate::Clock;
use crate::error::QuizError;
use crate::identity::SessionContext;
use crate::points::PointsAwarder;
use crate::quiz::QuizSession;

/// Per-question feedback shown on the results screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionReview {
    pub question: String,
    pub chosen: usize,
    pub correct: usize,
    pub is_correct: bool,
}

/// Everything the results screen needs after a submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizOutcome {
    pub quiz_id: QuizId,
    pub attempt_id: AttemptId,
    pub score: u8,
    pub correct: usize,
    pub total_questions: usize,
    pub points_earned: u64,
    /// Profile total after the award; `None` when nothing was awarded.
    pub new_total: Option<u64>,
    pub tier: ScoreTier,
    pub review: Vec<QuestionReview>,
}

/// Loads quizzes and persists finished quiz sessions.
#[derive(Clone)]
pub struct QuizService {
    clock: Clock,
    quizzes: Arc<dyn QuizRepository>,
    attempts: Arc<dyn QuizAttemptRepository>,
    points: PointsAwarder,
}

impl QuizService {
    #[must_use]
    pub fn new(
        clock: Clock,
        quizzes: Arc<dyn QuizRepository>,
        attempts: Arc<dyn QuizAttemptRepository>,
        points: PointsAwarder,
    ) -> Self {
        Self {
            clock,
            quizzes,
            attempts,
            points,
        }
    }

    /// Active quizzes ordered by title.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Remote` if the store call fails.
    pub async fn list_quizzes(&self) -> Result<Vec<Quiz>, QuizError> {
        Ok(self.quizzes.list_quizzes(true).await?)
    }

    /// Fetch a quiz and start `session` on it.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::UnknownQuiz` for a missing quiz and
    /// `QuizError::InvalidState` if the session cannot start.
    pub async fn begin(&self, session: &mut QuizSession, quiz_id: QuizId) -> Result<(), QuizError> {
        let quiz = self
            .quizzes
            .get_quiz(quiz_id)
            .await?
            .ok_or(QuizError::UnknownQuiz(quiz_id))?;
        session.start(quiz)
    }

    /// The signed-in user's attempts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Unauthenticated` without a session and
    /// `QuizError::Remote` if the store call fails.
    pub async fn list_attempts(&self, ctx: &SessionContext) -> Result<Vec<QuizAttempt>, QuizError> {
        let user_id = ctx.user_id().ok_or(QuizError::Unauthenticated)?;
        Ok(self.attempts.list_attempts(user_id).await?)
    }

    /// Score a session waiting in `Scoring`, save the attempt and award points.
    ///
    /// On success the session moves to `Results`. If the attempt was saved but
    /// the award failed, the session stays in `Scoring` and a later submit
    /// reuses the saved attempt instead of inserting another.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidState` outside `Scoring`,
    /// `QuizError::Unauthenticated` without a session and `QuizError::Remote`
    /// when the attempt insert or the points award fails.
    pub async fn submit(
        &self,
        ctx: &SessionContext,
        session: &mut QuizSession,
    ) -> Result<QuizOutcome, QuizError> {
        session.ensure_scoring()?;
        let user_id = ctx.user_id().ok_or(QuizError::Unauthenticated)?;
        let quiz = session.quiz().cloned().ok_or(QuizError::InvalidState {
            action: "submit",
            reason: "no quiz is loaded",
        })?;

        let questions = session.questions();
        let answers = session.answers();
        let score = scoring::score(questions, answers)?;
        let correct = scoring::correct_count(questions, answers);
        let review = questions
            .iter()
            .zip(answers)
            .map(|(question, chosen)| QuestionReview {
                question: question.question.clone(),
                chosen: *chosen,
                correct: question.correct,
                is_correct: question.is_correct(*chosen),
            })
            .collect::<Vec<_>>();
        let total_questions = questions.len();

        let attempt_id = match session.saved_attempt() {
            Some(id) => id,
            None => {
                let attempt = NewQuizAttempt {
                    user_id,
                    quiz_id: quiz.id,
                    score,
                    answers: answers.to_vec(),
                    completed_at: self.clock.now(),
                };
                let id = self.attempts.insert_attempt(&attempt).await.map_err(|err| {
                    tracing::error!(quiz = %quiz.id, error = %err, "failed to save quiz attempt");
                    err
                })?;
                tracing::info!(quiz = %quiz.id, attempt = %id, score, "quiz attempt saved");
                session.record_attempt(id);
                id
            }
        };

        let points_earned = scoring::points_for_score(score, quiz.points_reward);
        let new_total = self
            .points
            .award(user_id, points_earned)
            .await
            .map_err(|err| {
                tracing::error!(quiz = %quiz.id, error = %err, "failed to award quiz points");
                err
            })?;

        let outcome = QuizOutcome {
            quiz_id: quiz.id,
            attempt_id,
            score,
            correct,
            total_questions,
            points_earned,
            new_total,
            tier: ScoreTier::for_score(score),
            review,
        };
        session.finish(outcome.clone());
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{AuthSession, AuthUser};
    use quest_core::model::{Profile, UserId, builtin_questions};
    use quest_core::time::fixed_now;
    use storage::repository::{InMemoryRepository, ProfileRepository, Storage};

    fn ctx_for(user: UserId) -> SessionContext {
        SessionContext::fixed(Some(AuthSession {
            access_token: "t".into(),
            refresh_token: None,
            expires_at: None,
            user: AuthUser {
                id: user,
                email: "asha@example.com".into(),
                username: None,
            },
        }))
    }

    fn service(repo: &InMemoryRepository) -> QuizService {
        let storage = Storage::from_adapter(repo.clone());
        let clock = Clock::fixed(fixed_now());
        QuizService::new(
            clock,
            storage.quizzes,
            storage.attempts,
            PointsAwarder::new(clock, storage.profiles),
        )
    }

    async fn play(session: &mut QuizSession, answers: &[usize]) {
        for answer in answers {
            session.select_answer(*answer).unwrap();
            session.advance().unwrap();
        }
    }

    #[tokio::test]
    async fn submit_requires_scoring_phase() {
        let repo = InMemoryRepository::new();
        let svc = service(&repo);
        let mut session = QuizSession::new();
        let err = svc
            .submit(&ctx_for(UserId::random()), &mut session)
            .await
            .unwrap_err();
        assert!(matches!(err, QuizError::InvalidState { action: "submit", .. }));
    }

    #[tokio::test]
    async fn partial_score_rounds_points() {
        let repo = InMemoryRepository::new();
        let user = UserId::random();
        repo.insert_profile(&Profile::new(user, None, fixed_now()))
            .await
            .unwrap();
        let quiz = Quiz::new(QuizId::random(), "Basics", builtin_questions()).with_points_reward(10);
        repo.upsert_quiz(&quiz).await.unwrap();

        let svc = service(&repo);
        let mut session = QuizSession::new();
        svc.begin(&mut session, quiz.id).await.unwrap();
        // four of five correct
        play(&mut session, &[0, 2, 1, 1, 0]).await;

        let outcome = svc.submit(&ctx_for(user), &mut session).await.unwrap();
        assert_eq!(outcome.score, 80);
        assert_eq!(outcome.points_earned, 8);
        assert_eq!(outcome.new_total, Some(8));
        assert_eq!(outcome.tier, ScoreTier::Excellent);
        assert!(!outcome.review[4].is_correct);
        assert_eq!(session.outcome(), Some(&outcome));
    }

    #[tokio::test]
    async fn failed_award_keeps_session_and_does_not_duplicate_attempt() {
        let repo = InMemoryRepository::new();
        let user = UserId::random();
        let quiz = Quiz::new(QuizId::random(), "Basics", builtin_questions());
        repo.upsert_quiz(&quiz).await.unwrap();

        let svc = service(&repo);
        let ctx = ctx_for(user);
        let mut session = QuizSession::new();
        session.start(quiz).unwrap();
        play(&mut session, &[0, 2, 1, 1, 2]).await;

        // no profile yet, so the award fails after the attempt is saved
        let err = svc.submit(&ctx, &mut session).await.unwrap_err();
        assert!(matches!(err, QuizError::Remote(_)));
        assert_eq!(session.phase(), crate::quiz::QuizPhase::Scoring);
        assert_eq!(repo.attempt_count().unwrap(), 1);

        repo.insert_profile(&Profile::new(user, None, fixed_now()))
            .await
            .unwrap();
        let outcome = svc.submit(&ctx, &mut session).await.unwrap();
        assert_eq!(outcome.new_total, Some(5));
        assert_eq!(repo.attempt_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn unknown_quiz_is_reported() {
        let repo = InMemoryRepository::new();
        let svc = service(&repo);
        let id = QuizId::random();
        let err = svc.begin(&mut QuizSession::new(), id).await.unwrap_err();
        assert!(matches!(err, QuizError::UnknownQuiz(missing) if missing == id));
    }
}
