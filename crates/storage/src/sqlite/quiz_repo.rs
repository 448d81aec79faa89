use quest_core::model::{AttemptId, Quiz, QuizAttempt, QuizId, UserId};

use super::SqliteRepository;
use super::mapping::{bool_to_i64, db_err, map_attempt_row, map_quiz_row, ser};
use crate::repository::{NewQuizAttempt, QuizAttemptRepository, QuizRepository, StorageError};

#[async_trait::async_trait]
impl QuizRepository for SqliteRepository {
    async fn list_quizzes(&self, active_only: bool) -> Result<Vec<Quiz>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, title, description, module_id, questions, points_reward, is_active
                FROM quizzes
                WHERE (?1 = 0 OR is_active = 1)
                ORDER BY title ASC, id ASC
            ",
        )
        .bind(bool_to_i64(active_only))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_quiz_row).collect()
    }

    async fn get_quiz(&self, id: QuizId) -> Result<Option<Quiz>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, title, description, module_id, questions, points_reward, is_active
                FROM quizzes
                WHERE id = ?1
            ",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_quiz_row).transpose()
    }

    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError> {
        let questions = serde_json::to_string(&quiz.questions).map_err(ser)?;
        sqlx::query(
            r"
                INSERT INTO quizzes (
                    id, title, description, module_id, questions, points_reward, is_active
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    description = excluded.description,
                    module_id = excluded.module_id,
                    questions = excluded.questions,
                    points_reward = excluded.points_reward,
                    is_active = excluded.is_active
            ",
        )
        .bind(quiz.id.to_string())
        .bind(&quiz.title)
        .bind(quiz.description.as_deref())
        .bind(quiz.module_id.map(|id| id.to_string()))
        .bind(questions)
        .bind(i64::from(quiz.points_reward))
        .bind(bool_to_i64(quiz.is_active))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl QuizAttemptRepository for SqliteRepository {
    async fn insert_attempt(&self, attempt: &NewQuizAttempt) -> Result<AttemptId, StorageError> {
        let id = AttemptId::random();
        let answers = serde_json::to_string(&attempt.answers).map_err(ser)?;
        sqlx::query(
            r"
                INSERT INTO quiz_attempts (id, user_id, quiz_id, score, answers, completed_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(id.to_string())
        .bind(attempt.user_id.to_string())
        .bind(attempt.quiz_id.to_string())
        .bind(i64::from(attempt.score))
        .bind(answers)
        .bind(attempt.completed_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(id)
    }

    async fn list_attempts(&self, user_id: UserId) -> Result<Vec<QuizAttempt>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, user_id, quiz_id, score, answers, completed_at
                FROM quiz_attempts
                WHERE user_id = ?1
                ORDER BY completed_at DESC, rowid DESC
            ",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_attempt_row).collect()
    }
}
