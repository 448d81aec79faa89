use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{AttemptId, ModuleId, QuizId, UserId};

/// Reward used for quizzes stored without one.
pub const DEFAULT_QUIZ_POINTS_REWARD: u32 = 5;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyPrompt,

    #[error("a question needs at least two options, got {0}")]
    TooFewOptions(usize),

    #[error("correct option {correct} is out of range for {options} options")]
    CorrectOutOfRange { correct: usize, options: usize },
}

//
// ─── QUESTION ─────────────────────────────────────────────────────────────────
//

/// Multiple choice question.
///
/// Field names follow the JSON stored in the `quizzes.questions` column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    pub options: Vec<String>,
    pub correct: usize,
}

impl Question {
    /// Build a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when the prompt is blank, fewer than two options
    /// are given, or `correct` does not index an option.
    pub fn new<S: Into<String>>(
        question: impl Into<String>,
        options: impl IntoIterator<Item = S>,
        correct: usize,
    ) -> Result<Self, QuestionError> {
        let question = Self {
            question: question.into(),
            options: options.into_iter().map(Into::into).collect(),
            correct,
        };
        question.validate()?;
        Ok(question)
    }

    /// Check the invariants of a question read from storage.
    ///
    /// # Errors
    ///
    /// See [`Question::new`].
    pub fn validate(&self) -> Result<(), QuestionError> {
        if self.question.trim().is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }
        if self.options.len() < 2 {
            return Err(QuestionError::TooFewOptions(self.options.len()));
        }
        if self.correct >= self.options.len() {
            return Err(QuestionError::CorrectOutOfRange {
                correct: self.correct,
                options: self.options.len(),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn is_correct(&self, answer: usize) -> bool {
        self.correct == answer
    }

    #[must_use]
    pub fn option(&self, index: usize) -> Option<&str> {
        self.options.get(index).map(String::as_str)
    }
}

//
// ─── QUIZ ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    pub id: QuizId,
    pub title: String,
    pub description: Option<String>,
    pub module_id: Option<ModuleId>,
    pub questions: Vec<Question>,
    pub points_reward: u32,
    pub is_active: bool,
}

impl Quiz {
    #[must_use]
    pub fn new(id: QuizId, title: impl Into<String>, questions: Vec<Question>) -> Self {
        Self {
            id,
            title: title.into(),
            description: None,
            module_id: None,
            questions,
            points_reward: DEFAULT_QUIZ_POINTS_REWARD,
            is_active: true,
        }
    }

    #[must_use]
    pub fn with_points_reward(mut self, points_reward: u32) -> Self {
        self.points_reward = points_reward;
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn for_module(mut self, module_id: ModuleId) -> Self {
        self.module_id = Some(module_id);
        self
    }

    #[must_use]
    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

//
// ─── ATTEMPT ──────────────────────────────────────────────────────────────────
//

/// One completed run through a quiz. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: AttemptId,
    pub user_id: UserId,
    pub quiz_id: QuizId,
    pub score: u8,
    pub answers: Vec<usize>,
    pub completed_at: DateTime<Utc>,
}

//
// ─── BUILT-IN QUESTIONS ───────────────────────────────────────────────────────
//

const BUILTIN: [(&str, [&str; 4], usize); 5] = [
    (
        "Which article of the Indian Constitution deals with the Right to Equality?",
        ["Article 14", "Article 19", "Article 21", "Article 25"],
        0,
    ),
    (
        "Who is known as the 'Father of the Indian Constitution'?",
        [
            "Mahatma Gandhi",
            "Jawaharlal Nehru",
            "Dr. B.R. Ambedkar",
            "Sardar Patel",
        ],
        2,
    ),
    (
        "How many fundamental rights are guaranteed by the Indian Constitution?",
        ["5", "6", "7", "8"],
        1,
    ),
    (
        "Which part of the Constitution deals with Fundamental Rights?",
        ["Part II", "Part III", "Part IV", "Part V"],
        1,
    ),
    (
        "When was the Indian Constitution adopted?",
        [
            "26th January 1950",
            "15th August 1947",
            "26th November 1949",
            "2nd October 1950",
        ],
        2,
    ),
];

/// Fixed question set used when a quiz carries no questions of its own.
#[must_use]
pub fn builtin_questions() -> Vec<Question> {
    BUILTIN
        .iter()
        .map(|(question, options, correct)| Question {
            question: (*question).to_owned(),
            options: options.iter().map(|o| (*o).to_owned()).collect(),
            correct: *correct,
        })
        .collect()
}
