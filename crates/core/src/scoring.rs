//! Bookkeeping arithmetic for quiz scores, point awards and module completion.
//!
//! All rounding is half-up on non-negative values and done in integers, so
//! `round(100 × 1/8)` is 13 and `round(0.5 × 5)` is 3.

use thiserror::Error;

use crate::model::Question;

/// Highest possible quiz score.
pub const MAX_SCORE: u8 = 100;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScoreError {
    #[error("cannot score a quiz without questions")]
    NoQuestions,

    #[error("score must be within 0..=100, got {0}")]
    OutOfRange(i64),
}

/// Half-up integer rounding of `numerator / denominator`.
fn div_round(numerator: u64, denominator: u64) -> u64 {
    (2 * numerator + denominator) / (2 * denominator)
}

/// Number of answers that pick the stored correct option.
///
/// Missing answers count as wrong; extra answers are ignored.
#[must_use]
pub fn correct_count(questions: &[Question], answers: &[usize]) -> usize {
    questions
        .iter()
        .zip(answers)
        .filter(|(question, answer)| question.is_correct(**answer))
        .count()
}

/// Percentage score: `round(100 × correct / questions)`.
///
/// # Errors
///
/// Returns `ScoreError::NoQuestions` for an empty question list.
pub fn score(questions: &[Question], answers: &[usize]) -> Result<u8, ScoreError> {
    if questions.is_empty() {
        return Err(ScoreError::NoQuestions);
    }
    let correct = correct_count(questions, answers) as u64;
    let pct = div_round(100 * correct, questions.len() as u64);
    // correct <= len, so pct <= 100
    Ok(u8::try_from(pct).unwrap_or(MAX_SCORE))
}

/// Validate a score read from storage.
///
/// # Errors
///
/// Returns `ScoreError::OutOfRange` for values outside 0..=100.
pub fn score_from_persisted(raw: i64) -> Result<u8, ScoreError> {
    u8::try_from(raw)
        .ok()
        .filter(|s| *s <= MAX_SCORE)
        .ok_or(ScoreError::OutOfRange(raw))
}

/// Points earned for a quiz: `round(score / 100 × reward)`.
#[must_use]
pub fn points_for_score(score: u8, reward: u32) -> u64 {
    let score = u64::from(score.min(MAX_SCORE));
    div_round(score * u64::from(reward), 100)
}

/// Feedback band shown with a quiz result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreTier {
    Excellent,
    Good,
    KeepPracticing,
}

impl ScoreTier {
    #[must_use]
    pub fn for_score(score: u8) -> Self {
        match score {
            80.. => Self::Excellent,
            60..=79 => Self::Good,
            _ => Self::KeepPracticing,
        }
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            ScoreTier::Excellent => "Excellent work! You're a constitutional expert!",
            ScoreTier::Good => "Good job! Keep studying to improve your score.",
            ScoreTier::KeepPracticing => "Keep practicing! Review the material and try again.",
        }
    }
}

/// Completed modules over total modules, for a progress indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Completion {
    pub completed: usize,
    pub total: usize,
}

impl Completion {
    #[must_use]
    pub fn new(completed: usize, total: usize) -> Self {
        Self { completed, total }
    }

    /// `completed / total`, or 0 when there are no modules.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }

    /// Ratio as a rounded whole percentage.
    #[must_use]
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let pct = div_round(100 * self.completed as u64, self.total as u64);
        u8::try_from(pct).unwrap_or(u8::MAX)
    }
}
