use quest_core::model::{AttemptId, Question, Quiz, builtin_questions};

use crate::error::QuizError;
use crate::quiz::QuizOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuizPhase {
    #[default]
    Browsing,
    InProgress,
    Scoring,
    Results,
}

impl QuizPhase {
    fn describe(self) -> &'static str {
        match self {
            QuizPhase::Browsing => "no quiz is running",
            QuizPhase::InProgress => "the quiz is still in progress",
            QuizPhase::Scoring => "the quiz is waiting to be scored",
            QuizPhase::Results => "the quiz has already been scored",
        }
    }
}

/// What `advance` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Moved to the question at this index.
    Next(usize),
    /// The last answer was recorded; the session waits for scoring.
    ReadyToScore,
}

/// In-memory state for one run through a quiz.
///
/// Abandoning a session mid-quiz discards it; nothing is persisted until
/// the session is submitted from `Scoring`.
#[derive(Debug, Clone, Default)]
pub struct QuizSession {
    phase: QuizPhase,
    quiz: Option<Quiz>,
    questions: Vec<Question>,
    index: usize,
    pending: Option<usize>,
    answers: Vec<usize>,
    saved_attempt: Option<AttemptId>,
    outcome: Option<QuizOutcome>,
}

impl QuizSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin `quiz` from the first question.
    ///
    /// Quizzes without questions of their own use the built-in set.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidState` unless browsing or showing results.
    pub fn start(&mut self, quiz: Quiz) -> Result<(), QuizError> {
        if !matches!(self.phase, QuizPhase::Browsing | QuizPhase::Results) {
            return Err(self.invalid("start a quiz"));
        }
        let questions = if quiz.questions.is_empty() {
            builtin_questions()
        } else {
            quiz.questions.clone()
        };
        *self = Self {
            phase: QuizPhase::InProgress,
            quiz: Some(quiz),
            questions,
            ..Self::default()
        };
        Ok(())
    }

    /// Choose an option for the current question. Later calls replace earlier ones.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidState` outside `InProgress` and
    /// `QuizError::OptionOutOfRange` for an index past the last option.
    pub fn select_answer(&mut self, option: usize) -> Result<(), QuizError> {
        let question = self
            .current_question()
            .ok_or_else(|| self.invalid("select an answer"))?;
        let options = question.options.len();
        if option >= options {
            return Err(QuizError::OptionOutOfRange {
                index: option,
                options,
            });
        }
        self.pending = Some(option);
        Ok(())
    }

    /// Commit the pending selection and move on.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidState` outside `InProgress` or when no
    /// answer has been selected.
    pub fn advance(&mut self) -> Result<Advance, QuizError> {
        if self.phase != QuizPhase::InProgress {
            return Err(self.invalid("advance"));
        }
        let choice = self.pending.take().ok_or(QuizError::InvalidState {
            action: "advance",
            reason: "no answer is selected",
        })?;
        self.answers.push(choice);

        if self.index + 1 < self.questions.len() {
            self.index += 1;
            Ok(Advance::Next(self.index))
        } else {
            self.phase = QuizPhase::Scoring;
            Ok(Advance::ReadyToScore)
        }
    }

    /// Drop all state and return to browsing.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[must_use]
    pub fn phase(&self) -> QuizPhase {
        self.phase
    }

    #[must_use]
    pub fn quiz(&self) -> Option<&Quiz> {
        self.quiz.as_ref()
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.index
    }

    /// The question awaiting an answer, while in progress.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        if self.phase == QuizPhase::InProgress {
            self.questions.get(self.index)
        } else {
            None
        }
    }

    /// One-based position and question count, e.g. `(2, 5)`.
    #[must_use]
    pub fn position(&self) -> Option<(usize, usize)> {
        self.current_question()
            .map(|_| (self.index + 1, self.questions.len()))
    }

    #[must_use]
    pub fn pending_selection(&self) -> Option<usize> {
        self.pending
    }

    #[must_use]
    pub fn answers(&self) -> &[usize] {
        &self.answers
    }

    #[must_use]
    pub fn outcome(&self) -> Option<&QuizOutcome> {
        self.outcome.as_ref()
    }

    pub(crate) fn saved_attempt(&self) -> Option<AttemptId> {
        self.saved_attempt
    }

    pub(crate) fn record_attempt(&mut self, id: AttemptId) {
        self.saved_attempt = Some(id);
    }

    pub(crate) fn finish(&mut self, outcome: QuizOutcome) {
        self.phase = QuizPhase::Results;
        self.outcome = Some(outcome);
    }

    pub(crate) fn ensure_scoring(&self) -> Result<(), QuizError> {
        if self.phase == QuizPhase::Scoring {
            Ok(())
        } else {
            Err(self.invalid("submit"))
        }
    }

    fn invalid(&self, action: &'static str) -> QuizError {
        QuizError::InvalidState {
            action,
            reason: self.phase.describe(),
        }
    }
}
