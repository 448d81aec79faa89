mod badge;
mod game;
mod ids;
mod module;
mod profile;
mod progress;
mod quiz;

pub use ids::{AttemptId, BadgeId, GameId, ModuleId, ParseIdError, QuizId, UserId};

pub use badge::{Badge, EarnedBadge, UserBadge};
pub use game::{Game, GameScore};
pub use module::LearningModule;
pub use profile::{CharacterType, DEFAULT_LEVEL, Profile};
pub use progress::{
    COMPLETED_PERCENTAGE, ModuleProgress, ProgressRecordError, STARTED_PERCENTAGE, UserProgress,
};
pub use quiz::{
    DEFAULT_QUIZ_POINTS_REWARD, Question, QuestionError, Quiz, QuizAttempt, builtin_questions,
};
