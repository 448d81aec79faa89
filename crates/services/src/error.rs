//! Shared error types for the services crate.

use thiserror::Error;

use quest_core::model::{ModuleId, QuizId};
use quest_core::scoring::ScoreError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Form and field checks run before any remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("invalid email address: {0}")]
    InvalidEmail(String),
}

/// Errors emitted by identity adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IdentityError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("invalid login credentials")]
    InvalidCredentials,
    #[error("an account already exists for {0}")]
    AlreadyRegistered(String),
    #[error("not signed in")]
    NoSession,
    #[error("identity service returned status {status}: {message}")]
    HttpStatus {
        status: reqwest::StatusCode,
        message: String,
    },
    #[error("identity service returned an unexpected response: {0}")]
    UnexpectedResponse(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by the quiz session and `QuizService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizError {
    #[error("cannot {action}: {reason}")]
    InvalidState {
        action: &'static str,
        reason: &'static str,
    },
    #[error("option {index} is out of range for a question with {options} options")]
    OptionOutOfRange { index: usize, options: usize },
    #[error("not signed in")]
    Unauthenticated,
    #[error("quiz {0} not found")]
    UnknownQuiz(QuizId),
    #[error(transparent)]
    Score(#[from] ScoreError),
    #[error(transparent)]
    Remote(#[from] StorageError),
}

/// Errors emitted by `ProgressTracker`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("not signed in")]
    Unauthenticated,
    #[error("module {0} not found")]
    UnknownModule(ModuleId),
    #[error(transparent)]
    Remote(#[from] StorageError),
}

/// Errors emitted by `ProfileService`, `BadgeService` and `GameCenter`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProfileError {
    #[error("not signed in")]
    Unauthenticated,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Remote(#[from] StorageError),
}

/// Errors emitted by `DashboardShell`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DashboardError {
    #[error("not signed in")]
    Unauthenticated,
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Remote(#[from] StorageError),
}

/// Errors emitted while reading `QUEST_` configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid QUEST_POINTS_STRATEGY value: {0}")]
    InvalidPointsStrategy(String),
    #[error("QUEST_AUTH_URL and QUEST_AUTH_ANON_KEY must be set together")]
    PartialAuth,
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
}
