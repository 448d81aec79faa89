//! User-visible notices for the outcome of each dashboard action.
//!
//! Validation failures show their own message. Remote failures are logged
//! where they happen and shown here only as a generic "Failed to ..." line.

use quest_core::model::LearningModule;

use crate::error::{IdentityError, ProfileError, ProgressError, QuizError};
use crate::identity::SignUpOutcome;
use crate::progress::ModuleCompletion;
use crate::quiz::QuizOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub description: String,
}

const ERROR_TITLE: &str = "Error";

impl Notice {
    #[must_use]
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            title: title.into(),
            description: description.into(),
        }
    }

    #[must_use]
    pub fn failure(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Failure,
            title: title.into(),
            description: description.into(),
        }
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.kind == NoticeKind::Failure
    }

    #[must_use]
    pub fn module_started(module: &LearningModule) -> Self {
        Self::success(
            "Module Started",
            format!("You've started learning: {}", module.title),
        )
    }

    #[must_use]
    pub fn module_completed(completion: &ModuleCompletion) -> Self {
        if completion.already_completed {
            return Self::success(
                "Module Completed!",
                format!("You already finished {}.", completion.module.title),
            );
        }
        Self::success(
            "Module Completed!",
            format!("You earned {} points!", completion.points_awarded),
        )
    }

    #[must_use]
    pub fn quiz_completed(outcome: &QuizOutcome) -> Self {
        Self::success(
            "Quiz Completed!",
            format!(
                "You scored {}% and earned {} points!",
                outcome.score, outcome.points_earned
            ),
        )
    }

    #[must_use]
    pub fn profile_updated() -> Self {
        Self::success("Profile Updated", "Your profile has been updated successfully!")
    }

    #[must_use]
    pub fn signed_in() -> Self {
        Self::success("Welcome back!", "Successfully logged in")
    }

    #[must_use]
    pub fn signed_up(outcome: &SignUpOutcome) -> Self {
        match outcome {
            SignUpOutcome::ConfirmationRequired(_) => Self::success(
                "Account created!",
                "Please check your email to confirm your account",
            ),
            SignUpOutcome::SignedIn(_) => {
                Self::success("Account created!", "Welcome to Constitution Quest!")
            }
        }
    }

    #[must_use]
    pub fn signed_out() -> Self {
        Self::success(
            "Signed out successfully",
            "Come back soon to continue your constitutional journey!",
        )
    }

    #[must_use]
    pub fn auth_failed(err: &IdentityError) -> Self {
        let description = match err {
            IdentityError::Validation(validation) => validation.to_string(),
            IdentityError::InvalidCredentials => "Invalid login credentials".to_owned(),
            IdentityError::AlreadyRegistered(_) => err.to_string(),
            IdentityError::HttpStatus { message, .. } if !message.trim().is_empty() => {
                message.clone()
            }
            _ => "Something went wrong".to_owned(),
        };
        Self::failure("Authentication Error", description)
    }

    #[must_use]
    pub fn start_module_failed(_err: &ProgressError) -> Self {
        Self::failure(ERROR_TITLE, "Failed to start module")
    }

    #[must_use]
    pub fn complete_module_failed(_err: &ProgressError) -> Self {
        Self::failure(ERROR_TITLE, "Failed to complete module")
    }

    #[must_use]
    pub fn quiz_failed(_err: &QuizError) -> Self {
        Self::failure(ERROR_TITLE, "Failed to save quiz results")
    }

    #[must_use]
    pub fn profile_failed(err: &ProfileError) -> Self {
        match err {
            ProfileError::Validation(validation) => Self::failure(ERROR_TITLE, validation.to_string()),
            _ => Self::failure(ERROR_TITLE, "Failed to update profile"),
        }
    }
}
