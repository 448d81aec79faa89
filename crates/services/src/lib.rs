#![forbid(unsafe_code)]

pub mod app_services;
pub mod badges;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod games;
pub mod identity;
pub mod notice;
pub mod points;
pub mod profile;
pub mod progress;
pub mod quiz;

pub use quest_core::Clock;

pub use app_services::AppServices;
pub use badges::BadgeService;
pub use config::QuestConfig;
pub use dashboard::{DashboardShell, DashboardView, Overview, Tab};
pub use error::{
    AppServicesError, ConfigError, DashboardError, IdentityError, ProfileError, ProgressError,
    QuizError, ValidationError,
};
pub use games::GameCenter;
pub use identity::{
    AuthEvent, AuthSession, AuthUser, IdentityProvider, SessionContext, SignInForm, SignUpForm,
    SignUpOutcome,
};
pub use notice::{Notice, NoticeKind};
pub use points::{AwardStrategy, PointsAwarder};
pub use profile::ProfileService;
pub use progress::{ModuleCompletion, ModuleStart, ProgressTracker};
pub use quiz::{Advance, QuizOutcome, QuizPhase, QuizService, QuizSession};
