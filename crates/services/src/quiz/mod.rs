pub mod service;
pub mod session;

pub use service::{QuestionReview, QuizOutcome, QuizService};
pub use session::{Advance, QuizPhase, QuizSession};
