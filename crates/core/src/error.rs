use thiserror::Error;

use crate::model::{ParseIdError, ProgressRecordError, QuestionError};
use crate::scoring::ScoreError;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Progress(#[from] ProgressRecordError),
    #[error(transparent)]
    Score(#[from] ScoreError),
    #[error(transparent)]
    Id(#[from] ParseIdError),
}
