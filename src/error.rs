use thiserror::Error;

use crate::catalog::CatalogError;
use crate::exam::ExamError;
use crate::practice::PracticeError;
use crate::session::ComposeError;
use crate::storage::StorageError;

/// Top-level error for the command-line driver.
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error(transparent)]
    Exam(#[from] ExamError),

    #[error(transparent)]
    Practice(#[from] PracticeError),

    #[error("output error: {0}")]
    Output(#[from] serde_json::Error),

    #[error("usage: {0}")]
    Usage(String),
}

pub type TrainerResult<T> = Result<T, TrainerError>;
