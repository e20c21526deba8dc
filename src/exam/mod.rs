//! Timed mock exams: attempt state, the exam state machine, scoring and
//! history summaries.

pub mod attempt;
pub mod history;
pub mod machine;
pub mod scoring;

pub use attempt::ExamAttemptState;
pub use history::{ExamHistorySummary, LegLatest, Trend};
pub use machine::{ExamPhase, MockExam, TickOutcome};
pub use scoring::{score_exam, ExamResult, SubjectScore};

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::ComposeError;
use crate::storage::StorageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExamPhaseKind {
    NotStarted,
    InProgress,
    Submitted,
    Abandoned,
}

impl ExamPhaseKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            ExamPhaseKind::NotStarted => "not started",
            ExamPhaseKind::InProgress => "in progress",
            ExamPhaseKind::Submitted => "submitted",
            ExamPhaseKind::Abandoned => "abandoned",
        }
    }
}

impl fmt::Display for ExamPhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an attempt ended up submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SubmitReason {
    Manual,
    ExamTimeExpired,
    QuestionTimeExpired,
}

#[derive(Debug, Error)]
pub enum ExamError {
    #[error("no exam attempt in progress")]
    NoActiveAttempt,

    #[error("cannot {action} while exam is {from}")]
    InvalidTransition {
        from: ExamPhaseKind,
        action: &'static str,
    },

    #[error("an exam attempt is already in progress")]
    AttemptInProgress,

    #[error("choice {choice} out of range ({available} choices)")]
    InvalidChoice { choice: usize, available: usize },

    #[error("could not compose exam: {0}")]
    Compose(#[from] ComposeError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ExamError {
    /// Errors after which the exam context is unchanged and the caller can
    /// simply carry on or retry.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ExamError::NoActiveAttempt | ExamError::InvalidChoice { .. } | ExamError::Storage(_)
        )
    }
}
