//! Persistence collaborator.
//!
//! - [`SqliteStore`] keeps memory states, exam history and the saved attempt
//!   in a local SQLite file
//! - [`InMemoryStore`] keeps the same data in process memory

pub mod memory;
pub mod migrations;
pub mod sqlite;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

use std::collections::HashMap;

use thiserror::Error;

use crate::catalog::QuestionId;
use crate::exam::{ExamAttemptState, ExamResult};
use crate::memory::MemoryState;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("migration error: {0}")]
    Migration(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

pub trait Persistence {
    fn load_memory_state(&self, question_id: QuestionId) -> StorageResult<Option<MemoryState>>;

    /// Records for the ids that have one; unseen ids are simply absent.
    fn load_memory_states(
        &self,
        question_ids: &[QuestionId],
    ) -> StorageResult<HashMap<QuestionId, MemoryState>>;

    fn save_memory_state(&self, question_id: QuestionId, state: &MemoryState) -> StorageResult<()>;

    fn save_exam_result(&self, result: &ExamResult) -> StorageResult<()>;

    /// Most recently completed first.
    fn load_exam_history(&self) -> StorageResult<Vec<ExamResult>>;

    /// Replaces any previously saved attempt.
    fn save_attempt(&self, attempt: &ExamAttemptState) -> StorageResult<()>;

    fn load_saved_attempt(&self) -> StorageResult<Option<ExamAttemptState>>;

    fn clear_saved_attempt(&self) -> StorageResult<()>;
}
