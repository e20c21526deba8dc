//! Study engine for PPL(A) theory exam preparation.
//!
//! Box-based spaced repetition per question, session composition for the
//! different practice strategies, and a timed mock exam that follows the
//! official per-subject quotas.

pub mod catalog;
pub mod config;
pub mod due_set;
pub mod error;
pub mod exam;
pub mod logging;
pub mod memory;
pub mod practice;
pub mod scheduler;
pub mod session;
pub mod storage;
pub mod syllabus;

pub use catalog::{CatalogQuestion, InMemoryCatalog, QuestionCatalog, QuestionId};
pub use config::{Config, TrainerConfig};
pub use due_set::DueSet;
pub use error::{TrainerError, TrainerResult};
pub use exam::{ExamError, ExamHistorySummary, ExamResult, MockExam};
pub use memory::{Maturity, MemoryState, MemoryStateStore};
pub use practice::{PracticeSession, SessionSummary, SuggestedAction};
pub use session::{ComposedSession, SessionComposer, SessionKind, SessionRequest, SessionScope};
pub use storage::{InMemoryStore, Persistence, SqliteStore, StorageError};
pub use syllabus::{Leg, Subject};
