#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use pexo_trainer::catalog::{CatalogQuestion, InMemoryCatalog, QuestionId};
use pexo_trainer::exam::{ExamAttemptState, ExamResult};
use pexo_trainer::storage::{InMemoryStore, Persistence, StorageError, StorageResult};
use pexo_trainer::{MemoryState, Subject};

/// `per_subject` questions in every subject, ids `subject_index * 1000 + n`.
pub fn catalog(per_subject: usize) -> InMemoryCatalog {
    InMemoryCatalog::new(questions(per_subject))
}

pub fn questions(per_subject: usize) -> Vec<CatalogQuestion> {
    let mut questions = Vec::new();
    for (index, subject) in Subject::ALL.into_iter().enumerate() {
        let categories = subject.category_ids();
        for n in 0..per_subject {
            let id = (index * 1000 + n + 1) as QuestionId;
            questions.push(CatalogQuestion {
                id,
                category_id: categories[n % categories.len()],
                text: format!("{} question {n}", subject.name()),
                correct_answer: format!("correct {id}"),
                incorrect_answers: [
                    format!("distractor {id}a"),
                    format!("distractor {id}b"),
                    format!("distractor {id}c"),
                ],
                mock_eligible: true,
            });
        }
    }
    questions
}

/// In-memory persistence whose writes can be made to fail on demand.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: InMemoryStore,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StorageError::Unavailable("disk full".to_string()))
        } else {
            Ok(())
        }
    }
}

impl Persistence for FlakyStore {
    fn load_memory_state(&self, question_id: QuestionId) -> StorageResult<Option<MemoryState>> {
        self.inner.load_memory_state(question_id)
    }

    fn load_memory_states(
        &self,
        question_ids: &[QuestionId],
    ) -> StorageResult<HashMap<QuestionId, MemoryState>> {
        self.inner.load_memory_states(question_ids)
    }

    fn save_memory_state(&self, question_id: QuestionId, state: &MemoryState) -> StorageResult<()> {
        self.check()?;
        self.inner.save_memory_state(question_id, state)
    }

    fn save_exam_result(&self, result: &ExamResult) -> StorageResult<()> {
        self.check()?;
        self.inner.save_exam_result(result)
    }

    fn load_exam_history(&self) -> StorageResult<Vec<ExamResult>> {
        self.inner.load_exam_history()
    }

    fn save_attempt(&self, attempt: &ExamAttemptState) -> StorageResult<()> {
        self.check()?;
        self.inner.save_attempt(attempt)
    }

    fn load_saved_attempt(&self) -> StorageResult<Option<ExamAttemptState>> {
        self.inner.load_saved_attempt()
    }

    fn clear_saved_attempt(&self) -> StorageResult<()> {
        self.check()?;
        self.inner.clear_saved_attempt()
    }
}
