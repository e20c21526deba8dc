use std::collections::HashMap;

use parking_lot::Mutex;

use crate::catalog::QuestionId;
use crate::exam::{ExamAttemptState, ExamResult};
use crate::memory::MemoryState;
use crate::storage::{Persistence, StorageResult};

#[derive(Debug, Default)]
struct Inner {
    states: HashMap<QuestionId, MemoryState>,
    results: Vec<ExamResult>,
    attempt: Option<ExamAttemptState>,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_saved_attempt(&self) -> bool {
        self.inner.lock().attempt.is_some()
    }

    pub fn result_count(&self) -> usize {
        self.inner.lock().results.len()
    }
}

impl Persistence for InMemoryStore {
    fn load_memory_state(&self, question_id: QuestionId) -> StorageResult<Option<MemoryState>> {
        Ok(self.inner.lock().states.get(&question_id).cloned())
    }

    fn load_memory_states(
        &self,
        question_ids: &[QuestionId],
    ) -> StorageResult<HashMap<QuestionId, MemoryState>> {
        let inner = self.inner.lock();
        Ok(question_ids
            .iter()
            .filter_map(|id| inner.states.get(id).map(|s| (*id, s.clone())))
            .collect())
    }

    fn save_memory_state(&self, question_id: QuestionId, state: &MemoryState) -> StorageResult<()> {
        self.inner.lock().states.insert(question_id, state.clone());
        Ok(())
    }

    fn save_exam_result(&self, result: &ExamResult) -> StorageResult<()> {
        let mut inner = self.inner.lock();
        if !inner.results.iter().any(|r| r.id == result.id) {
            inner.results.push(result.clone());
        }
        Ok(())
    }

    fn load_exam_history(&self) -> StorageResult<Vec<ExamResult>> {
        let mut results = self.inner.lock().results.clone();
        results.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        Ok(results)
    }

    fn save_attempt(&self, attempt: &ExamAttemptState) -> StorageResult<()> {
        self.inner.lock().attempt = Some(attempt.clone());
        Ok(())
    }

    fn load_saved_attempt(&self) -> StorageResult<Option<ExamAttemptState>> {
        Ok(self.inner.lock().attempt.clone())
    }

    fn clear_saved_attempt(&self) -> StorageResult<()> {
        self.inner.lock().attempt = None;
        Ok(())
    }
}
