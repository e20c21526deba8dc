use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::catalog::QuestionId;
use crate::config::SchedulerParams;
use crate::due_set::{self, DueSet};
use crate::memory::{Maturity, MaturityCounts, MemoryState};
use crate::scheduler;
use crate::storage::{Persistence, StorageResult};

/// In-memory snapshot of memory states, written through to [`Persistence`].
///
/// Every mutation goes through [`MemoryStateStore::record_answer`], so the
/// snapshot handed to the due-set query is never older than the last grade.
#[derive(Debug, Clone)]
pub struct MemoryStateStore {
    states: HashMap<QuestionId, MemoryState>,
    params: SchedulerParams,
}

impl MemoryStateStore {
    pub fn new(params: SchedulerParams) -> Self {
        Self {
            states: HashMap::new(),
            params,
        }
    }

    pub fn load<P: Persistence + ?Sized>(
        persistence: &P,
        question_ids: &[QuestionId],
        params: SchedulerParams,
    ) -> StorageResult<Self> {
        let states = persistence.load_memory_states(question_ids)?;
        tracing::debug!(
            requested = question_ids.len(),
            loaded = states.len(),
            "memory states loaded"
        );
        Ok(Self { states, params })
    }

    pub fn params(&self) -> &SchedulerParams {
        &self.params
    }

    pub fn get(&self, question_id: QuestionId) -> Option<&MemoryState> {
        self.states.get(&question_id)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Grades an answer and persists the new record before updating the
    /// snapshot; on a storage error nothing changes and the call can be retried.
    pub fn record_answer<P: Persistence + ?Sized>(
        &mut self,
        persistence: &P,
        question_id: QuestionId,
        correct: bool,
        now: DateTime<Utc>,
    ) -> StorageResult<MemoryState> {
        let next = scheduler::advance(self.states.get(&question_id), correct, now, &self.params);
        persistence.save_memory_state(question_id, &next)?;

        tracing::debug!(
            question_id,
            correct,
            box_level = next.box_level,
            interval_days = next.interval_days,
            "memory state advanced"
        );

        self.states.insert(question_id, next.clone());
        Ok(next)
    }

    pub fn maturity(&self, question_id: QuestionId) -> Maturity {
        scheduler::classify(self.get(question_id), &self.params)
    }

    pub fn due_set<I>(&self, now: DateTime<Utc>, question_ids: I) -> DueSet
    where
        I: IntoIterator<Item = QuestionId>,
    {
        due_set::partition(now, question_ids, |id| self.states.get(&id))
    }

    pub fn maturity_counts<I>(&self, question_ids: I) -> MaturityCounts
    where
        I: IntoIterator<Item = QuestionId>,
    {
        due_set::maturity_counts(question_ids, |id| self.states.get(&id), &self.params)
    }

    /// Seen questions whose review date has passed.
    pub fn due_count(&self, now: DateTime<Utc>) -> usize {
        self.states.values().filter(|s| s.is_due(now)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStore;
    use chrono::Duration;

    #[test]
    fn record_answer_writes_through() {
        let persistence = InMemoryStore::new();
        let mut store = MemoryStateStore::new(SchedulerParams::default());
        let now = Utc::now();

        let state = store.record_answer(&persistence, 7, true, now).unwrap();
        assert_eq!(state.box_level, 2);
        assert_eq!(store.get(7), Some(&state));
        assert_eq!(persistence.load_memory_state(7).unwrap(), Some(state));

        let reloaded =
            MemoryStateStore::load(&persistence, &[7, 8], SchedulerParams::default()).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.maturity(8), Maturity::New);
        assert_eq!(reloaded.maturity(7), Maturity::Learning);
    }

    #[test]
    fn due_count_tracks_review_dates() {
        let persistence = InMemoryStore::new();
        let mut store = MemoryStateStore::new(SchedulerParams::default());
        let now = Utc::now();

        store.record_answer(&persistence, 1, false, now).unwrap();
        store.record_answer(&persistence, 2, true, now).unwrap();

        assert_eq!(store.due_count(now), 0);
        assert_eq!(store.due_count(now + Duration::days(1)), 1);
        assert_eq!(store.due_count(now + Duration::days(3)), 2);

        let due = store.due_set(now + Duration::days(1), [1, 2, 3]);
        assert_eq!(due.due, vec![1]);
        assert_eq!(due.not_due, vec![2]);
        assert_eq!(due.unseen, vec![3]);
    }
}
