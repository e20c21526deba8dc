//! Partitioning of question ids into due, not-yet-due and unseen.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::QuestionId;
use crate::config::SchedulerParams;
use crate::memory::{MaturityCounts, MemoryState};
use crate::scheduler;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DueSet {
    /// Most overdue first; ties go to the lower box, then the lower id.
    pub due: Vec<QuestionId>,
    /// Soonest review first.
    pub not_due: Vec<QuestionId>,
    /// Input order.
    pub unseen: Vec<QuestionId>,
}

impl DueSet {
    pub fn len(&self) -> usize {
        self.due.len() + self.not_due.len() + self.unseen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn unseen_set(&self) -> HashSet<QuestionId> {
        self.unseen.iter().copied().collect()
    }
}

/// Every distinct id lands in exactly one bucket.
pub fn partition<'a, I, F>(now: DateTime<Utc>, question_ids: I, lookup: F) -> DueSet
where
    I: IntoIterator<Item = QuestionId>,
    F: Fn(QuestionId) -> Option<&'a MemoryState>,
{
    let mut seen_ids = HashSet::new();
    let mut due = Vec::new();
    let mut not_due = Vec::new();
    let mut unseen = Vec::new();

    for id in question_ids {
        if !seen_ids.insert(id) {
            continue;
        }
        match lookup(id) {
            None => unseen.push(id),
            Some(state) if state.is_due(now) => {
                due.push((state.next_review_due, state.box_level, id))
            }
            Some(state) => not_due.push((state.next_review_due, state.box_level, id)),
        }
    }

    due.sort_unstable();
    not_due.sort_unstable();

    DueSet {
        due: due.into_iter().map(|(_, _, id)| id).collect(),
        not_due: not_due.into_iter().map(|(_, _, id)| id).collect(),
        unseen,
    }
}

pub fn maturity_counts<'a, I, F>(
    question_ids: I,
    lookup: F,
    params: &SchedulerParams,
) -> MaturityCounts
where
    I: IntoIterator<Item = QuestionId>,
    F: Fn(QuestionId) -> Option<&'a MemoryState>,
{
    let mut seen_ids = HashSet::new();
    let mut counts = MaturityCounts::default();
    for id in question_ids {
        if seen_ids.insert(id) {
            counts.add(scheduler::classify(lookup(id), params));
        }
    }
    counts
}
