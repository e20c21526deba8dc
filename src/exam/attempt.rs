use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ExamParams;
use crate::exam::{ExamError, SubmitReason};
use crate::session::{ComposedSession, PresentedQuestion, QuotaShortfall};
use crate::syllabus::Leg;

/// Everything needed to show and resume an exam in progress.
///
/// Timers are `None` in practice mode. The per-question timer restarts at
/// the full budget whenever the position changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamAttemptState {
    pub id: Uuid,
    pub leg: Leg,
    pub practice_mode: bool,
    pub questions: Vec<PresentedQuestion>,
    pub answers: Vec<Option<usize>>,
    /// Time spent on each position.
    pub elapsed_ms: Vec<u64>,
    pub current_index: usize,
    pub highest_visited: usize,
    pub flagged: BTreeSet<usize>,
    pub exam_remaining_ms: Option<u64>,
    pub question_remaining_ms: Option<u64>,
    pub per_question_budget_ms: Option<u64>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub shortfalls: Vec<QuotaShortfall>,
}

/// What a tick did to the timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimerEvent {
    Running,
    Advanced { to: usize },
    Expired(SubmitReason),
}

impl ExamAttemptState {
    pub fn new(
        leg: Leg,
        practice_mode: bool,
        session: ComposedSession,
        params: &ExamParams,
        started_at: DateTime<Utc>,
    ) -> Self {
        let count = session.questions.len();
        let (exam_remaining_ms, per_question_budget_ms) = if practice_mode {
            (None, None)
        } else {
            (
                Some(duration_ms(leg.time_limit())),
                Some(params.per_question_seconds.saturating_mul(1000)),
            )
        };

        Self {
            id: Uuid::new_v4(),
            leg,
            practice_mode,
            questions: session.questions,
            answers: vec![None; count],
            elapsed_ms: vec![0; count],
            current_index: 0,
            highest_visited: 0,
            flagged: BTreeSet::new(),
            exam_remaining_ms,
            question_remaining_ms: per_question_budget_ms,
            per_question_budget_ms,
            started_at,
            shortfalls: session.shortfalls,
        }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn current_question(&self) -> Option<&PresentedQuestion> {
        self.questions.get(self.current_index)
    }

    pub fn current_answer(&self) -> Option<usize> {
        self.answers.get(self.current_index).copied().flatten()
    }

    pub fn is_last(&self) -> bool {
        self.current_index + 1 >= self.questions.len()
    }

    pub fn answered_count(&self) -> usize {
        self.answers.iter().filter(|a| a.is_some()).count()
    }

    pub fn is_flagged(&self, index: usize) -> bool {
        self.flagged.contains(&index)
    }

    pub fn exam_remaining(&self) -> Option<Duration> {
        self.exam_remaining_ms.map(Duration::from_millis)
    }

    pub fn question_remaining(&self) -> Option<Duration> {
        self.question_remaining_ms.map(Duration::from_millis)
    }

    pub fn select_answer(&mut self, choice: usize) -> Result<(), ExamError> {
        let available = self
            .current_question()
            .map(|q| q.choices.len())
            .unwrap_or(0);
        if choice >= available {
            return Err(ExamError::InvalidChoice { choice, available });
        }
        if let Some(slot) = self.answers.get_mut(self.current_index) {
            *slot = Some(choice);
        }
        Ok(())
    }

    pub fn next(&mut self) -> usize {
        self.move_to(self.current_index.saturating_add(1))
    }

    pub fn previous(&mut self) -> usize {
        self.move_to(self.current_index.saturating_sub(1))
    }

    pub fn jump_to(&mut self, index: usize) -> usize {
        self.move_to(index)
    }

    /// Returns whether the current question is flagged afterwards.
    pub fn toggle_flag(&mut self) -> bool {
        let index = self.current_index;
        if !self.flagged.remove(&index) {
            self.flagged.insert(index);
            return true;
        }
        false
    }

    fn move_to(&mut self, index: usize) -> usize {
        let last = self.questions.len().saturating_sub(1);
        let target = index.min(last);
        if target != self.current_index {
            self.current_index = target;
            self.question_remaining_ms = self.per_question_budget_ms;
        }
        self.highest_visited = self.highest_visited.max(target);
        target
    }

    /// Charges `elapsed_ms` to the current position and runs down the timers.
    /// Overrun past the per-question timer is not carried to the next question.
    pub(crate) fn apply_tick(&mut self, elapsed_ms: u64) -> TimerEvent {
        if let Some(spent) = self.elapsed_ms.get_mut(self.current_index) {
            *spent = spent.saturating_add(elapsed_ms);
        }

        let Some(exam_remaining) = self.exam_remaining_ms else {
            return TimerEvent::Running;
        };

        let exam_remaining = exam_remaining.saturating_sub(elapsed_ms);
        self.exam_remaining_ms = Some(exam_remaining);
        if exam_remaining == 0 {
            return TimerEvent::Expired(SubmitReason::ExamTimeExpired);
        }

        if let Some(question_remaining) = self.question_remaining_ms {
            let question_remaining = question_remaining.saturating_sub(elapsed_ms);
            self.question_remaining_ms = Some(question_remaining);
            if question_remaining == 0 {
                if self.is_last() {
                    return TimerEvent::Expired(SubmitReason::QuestionTimeExpired);
                }
                let to = self.next();
                return TimerEvent::Advanced { to };
            }
        }

        TimerEvent::Running
    }
}

pub(crate) fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
