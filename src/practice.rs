//! Walks a composed practice session: grading, memory updates and the
//! end-of-session summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{QuestionCatalog, QuestionId};
use crate::memory::{MemoryState, MemoryStateStore};
use crate::session::{ComposedSession, PresentedQuestion, SessionKind};
use crate::storage::{Persistence, StorageError};
use crate::syllabus::Subject;

/// Session accuracy below this suggests studying the weakest subject.
const WEAK_ACCURACY: f64 = 0.75;
/// Answers in one sitting after which a break is suggested.
const BREAK_AFTER: usize = 30;

#[derive(Debug, Error)]
pub enum PracticeError {
    #[error("question {0} was already answered")]
    AlreadyAnswered(QuestionId),

    #[error("choice {choice} out of range ({available} choices)")]
    InvalidChoice { choice: usize, available: usize },

    #[error("session has no more questions")]
    Finished,

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerFeedback {
    pub question_id: QuestionId,
    pub chosen_index: usize,
    pub correct: bool,
    pub correct_index: usize,
    pub correct_answer: String,
    pub memory: MemoryState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SuggestedAction {
    ReviewDue { count: usize },
    StudyWeakArea { subject: Subject },
    TakeBreak,
    ContinuePractice { remaining: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectTally {
    pub subject: Subject,
    pub answered: usize,
    pub correct: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub kind: SessionKind,
    pub answered: usize,
    pub correct: usize,
    pub accuracy: Option<f64>,
    pub by_subject: Vec<SubjectTally>,
    pub suggested_action: SuggestedAction,
}

#[derive(Debug, Clone)]
pub struct PracticeSession {
    session: ComposedSession,
    position: usize,
    /// Per position: whether the answer was correct.
    outcomes: Vec<Option<bool>>,
}

impl PracticeSession {
    pub fn new(session: ComposedSession) -> Self {
        let count = session.questions.len();
        Self {
            session,
            position: 0,
            outcomes: vec![None; count],
        }
    }

    pub fn kind(&self) -> SessionKind {
        self.session.request.kind
    }

    pub fn len(&self) -> usize {
        self.session.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.session.questions.is_empty()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn current(&self) -> Option<&PresentedQuestion> {
        self.session.questions.get(self.position)
    }

    pub fn is_finished(&self) -> bool {
        self.position >= self.len()
    }

    pub fn answered(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_some()).count()
    }

    /// Grades the current question, advances its memory state and records
    /// the answer in the catalog history. A catalog failure is logged only;
    /// a storage failure leaves the question unanswered so it can be retried.
    pub fn answer<C, P>(
        &mut self,
        choice: usize,
        store: &mut MemoryStateStore,
        persistence: &P,
        catalog: &C,
        now: DateTime<Utc>,
    ) -> Result<AnswerFeedback, PracticeError>
    where
        C: QuestionCatalog + ?Sized,
        P: Persistence + ?Sized,
    {
        let question = self.current().ok_or(PracticeError::Finished)?;
        if self.outcomes[self.position].is_some() {
            return Err(PracticeError::AlreadyAnswered(question.question_id));
        }
        if choice >= question.choices.len() {
            return Err(PracticeError::InvalidChoice {
                choice,
                available: question.choices.len(),
            });
        }

        let correct = question.is_correct(choice);
        let question_id = question.question_id;
        let correct_index = question.correct_index;
        let correct_answer = question.correct_answer.clone();

        let memory = store.record_answer(persistence, question_id, correct, now)?;
        if let Err(err) = catalog.record_answer(question_id, correct, now) {
            tracing::warn!(question_id, error = %err, "failed to record answer history");
        }

        self.outcomes[self.position] = Some(correct);
        Ok(AnswerFeedback {
            question_id,
            chosen_index: choice,
            correct,
            correct_index,
            correct_answer,
            memory,
        })
    }

    /// Moves to the next question, returning it if there is one.
    pub fn advance(&mut self) -> Option<&PresentedQuestion> {
        if self.position < self.len() {
            self.position += 1;
        }
        self.current()
    }

    pub fn summary(&self, store: &MemoryStateStore, now: DateTime<Utc>) -> SessionSummary {
        let mut by_subject: Vec<SubjectTally> = Vec::new();
        for (question, outcome) in self.session.questions.iter().zip(&self.outcomes) {
            let Some(correct) = outcome else {
                continue;
            };
            let tally = match by_subject.iter().position(|t| t.subject == question.subject) {
                Some(index) => &mut by_subject[index],
                None => {
                    by_subject.push(SubjectTally {
                        subject: question.subject,
                        answered: 0,
                        correct: 0,
                    });
                    let last = by_subject.len() - 1;
                    &mut by_subject[last]
                }
            };
            tally.answered += 1;
            if *correct {
                tally.correct += 1;
            }
        }
        by_subject.sort_by_key(|t| t.subject);

        let answered: usize = by_subject.iter().map(|t| t.answered).sum();
        let correct: usize = by_subject.iter().map(|t| t.correct).sum();
        let accuracy = (answered > 0).then(|| correct as f64 / answered as f64);

        let weakest = by_subject
            .iter()
            .min_by(|a, b| tally_accuracy(a).total_cmp(&tally_accuracy(b)))
            .map(|t| t.subject);
        let due = store.due_count(now);

        let suggested_action = match (accuracy, weakest) {
            (Some(acc), Some(subject)) if acc < WEAK_ACCURACY => {
                SuggestedAction::StudyWeakArea { subject }
            }
            _ if due > 0 => SuggestedAction::ReviewDue { count: due },
            _ if answered >= BREAK_AFTER => SuggestedAction::TakeBreak,
            _ => SuggestedAction::ContinuePractice {
                remaining: self.len() - answered,
            },
        };

        tracing::info!(
            kind = self.kind().title(),
            answered,
            correct,
            suggestion = ?suggested_action,
            "practice session summarised"
        );

        SessionSummary {
            kind: self.kind(),
            answered,
            correct,
            accuracy,
            by_subject,
            suggested_action,
        }
    }
}

fn tally_accuracy(tally: &SubjectTally) -> f64 {
    tally.correct as f64 / tally.answered.max(1) as f64
}
