use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::catalog::QuestionCatalog;
use crate::config::{ExamParams, TrainerConfig};
use crate::due_set::DueSet;
use crate::exam::attempt::{duration_ms, TimerEvent};
use crate::exam::scoring::score_exam;
use crate::exam::{ExamAttemptState, ExamError, ExamPhaseKind, ExamResult, SubmitReason};
use crate::session::{SessionComposer, SessionKind, SessionRequest};
use crate::storage::Persistence;
use crate::syllabus::Leg;

#[derive(Debug, Clone, PartialEq)]
pub enum ExamPhase {
    NotStarted,
    InProgress(ExamAttemptState),
    Submitted(ExamResult),
    Abandoned { saved: bool },
}

impl ExamPhase {
    pub fn kind(&self) -> ExamPhaseKind {
        match self {
            ExamPhase::NotStarted => ExamPhaseKind::NotStarted,
            ExamPhase::InProgress(_) => ExamPhaseKind::InProgress,
            ExamPhase::Submitted(_) => ExamPhaseKind::Submitted,
            ExamPhase::Abandoned { .. } => ExamPhaseKind::Abandoned,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Running,
    /// The per-question timer ran out and the exam moved on.
    Advanced { to: usize },
    Submitted { reason: SubmitReason },
}

/// One learner's mock exam context.
///
/// `NotStarted -> InProgress -> Submitted | Abandoned`; starting again from
/// either terminal phase begins a fresh attempt.
#[derive(Debug)]
pub struct MockExam {
    phase: ExamPhase,
    params: ExamParams,
    composer: SessionComposer,
}

impl MockExam {
    pub fn new(config: &TrainerConfig) -> Self {
        Self {
            phase: ExamPhase::NotStarted,
            params: config.exam.clone(),
            composer: SessionComposer::new(config),
        }
    }

    pub fn phase(&self) -> &ExamPhase {
        &self.phase
    }

    pub fn phase_kind(&self) -> ExamPhaseKind {
        self.phase.kind()
    }

    pub fn attempt(&self) -> Option<&ExamAttemptState> {
        match &self.phase {
            ExamPhase::InProgress(attempt) => Some(attempt),
            _ => None,
        }
    }

    pub fn result(&self) -> Option<&ExamResult> {
        match &self.phase {
            ExamPhase::Submitted(result) => Some(result),
            _ => None,
        }
    }

    pub fn start<C, R>(
        &mut self,
        leg: Leg,
        practice_mode: bool,
        catalog: &C,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<&ExamAttemptState, ExamError>
    where
        C: QuestionCatalog + ?Sized,
        R: Rng + ?Sized,
    {
        if matches!(self.phase, ExamPhase::InProgress(_)) {
            return Err(ExamError::AttemptInProgress);
        }

        let request = SessionRequest::new(SessionKind::TimedMockExam { leg });
        let session = self
            .composer
            .compose(&request, catalog, &DueSet::default(), rng)?;
        let attempt = ExamAttemptState::new(leg, practice_mode, session, &self.params, now);

        tracing::info!(
            attempt_id = %attempt.id,
            leg = leg.number(),
            practice_mode,
            questions = attempt.len(),
            partial = !attempt.shortfalls.is_empty(),
            "mock exam started"
        );

        self.phase = ExamPhase::InProgress(attempt);
        self.attempt().ok_or(ExamError::NoActiveAttempt)
    }

    /// Restores a previously saved attempt. `Ok(false)` when nothing is saved.
    pub fn resume<P: Persistence + ?Sized>(&mut self, persistence: &P) -> Result<bool, ExamError> {
        if matches!(self.phase, ExamPhase::InProgress(_)) {
            return Err(ExamError::AttemptInProgress);
        }

        match persistence.load_saved_attempt()? {
            Some(attempt) => {
                tracing::info!(
                    attempt_id = %attempt.id,
                    position = attempt.current_index,
                    answered = attempt.answered_count(),
                    "mock exam resumed"
                );
                self.phase = ExamPhase::InProgress(attempt);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn select_answer(&mut self, choice: usize) -> Result<(), ExamError> {
        self.attempt_mut()?.select_answer(choice)
    }

    pub fn next(&mut self) -> Result<usize, ExamError> {
        Ok(self.attempt_mut()?.next())
    }

    pub fn previous(&mut self) -> Result<usize, ExamError> {
        Ok(self.attempt_mut()?.previous())
    }

    pub fn jump_to(&mut self, index: usize) -> Result<usize, ExamError> {
        Ok(self.attempt_mut()?.jump_to(index))
    }

    pub fn toggle_flag(&mut self) -> Result<bool, ExamError> {
        Ok(self.attempt_mut()?.toggle_flag())
    }

    /// Advances the timers by `elapsed` as measured by the caller. When a
    /// timer runs out on the last question or for the whole exam, the attempt
    /// is submitted; if that save fails the attempt stays in progress and the
    /// next tick retries.
    pub fn tick<P: Persistence + ?Sized>(
        &mut self,
        elapsed: Duration,
        now: DateTime<Utc>,
        persistence: &P,
    ) -> Result<TickOutcome, ExamError> {
        let event = self.attempt_mut()?.apply_tick(duration_ms(elapsed));
        match event {
            TimerEvent::Running => Ok(TickOutcome::Running),
            TimerEvent::Advanced { to } => {
                tracing::debug!(to, "question time expired, advancing");
                Ok(TickOutcome::Advanced { to })
            }
            TimerEvent::Expired(reason) => {
                self.finish(reason, now, persistence)?;
                Ok(TickOutcome::Submitted { reason })
            }
        }
    }

    pub fn submit<P: Persistence + ?Sized>(
        &mut self,
        now: DateTime<Utc>,
        persistence: &P,
    ) -> Result<ExamResult, ExamError> {
        self.finish(SubmitReason::Manual, now, persistence)
    }

    /// Leaves the attempt. With `save` it can be resumed later; otherwise any
    /// saved attempt is discarded. No result is recorded either way.
    pub fn abandon<P: Persistence + ?Sized>(
        &mut self,
        save: bool,
        persistence: &P,
    ) -> Result<(), ExamError> {
        let ExamPhase::InProgress(attempt) = &self.phase else {
            return Err(ExamError::InvalidTransition {
                from: self.phase.kind(),
                action: "abandon",
            });
        };

        if save {
            persistence.save_attempt(attempt)?;
        } else {
            persistence.clear_saved_attempt()?;
        }

        tracing::info!(
            attempt_id = %attempt.id,
            saved = save,
            answered = attempt.answered_count(),
            "mock exam abandoned"
        );
        self.phase = ExamPhase::Abandoned { saved: save };
        Ok(())
    }

    fn finish<P: Persistence + ?Sized>(
        &mut self,
        reason: SubmitReason,
        now: DateTime<Utc>,
        persistence: &P,
    ) -> Result<ExamResult, ExamError> {
        let ExamPhase::InProgress(attempt) = &self.phase else {
            return Err(ExamError::InvalidTransition {
                from: self.phase.kind(),
                action: "submit",
            });
        };

        let result = score_exam(attempt, self.params.pass_threshold_percent, now);
        persistence.save_exam_result(&result)?;
        if let Err(err) = persistence.clear_saved_attempt() {
            tracing::warn!(error = %err, "failed to clear saved attempt after submit");
        }

        tracing::info!(
            attempt_id = %result.id,
            reason = ?reason,
            correct = result.correct_answers,
            total = result.total_questions,
            percentage = result.percentage,
            passed = result.passed,
            "mock exam submitted"
        );

        self.phase = ExamPhase::Submitted(result.clone());
        Ok(result)
    }

    fn attempt_mut(&mut self) -> Result<&mut ExamAttemptState, ExamError> {
        match &mut self.phase {
            ExamPhase::InProgress(attempt) => Ok(attempt),
            _ => Err(ExamError::NoActiveAttempt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogQuestion, InMemoryCatalog};
    use crate::storage::InMemoryStore;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn catalog() -> InMemoryCatalog {
        let mut questions = Vec::new();
        for category in [553, 552, 554] {
            for n in 0..20 {
                let id = category * 100 + n;
                questions.push(CatalogQuestion {
                    id,
                    category_id: category,
                    text: format!("Q{id}"),
                    correct_answer: "yes".into(),
                    incorrect_answers: ["no".into(), "maybe".into(), "never".into()],
                    mock_eligible: true,
                });
            }
        }
        InMemoryCatalog::new(questions)
    }

    fn started(practice_mode: bool) -> MockExam {
        let mut exam = MockExam::new(&TrainerConfig::default());
        exam.start(
            Leg::HumanEnvironment,
            practice_mode,
            &catalog(),
            Utc::now(),
            &mut ChaCha8Rng::seed_from_u64(5),
        )
        .unwrap();
        exam
    }

    #[test]
    fn actions_without_attempt_are_ignored() {
        let mut exam = MockExam::new(&TrainerConfig::default());
        let store = InMemoryStore::new();

        let err = exam.next().unwrap_err();
        assert!(matches!(err, ExamError::NoActiveAttempt));
        assert!(err.is_recoverable());
        assert!(matches!(exam.select_answer(0), Err(ExamError::NoActiveAttempt)));
        assert!(matches!(
            exam.tick(Duration::from_secs(1), Utc::now(), &store),
            Err(ExamError::NoActiveAttempt)
        ));
        assert!(matches!(
            exam.submit(Utc::now(), &store),
            Err(ExamError::InvalidTransition {
                from: ExamPhaseKind::NotStarted,
                action: "submit"
            })
        ));
        assert_eq!(exam.phase(), &ExamPhase::NotStarted);
    }

    #[test]
    fn cannot_start_twice() {
        let mut exam = started(false);
        let result = exam.start(
            Leg::TechnicalLegal,
            false,
            &catalog(),
            Utc::now(),
            &mut ChaCha8Rng::seed_from_u64(1),
        );
        assert!(matches!(result, Err(ExamError::AttemptInProgress)));
        assert_eq!(exam.attempt().map(|a| a.leg), Some(Leg::HumanEnvironment));
    }

    #[test]
    fn submit_scores_and_clears_saved_attempt() {
        let store = InMemoryStore::new();
        let mut exam = started(true);
        exam.abandon(true, &store).unwrap();
        assert!(store.has_saved_attempt());
        assert!(exam.resume(&store).unwrap());

        let attempt = exam.attempt().unwrap().clone();
        for (index, question) in attempt.questions.iter().enumerate() {
            exam.jump_to(index).unwrap();
            exam.select_answer(question.correct_index).unwrap();
        }

        let result = exam.submit(Utc::now(), &store).unwrap();
        assert!(result.passed);
        assert_eq!(result.correct_answers, 60);
        assert_eq!(exam.phase_kind(), ExamPhaseKind::Submitted);
        assert!(!store.has_saved_attempt());
        assert_eq!(store.result_count(), 1);

        assert!(matches!(
            exam.abandon(false, &store),
            Err(ExamError::InvalidTransition {
                from: ExamPhaseKind::Submitted,
                ..
            })
        ));
    }

    #[test]
    fn restart_after_terminal_phase() {
        let store = InMemoryStore::new();
        let mut exam = started(false);
        exam.abandon(false, &store).unwrap();
        assert_eq!(exam.phase(), &ExamPhase::Abandoned { saved: false });
        assert!(!exam.resume(&store).unwrap());

        exam.start(
            Leg::HumanEnvironment,
            false,
            &catalog(),
            Utc::now(),
            &mut ChaCha8Rng::seed_from_u64(9),
        )
        .unwrap();
        assert_eq!(exam.phase_kind(), ExamPhaseKind::InProgress);
    }

    #[test]
    fn whole_exam_timer_submits_all_questions() {
        let store = InMemoryStore::new();
        let mut exam = started(false);
        exam.select_answer(0).unwrap();

        let outcome = exam
            .tick(Leg::HumanEnvironment.time_limit(), Utc::now(), &store)
            .unwrap();
        assert_eq!(
            outcome,
            TickOutcome::Submitted {
                reason: SubmitReason::ExamTimeExpired
            }
        );
        let result = exam.result().unwrap();
        assert_eq!(result.total_questions, 60);
        assert!(!result.passed);
    }
}
