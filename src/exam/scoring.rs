use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::exam::ExamAttemptState;
use crate::session::{SessionKind, SessionRequest, SessionScope};
use crate::syllabus::{Leg, Subject};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectScore {
    pub subject: Subject,
    pub total: usize,
    pub correct: usize,
    pub percentage: f64,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResult {
    /// Same id as the attempt, so saving twice stores one result.
    pub id: Uuid,
    pub leg: Leg,
    pub practice_mode: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub total_questions: usize,
    pub correct_answers: usize,
    pub percentage: f64,
    pub passed: bool,
    /// Only subjects present in the attempt, in quota-table order.
    pub subject_breakdown: Vec<SubjectScore>,
}

impl ExamResult {
    pub fn failed_subjects(&self) -> Vec<Subject> {
        self.subject_breakdown
            .iter()
            .filter(|score| !score.passed)
            .map(|score| score.subject)
            .collect()
    }

    /// Follow-up practice: drill failed subjects, or polish the leg's weak
    /// spots when everything passed.
    pub fn remediation_request(&self) -> SessionRequest {
        let failed = self.failed_subjects();
        if failed.is_empty() {
            SessionRequest::new(SessionKind::WeakAreaFocus).with_scope(SessionScope::Leg(self.leg))
        } else {
            SessionRequest::new(SessionKind::FullPractice)
                .with_scope(SessionScope::Subjects(failed))
        }
    }
}

/// Scores an attempt. Unanswered questions count as incorrect and the exam
/// passes only when every subject reaches `pass_threshold_percent`.
pub fn score_exam(
    attempt: &ExamAttemptState,
    pass_threshold_percent: f64,
    completed_at: DateTime<Utc>,
) -> ExamResult {
    let leg = attempt.leg;
    let mut tallies: Vec<(Subject, usize, usize)> =
        leg.subjects().map(|subject| (subject, 0, 0)).collect();

    for (question, answer) in attempt.questions.iter().zip(&attempt.answers) {
        let subject = leg
            .subject_for_category(question.category_id)
            .unwrap_or(question.subject);
        let correct = answer.is_some_and(|choice| question.is_correct(choice));

        let index = match tallies.iter().position(|(s, _, _)| *s == subject) {
            Some(index) => index,
            None => {
                tallies.push((subject, 0, 0));
                tallies.len() - 1
            }
        };
        tallies[index].1 += 1;
        if correct {
            tallies[index].2 += 1;
        }
    }

    let subject_breakdown: Vec<SubjectScore> = tallies
        .into_iter()
        .filter(|(_, total, _)| *total > 0)
        .map(|(subject, total, correct)| {
            let percentage = percent(correct, total);
            SubjectScore {
                subject,
                total,
                correct,
                percentage,
                passed: percentage >= pass_threshold_percent,
            }
        })
        .collect();

    let total_questions = attempt.questions.len();
    let correct_answers = subject_breakdown.iter().map(|s| s.correct).sum();
    let passed =
        !subject_breakdown.is_empty() && subject_breakdown.iter().all(|score| score.passed);

    ExamResult {
        id: attempt.id,
        leg,
        practice_mode: attempt.practice_mode,
        started_at: attempt.started_at,
        completed_at,
        total_questions,
        correct_answers,
        percentage: percent(correct_answers, total_questions),
        passed,
        subject_breakdown,
    }
}

fn percent(correct: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        correct as f64 / total as f64 * 100.0
    }
}
