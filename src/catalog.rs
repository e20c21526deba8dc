//! Question catalog collaborator.
//!
//! The engine only needs two things from the question bank: the questions in
//! a set of subjects and a short answer history per subject for weak-area
//! scoring. [`InMemoryCatalog`] serves both from a JSON question bank.

use std::collections::{HashMap, VecDeque};
use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::syllabus::{CategoryId, Subject};

pub type QuestionId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogQuestion {
    pub id: QuestionId,
    /// Top-level category code; subjects are resolved through the syllabus.
    pub category_id: CategoryId,
    pub text: String,
    pub correct_answer: String,
    pub incorrect_answers: [String; 3],
    #[serde(default = "default_mock_eligible")]
    pub mock_eligible: bool,
}

fn default_mock_eligible() -> bool {
    true
}

impl CatalogQuestion {
    pub fn subject(&self) -> Option<Subject> {
        Subject::for_category(self.category_id)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerHistory {
    pub answered: usize,
    pub correct: usize,
}

impl AnswerHistory {
    pub fn accuracy(&self) -> Option<f64> {
        if self.answered == 0 {
            None
        } else {
            Some(self.correct as f64 / self.answered as f64)
        }
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read question bank: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid question bank: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unknown question {0}")]
    UnknownQuestion(QuestionId),

    #[error("question bank unavailable: {0}")]
    Unavailable(String),
}

pub trait QuestionCatalog {
    /// Questions belonging to any of `subjects`, in ascending id order.
    fn fetch_eligible_questions(
        &self,
        subjects: &[Subject],
    ) -> Result<Vec<CatalogQuestion>, CatalogError>;

    /// Answer counts over the most recent `window` answers in `subject`.
    fn fetch_answered_history(
        &self,
        subject: Subject,
        window: usize,
    ) -> Result<AnswerHistory, CatalogError>;

    fn record_answer(
        &self,
        question_id: QuestionId,
        correct: bool,
        answered_at: DateTime<Utc>,
    ) -> Result<(), CatalogError>;
}

// ==================== In-memory catalog ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionBank {
    pub questions: Vec<CatalogQuestion>,
}

/// Answers kept per subject unless overridden with
/// [`InMemoryCatalog::with_history_capacity`].
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

#[derive(Debug)]
pub struct InMemoryCatalog {
    questions: Vec<CatalogQuestion>,
    /// Most recent outcomes per subject, newest at the back.
    history: RwLock<HashMap<Subject, VecDeque<bool>>>,
    history_capacity: usize,
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl InMemoryCatalog {
    pub fn new(mut questions: Vec<CatalogQuestion>) -> Self {
        questions.sort_by_key(|q| q.id);
        questions.dedup_by_key(|q| q.id);

        let unmapped = questions.iter().filter(|q| q.subject().is_none()).count();
        if unmapped > 0 {
            tracing::warn!(unmapped, "questions outside the syllabus will never be selected");
        }

        Self {
            questions,
            history: RwLock::new(HashMap::new()),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }

    /// Caps the answers remembered per subject. History windows larger than
    /// the cap see at most `capacity` answers.
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        for outcomes in self.history.get_mut().values_mut() {
            let excess = outcomes.len().saturating_sub(capacity);
            outcomes.drain(..excess);
        }
        self.history_capacity = capacity;
        self
    }

    pub fn history_capacity(&self) -> usize {
        self.history_capacity
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let bank: QuestionBank = serde_json::from_str(raw)?;
        Ok(Self::new(bank.questions))
    }

    pub fn load_json_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let catalog = Self::from_json(&raw)?;
        tracing::info!(
            path = %path.as_ref().display(),
            questions = catalog.len(),
            "question bank loaded"
        );
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn question(&self, id: QuestionId) -> Option<&CatalogQuestion> {
        self.questions
            .binary_search_by_key(&id, |q| q.id)
            .ok()
            .map(|index| &self.questions[index])
    }

    pub fn question_ids(&self) -> Vec<QuestionId> {
        self.questions.iter().map(|q| q.id).collect()
    }
}

impl QuestionCatalog for InMemoryCatalog {
    fn fetch_eligible_questions(
        &self,
        subjects: &[Subject],
    ) -> Result<Vec<CatalogQuestion>, CatalogError> {
        Ok(self
            .questions
            .iter()
            .filter(|q| q.subject().is_some_and(|s| subjects.contains(&s)))
            .cloned()
            .collect())
    }

    fn fetch_answered_history(
        &self,
        subject: Subject,
        window: usize,
    ) -> Result<AnswerHistory, CatalogError> {
        let history = self.history.read();
        let mut summary = AnswerHistory::default();
        let Some(outcomes) = history.get(&subject) else {
            return Ok(summary);
        };

        for &correct in outcomes.iter().rev().take(window) {
            summary.answered += 1;
            if correct {
                summary.correct += 1;
            }
        }
        Ok(summary)
    }

    fn record_answer(
        &self,
        question_id: QuestionId,
        correct: bool,
        _answered_at: DateTime<Utc>,
    ) -> Result<(), CatalogError> {
        let subject = self
            .question(question_id)
            .and_then(CatalogQuestion::subject)
            .ok_or(CatalogError::UnknownQuestion(question_id))?;

        let mut history = self.history.write();
        let outcomes = history.entry(subject).or_default();
        if outcomes.len() >= self.history_capacity {
            outcomes.pop_front();
        }
        outcomes.push_back(correct);
        Ok(())
    }
}
