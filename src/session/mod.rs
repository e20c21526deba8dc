//! Session requests and composed question lists.

pub mod composer;
pub mod presented;

pub use composer::{ComposeError, SessionComposer};
pub use presented::PresentedQuestion;

use serde::{Deserialize, Serialize};

use crate::catalog::QuestionId;
use crate::config::SessionSizes;
use crate::syllabus::{Leg, Subject};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionKind {
    DueReview,
    WeakAreaFocus,
    NewMaterial,
    FullPractice,
    TimedMockExam { leg: Leg },
}

impl SessionKind {
    pub fn title(&self) -> &'static str {
        match self {
            SessionKind::DueReview => "Due Review",
            SessionKind::WeakAreaFocus => "Weak Area Focus",
            SessionKind::NewMaterial => "New Material",
            SessionKind::FullPractice => "Full Practice",
            SessionKind::TimedMockExam { .. } => "Mock Exam",
        }
    }

    pub fn default_size(&self, sizes: &SessionSizes) -> usize {
        match self {
            SessionKind::DueReview => sizes.due_review,
            SessionKind::WeakAreaFocus => sizes.weak_area_focus,
            SessionKind::NewMaterial => sizes.new_material,
            SessionKind::FullPractice => sizes.full_practice,
            SessionKind::TimedMockExam { leg } => leg.total_questions(),
        }
    }

    /// Parses command-line style names such as `due-review` or `mock`.
    pub fn parse(name: &str, leg: Option<Leg>) -> Option<Self> {
        match normalise_kind(name).as_str() {
            "due" | "due-review" => Some(SessionKind::DueReview),
            "weak" | "weak-area" | "weak-area-focus" => Some(SessionKind::WeakAreaFocus),
            "new" | "new-material" => Some(SessionKind::NewMaterial),
            "practice" | "full-practice" => Some(SessionKind::FullPractice),
            "mock" | "mock-exam" | "timed-mock-exam" => {
                leg.map(|leg| SessionKind::TimedMockExam { leg })
            }
            _ => None,
        }
    }

    /// True for names that only parse together with a leg.
    pub fn name_requires_leg(name: &str) -> bool {
        matches!(
            normalise_kind(name).as_str(),
            "mock" | "mock-exam" | "timed-mock-exam"
        )
    }
}

fn normalise_kind(name: &str) -> String {
    name.trim().to_lowercase().replace('_', "-")
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum SessionScope {
    #[default]
    All,
    Leg(Leg),
    Subjects(Vec<Subject>),
}

impl SessionScope {
    /// Subjects covered, in syllabus order and without duplicates.
    pub fn subjects(&self) -> Vec<Subject> {
        match self {
            SessionScope::All => Subject::ALL.to_vec(),
            SessionScope::Leg(leg) => leg.subjects().collect(),
            SessionScope::Subjects(list) => Subject::ALL
                .into_iter()
                .filter(|s| list.contains(s))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    pub kind: SessionKind,
    #[serde(default)]
    pub scope: SessionScope,
    #[serde(default)]
    pub size: Option<usize>,
}

impl SessionRequest {
    pub fn new(kind: SessionKind) -> Self {
        Self {
            kind,
            scope: SessionScope::All,
            size: None,
        }
    }

    pub fn with_scope(mut self, scope: SessionScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    /// Mock exams ignore both scope and size: the leg's quota table decides.
    pub fn subjects(&self) -> Vec<Subject> {
        match self.kind {
            SessionKind::TimedMockExam { leg } => leg.subjects().collect(),
            _ => self.scope.subjects(),
        }
    }

    pub fn resolved_size(&self, sizes: &SessionSizes) -> usize {
        match self.kind {
            SessionKind::TimedMockExam { leg } => leg.total_questions(),
            kind => self.size.unwrap_or_else(|| kind.default_size(sizes)),
        }
    }
}

/// A subject that could not fill its mock exam quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaShortfall {
    pub subject: Subject,
    pub requested: usize,
    pub available: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposedSession {
    pub request: SessionRequest,
    pub questions: Vec<PresentedQuestion>,
    pub shortfalls: Vec<QuotaShortfall>,
}

impl ComposedSession {
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// True when at least one quota was reduced to what the catalog had.
    pub fn is_partial(&self) -> bool {
        !self.shortfalls.is_empty()
    }

    pub fn question_ids(&self) -> Vec<QuestionId> {
        self.questions.iter().map(|q| q.question_id).collect()
    }
}
