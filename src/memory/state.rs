use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Per-question spaced-repetition record.
///
/// `next_review_due` always equals `last_reviewed_at + interval_days` days;
/// only [`crate::scheduler::advance`] produces new values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryState {
    #[serde(rename = "box")]
    pub box_level: u8,
    pub ease_factor: f64,
    pub interval_days: u32,
    pub repetitions: u32,
    pub last_reviewed_at: DateTime<Utc>,
    pub next_review_due: DateTime<Utc>,
}

impl MemoryState {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_due <= now
    }

    /// How long past due the record is; zero when not yet due.
    pub fn overdue_by(&self, now: DateTime<Utc>) -> Duration {
        (now - self.next_review_due).max(Duration::zero())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Maturity {
    New,
    Learning,
    Review,
    Mastered,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaturityCounts {
    pub new: usize,
    pub learning: usize,
    pub review: usize,
    pub mastered: usize,
}

impl MaturityCounts {
    pub fn add(&mut self, maturity: Maturity) {
        match maturity {
            Maturity::New => self.new += 1,
            Maturity::Learning => self.learning += 1,
            Maturity::Review => self.review += 1,
            Maturity::Mastered => self.mastered += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.new + self.learning + self.review + self.mastered
    }
}
