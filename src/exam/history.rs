use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::exam::ExamResult;
use crate::storage::{Persistence, StorageResult};
use crate::syllabus::Leg;

const TREND_WINDOW: usize = 3;
const TREND_TOLERANCE: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Trend {
    Improving,
    Steady,
    Declining,
    NotEnoughData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegLatest {
    pub leg: Leg,
    pub percentage: f64,
    pub passed: bool,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamHistorySummary {
    pub attempts: usize,
    pub passes: usize,
    pub best_percentage: Option<f64>,
    pub average_percentage: Option<f64>,
    /// Leg order; legs never attempted are absent.
    pub latest_by_leg: Vec<LegLatest>,
    pub trend: Trend,
}

impl ExamHistorySummary {
    pub fn load<P: Persistence + ?Sized>(persistence: &P) -> StorageResult<Self> {
        let history = persistence.load_exam_history()?;
        Ok(Self::from_results(&history))
    }

    /// `results` must be newest first, as returned by the store.
    pub fn from_results(results: &[ExamResult]) -> Self {
        let attempts = results.len();
        let passes = results.iter().filter(|r| r.passed).count();
        let best_percentage = results.iter().map(|r| r.percentage).reduce(f64::max);
        let average_percentage = mean(results.iter().map(|r| r.percentage));

        let latest_by_leg = Leg::ALL
            .into_iter()
            .filter_map(|leg| {
                results.iter().find(|r| r.leg == leg).map(|r| LegLatest {
                    leg,
                    percentage: r.percentage,
                    passed: r.passed,
                    completed_at: r.completed_at,
                })
            })
            .collect();

        Self {
            attempts,
            passes,
            best_percentage,
            average_percentage,
            latest_by_leg,
            trend: trend(results),
        }
    }

    pub fn pass_rate(&self) -> Option<f64> {
        (self.attempts > 0).then(|| self.passes as f64 / self.attempts as f64)
    }
}

/// Compares the last three attempts against the three before them.
fn trend(results: &[ExamResult]) -> Trend {
    let recent = mean(results.iter().take(TREND_WINDOW).map(|r| r.percentage));
    let earlier = mean(
        results
            .iter()
            .skip(TREND_WINDOW)
            .take(TREND_WINDOW)
            .map(|r| r.percentage),
    );

    match (recent, earlier) {
        (Some(recent), Some(earlier)) if recent - earlier > TREND_TOLERANCE => Trend::Improving,
        (Some(recent), Some(earlier)) if earlier - recent > TREND_TOLERANCE => Trend::Declining,
        (Some(_), Some(_)) => Trend::Steady,
        _ => Trend::NotEnoughData,
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}
