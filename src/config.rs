use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Runtime settings for the command-line driver.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub question_bank_path: PathBuf,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Self {
        let database_path = std::env::var("TRAINER_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/trainer.db"));

        let question_bank_path = std::env::var("TRAINER_QUESTION_BANK")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/questions.json"));

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Self {
            database_path,
            question_bank_path,
            log_level,
        }
    }
}

// ==================== Engine tuning ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerParams {
    pub max_box: u8,
    pub initial_ease: f64,
    pub min_ease: f64,
    pub max_ease: f64,
    pub ease_step_up: f64,
    pub ease_step_down: f64,
    /// Review interval in days for box 1, 2, 3, ... Boxes past the end grow
    /// by the ease factor.
    pub interval_progression: Vec<u32>,
    /// Consecutive correct answers required at the top box to count as mastered.
    pub mastered_min_streak: u32,
}

impl Default for SchedulerParams {
    fn default() -> Self {
        Self {
            max_box: 5,
            initial_ease: 2.5,
            min_ease: 1.3,
            max_ease: 3.0,
            ease_step_up: 0.1,
            ease_step_down: 0.2,
            interval_progression: vec![1, 3, 7, 16],
            mastered_min_streak: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSizes {
    pub due_review: usize,
    pub weak_area_focus: usize,
    pub new_material: usize,
    pub full_practice: usize,
}

impl Default for SessionSizes {
    fn default() -> Self {
        Self {
            due_review: 20,
            weak_area_focus: 15,
            new_material: 10,
            full_practice: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeakAreaParams {
    /// Most recent answers per subject considered for scoring.
    pub history_window: usize,
    /// A subject qualifies only when its answered count exceeds this.
    pub min_sample_size: usize,
    pub max_subjects: usize,
}

impl Default for WeakAreaParams {
    fn default() -> Self {
        Self {
            history_window: 50,
            min_sample_size: 4,
            max_subjects: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamParams {
    pub per_question_seconds: u64,
    pub pass_threshold_percent: f64,
}

impl Default for ExamParams {
    fn default() -> Self {
        Self {
            per_question_seconds: 75,
            pass_threshold_percent: 75.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainerConfig {
    pub scheduler: SchedulerParams,
    pub sessions: SessionSizes,
    pub weak_area: WeakAreaParams,
    pub exam: ExamParams,
}

impl TrainerConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(val) = env_parse("TRAINER_MAX_BOX") {
            config.scheduler.max_box = val;
        }
        if let Some(val) = env_parse("TRAINER_MASTERED_STREAK") {
            config.scheduler.mastered_min_streak = val;
        }
        if let Ok(raw) = std::env::var("TRAINER_INTERVALS") {
            let parsed: Option<Vec<u32>> = raw.split(',').map(|v| v.trim().parse().ok()).collect();
            match parsed {
                Some(days) if !days.is_empty() => config.scheduler.interval_progression = days,
                _ => tracing::warn!(value = %raw, "ignoring malformed TRAINER_INTERVALS"),
            }
        }
        if let Some(val) = env_parse("TRAINER_SESSION_SIZE_DUE") {
            config.sessions.due_review = val;
        }
        if let Some(val) = env_parse("TRAINER_SESSION_SIZE_WEAK") {
            config.sessions.weak_area_focus = val;
        }
        if let Some(val) = env_parse("TRAINER_SESSION_SIZE_NEW") {
            config.sessions.new_material = val;
        }
        if let Some(val) = env_parse("TRAINER_SESSION_SIZE_PRACTICE") {
            config.sessions.full_practice = val;
        }
        if let Some(val) = env_parse("TRAINER_WEAK_WINDOW") {
            config.weak_area.history_window = val;
        }
        if let Some(val) = env_parse("TRAINER_WEAK_MIN_SAMPLE") {
            config.weak_area.min_sample_size = val;
        }
        if let Some(val) = env_parse("TRAINER_QUESTION_SECONDS") {
            config.exam.per_question_seconds = val;
        }
        if let Some(val) = env_parse("TRAINER_PASS_THRESHOLD") {
            config.exam.pass_threshold_percent = val;
        }

        config
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable setting");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_tuning() {
        let config = TrainerConfig::default();
        assert_eq!(config.scheduler.max_box, 5);
        assert_eq!(config.scheduler.interval_progression, vec![1, 3, 7, 16]);
        assert!((config.scheduler.min_ease - 1.3).abs() < f64::EPSILON);
        assert!((config.scheduler.max_ease - 3.0).abs() < f64::EPSILON);
        assert_eq!(config.exam.per_question_seconds, 75);
        assert_eq!(config.sessions.weak_area_focus, 15);
    }

    #[test]
    fn env_overrides_are_applied() {
        std::env::set_var("TRAINER_WEAK_MIN_SAMPLE", "9");
        std::env::set_var("TRAINER_INTERVALS", "1, 2, 4");
        std::env::set_var("TRAINER_PASS_THRESHOLD", "not-a-number");

        let config = TrainerConfig::from_env();
        assert_eq!(config.weak_area.min_sample_size, 9);
        assert_eq!(config.scheduler.interval_progression, vec![1, 2, 4]);
        assert!((config.exam.pass_threshold_percent - 75.0).abs() < f64::EPSILON);

        std::env::remove_var("TRAINER_WEAK_MIN_SAMPLE");
        std::env::remove_var("TRAINER_INTERVALS");
        std::env::remove_var("TRAINER_PASS_THRESHOLD");
    }
}
