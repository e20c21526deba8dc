//! SQLite-backed persistence.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use crate::catalog::QuestionId;
use crate::exam::{ExamAttemptState, ExamResult, SubjectScore};
use crate::memory::MemoryState;
use crate::storage::migrations;
use crate::storage::{Persistence, StorageError, StorageResult};
use crate::syllabus::Leg;

pub struct SqliteStore {
    conn: Mutex<Connection>,
    db_path: String,
}

impl SqliteStore {
    /// Opens (or creates) the database file and brings the schema up to date.
    pub fn open<P: AsRef<Path>>(db_path: P) -> StorageResult<Self> {
        let path_str = db_path.as_ref().to_string_lossy().to_string();
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|err| {
                    StorageError::Unavailable(format!("cannot create {}: {err}", parent.display()))
                })?;
            }
        }

        let mut conn = Connection::open(&db_path)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;",
        )?;
        migrations::run_migrations(&mut conn)?;

        tracing::info!(path = %path_str, "sqlite store opened");
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: path_str,
        })
    }

    pub fn in_memory() -> StorageResult<Self> {
        let mut conn = Connection::open_in_memory()?;
        migrations::run_migrations(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: ":memory:".to_string(),
        })
    }

    pub fn db_path(&self) -> &str {
        &self.db_path
    }
}

// ==================== Row mapping ====================

struct MemoryStateRow {
    question_id: i64,
    box_level: i64,
    ease_factor: f64,
    interval_days: i64,
    repetitions: i64,
    last_reviewed_at: String,
    next_review_due: String,
}

impl MemoryStateRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            question_id: row.get(0)?,
            box_level: row.get(1)?,
            ease_factor: row.get(2)?,
            interval_days: row.get(3)?,
            repetitions: row.get(4)?,
            last_reviewed_at: row.get(5)?,
            next_review_due: row.get(6)?,
        })
    }

    fn into_state(self) -> StorageResult<(QuestionId, MemoryState)> {
        let state = MemoryState {
            box_level: narrow(self.box_level, "box")?,
            ease_factor: self.ease_factor,
            interval_days: narrow(self.interval_days, "interval_days")?,
            repetitions: narrow(self.repetitions, "repetitions")?,
            last_reviewed_at: parse_timestamp(&self.last_reviewed_at)?,
            next_review_due: parse_timestamp(&self.next_review_due)?,
        };
        Ok((self.question_id, state))
    }
}

struct ExamResultRow {
    id: String,
    leg: i64,
    practice_mode: bool,
    started_at: String,
    completed_at: String,
    total_questions: i64,
    correct_answers: i64,
    percentage: f64,
    passed: bool,
    subject_breakdown: String,
}

impl ExamResultRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            leg: row.get(1)?,
            practice_mode: row.get(2)?,
            started_at: row.get(3)?,
            completed_at: row.get(4)?,
            total_questions: row.get(5)?,
            correct_answers: row.get(6)?,
            percentage: row.get(7)?,
            passed: row.get(8)?,
            subject_breakdown: row.get(9)?,
        })
    }

    fn into_result(self) -> StorageResult<ExamResult> {
        let id = uuid::Uuid::parse_str(&self.id)
            .map_err(|err| StorageError::Corrupt(format!("exam result id {}: {err}", self.id)))?;
        let leg = narrow::<u8>(self.leg, "leg")
            .ok()
            .and_then(Leg::from_number)
            .ok_or_else(|| StorageError::Corrupt(format!("unknown leg {}", self.leg)))?;
        let subject_breakdown: Vec<SubjectScore> = serde_json::from_str(&self.subject_breakdown)?;

        Ok(ExamResult {
            id,
            leg,
            practice_mode: self.practice_mode,
            started_at: parse_timestamp(&self.started_at)?,
            completed_at: parse_timestamp(&self.completed_at)?,
            total_questions: narrow(self.total_questions, "total_questions")?,
            correct_answers: narrow(self.correct_answers, "correct_answers")?,
            percentage: self.percentage,
            passed: self.passed,
            subject_breakdown,
        })
    }
}

fn narrow<T: TryFrom<i64>>(value: i64, column: &str) -> StorageResult<T> {
    T::try_from(value).map_err(|_| StorageError::Corrupt(format!("{column} out of range: {value}")))
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(raw: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|err| StorageError::Corrupt(format!("timestamp {raw}: {err}")))
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

const SELECT_MEMORY_STATE: &str = "SELECT question_id, box, ease_factor, interval_days, repetitions, \
     last_reviewed_at, next_review_due FROM memory_states";

// ==================== Persistence ====================

impl Persistence for SqliteStore {
    fn load_memory_state(&self, question_id: QuestionId) -> StorageResult<Option<MemoryState>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                &format!("{SELECT_MEMORY_STATE} WHERE question_id = ?1"),
                params![question_id],
                MemoryStateRow::from_row,
            )
            .optional()?;

        row.map(|r| r.into_state().map(|(_, state)| state)).transpose()
    }

    fn load_memory_states(
        &self,
        question_ids: &[QuestionId],
    ) -> StorageResult<HashMap<QuestionId, MemoryState>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!("{SELECT_MEMORY_STATE} WHERE question_id = ?1"))?;

        let mut states = HashMap::with_capacity(question_ids.len());
        for &question_id in question_ids {
            if states.contains_key(&question_id) {
                continue;
            }
            let row = stmt
                .query_row(params![question_id], MemoryStateRow::from_row)
                .optional()?;
            if let Some(row) = row {
                let (id, state) = row.into_state()?;
                states.insert(id, state);
            }
        }
        Ok(states)
    }

    fn save_memory_state(&self, question_id: QuestionId, state: &MemoryState) -> StorageResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            r#"
            INSERT INTO memory_states
                (question_id, box, ease_factor, interval_days, repetitions,
                 last_reviewed_at, next_review_due)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(question_id) DO UPDATE SET
                box = excluded.box,
                ease_factor = excluded.ease_factor,
                interval_days = excluded.interval_days,
                repetitions = excluded.repetitions,
                last_reviewed_at = excluded.last_reviewed_at,
                next_review_due = excluded.next_review_due
            "#,
            params![
                question_id,
                i64::from(state.box_level),
                state.ease_factor,
                i64::from(state.interval_days),
                i64::from(state.repetitions),
                format_timestamp(&state.last_reviewed_at),
                format_timestamp(&state.next_review_due),
            ],
        )?;
        Ok(())
    }

    fn save_exam_result(&self, result: &ExamResult) -> StorageResult<()> {
        let breakdown = serde_json::to_string(&result.subject_breakdown)?;
        let conn = self.conn.lock();
        conn.execute(
            r#"
            INSERT OR IGNORE INTO exam_results
                (id, leg, practice_mode, started_at, completed_at, total_questions,
                 correct_answers, percentage, passed, subject_breakdown)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                result.id.to_string(),
                i64::from(result.leg.number()),
                result.practice_mode,
                format_timestamp(&result.started_at),
                format_timestamp(&result.completed_at),
                to_i64(result.total_questions),
                to_i64(result.correct_answers),
                result.percentage,
                result.passed,
                breakdown,
            ],
        )?;
        Ok(())
    }

    fn load_exam_history(&self) -> StorageResult<Vec<ExamResult>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            r#"
            SELECT id, leg, practice_mode, started_at, completed_at, total_questions,
                   correct_answers, percentage, passed, subject_breakdown
            FROM exam_results
            ORDER BY completed_at DESC
            "#,
        )?;
        let rows = stmt
            .query_map([], ExamResultRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(ExamResultRow::into_result).collect()
    }

    fn save_attempt(&self, attempt: &ExamAttemptState) -> StorageResult<()> {
        let payload = serde_json::to_string(attempt)?;
        let conn = self.conn.lock();
        conn.execute(
            r#"
            INSERT INTO saved_attempts (slot, payload, saved_at) VALUES (1, ?1, ?2)
            ON CONFLICT(slot) DO UPDATE SET payload = excluded.payload, saved_at = excluded.saved_at
            "#,
            params![payload, format_timestamp(&Utc::now())],
        )?;
        Ok(())
    }

    fn load_saved_attempt(&self) -> StorageResult<Option<ExamAttemptState>> {
        let conn = self.conn.lock();
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM saved_attempts WHERE slot = 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        match payload {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn clear_saved_attempt(&self) -> StorageResult<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM saved_attempts", [])?;
        Ok(())
    }
}
