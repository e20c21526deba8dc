//! Versioned schema migrations.
//!
//! Each migration runs in its own transaction and is recorded in
//! `schema_migrations`, so reopening an existing database is a no-op.

use chrono::Utc;
use rusqlite::{params, Connection};

use crate::storage::{StorageError, StorageResult};

pub const CURRENT_SCHEMA_VERSION: i32 = 2;

const INIT_SCHEMA: &str = include_str!("schema.sql");

#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i32,
    pub name: &'static str,
    pub sql: &'static str,
}

pub fn get_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            name: "initial schema",
            sql: INIT_SCHEMA,
        },
        Migration {
            version: 2,
            name: "exam history indexes",
            sql: r#"
            CREATE INDEX IF NOT EXISTS idx_exam_results_completed
                ON exam_results(completed_at DESC);

            CREATE INDEX IF NOT EXISTS idx_exam_results_leg
                ON exam_results(leg, completed_at DESC);
            "#,
        },
    ]
}

pub fn current_version(conn: &Connection) -> StorageResult<i32> {
    let version: Option<i32> = conn.query_row(
        "SELECT MAX(version) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    Ok(version.unwrap_or(0))
}

pub fn run_migrations(conn: &mut Connection) -> StorageResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version    INTEGER PRIMARY KEY,
            name       TEXT NOT NULL,
            applied_at TEXT NOT NULL
        );",
    )?;

    let applied = current_version(conn)?;

    for migration in get_migrations().into_iter().filter(|m| m.version > applied) {
        let tx = conn.transaction()?;
        tx.execute_batch(migration.sql).map_err(|err| {
            StorageError::Migration(format!(
                "v{} ({}) failed: {err}",
                migration.version, migration.name
            ))
        })?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
            params![migration.version, migration.name, Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;

        tracing::info!(
            version = migration.version,
            name = migration.name,
            "schema migration applied"
        );
    }

    Ok(())
}
