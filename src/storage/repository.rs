use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::models::{Assistant, AssistantConfig, Thread};
use crate::runs::{Run, RunStatus};

/// SQLite-backed store for assistants, threads and run records.
///
/// A single connection is shared process-wide; every operation locks it for
/// the duration of one statement and releases it before returning.
#[derive(Clone)]
pub struct Storage {
    conn: Arc<Mutex<Connection>>,
}

impl Storage {
    /// Open (or create) the database at `path` and initialize the schema
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Fresh in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let storage = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        storage.init_schema()?;
        Ok(storage)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| anyhow!("Lock error: {}", e))
    }

    /// Initialize the database schema
    fn init_schema(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS assistant (
                assistant_id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                config TEXT NOT NULL DEFAULT '{}',
                updated_at TEXT NOT NULL,
                public INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_assistant_user_id ON assistant(user_id);

            CREATE TABLE IF NOT EXISTS thread (
                thread_id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                assistant_id TEXT NOT NULL,
                name TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_thread_user_id ON thread(user_id);

            CREATE TABLE IF NOT EXISTS runs (
                id TEXT PRIMARY KEY,
                thread_id TEXT NOT NULL,
                assistant_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                started_at TEXT NOT NULL,
                completed_at TEXT,
                error TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_runs_thread_id ON runs(thread_id);
            CREATE INDEX IF NOT EXISTS idx_runs_status ON runs(status);
            "#,
        )?;

        Ok(())
    }

    /// Insert or replace an assistant
    pub fn put_assistant(&self, assistant: &Assistant) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            r#"
            INSERT INTO assistant (assistant_id, user_id, name, config, updated_at, public)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT (assistant_id) DO UPDATE SET
                user_id = excluded.user_id,
                name = excluded.name,
                config = excluded.config,
                updated_at = excluded.updated_at,
                public = excluded.public
            "#,
            params![
                assistant.assistant_id,
                assistant.user_id,
                assistant.name,
                serde_json::to_string(&assistant.config)?,
                assistant.updated_at.to_rfc3339(),
                assistant.public as i32,
            ],
        )?;

        Ok(())
    }

    /// Get an assistant visible to `user_id` (owned by them or public)
    pub fn get_assistant(&self, user_id: &str, assistant_id: &str) -> Result<Option<Assistant>> {
        let conn = self.lock()?;

        let row = conn
            .query_row(
                r#"
                SELECT assistant_id, user_id, name, config, updated_at, public
                FROM assistant
                WHERE assistant_id = ?1 AND (user_id = ?2 OR public = 1)
                "#,
                params![assistant_id, user_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, i32>(5)?,
                    ))
                },
            )
            .optional()?;

        let Some((assistant_id, owner, name, config, updated_at, public)) = row else {
            return Ok(None);
        };

        let config: AssistantConfig = serde_json::from_str(&config)
            .map_err(|e| anyhow!("Stored config of assistant {} is invalid: {}", assistant_id, e))?;

        Ok(Some(Assistant {
            assistant_id,
            user_id: owner,
            name,
            config,
            updated_at: parse_timestamp(&updated_at),
            public: public != 0,
        }))
    }

    /// Insert or replace a thread
    pub fn put_thread(&self, thread: &Thread) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            r#"
            INSERT INTO thread (thread_id, user_id, assistant_id, name, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (thread_id) DO UPDATE SET
                user_id = excluded.user_id,
                assistant_id = excluded.assistant_id,
                name = excluded.name,
                updated_at = excluded.updated_at
            "#,
            params![
                thread.thread_id,
                thread.user_id,
                thread.assistant_id,
                thread.name,
                thread.updated_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    /// Get a thread owned by `user_id`
    pub fn get_thread(&self, user_id: &str, thread_id: &str) -> Result<Option<Thread>> {
        let conn = self.lock()?;

        let thread = conn
            .query_row(
                r#"
                SELECT thread_id, user_id, assistant_id, name, updated_at
                FROM thread WHERE thread_id = ?1 AND user_id = ?2
                "#,
                params![thread_id, user_id],
                |row| {
                    Ok(Thread {
                        thread_id: row.get(0)?,
                        user_id: row.get(1)?,
                        assistant_id: row.get(2)?,
                        name: row.get(3)?,
                        updated_at: parse_timestamp(&row.get::<_, String>(4)?),
                    })
                },
            )
            .optional()?;

        Ok(thread)
    }

    /// Create a run record
    pub fn create_run(&self, run: &Run) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            r#"
            INSERT INTO runs (id, thread_id, assistant_id, user_id, status,
                              started_at, completed_at, error)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                run.id,
                run.thread_id,
                run.assistant_id,
                run.user_id,
                run.status.as_str(),
                run.started_at.to_rfc3339(),
                run.completed_at.map(|dt| dt.to_rfc3339()),
                run.error,
            ],
        )?;

        Ok(())
    }

    /// Get a run owned by `user_id`
    pub fn get_run(&self, user_id: &str, id: &str) -> Result<Option<Run>> {
        let conn = self.lock()?;

        let run = conn
            .query_row(
                r#"
                SELECT id, thread_id, assistant_id, user_id, status,
                       started_at, completed_at, error
                FROM runs WHERE id = ?1 AND user_id = ?2
                "#,
                params![id, user_id],
                |row| {
                    Ok(Run {
                        id: row.get(0)?,
                        thread_id: row.get(1)?,
                        assistant_id: row.get(2)?,
                        user_id: row.get(3)?,
                        status: {
                            let status_str: String = row.get(4)?;
                            status_str.parse().unwrap_or_default()
                        },
                        started_at: parse_timestamp(&row.get::<_, String>(5)?),
                        completed_at: row
                            .get::<_, Option<String>>(6)?
                            .map(|ts| parse_timestamp(&ts)),
                        error: row.get(7)?,
                    })
                },
            )
            .optional()?;

        Ok(run)
    }

    /// Update a run's status. Finished runs keep their first terminal status.
    pub fn update_run_status(&self, id: &str, status: RunStatus, error: Option<&str>) -> Result<()> {
        let conn = self.lock()?;

        let completed_at = status.is_finished().then(|| Utc::now().to_rfc3339());

        conn.execute(
            r#"
            UPDATE runs SET status = ?1, error = COALESCE(?2, error),
                            completed_at = COALESCE(?3, completed_at)
            WHERE id = ?4 AND status NOT IN ('completed', 'failed', 'cancelled')
            "#,
            params![status.as_str(), error, completed_at, id],
        )?;

        Ok(())
    }
}

fn parse_timestamp(ts: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(ts)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
