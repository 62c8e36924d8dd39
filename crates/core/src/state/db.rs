//! # Petmind Database
//!
//! Single SQLite database shared by the chat history, questionnaire and facts
//! stores. Defaults to `.petmind/petmind.db`.
//!
//! On-disk databases run in WAL mode and every store call opens its own
//! connection, so one slow query never holds up another source. An
//! in-memory database exists only inside its one connection, which calls
//! share behind a mutex.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::memory::MemoryError;

/// Schema version for migrations
const SCHEMA_VERSION: i32 = 1;

/// How long a call waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Default on-disk location
pub const DEFAULT_DB_PATH: &str = ".petmind/petmind.db";

#[derive(Clone)]
enum Backend {
    File(Arc<PathBuf>),
    Memory(Arc<Mutex<Connection>>),
}

/// Database handle shared by every store
#[derive(Clone)]
pub struct PetmindDb {
    backend: Backend,
}

impl PetmindDb {
    /// Open or create the database at a specific path
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let conn = open_file(path)
            .with_context(|| format!("Failed to open petmind database at {}", path.display()))?;
        let mode: String = conn
            .query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))
            .context("Failed to enable WAL mode")?;
        tracing::debug!("Opened {} in {} mode", path.display(), mode);

        Self::run_migrations(&conn)?;
        Ok(Self {
            backend: Backend::File(Arc::new(path.to_path_buf())),
        })
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::run_migrations(&conn)?;
        Ok(Self {
            backend: Backend::Memory(Arc::new(Mutex::new(conn))),
        })
    }

    /// Run a closure against a connection on the blocking pool.
    pub(crate) async fn with_connection<T, F>(&self, f: F) -> std::result::Result<T, MemoryError>
    where
        F: FnOnce(&mut Connection) -> std::result::Result<T, MemoryError> + Send + 'static,
        T: Send + 'static,
    {
        let backend = self.backend.clone();
        tokio::task::spawn_blocking(move || match backend {
            Backend::File(path) => {
                let mut conn = open_file(&path)?;
                f(&mut conn)
            }
            Backend::Memory(conn) => {
                let mut guard = conn
                    .lock()
                    .map_err(|e| MemoryError::unavailable(format!("Lock error: {}", e)))?;
                f(&mut guard)
            }
        })
        .await
        .map_err(|e| MemoryError::unavailable(format!("storage task failed: {}", e)))?
    }

    /// Run raw SQL, for fixtures
    #[cfg(test)]
    pub(crate) async fn execute_batch(&self, sql: &str) {
        let sql = sql.to_string();
        self.with_connection(move |conn| Ok(conn.execute_batch(&sql)?))
            .await
            .unwrap()
    }

    /// Run schema migrations
    fn run_migrations(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY)",
            [],
        )?;

        let current_version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        if current_version < 1 {
            Self::migrate_v1(conn)?;
            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
                [1],
            )?;
        }

        Ok(())
    }

    /// Migration to version 1 - chat history, questionnaire and facts
    fn migrate_v1(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS chat_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                role TEXT NOT NULL,
                message TEXT NOT NULL,
                timestamp TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS questionnaire (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                breed TEXT NOT NULL,
                age INTEGER NOT NULL,
                name TEXT NOT NULL,
                temperament TEXT NOT NULL DEFAULT '',
                timestamp TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS facts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                collection TEXT NOT NULL,
                content TEXT NOT NULL,
                embedding TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_chat_history_user
                ON chat_history(user_id, timestamp);
            CREATE INDEX IF NOT EXISTS idx_questionnaire_user
                ON questionnaire(user_id, timestamp);
            CREATE INDEX IF NOT EXISTS idx_facts_collection
                ON facts(collection);
            "#,
        )
        .context("Failed to apply schema version 1")?;

        tracing::info!(
            "PetmindDb initialized with schema version {}",
            SCHEMA_VERSION
        );

        Ok(())
    }
}

fn open_file(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(conn)
}

/// Encode a timestamp the way every table stores it (RFC 3339, microseconds, UTC).
///
/// Older rows may hold SQLite's `YYYY-MM-DD HH:MM:SS` form, so queries order
/// by `julianday(timestamp)` rather than by the raw text.
pub(crate) fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Decode a stored timestamp; also accepts SQLite's `CURRENT_TIMESTAMP` form.
pub(crate) fn decode_timestamp(raw: &str) -> std::result::Result<DateTime<Utc>, MemoryError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| MemoryError::malformed(format!("bad timestamp '{}': {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_petmind_db_open_creates_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("petmind.db");
        PetmindDb::open_at(&path).unwrap();

        let conn = Connection::open(&path).unwrap();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(tables.contains(&"chat_history".to_string()));
        assert!(tables.contains(&"questionnaire".to_string()));
        assert!(tables.contains(&"facts".to_string()));

        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[test]
    fn test_schema_version_tracking() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/petmind.db");

        // Open twice - should not fail on second open
        let db1 = PetmindDb::open_at(&path).unwrap();
        drop(db1);
        PetmindDb::open_at(&path).unwrap();

        let conn = Connection::open(&path).unwrap();
        let version: i32 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                row.get(0)
            })
            .unwrap();

        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_timestamp_round_trip_and_sqlite_form() {
        let ts = decode_timestamp("2024-05-01T10:00:00.000001Z").unwrap();
        assert_eq!(encode_timestamp(&ts), "2024-05-01T10:00:00.000001Z");

        let legacy = decode_timestamp("2024-05-01 10:00:00").unwrap();
        assert!(legacy < ts);
        assert!(decode_timestamp("yesterday").is_err());
    }

    #[tokio::test]
    async fn test_with_connection_runs_query() {
        let db = PetmindDb::open_in_memory().unwrap();
        let count = db
            .with_connection(|conn| {
                let n: i64 =
                    conn.query_row("SELECT COUNT(*) FROM chat_history", [], |row| row.get(0))?;
                Ok(n)
            })
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_slow_call_does_not_block_other_calls() {
        let dir = tempfile::tempdir().unwrap();
        let db = PetmindDb::open_at(dir.path().join("petmind.db")).unwrap();

        let slow_db = db.clone();
        let slow = tokio::spawn(async move {
            slow_db
                .with_connection(|conn| {
                    conn.query_row("SELECT COUNT(*) FROM facts", [], |row| row.get::<_, i64>(0))?;
                    std::thread::sleep(Duration::from_millis(600));
                    Ok(())
                })
                .await
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let started = Instant::now();
        let count: i64 = db
            .with_connection(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM chat_history", [], |row| row.get(0))?)
            })
            .await
            .unwrap();
        assert_eq!(count, 0);
        assert!(started.elapsed() < Duration::from_millis(400));

        slow.await.unwrap().unwrap();
    }
}
