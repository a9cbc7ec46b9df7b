//! Store handle, connection setup, and schema migrations.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};

/// Handle to the SQLite mirror database.
///
/// Cheap to clone; all clones share a single connection guarded by a
/// mutex. Events are soft-deleted so history survives provider removals,
/// while logged meetings are append-only with link columns backfilled
/// after their side effects resolve.
#[derive(Clone)]
pub struct MirrorStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    connection: Mutex<Connection>,
}

impl MirrorStore {
    /// Opens (or creates) the mirror database at the given path.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let store = Self::from_connection(Connection::open(path)?)?;
        info!("mirror database ready at {}", path.display());
        Ok(store)
    }

    /// Opens a throwaway in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(connection: Connection) -> StoreResult<Self> {
        configure_connection(&connection)?;
        let store = Self {
            inner: Arc::new(StoreInner {
                connection: Mutex::new(connection),
            }),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub(crate) fn connection(&self) -> MutexGuard<'_, Connection> {
        self.inner.connection.lock()
    }

    fn run_migrations(&self) -> StoreResult<()> {
        let conn = self.connection();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS canonical_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                external_id TEXT NOT NULL,
                provider TEXT NOT NULL,
                user_id TEXT,
                lead_id TEXT,
                title TEXT NOT NULL,
                description TEXT,
                start_time INTEGER NOT NULL,
                end_time INTEGER NOT NULL,
                timezone TEXT,
                is_all_day INTEGER NOT NULL DEFAULT 0,
                location_kind TEXT NOT NULL DEFAULT 'other',
                location_details TEXT,
                attendees TEXT,
                organizer_email TEXT,
                organizer_name TEXT NOT NULL,
                is_online_meeting INTEGER NOT NULL DEFAULT 0,
                online_meeting_provider TEXT,
                outcome TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                updated_at INTEGER NOT NULL,
                UNIQUE(provider, external_id)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_events_start_time
             ON canonical_events(start_time)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_events_user
             ON canonical_events(user_id, is_active)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_events_lead
             ON canonical_events(lead_id)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS logged_meetings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                kind TEXT NOT NULL,
                virtual_provider TEXT,
                occurred_at INTEGER NOT NULL,
                duration_minutes INTEGER NOT NULL,
                summary TEXT,
                outcome TEXT NOT NULL,
                participants TEXT,
                lead_id TEXT,
                logged_by TEXT NOT NULL,
                organization_id TEXT NOT NULL,
                activity_id TEXT,
                follow_up_task_id TEXT,
                attachment_key TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_meetings_occurred_at
             ON logged_meetings(occurred_at)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_meetings_org
             ON logged_meetings(organization_id, is_active)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_meetings_lead
             ON logged_meetings(lead_id)",
            [],
        )?;

        debug!("schema migrations completed");
        Ok(())
    }
}

fn configure_connection(connection: &Connection) -> StoreResult<()> {
    connection.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;",
    )?;
    Ok(())
}

pub(crate) fn encode_json<T: serde::Serialize>(
    field: &'static str,
    value: &T,
) -> StoreResult<String> {
    serde_json::to_string(value).map_err(|source| StoreError::Encode { field, source })
}
