//! SQLite-backed store.
//!
//! Connections come from a small pool. A request checks one out for the
//! duration of its query and returns it afterwards, so concurrent requests
//! run on separate connections and never wait on each other.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rusqlite::{params, Connection, OpenFlags, Row};
use tracing::{debug, warn};

use super::models::{Project, User};
use crate::error::StoreError;

/// Idle connections kept open for reuse.
pub const POOL_SIZE: usize = 8;
/// How long a connection waits on a database lock held by another writer.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

static MEMORY_DB_ID: AtomicU64 = AtomicU64::new(0);

struct Pool {
    target: PathBuf,
    flags: OpenFlags,
    idle: Mutex<Vec<Connection>>,
    // Keeps a shared in-memory database alive while the pool exists.
    _anchor: Option<Mutex<Connection>>,
}

impl Pool {
    fn connect(&self) -> rusqlite::Result<Connection> {
        let conn = Connection::open_with_flags(&self.target, self.flags)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }

    fn checkout(&self) -> Result<Connection, StoreError> {
        // The idle list is only pushed to and popped from, so a panic
        // elsewhere cannot leave it inconsistent.
        let pooled = self
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        match pooled {
            Some(conn) => Ok(conn),
            None => self.connect().map_err(StoreError::Open),
        }
    }

    fn checkin(&self, conn: Connection) {
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < POOL_SIZE {
            idle.push(conn);
        }
    }
}

/// Handle to an open SQLite database.
///
/// Cloning is cheap; all clones share one connection pool. Queries run on
/// the blocking thread pool so they never stall the async workers.
#[derive(Clone)]
pub struct SqliteStore {
    pool: Arc<Pool>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("target", &self.pool.target)
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open an existing database file read-write and verify it answers.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if !path.is_file() {
            return Err(StoreError::NotFound(path.to_path_buf()));
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let pool = Pool {
            target: path.to_path_buf(),
            flags,
            idle: Mutex::new(Vec::with_capacity(POOL_SIZE)),
            _anchor: None,
        };

        let conn = pool.connect().map_err(StoreError::Open)?;
        ping_conn(&conn).map_err(StoreError::Ping)?;
        pool.checkin(conn);

        debug!(path = %path.display(), "SQLite database opened");
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Fresh private in-memory database shared by every pooled connection.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let id = MEMORY_DB_ID.fetch_add(1, Ordering::Relaxed);
        let target = PathBuf::from(format!(
            "file:project_api_mem_{}_{}?mode=memory&cache=shared",
            std::process::id(),
            id
        ));
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let anchor = Connection::open_with_flags(&target, flags).map_err(StoreError::Open)?;
        Ok(Self {
            pool: Arc::new(Pool {
                target,
                flags,
                idle: Mutex::new(Vec::with_capacity(POOL_SIZE)),
                _anchor: Some(Mutex::new(anchor)),
            }),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let pool = Arc::clone(&self.pool);
        tokio::task::spawn_blocking(move || {
            let conn = pool.checkout()?;
            let result = f(&conn);
            pool.checkin(conn);
            result
        })
        .await?
    }

    /// Liveness check.
    pub async fn ping(&self) -> Result<(), StoreError> {
        self.with_conn(|conn| ping_conn(conn).map_err(StoreError::Ping))
            .await
    }

    /// Active users, newest first, bounded by `limit`/`offset`.
    pub async fn list_active_users(&self, limit: i64, offset: i64) -> Result<Vec<User>, StoreError> {
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {} FROM users WHERE is_active = 1 ORDER BY created_at DESC LIMIT ?1 OFFSET ?2",
                User::COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![limit, offset], User::from_row)?;
            Ok(collect_with_skip(rows, "user"))
        })
        .await
    }

    /// All projects, newest first.
    pub async fn list_projects(&self) -> Result<Vec<Project>, StoreError> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM projects ORDER BY created_at DESC",
                Project::COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], Project::from_row)?;
            Ok(collect_with_skip(rows, "project"))
        })
        .await
    }

    /// Number of active users.
    pub async fn count_active_users(&self) -> Result<i64, StoreError> {
        self.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM users WHERE is_active = 1", [], |row| {
                row.get(0)
            })?)
        })
        .await
    }

    /// Project counts keyed by status.
    pub async fn count_projects_by_status(&self) -> Result<BTreeMap<String, i64>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM projects GROUP BY status")?;
            let rows = stmt.query_map([], |row: &Row<'_>| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            Ok(collect_with_skip(rows, "project status count")
                .into_iter()
                .collect())
        })
        .await
    }

    /// Number of tasks.
    pub async fn count_tasks(&self) -> Result<i64, StoreError> {
        self.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))?)
        })
        .await
    }
}

fn ping_conn(conn: &Connection) -> rusqlite::Result<()> {
    // Touches the schema page, so a file that is not a database fails here.
    conn.query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| {
        row.get::<_, i64>(0)
    })
    .map(|_| ())
}

/// Collect scanned rows, logging and dropping any row that fails to scan.
pub(crate) fn collect_with_skip<T, I>(rows: I, kind: &str) -> Vec<T>
where
    I: IntoIterator<Item = rusqlite::Result<T>>,
{
    rows.into_iter()
        .fold(Vec::new(), |mut acc, row| {
            match row {
                Ok(item) => acc.push(item),
                Err(e) => warn!("Error scanning {} row: {}", kind, e),
            }
            acc
        })
}
