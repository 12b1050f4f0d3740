//! Optional relational store.
//!
//! The service runs with or without a database. [`Store`] makes that explicit:
//! handlers match on it instead of checking for a missing handle.

pub mod models;
pub mod sqlite;

use std::path::Path;

use tracing::{info, warn};

pub use models::{Budget, Priority, Project, ProjectStatus, User};
pub use sqlite::SqliteStore;

use crate::error::StoreError;

/// Store attachment state, fixed at startup.
#[derive(Debug, Clone)]
pub enum Store {
    /// A live database handle.
    Connected(SqliteStore),
    /// No database; the service runs degraded.
    Unavailable,
}

impl Store {
    /// Open and ping the database at `path`.
    pub fn connect(path: &Path) -> Result<Self, StoreError> {
        SqliteStore::open(path).map(Store::Connected)
    }

    /// Like [`Store::connect`], but a failure yields [`Store::Unavailable`]
    /// after logging a warning.
    pub fn connect_or_degrade(path: &Path) -> Self {
        match Self::connect(path) {
            Ok(store) => {
                info!(path = %path.display(), "Database connected successfully");
                store
            }
            Err(e) => {
                warn!("{}; continuing without database", e);
                Store::Unavailable
            }
        }
    }

    /// The live handle, if any.
    pub fn connected(&self) -> Option<&SqliteStore> {
        match self {
            Store::Connected(store) => Some(store),
            Store::Unavailable => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Store::Connected(_))
    }
}
