//! Service context shared with every handler.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::store::Store;

/// Version reported by health and statistics.
pub const SERVER_VERSION: &str = "1.0.0";

/// Read-only state built once at startup.
///
/// Holds no mutable business state; the store owns all durable data.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Resolved configuration.
    pub config: Arc<Config>,
    /// Store attachment.
    pub store: Store,
    started_at: Instant,
}

impl AppState {
    /// Create state, capturing the start instant now.
    pub fn new(config: Config, store: Store) -> Self {
        Self::started_at(config, store, Instant::now())
    }

    /// Create state with an explicit start instant.
    pub fn started_at(config: Config, store: Store, started_at: Instant) -> Self {
        Self {
            config: Arc::new(config),
            store,
            started_at,
        }
    }

    /// Time since startup.
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uptime_counts_from_start() {
        let Some(start) = Instant::now().checked_sub(Duration::from_secs(2)) else {
            return;
        };
        let state = AppState::started_at(Config::default(), Store::Unavailable, start);
        assert!(state.uptime() >= Duration::from_secs(2));
    }
}
