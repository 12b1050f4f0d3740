//! Runtime configuration resolved from defaults and environment overrides.
//!
//! Resolution never fails: a malformed override is ignored and the default
//! it would have replaced is kept.

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Default HTTP listen port.
pub const DEFAULT_PORT: u16 = 8080;
/// Default SQLite database location.
pub const DEFAULT_DATABASE_PATH: &str = "./data/sample.db";
/// Default environment name.
pub const DEFAULT_ENVIRONMENT: &str = "development";
/// Default directory for the landing page and `/static/*` files.
pub const DEFAULT_ASSET_ROOT: &str = ".";

/// Environment name that turns debug mode off.
const PRODUCTION: &str = "production";

/// Immutable runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    /// HTTP listen port.
    pub port: u16,
    /// Location of the SQLite database file.
    pub database_path: PathBuf,
    /// Environment name (`development`, `production`, ...).
    pub environment: String,
    /// Debug mode, derived from the environment name.
    pub debug: bool,
    /// Directory holding `index.html` and the files served under `/static/`.
    pub asset_root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            environment: DEFAULT_ENVIRONMENT.to_string(),
            debug: true,
            asset_root: PathBuf::from(DEFAULT_ASSET_ROOT),
        }
    }
}

/// Raw environment overrides, all optional and all strings so that parsing
/// never rejects the whole set because of one bad value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnvOverrides {
    /// `APP_PORT`
    #[serde(default)]
    pub app_port: Option<String>,
    /// `DATABASE_PATH`
    #[serde(default)]
    pub database_path: Option<String>,
    /// `GO_ENV`
    #[serde(default)]
    pub go_env: Option<String>,
    /// `STATIC_ROOT`
    #[serde(default)]
    pub static_root: Option<String>,
}

impl Config {
    /// Resolve configuration from defaults and the process environment,
    /// reading a `.env` file first if one exists.
    pub fn resolve() -> Self {
        dotenvy::dotenv().ok();

        let overrides = match envy::from_env::<EnvOverrides>() {
            Ok(overrides) => overrides,
            Err(e) => {
                warn!("Ignoring unreadable environment overrides: {}", e);
                EnvOverrides::default()
            }
        };

        let config = Self::from_overrides(overrides);
        info!(
            port = config.port,
            database_path = %config.database_path.display(),
            environment = %config.environment,
            debug = config.debug,
            asset_root = %config.asset_root.display(),
            "Configuration loaded"
        );
        config
    }

    /// Apply overrides on top of the defaults.
    pub fn from_overrides(overrides: EnvOverrides) -> Self {
        let mut config = Self::default();

        if let Some(port) = overrides.app_port.as_deref().and_then(parse_port) {
            config.port = port;
        }

        if let Some(path) = non_empty(overrides.database_path) {
            config.database_path = PathBuf::from(path);
        }

        if let Some(env) = non_empty(overrides.go_env) {
            config.debug = env != PRODUCTION;
            config.environment = env;
        }

        if let Some(root) = non_empty(overrides.static_root) {
            config.asset_root = PathBuf::from(root);
        }

        config
    }

    /// Address the listener binds to (all interfaces).
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

fn parse_port(raw: &str) -> Option<u16> {
    raw.trim().parse::<u16>().ok().filter(|port| *port > 0)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overrides(port: Option<&str>, db: Option<&str>, env: Option<&str>) -> EnvOverrides {
        EnvOverrides {
            app_port: port.map(str::to_string),
            database_path: db.map(str::to_string),
            go_env: env.map(str::to_string),
            static_root: None,
        }
    }

    #[test]
    fn defaults_without_overrides() {
        let config = Config::from_overrides(EnvOverrides::default());
        assert_eq!(config, Config::default());
        assert_eq!(config.port, 8080);
        assert_eq!(config.database_path, PathBuf::from("./data/sample.db"));
        assert_eq!(config.environment, "development");
        assert!(config.debug);
    }

    #[test]
    fn valid_port_overrides_default() {
        let config = Config::from_overrides(overrides(Some("9090"), None, None));
        assert_eq!(config.port, 9090);
    }

    #[test]
    fn malformed_port_is_ignored() {
        for raw in ["abc", "-1", "0", "70000", ""] {
            let config = Config::from_overrides(overrides(Some(raw), None, None));
            assert_eq!(config.port, DEFAULT_PORT, "port override {raw:?}");
        }
    }

    #[test]
    fn empty_database_path_is_ignored() {
        let config = Config::from_overrides(overrides(None, Some(""), None));
        assert_eq!(config.database_path, PathBuf::from(DEFAULT_DATABASE_PATH));

        let config = Config::from_overrides(overrides(None, Some("/tmp/app.db"), None));
        assert_eq!(config.database_path, PathBuf::from("/tmp/app.db"));
    }

    #[test]
    fn production_environment_disables_debug() {
        let config = Config::from_overrides(overrides(None, None, Some("production")));
        assert_eq!(config.environment, "production");
        assert!(!config.debug);

        let config = Config::from_overrides(overrides(None, None, Some("staging")));
        assert_eq!(config.environment, "staging");
        assert!(config.debug);
    }

    #[test]
    fn listen_addr_binds_all_interfaces() {
        let config = Config::from_overrides(overrides(Some("3000"), None, None));
        assert_eq!(config.listen_addr().to_string(), "0.0.0.0:3000");
    }
}
