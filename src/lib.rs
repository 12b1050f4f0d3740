//! Small JSON HTTP API over an optional SQLite store.
//!
//! The service lists users and projects, acknowledges new users, reports
//! aggregate statistics and serves a landing page with static files. It keeps
//! working without a database: health reports unhealthy, data endpoints
//! answer with error envelopes, static content is still served.
//!
//! # Request flow
//!
//! ```text
//! listener -> access control -> request logging -> router -> handler -> store
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration from defaults and environment overrides
//! - [`error`]: Store, server and handler error types
//! - [`store`]: Optional SQLite store and row types
//! - [`api`]: Envelope, middleware, routes and handlers
//! - [`server`]: Listener lifecycle and connection limits
//! - [`metrics`]: Request metrics
//! - [`utils`]: Utility functions

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod server;
pub mod store;
pub mod utils;

pub use config::Config;
pub use error::{ApiError, ServerError, StoreError};
pub use store::Store;
