//! HTTP API: envelope, middleware, routes and handlers.

pub mod assets;
pub mod envelope;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

pub use envelope::ApiResponse;
pub use routes::create_router;
pub use state::AppState;
