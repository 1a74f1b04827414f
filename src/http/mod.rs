//! HTTP layer: router, shared state, and endpoint handlers.

pub mod context;
pub mod handler_authorize;
pub mod handler_token;
pub mod server;

pub use context::AppState;
pub use server::build_router;
