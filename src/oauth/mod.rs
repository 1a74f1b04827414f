//! OAuth 2.1 authorization server modules.

pub mod auth_server;
pub mod client_assertion;
pub mod pkce;
pub mod redirect_uri;
pub mod types;

pub use auth_server::{ACCESS_TOKEN_EXPIRES_IN, AuthorizationServer};
pub use client_assertion::JWT_BEARER_ASSERTION_TYPE;
pub use types::*;
