//! Application state shared across request handlers.

use std::sync::Arc;

use crate::config::Config;
use crate::oauth::AuthorizationServer;
use crate::storage::OAuthStorage;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// OAuth storage for clients, pending requests, codes, and refresh tokens
    pub storage: Arc<dyn OAuthStorage>,
    /// Protocol state machine driving the authorization-code lifecycle
    pub auth_server: Arc<AuthorizationServer>,
}
