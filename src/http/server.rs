//! Router configuration for the authorization server endpoints.

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use super::context::AppState;
use super::handler_authorize::{handle_authorize_get, handle_authorize_post};
use super::handler_token::handle_token;

/// Build the application router
pub fn build_router(ctx: AppState) -> Router {
    Router::new()
        .route(
            "/oauth/authorize",
            get(handle_authorize_get).post(handle_authorize_post),
        )
        .route("/oauth/token", post(handle_token))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
