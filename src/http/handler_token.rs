//! Token endpoint handler.
//!
//! `POST /oauth/token` exchanges an authorization code for tokens. Failures
//! are rendered as JSON error bodies; `ApiError` implements `IntoResponse`
//! with the taxonomy status mapping.

use axum::Form;
use axum::Json;
use axum::extract::State;

use crate::errors::ApiError;
use crate::http::context::AppState;
use crate::oauth::types::{TokenForm, TokenRequest, TokenResponse};

pub async fn handle_token(
    State(state): State<AppState>,
    Form(form): Form<TokenForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    let request = TokenRequest::try_from(form)?;
    let response = state.auth_server.token(request).await?;
    Ok(Json(response))
}
