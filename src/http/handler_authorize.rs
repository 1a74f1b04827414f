//! Authorization endpoint handlers.
//!
//! `GET /oauth/authorize` admits an authorization request and parks it behind
//! a session cookie while the resource owner authenticates on the interaction
//! surface. `POST /oauth/authorize` completes the flow and redirects back to
//! the client with a fresh authorization code.
//!
//! Both handlers report every failure as a redirect to
//! `/oauth/interaction/error`; no error body is ever rendered directly.

use axum::extract::{Query, State};
use axum::http::{HeaderMap, header};
use axum::response::{AppendHeaders, IntoResponse, Redirect, Response};

use crate::errors::ApiError;
use crate::http::context::AppState;
use crate::oauth::types::{AuthorizationRequest, AuthorizeQuery};

/// Name of the cookie carrying the opaque session identifier.
pub const SESSION_COOKIE_NAME: &str = "OAuthAuthorizationRequestId";

/// Path of the interaction surface the resource owner is sent to.
const INTERACTION_AUTHORIZE_PATH: &str = "/oauth/interaction/authorize";

/// Path of the interaction surface that renders errors.
const INTERACTION_ERROR_PATH: &str = "/oauth/interaction/error";

pub async fn handle_authorize_get(
    State(state): State<AppState>,
    Query(query): Query<AuthorizeQuery>,
) -> Response {
    let request = match AuthorizationRequest::try_from(query) {
        Ok(request) => request,
        Err(err) => return interaction_error_redirect(&err),
    };

    match state.auth_server.authorize(request).await {
        Ok(session_id) => {
            let cookie = session_cookie_value(
                &session_id,
                *state.config.cookie_secure.as_ref(),
                state.config.auth_request_ttl.as_ref().as_secs(),
            );
            (
                AppendHeaders([(header::SET_COOKIE, cookie)]),
                Redirect::to(INTERACTION_AUTHORIZE_PATH),
            )
                .into_response()
        }
        Err(err) => interaction_error_redirect(&err),
    }
}

pub async fn handle_authorize_post(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let Some(session_id) = extract_session_cookie(&headers) else {
        return interaction_error_redirect(&ApiError::invalid_request(
            "The request did not contain a required cookie.",
        ));
    };

    match state.auth_server.complete_authorization(&session_id).await {
        Ok(redirect) => Redirect::to(redirect.as_str()).into_response(),
        Err(err) => interaction_error_redirect(&err),
    }
}

fn session_cookie_value(session_id: &str, secure: bool, max_age_secs: u64) -> String {
    let mut cookie =
        format!("{SESSION_COOKIE_NAME}={session_id}; HttpOnly; Path=/; Max-Age={max_age_secs}");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn extract_session_cookie(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';').map(str::trim).find_map(|pair| {
        pair.strip_prefix(SESSION_COOKIE_NAME)
            .and_then(|rest| rest.strip_prefix('='))
            .map(str::to_string)
    })
}

/// Render an error as a redirect to the interaction error surface.
fn interaction_error_redirect(err: &ApiError) -> Response {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query.append_pair("type", err.kind.as_str());
    if let Some(description) = &err.description {
        query.append_pair("description", description);
    }
    if let Some(error_uri) = &err.error_uri {
        query.append_pair("errorUri", error_uri.as_str());
    }
    Redirect::to(&format!("{INTERACTION_ERROR_PATH}?{}", query.finish())).into_response()
}
