//! Standardized error types following the `error-oasd-<domain>-<number>` format,
//! plus the fixed OAuth error taxonomy surfaced to clients.

use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Configuration errors that occur during application startup
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Error when a required environment variable is not set
    #[error("error-oasd-config-1 {0} must be set")]
    EnvVarRequired(String),

    /// Error when PORT cannot be parsed
    #[error("error-oasd-config-2 Parsing PORT into u16 failed: {0:?}")]
    PortParsingFailed(std::num::ParseIntError),

    /// Error when version information is not available
    #[error("error-oasd-config-3 One of GIT_HASH or CARGO_PKG_VERSION must be set")]
    VersionNotSet,

    /// Error when duration string cannot be parsed
    #[error("error-oasd-config-4 Failed to parse duration '{0}': {1}")]
    DurationParsingFailed(String, String),

    /// Error when boolean string cannot be parsed
    #[error(
        "error-oasd-config-5 Failed to parse boolean '{0}': expected true/false/1/0/yes/no/on/off"
    )]
    BoolParsingFailed(String),

    /// Error when the external base URL cannot be parsed
    #[error("error-oasd-config-6 Unable to parse EXTERNAL_BASE '{0}': {1}")]
    ExternalBaseParsingFailed(String, url::ParseError),

    /// Error when the client seed file cannot be read or parsed
    #[error("error-oasd-config-7 Failed to load client seed file '{0}': {1}")]
    ClientSeedFailed(String, String),
}

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Error when a backing store cannot be reached or created
    #[error("error-oasd-storage-1 Connection failed: {0}")]
    ConnectionFailed(String),

    /// Error when a store operation fails
    #[error("error-oasd-storage-2 Query execution failed: {0}")]
    QueryFailed(String),

    /// Error when stored data is invalid
    #[error("error-oasd-storage-3 Invalid data: {0}")]
    InvalidData(String),
}

/// Fixed OAuth 2.1 error vocabulary (RFC 6749 Section 5.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRequest,
    InvalidClient,
    InvalidGrant,
    UnauthorizedClient,
    UnsupportedGrantType,
    InvalidScope,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::InvalidClient => "invalid_client",
            ErrorKind::InvalidGrant => "invalid_grant",
            ErrorKind::UnauthorizedClient => "unauthorized_client",
            ErrorKind::UnsupportedGrantType => "unsupported_grant_type",
            ErrorKind::InvalidScope => "invalid_scope",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Protocol-level error surfaced to OAuth clients.
///
/// Carries one of the six taxonomy kinds plus an optional human-readable
/// description and an optional reference URI. Rendered at the boundary either
/// as an interaction-error redirect (authorization phase) or as a JSON error
/// body (token phase).
#[derive(Debug, Clone, Error)]
#[error("{kind}: {}", description.as_deref().unwrap_or("no further details"))]
pub struct ApiError {
    pub kind: ErrorKind,
    pub description: Option<String>,
    pub error_uri: Option<Url>,
}

impl ApiError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            description: None,
            error_uri: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_error_uri(mut self, error_uri: Url) -> Self {
        self.error_uri = Some(error_uri);
        self
    }

    pub fn invalid_request(description: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest).with_description(description)
    }

    pub fn invalid_client(description: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidClient).with_description(description)
    }

    pub fn invalid_grant(description: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidGrant).with_description(description)
    }

    pub fn unsupported_grant_type(description: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedGrantType).with_description(description)
    }

    /// HTTP status for this error kind. Every defined kind currently maps to
    /// 400; the mapping is isolated here so it can be extended per-kind.
    pub fn status_code(&self) -> StatusCode {
        match self.kind {
            ErrorKind::InvalidRequest
            | ErrorKind::InvalidClient
            | ErrorKind::InvalidGrant
            | ErrorKind::UnauthorizedClient
            | ErrorKind::UnsupportedGrantType
            | ErrorKind::InvalidScope => StatusCode::BAD_REQUEST,
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.kind,
            error_description: self.description.clone(),
            error_uri: self.error_uri.as_ref().map(|u| u.to_string()),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        tracing::error!(error = %err, "storage failure during request processing");
        ApiError::invalid_request("The server was unable to process the request.")
    }
}

/// JSON error body returned by the token endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_uri: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), axum::Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_wire_names() {
        assert_eq!(ErrorKind::InvalidRequest.as_str(), "invalid_request");
        assert_eq!(ErrorKind::InvalidClient.as_str(), "invalid_client");
        assert_eq!(ErrorKind::InvalidGrant.as_str(), "invalid_grant");
        assert_eq!(ErrorKind::UnauthorizedClient.as_str(), "unauthorized_client");
        assert_eq!(
            ErrorKind::UnsupportedGrantType.as_str(),
            "unsupported_grant_type"
        );
        assert_eq!(ErrorKind::InvalidScope.as_str(), "invalid_scope");
    }

    #[test]
    fn test_all_kinds_map_to_bad_request() {
        for kind in [
            ErrorKind::InvalidRequest,
            ErrorKind::InvalidClient,
            ErrorKind::InvalidGrant,
            ErrorKind::UnauthorizedClient,
            ErrorKind::UnsupportedGrantType,
            ErrorKind::InvalidScope,
        ] {
            assert_eq!(ApiError::new(kind).status_code(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn test_body_omits_absent_fields() {
        let body = ApiError::new(ErrorKind::InvalidGrant).body();
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json, serde_json::json!({"error": "invalid_grant"}));
    }

    #[test]
    fn test_body_carries_description_and_uri() {
        let body = ApiError::invalid_request("The property `code` must be provided.")
            .with_error_uri(Url::parse("https://errors.example/invalid_request").unwrap())
            .body();
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"], "invalid_request");
        assert_eq!(
            json["error_description"],
            "The property `code` must be provided."
        );
        assert_eq!(json["error_uri"], "https://errors.example/invalid_request");
    }
}
