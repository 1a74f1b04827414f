//! OAuth 2.1 core types and data structures.
//!
//! Defines the client/grant data model, request forms with boundary
//! validation, and opaque token generation.

use base64::prelude::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::errors::ApiError;

/// OAuth 2.1 Grant Types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    AuthorizationCode,
    RefreshToken,
    ClientCredentials,
}

/// OAuth 2.1 Token Types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Bearer,
}

/// Client Type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientType {
    Public,
    Confidential,
}

/// PKCE code challenge methods (RFC 7636)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodeChallengeMethod {
    #[default]
    #[serde(rename = "plain")]
    Plain,
    S256,
}

impl CodeChallengeMethod {
    /// Parse a challenge method, naming the offending property on failure.
    pub fn parse(value: &str, property: &str) -> Result<Self, ApiError> {
        match value {
            "plain" => Ok(CodeChallengeMethod::Plain),
            "S256" => Ok(CodeChallengeMethod::S256),
            other => Err(ApiError::invalid_request(format!(
                "The value `{other}` is not a valid value for the property `{property}`. \
                 Legal options include `plain` and `S256`."
            ))),
        }
    }
}

/// Registered OAuth client profile.
///
/// Registration and persistence are external; records are immutable once
/// stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    /// Unique client identifier
    pub client_id: Uuid,
    /// Client type (public or confidential)
    pub client_type: ClientType,
    /// PEM-encoded public key, present only for confidential clients using
    /// private-key JWT authentication
    pub client_public_key: Option<String>,
    /// Registered redirect URIs (non-empty, each passing the redirect URI policy)
    pub redirect_uris: Vec<Url>,
}

/// Admitted authorization request held until the resource owner completes
/// authentication, keyed by an opaque session identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingAuthorizationRequest {
    pub client_id: Uuid,
    pub code_challenge: String,
    pub code_challenge_method: CodeChallengeMethod,
    /// Always resolved to a concrete value before storage
    pub redirect_uri: Url,
    pub scope: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PendingAuthorizationRequest {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Stored authorization code metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationCodeInfo {
    /// The opaque code value, used as the storage key
    pub code: String,
    pub client_id: Uuid,
    pub code_challenge: String,
    pub code_challenge_method: CodeChallengeMethod,
    pub redirect_uri: Url,
    pub scope: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Whether this code has been redeemed
    pub is_used: bool,
    /// Refresh token bound after the first successful redemption; revoked if
    /// the code is ever presented again
    pub refresh_token: Option<String>,
}

impl AuthorizationCodeInfo {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Successful output of the token exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: TokenType,
    /// Seconds until the access token expires
    pub expires_in: u64,
    /// Copied from the redeemed authorization code
    pub scope: String,
}

/// Raw query parameters for the authorization endpoint.
///
/// Everything is optional at this layer so that missing or malformed values
/// surface as taxonomy errors with property-aware messages instead of a
/// framework rejection.
#[derive(Debug, Deserialize)]
pub struct AuthorizeQuery {
    pub response_type: Option<String>,
    pub client_id: Option<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
    pub redirect_uri: Option<String>,
    pub scope: Option<String>,
    pub state: Option<String>,
}

/// Validated authorization request.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub client_id: Uuid,
    pub code_challenge: String,
    pub code_challenge_method: CodeChallengeMethod,
    pub redirect_uri: Option<Url>,
    pub scope: String,
    pub state: String,
}

impl TryFrom<AuthorizeQuery> for AuthorizationRequest {
    type Error = ApiError;

    fn try_from(query: AuthorizeQuery) -> Result<Self, Self::Error> {
        let response_type = require(query.response_type, "response_type")?;
        if response_type != "code" {
            return Err(ApiError::invalid_request(format!(
                "The value `{response_type}` is not a valid value for the property \
                 `response_type`. The only legal option is `code`."
            )));
        }

        let client_id = parse_client_id(&require(query.client_id, "client_id")?)?;
        let code_challenge = require(query.code_challenge, "code_challenge")?;
        let code_challenge_method = match query.code_challenge_method {
            Some(method) => CodeChallengeMethod::parse(&method, "code_challenge_method")?,
            None => CodeChallengeMethod::default(),
        };
        let redirect_uri = query
            .redirect_uri
            .map(|uri| parse_url(&uri, "redirect_uri"))
            .transpose()?;
        let scope = require(query.scope, "scope")?;
        let state = require(query.state, "state")?;

        Ok(Self {
            client_id,
            code_challenge,
            code_challenge_method,
            redirect_uri,
            scope,
            state,
        })
    }
}

/// Raw form body for the token endpoint.
#[derive(Debug, Deserialize)]
pub struct TokenForm {
    pub grant_type: Option<String>,
    pub client_id: Option<String>,
    pub code: Option<String>,
    pub code_verifier: Option<String>,
    pub redirect_uri: Option<String>,
    /// JWT client assertion for private-key JWT authentication (RFC 7523)
    pub client_assertion: Option<String>,
    /// Should be "urn:ietf:params:oauth:client-assertion-type:jwt-bearer"
    pub client_assertion_type: Option<String>,
}

/// Validated token request.
#[derive(Debug, Clone)]
pub struct TokenRequest {
    pub grant_type: GrantType,
    pub client_id: Option<Uuid>,
    pub code: String,
    pub code_verifier: String,
    pub redirect_uri: Option<Url>,
    pub client_assertion: Option<String>,
    pub client_assertion_type: Option<String>,
}

impl TryFrom<TokenForm> for TokenRequest {
    type Error = ApiError;

    fn try_from(form: TokenForm) -> Result<Self, Self::Error> {
        let grant_type = match require(form.grant_type, "grant_type")?.as_str() {
            "authorization_code" => GrantType::AuthorizationCode,
            "refresh_token" => GrantType::RefreshToken,
            "client_credentials" => GrantType::ClientCredentials,
            other => {
                return Err(ApiError::unsupported_grant_type(format!(
                    "The grant type `{other}` is not supported."
                )));
            }
        };

        let client_id = form.client_id.as_deref().map(parse_client_id).transpose()?;
        let code = require(form.code, "code")?;
        let code_verifier = require(form.code_verifier, "code_verifier")?;
        let redirect_uri = form
            .redirect_uri
            .map(|uri| parse_url(&uri, "redirect_uri"))
            .transpose()?;

        Ok(Self {
            grant_type,
            client_id,
            code,
            code_verifier,
            redirect_uri,
            client_assertion: form.client_assertion,
            client_assertion_type: form.client_assertion_type,
        })
    }
}

fn require(value: Option<String>, property: &str) -> Result<String, ApiError> {
    value.ok_or_else(|| {
        ApiError::invalid_request(format!("The property `{property}` must be provided."))
    })
}

/// Parse a client identifier; any non-UUID value is rejected before reaching
/// business logic.
pub fn parse_client_id(value: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(value).map_err(|_| {
        ApiError::invalid_request("The property `client_id` must be a valid UUID.".to_string())
    })
}

fn parse_url(value: &str, property: &str) -> Result<Url, ApiError> {
    Url::parse(value).map_err(|_| {
        ApiError::invalid_request(format!("The property `{property}` must be a valid URL."))
    })
}

/// Generate a secure random token
pub fn generate_token() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.r#gen();
    BASE64_URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate an authorization code: high-entropy, unguessable, opaque
pub fn generate_authorization_code() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let mut bytes = [0u8; 48];
    rng.fill(&mut bytes[..]);
    BASE64_URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_query() -> AuthorizeQuery {
        AuthorizeQuery {
            response_type: Some("code".to_string()),
            client_id: Some(Uuid::new_v4().to_string()),
            code_challenge: Some("challenge".to_string()),
            code_challenge_method: Some("S256".to_string()),
            redirect_uri: Some("https://app.example/cb".to_string()),
            scope: Some("read".to_string()),
            state: Some("xyz".to_string()),
        }
    }

    #[test]
    fn test_authorize_query_accepted() {
        let request = AuthorizationRequest::try_from(base_query()).unwrap();
        assert_eq!(request.code_challenge_method, CodeChallengeMethod::S256);
        assert_eq!(
            request.redirect_uri.unwrap().as_str(),
            "https://app.example/cb"
        );
    }

    #[test]
    fn test_authorize_query_missing_client_id() {
        let mut query = base_query();
        query.client_id = None;
        let err = AuthorizationRequest::try_from(query).unwrap_err();
        assert_eq!(
            err.description.unwrap(),
            "The property `client_id` must be provided."
        );
    }

    #[test]
    fn test_authorize_query_non_uuid_client_id() {
        let mut query = base_query();
        query.client_id = Some("not-a-uuid".to_string());
        let err = AuthorizationRequest::try_from(query).unwrap_err();
        assert_eq!(
            err.description.unwrap(),
            "The property `client_id` must be a valid UUID."
        );
    }

    #[test]
    fn test_authorize_query_rejects_token_response_type() {
        let mut query = base_query();
        query.response_type = Some("token".to_string());
        let err = AuthorizationRequest::try_from(query).unwrap_err();
        assert!(err.description.unwrap().contains("`response_type`"));
    }

    #[test]
    fn test_challenge_method_defaults_to_plain() {
        let mut query = base_query();
        query.code_challenge_method = None;
        let request = AuthorizationRequest::try_from(query).unwrap();
        assert_eq!(request.code_challenge_method, CodeChallengeMethod::Plain);
    }

    #[test]
    fn test_challenge_method_rejects_unknown() {
        let mut query = base_query();
        query.code_challenge_method = Some("S512".to_string());
        let err = AuthorizationRequest::try_from(query).unwrap_err();
        assert!(err.description.unwrap().contains("`code_challenge_method`"));
    }

    #[test]
    fn test_token_form_unknown_grant_type() {
        let form = TokenForm {
            grant_type: Some("password".to_string()),
            client_id: None,
            code: Some("abc".to_string()),
            code_verifier: Some("v".to_string()),
            redirect_uri: None,
            client_assertion: None,
            client_assertion_type: None,
        };
        let err = TokenRequest::try_from(form).unwrap_err();
        assert_eq!(err.kind, crate::errors::ErrorKind::UnsupportedGrantType);
    }

    #[test]
    fn test_token_form_missing_code() {
        let form = TokenForm {
            grant_type: Some("authorization_code".to_string()),
            client_id: Some(Uuid::new_v4().to_string()),
            code: None,
            code_verifier: Some("v".to_string()),
            redirect_uri: None,
            client_assertion: None,
            client_assertion_type: None,
        };
        let err = TokenRequest::try_from(form).unwrap_err();
        assert_eq!(
            err.description.unwrap(),
            "The property `code` must be provided."
        );
    }

    #[test]
    fn test_generated_tokens_are_unique() {
        assert_ne!(generate_token(), generate_token());
        assert_ne!(generate_authorization_code(), generate_authorization_code());
    }

    #[test]
    fn test_generated_values_carry_full_entropy() {
        // 32 and 48 random bytes as unpadded base64url.
        assert_eq!(generate_token().len(), 43);
        assert_eq!(generate_authorization_code().len(), 64);
    }

    #[test]
    fn test_challenge_method_serde_names() {
        assert_eq!(
            serde_json::to_string(&CodeChallengeMethod::Plain).unwrap(),
            "\"plain\""
        );
        assert_eq!(
            serde_json::to_string(&CodeChallengeMethod::S256).unwrap(),
            "\"S256\""
        );
    }
}
