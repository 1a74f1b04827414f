//! OAuth 2.1 authorization server implementation.
//!
//! Drives the authorization-code lifecycle: request admission, completion
//! into a single-use code, and the token exchange with PKCE and client
//! authentication. The HTTP layer stays thin; protocol decisions live here.

use std::sync::Arc;

use chrono::{Duration, Utc};
use url::Url;
use uuid::Uuid;

use crate::errors::ApiError;
use crate::oauth::client_assertion::{
    JWT_BEARER_ASSERTION_TYPE, extract_subject_unverified, verify_client_assertion,
};
use crate::oauth::pkce::verify_pkce_challenge;
use crate::oauth::redirect_uri::validate_redirect_uri;
use crate::oauth::types::{
    AuthorizationCodeInfo, AuthorizationRequest, Client, GrantType, PendingAuthorizationRequest,
    TokenRequest, TokenResponse, TokenType, generate_authorization_code, generate_token,
};
use crate::storage::{CodeRedemption, OAuthStorage};

/// Access token lifetime reported in the token response, in seconds.
pub const ACCESS_TOKEN_EXPIRES_IN: u64 = 3600;

const BINDING_MISMATCH: &str =
    "The request details provided does not match the information that was stored on the server.";

const INVALID_CODE: &str = "The provided authorization code is invalid.";

const AUTHENTICATION_REQUIRED: &str =
    "The client must present some valid form of authentication, or in the case of a public \
     client, must include the `client_id` in the body of the request.";

/// Core authorization server state machine.
pub struct AuthorizationServer {
    storage: Arc<dyn OAuthStorage>,
    /// Server identity, used as the expected audience of client assertions
    issuer: String,
    /// Pending authorization request lifetime, seconds
    auth_request_ttl_secs: i64,
    /// Authorization code lifetime, seconds
    auth_code_ttl_secs: i64,
}

impl AuthorizationServer {
    pub fn new(
        storage: Arc<dyn OAuthStorage>,
        issuer: String,
        auth_request_ttl: std::time::Duration,
        auth_code_ttl: std::time::Duration,
    ) -> Self {
        Self {
            storage,
            issuer,
            auth_request_ttl_secs: auth_request_ttl.as_secs() as i64,
            auth_code_ttl_secs: auth_code_ttl.as_secs() as i64,
        }
    }

    /// Admit an authorization request.
    ///
    /// Validates the client and resolves the redirect URI, stores the pending
    /// request, and returns the opaque session identifier the caller should
    /// place in the session cookie.
    pub async fn authorize(&self, request: AuthorizationRequest) -> Result<String, ApiError> {
        let client = self.require_client(&request.client_id).await?;

        let redirect_uri = match request.redirect_uri {
            Some(uri) => {
                validate_redirect_uri(&uri)
                    .map_err(|err| ApiError::invalid_request(err.to_string()))?;
                if !client.redirect_uris.contains(&uri) {
                    return Err(ApiError::invalid_request(format!(
                        "The redirect URL `{uri}` is not valid."
                    )));
                }
                uri
            }
            None => {
                if client.redirect_uris.len() == 1 {
                    client.redirect_uris[0].clone()
                } else {
                    return Err(ApiError::invalid_request(
                        "A redirect URL was expected, however, no URL was found.",
                    ));
                }
            }
        };

        let now = Utc::now();
        let pending = PendingAuthorizationRequest {
            client_id: client.client_id,
            code_challenge: request.code_challenge,
            code_challenge_method: request.code_challenge_method,
            redirect_uri,
            scope: request.scope,
            state: request.state,
            created_at: now,
            expires_at: now + Duration::seconds(self.auth_request_ttl_secs),
        };

        let session_id = Uuid::new_v4().to_string();
        self.storage
            .store_authorization_request(&session_id, &pending)
            .await?;

        tracing::debug!(client_id = %client.client_id, "authorization request admitted");
        Ok(session_id)
    }

    /// Complete an admitted authorization request.
    ///
    /// Consumes the pending request for the session, issues a short-lived
    /// single-use code, and returns the redirect URL carrying `code` and
    /// `state`.
    pub async fn complete_authorization(&self, session_id: &str) -> Result<Url, ApiError> {
        let now = Utc::now();
        let pending = self
            .storage
            .take_authorization_request(session_id, now)
            .await?
            .ok_or_else(|| {
                ApiError::invalid_request(
                    "The authorization request was not found or has expired.",
                )
            })?;

        let code = generate_authorization_code();
        let info = AuthorizationCodeInfo {
            code: code.clone(),
            client_id: pending.client_id,
            code_challenge: pending.code_challenge,
            code_challenge_method: pending.code_challenge_method,
            redirect_uri: pending.redirect_uri.clone(),
            scope: pending.scope,
            created_at: now,
            expires_at: now + Duration::seconds(self.auth_code_ttl_secs),
            is_used: false,
            refresh_token: None,
        };
        self.storage.store_code(&info).await?;

        let mut redirect = pending.redirect_uri;
        redirect
            .query_pairs_mut()
            .append_pair("code", &code)
            .append_pair("state", &pending.state);

        tracing::debug!(client_id = %pending.client_id, "authorization code issued");
        Ok(redirect)
    }

    /// Exchange an authorization code for tokens.
    pub async fn token(&self, request: TokenRequest) -> Result<TokenResponse, ApiError> {
        if request.grant_type != GrantType::AuthorizationCode {
            return Err(ApiError::unsupported_grant_type(
                "Only the `authorization_code` grant type is supported.",
            ));
        }

        let client = self.authenticate_client(&request).await?;

        // The refresh token is minted up front so redemption can bind it to
        // the code atomically; a replay observed at any later instant finds
        // it and revokes it.
        let access_token = generate_token();
        let refresh_token = generate_token();

        let info = match self
            .storage
            .redeem_code(&request.code, &refresh_token, Utc::now())
            .await?
        {
            CodeRedemption::Granted(info) => info,
            CodeRedemption::Replayed {
                revoked_refresh_token,
            } => {
                tracing::warn!(
                    refresh_token_revoked = revoked_refresh_token.is_some(),
                    "authorization code replay detected"
                );
                return Err(ApiError::invalid_grant(INVALID_CODE));
            }
            CodeRedemption::Unknown => {
                return Err(ApiError::invalid_grant(INVALID_CODE));
            }
        };

        // The code is burned either way; a binding failure also takes the
        // just-bound refresh token back out of the valid set.
        if let Err(err) = check_bindings(&client, &info, &request) {
            self.storage.revoke_refresh_token(&refresh_token).await?;
            return Err(err);
        }

        tracing::info!(client_id = %client.client_id, "tokens issued");
        Ok(TokenResponse {
            access_token,
            refresh_token,
            token_type: TokenType::Bearer,
            expires_in: ACCESS_TOKEN_EXPIRES_IN,
            scope: info.scope,
        })
    }

    /// Resolve the client making a token request.
    ///
    /// Public clients identify themselves with `client_id` in the body.
    /// Confidential clients present a private-key JWT assertion; the
    /// assertion's subject selects the client record.
    async fn authenticate_client(&self, request: &TokenRequest) -> Result<Client, ApiError> {
        if let Some(client_id) = request.client_id {
            return self.require_client(&client_id).await;
        }

        if request.client_assertion_type.as_deref() != Some(JWT_BEARER_ASSERTION_TYPE) {
            return Err(ApiError::invalid_grant(AUTHENTICATION_REQUIRED));
        }
        let assertion = request
            .client_assertion
            .as_deref()
            .ok_or_else(|| ApiError::invalid_grant(AUTHENTICATION_REQUIRED))?;

        let subject = extract_subject_unverified(assertion)?;
        let client = self
            .storage
            .get_client(&subject)
            .await?
            .ok_or_else(|| ApiError::invalid_grant(AUTHENTICATION_REQUIRED))?;

        verify_client_assertion(assertion, &client, &self.issuer)?;
        Ok(client)
    }

    async fn require_client(&self, client_id: &Uuid) -> Result<Client, ApiError> {
        self.storage.get_client(client_id).await?.ok_or_else(|| {
            ApiError::invalid_client(format!(
                "The client with the id `{client_id}` was not found."
            ))
        })
    }
}

/// Binding checks run after the code is consumed. Failures are reported with
/// one generic message so the response does not reveal which binding was
/// wrong.
fn check_bindings(
    client: &Client,
    info: &AuthorizationCodeInfo,
    request: &TokenRequest,
) -> Result<(), ApiError> {
    if client.client_id != info.client_id {
        return Err(ApiError::invalid_request(BINDING_MISMATCH));
    }
    if !verify_pkce_challenge(
        &request.code_verifier,
        &info.code_challenge,
        info.code_challenge_method,
    ) {
        return Err(ApiError::invalid_request(BINDING_MISMATCH));
    }
    // Stored codes always carry a concrete redirect URI, so the request must
    // present the matching one.
    if request.redirect_uri.as_ref() != Some(&info.redirect_uri) {
        return Err(ApiError::invalid_request(BINDING_MISMATCH));
    }
    Ok(())
}
