//! Storage trait definitions for OAuth server state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::StorageError;
use crate::oauth::types::{AuthorizationCodeInfo, Client, PendingAuthorizationRequest};

pub type Result<T> = std::result::Result<T, StorageError>;

/// Outcome of an atomic authorization code redemption.
#[derive(Debug, Clone)]
pub enum CodeRedemption {
    /// First presentation of a live code; the code is now consumed.
    Granted(AuthorizationCodeInfo),
    /// The code had already been consumed. The bound refresh token, if any,
    /// has been revoked as part of this observation.
    Replayed {
        revoked_refresh_token: Option<String>,
    },
    /// The code does not exist or has expired.
    Unknown,
}

/// Registered client lookup and storage
#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Store a client record. Records are immutable once stored.
    async fn store_client(&self, client: &Client) -> Result<()>;

    /// Get a client by its identifier
    async fn get_client(&self, client_id: &Uuid) -> Result<Option<Client>>;
}

/// Pending authorization requests awaiting resource-owner completion
#[async_trait]
pub trait AuthorizationRequestStore: Send + Sync {
    /// Store a pending request under an opaque session identifier
    async fn store_authorization_request(
        &self,
        session_id: &str,
        request: &PendingAuthorizationRequest,
    ) -> Result<()>;

    /// Remove and return the pending request for a session. Expired requests
    /// are dropped and reported as absent.
    async fn take_authorization_request(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<PendingAuthorizationRequest>>;

    /// Remove expired pending requests, returning the number removed
    async fn cleanup_expired_requests(&self, now: DateTime<Utc>) -> Result<usize>;
}

/// Authorization code issuance and single-use redemption
#[async_trait]
pub trait AuthorizationCodeStore: Send + Sync {
    /// Store a newly issued code
    async fn store_code(&self, info: &AuthorizationCodeInfo) -> Result<()>;

    /// Atomically redeem a code: read its state, decide the outcome, and
    /// apply the transition under one critical section. On the first
    /// redemption the candidate `refresh_token` is bound to the code and
    /// added to the valid set as part of the same transition, so a replay
    /// can never observe a consumed code without its bound token. A replayed
    /// code revokes that token before returning.
    async fn redeem_code(
        &self,
        code: &str,
        refresh_token: &str,
        now: DateTime<Utc>,
    ) -> Result<CodeRedemption>;

    /// Remove expired codes that were never consumed, returning the number
    /// removed
    async fn cleanup_expired_codes(&self, now: DateTime<Utc>) -> Result<usize>;
}

/// Valid-set of issued refresh tokens
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Add a refresh token to the valid set
    async fn store_refresh_token(&self, refresh_token: &str) -> Result<()>;

    /// Check whether a refresh token is currently valid
    async fn is_refresh_token_valid(&self, refresh_token: &str) -> Result<bool>;

    /// Remove a refresh token from the valid set. Idempotent: revoking an
    /// absent token is not an error.
    async fn revoke_refresh_token(&self, refresh_token: &str) -> Result<()>;
}

/// Combined storage interface for the OAuth server
pub trait OAuthStorage:
    ClientStore + AuthorizationRequestStore + AuthorizationCodeStore + RefreshTokenStore
{
}

impl<T> OAuthStorage for T where
    T: ClientStore + AuthorizationRequestStore + AuthorizationCodeStore + RefreshTokenStore
{
}
