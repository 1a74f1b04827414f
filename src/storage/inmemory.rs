//! In-memory storage implementation for OAuth server state.
//!
//! All maps are exclusively owned by the store; every mutation goes through a
//! store method under the owning mutex. Suitable for development and tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::StorageError;
use crate::oauth::types::{AuthorizationCodeInfo, Client, PendingAuthorizationRequest};
use crate::storage::traits::{
    AuthorizationCodeStore, AuthorizationRequestStore, ClientStore, CodeRedemption,
    RefreshTokenStore, Result,
};

/// In-memory OAuth storage backed by mutex-guarded maps.
///
/// Lock ordering: `codes` before `refresh_tokens`. Locks are held only for
/// the state transition, never across hashing or signature work.
pub struct MemoryOAuthStorage {
    clients: Mutex<HashMap<Uuid, Client>>,
    authorization_requests: Mutex<HashMap<String, PendingAuthorizationRequest>>,
    codes: Mutex<HashMap<String, AuthorizationCodeInfo>>,
    refresh_tokens: Mutex<HashSet<String>>,
}

impl MemoryOAuthStorage {
    pub fn new() -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            authorization_requests: Mutex::new(HashMap::new()),
            codes: Mutex::new(HashMap::new()),
            refresh_tokens: Mutex::new(HashSet::new()),
        }
    }
}

impl Default for MemoryOAuthStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClientStore for MemoryOAuthStorage {
    async fn store_client(&self, client: &Client) -> Result<()> {
        let mut clients = self
            .clients
            .lock()
            .map_err(|e| StorageError::ConnectionFailed(format!("Lock error: {e}")))?;
        clients.insert(client.client_id, client.clone());
        Ok(())
    }

    async fn get_client(&self, client_id: &Uuid) -> Result<Option<Client>> {
        let clients = self
            .clients
            .lock()
            .map_err(|e| StorageError::ConnectionFailed(format!("Lock error: {e}")))?;
        Ok(clients.get(client_id).cloned())
    }
}

#[async_trait]
impl AuthorizationRequestStore for MemoryOAuthStorage {
    async fn store_authorization_request(
        &self,
        session_id: &str,
        request: &PendingAuthorizationRequest,
    ) -> Result<()> {
        let mut requests = self
            .authorization_requests
            .lock()
            .map_err(|e| StorageError::ConnectionFailed(format!("Lock error: {e}")))?;
        requests.insert(session_id.to_string(), request.clone());
        Ok(())
    }

    async fn take_authorization_request(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<PendingAuthorizationRequest>> {
        let mut requests = self
            .authorization_requests
            .lock()
            .map_err(|e| StorageError::ConnectionFailed(format!("Lock error: {e}")))?;
        match requests.remove(session_id) {
            Some(request) if request.is_expired(now) => Ok(None),
            other => Ok(other),
        }
    }

    async fn cleanup_expired_requests(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut requests = self
            .authorization_requests
            .lock()
            .map_err(|e| StorageError::ConnectionFailed(format!("Lock error: {e}")))?;
        let before = requests.len();
        requests.retain(|_, request| !request.is_expired(now));
        Ok(before - requests.len())
    }
}

#[async_trait]
impl AuthorizationCodeStore for MemoryOAuthStorage {
    async fn store_code(&self, info: &AuthorizationCodeInfo) -> Result<()> {
        let mut codes = self
            .codes
            .lock()
            .map_err(|e| StorageError::ConnectionFailed(format!("Lock error: {e}")))?;
        codes.insert(info.code.clone(), info.clone());
        Ok(())
    }

    async fn redeem_code(
        &self,
        code: &str,
        refresh_token: &str,
        now: DateTime<Utc>,
    ) -> Result<CodeRedemption> {
        let mut codes = self
            .codes
            .lock()
            .map_err(|e| StorageError::ConnectionFailed(format!("Lock error: {e}")))?;

        let Some(info) = codes.get_mut(code) else {
            return Ok(CodeRedemption::Unknown);
        };

        if info.is_used {
            // Second presentation. Pull the bound refresh token out of the
            // valid set before reporting the replay.
            let revoked = info.refresh_token.clone();
            if let Some(token) = revoked.as_deref() {
                let mut refresh_tokens = self
                    .refresh_tokens
                    .lock()
                    .map_err(|e| StorageError::ConnectionFailed(format!("Lock error: {e}")))?;
                refresh_tokens.remove(token);
            }
            return Ok(CodeRedemption::Replayed {
                revoked_refresh_token: revoked,
            });
        }

        if info.is_expired(now) {
            codes.remove(code);
            return Ok(CodeRedemption::Unknown);
        }

        // Consume and bind in one transition; a replay arriving after this
        // point always finds the bound token to revoke.
        info.is_used = true;
        info.refresh_token = Some(refresh_token.to_string());
        let granted = info.clone();
        let mut refresh_tokens = self
            .refresh_tokens
            .lock()
            .map_err(|e| StorageError::ConnectionFailed(format!("Lock error: {e}")))?;
        refresh_tokens.insert(refresh_token.to_string());
        Ok(CodeRedemption::Granted(granted))
    }

    async fn cleanup_expired_codes(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut codes = self
            .codes
            .lock()
            .map_err(|e| StorageError::ConnectionFailed(format!("Lock error: {e}")))?;
        let before = codes.len();
        codes.retain(|_, info| info.is_used || !info.is_expired(now));
        Ok(before - codes.len())
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryOAuthStorage {
    async fn store_refresh_token(&self, refresh_token: &str) -> Result<()> {
        let mut refresh_tokens = self
            .refresh_tokens
            .lock()
            .map_err(|e| StorageError::ConnectionFailed(format!("Lock error: {e}")))?;
        refresh_tokens.insert(refresh_token.to_string());
        Ok(())
    }

    async fn is_refresh_token_valid(&self, refresh_token: &str) -> Result<bool> {
        let refresh_tokens = self
            .refresh_tokens
            .lock()
            .map_err(|e| StorageError::ConnectionFailed(format!("Lock error: {e}")))?;
        Ok(refresh_tokens.contains(refresh_token))
    }

    async fn revoke_refresh_token(&self, refresh_token: &str) -> Result<()> {
        let mut refresh_tokens = self
            .refresh_tokens
            .lock()
            .map_err(|e| StorageError::ConnectionFailed(format!("Lock error: {e}")))?;
        refresh_tokens.remove(refresh_token);
        Ok(())
    }
}
