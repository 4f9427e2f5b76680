//! OAuth state management for CSRF protection
//!
//! Every authorization request carries a random `state` value that is
//! remembered server-side, bound to the provider it was issued for and
//! accepted back exactly once.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::auth::AuthFailure;
use crate::providers::ProviderId;

/// Data stored with OAuth state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateData {
    /// Provider the authorization request was sent to
    pub provider: ProviderId,

    /// When this state was created (Unix timestamp)
    pub created_at: i64,
}

impl StateData {
    pub fn new(provider: ProviderId) -> Self {
        Self {
            provider,
            created_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// OAuth state manager trait
#[async_trait]
pub trait OAuthStateManager: Send + Sync {
    /// Create and store a new state value
    ///
    /// Returns the state string to include in the authorization URL.
    async fn create_state(&self, data: &StateData) -> Result<String, AuthFailure>;

    /// Validate and consume a state value
    ///
    /// Fails with [`AuthFailure::InvalidState`] when the state is unknown,
    /// expired or already used.
    async fn validate_state(&self, state: &str) -> Result<StateData, AuthFailure>;
}

/// Generate a cryptographically secure random state value
pub fn generate_state() -> String {
    use rand::Rng;
    let bytes: [u8; 32] = rand::rng().random();
    base64_url_encode(&bytes)
}

/// Base64 URL-safe encoding without padding
fn base64_url_encode(bytes: &[u8]) -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Process-local state store with a fixed time-to-live
#[derive(Debug)]
pub struct InMemoryOAuthStateManager {
    states: DashMap<String, StateData>,
    ttl_secs: i64,
}

impl InMemoryOAuthStateManager {
    /// Create a manager whose states expire after `ttl_secs` (default: 600)
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            states: DashMap::new(),
            ttl_secs: i64::try_from(ttl_secs).unwrap_or(i64::MAX),
        }
    }

    /// Number of states awaiting a callback
    pub fn pending(&self) -> usize {
        self.states.len()
    }

    fn is_expired(&self, data: &StateData, now: i64) -> bool {
        now.saturating_sub(data.created_at) > self.ttl_secs
    }

    fn purge_expired(&self, now: i64) {
        self.states.retain(|_, data| !self.is_expired(data, now));
    }
}

impl Default for InMemoryOAuthStateManager {
    fn default() -> Self {
        Self::new(600)
    }
}

#[async_trait]
impl OAuthStateManager for InMemoryOAuthStateManager {
    async fn create_state(&self, data: &StateData) -> Result<String, AuthFailure> {
        self.purge_expired(chrono::Utc::now().timestamp());

        let state = generate_state();
        self.states.insert(state.clone(), data.clone());
        Ok(state)
    }

    async fn validate_state(&self, state: &str) -> Result<StateData, AuthFailure> {
        // Removal makes the state single use even when validation fails
        let (_, data) = self.states.remove(state).ok_or(AuthFailure::InvalidState)?;

        if self.is_expired(&data, chrono::Utc::now().timestamp()) {
            return Err(AuthFailure::InvalidState);
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_state_uniqueness() {
        let state1 = generate_state();
        let state2 = generate_state();
        assert_ne!(state1, state2);
        // Base64 URL-safe encoding of 32 bytes = 43 chars (without padding)
        assert_eq!(state1.len(), 43);
    }

    #[tokio::test]
    async fn test_state_is_single_use() {
        let manager = InMemoryOAuthStateManager::default();
        let state = manager
            .create_state(&StateData::new(ProviderId::Google))
            .await
            .unwrap();

        let data = manager.validate_state(&state).await.unwrap();
        assert_eq!(data.provider, ProviderId::Google);
        assert_eq!(
            manager.validate_state(&state).await.unwrap_err(),
            AuthFailure::InvalidState
        );
    }

    #[tokio::test]
    async fn test_unknown_state_rejected() {
        let manager = InMemoryOAuthStateManager::default();
        assert_eq!(
            manager.validate_state("forged").await.unwrap_err(),
            AuthFailure::InvalidState
        );
    }

    #[tokio::test]
    async fn test_expired_state_rejected_and_purged() {
        let manager = InMemoryOAuthStateManager::new(600);
        let stale = StateData {
            provider: ProviderId::Facebook,
            created_at: chrono::Utc::now().timestamp() - 601,
        };
        let state = manager.create_state(&stale).await.unwrap();
        assert_eq!(
            manager.validate_state(&state).await.unwrap_err(),
            AuthFailure::InvalidState
        );

        manager.create_state(&stale).await.unwrap();
        // The next issue sweeps the stale entry
        manager
            .create_state(&StateData::new(ProviderId::Google))
            .await
            .unwrap();
        assert_eq!(manager.pending(), 1);
    }
}
