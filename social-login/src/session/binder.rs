//! Binds a resolved account to the customer session

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use super::cookies::CookieStore;
use super::flash::{FlashMessage, FlashMessages};
use crate::accounts::Account;
use crate::error::{Error, Result};
use crate::ids::AccountId;

const AUTH_SESSION_KEY: &str = "_auth";

/// Customer session operations the login flow depends on
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Mark the session as logged in as `account`
    async fn set_authenticated(&self, account: &Account) -> Result<()>;

    /// Account the session is logged in as, if any
    async fn account_id(&self) -> Result<Option<AccountId>>;

    /// Queue a message for the next page
    async fn push_message(&self, message: FlashMessage) -> Result<()>;

    /// Remove and return queued messages
    async fn take_messages(&self) -> Result<Vec<FlashMessage>>;
}

/// Authentication data kept in the session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub account_id: Option<AccountId>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Unix timestamp of the login
    pub authenticated_at: Option<i64>,
}

impl AuthSession {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.account_id.is_some()
    }

    /// Record a login as `account`
    pub fn login(&mut self, account: &Account) {
        self.account_id = Some(account.id.clone());
        self.email = Some(account.email.clone());
        self.first_name = Some(account.first_name.clone());
        self.last_name = Some(account.last_name.clone());
        self.authenticated_at = Some(chrono::Utc::now().timestamp());
    }
}

/// [`SessionStore`] backed by a `tower-sessions` session
#[derive(Debug, Clone)]
pub struct TowerSessionStore {
    session: Session,
}

impl TowerSessionStore {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    /// Authentication data of the session (empty when logged out)
    pub async fn auth(&self) -> Result<AuthSession> {
        let auth: Option<AuthSession> = self
            .session
            .get(AUTH_SESSION_KEY)
            .await
            .map_err(|e| Error::Session(format!("Failed to read session data: {e}")))?;
        Ok(auth.unwrap_or_default())
    }
}

#[async_trait]
impl SessionStore for TowerSessionStore {
    async fn set_authenticated(&self, account: &Account) -> Result<()> {
        let mut auth = self.auth().await?;
        let fresh_login = auth.account_id.as_ref() != Some(&account.id);

        auth.login(account);
        self.session
            .insert(AUTH_SESSION_KEY, &auth)
            .await
            .map_err(|e| Error::Session(format!("Failed to save session data: {e}")))?;

        if fresh_login {
            // New identity in this session: issue a new session id
            self.session
                .cycle_id()
                .await
                .map_err(|e| Error::Session(format!("Failed to regenerate session ID: {e}")))?;
        }
        Ok(())
    }

    async fn account_id(&self) -> Result<Option<AccountId>> {
        Ok(self.auth().await?.account_id)
    }

    async fn push_message(&self, message: FlashMessage) -> Result<()> {
        FlashMessages::push(&self.session, message).await
    }

    async fn take_messages(&self) -> Result<Vec<FlashMessage>> {
        FlashMessages::take(&self.session).await
    }
}

/// Activates the login session for a resolved account
#[derive(Debug, Clone)]
pub struct SessionBinder {
    cache_cookie_name: String,
}

impl SessionBinder {
    pub const CACHE_COOKIE_PATH: &'static str = "/";

    pub fn new(cache_cookie_name: impl Into<String>) -> Self {
        Self {
            cache_cookie_name: cache_cookie_name.into(),
        }
    }

    /// Log the session in as `account` and drop the cache-partitioning cookie
    ///
    /// Activating the account the session already belongs to is a no-op apart
    /// from refreshing the stored profile data.
    pub async fn activate(
        &self,
        account: &Account,
        session: &dyn SessionStore,
        cookies: &mut dyn CookieStore,
    ) -> Result<()> {
        session.set_authenticated(account).await?;

        if cookies.get(&self.cache_cookie_name).is_some() {
            cookies.remove(&self.cache_cookie_name, Self::CACHE_COOKIE_PATH);
        }

        tracing::info!(account_id = %account.id, "Customer session activated");
        Ok(())
    }
}
