//! Resolves a provider profile to a local account, creating one on first login

use std::sync::Arc;

use super::model::{Account, NewAccount, StoreScope, MISSING_NAME_PLACEHOLDER};
use super::repository::{AccountRepository, RepositoryError};
use crate::auth::SocialProfile;
use crate::ids::AccountId;

/// Failure to look up or persist the account for a profile
///
/// Shown to the user only as [`AccountCreateError::USER_MESSAGE`].
#[derive(Debug, thiserror::Error)]
pub enum AccountCreateError {
    #[error("account lookup failed: {0}")]
    Lookup(#[source] RepositoryError),

    #[error("account creation failed: {0}")]
    Persist(#[source] RepositoryError),
}

impl AccountCreateError {
    pub const USER_MESSAGE: &'static str = "Unable to create account.";

    /// The underlying repository error
    pub fn repository_error(&self) -> &RepositoryError {
        match self {
            Self::Lookup(err) | Self::Persist(err) => err,
        }
    }
}

/// Links social identities to accounts by email
#[derive(Clone)]
pub struct AccountLinker {
    repository: Arc<dyn AccountRepository>,
}

impl AccountLinker {
    pub fn new(repository: Arc<dyn AccountRepository>) -> Self {
        Self { repository }
    }

    /// Find the account for `profile` within the scope's website or create it
    ///
    /// Returns `Ok(None)` when the profile carries no usable email. An existing
    /// account is returned as stored; profile names never overwrite it.
    pub async fn resolve_or_create(
        &self,
        profile: &SocialProfile,
        scope: StoreScope,
    ) -> Result<Option<Account>, AccountCreateError> {
        let Some(email) = profile.email() else {
            tracing::debug!(provider = %profile.provider, "Profile has no email, skipping account resolution");
            return Ok(None);
        };

        if let Some(existing) = self
            .repository
            .find_by_email(email, scope.website_id)
            .await
            .map_err(AccountCreateError::Lookup)?
        {
            tracing::debug!(account_id = %existing.id, "Linked profile to existing account");
            return Ok(Some(existing));
        }

        let new_account = NewAccount {
            email: email.to_string(),
            first_name: name_or_placeholder(profile.first_name.as_deref()),
            last_name: name_or_placeholder(profile.last_name.as_deref()),
            scope,
        };

        let account = self
            .repository
            .create(new_account)
            .await
            .map_err(AccountCreateError::Persist)?;

        tracing::info!(
            account_id = %account.id,
            provider = %profile.provider,
            website_id = scope.website_id,
            "Created account from social profile"
        );
        Ok(Some(account))
    }

    /// Load the stored state of an account
    pub async fn reload(&self, id: &AccountId) -> Result<Account, AccountCreateError> {
        self.repository
            .get_by_id(id)
            .await
            .map_err(AccountCreateError::Lookup)
    }
}

fn name_or_placeholder(name: Option<&str>) -> String {
    match name.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => MISSING_NAME_PLACEHOLDER.to_string(),
    }
}
