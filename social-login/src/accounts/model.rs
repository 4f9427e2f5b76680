//! Account records and the store scope they belong to

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::AccountId;

/// Placeholder stored when the provider did not return a name part
pub const MISSING_NAME_PLACEHOLDER: &str = "-";

/// Website and store a login happens in
///
/// Accounts are unique per website; the store records where an account was
/// created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreScope {
    #[serde(default = "default_scope_id")]
    pub website_id: u32,
    #[serde(default = "default_scope_id")]
    pub store_id: u32,
}

impl Default for StoreScope {
    fn default() -> Self {
        Self {
            website_id: default_scope_id(),
            store_id: default_scope_id(),
        }
    }
}

fn default_scope_id() -> u32 {
    1
}

/// A local account
///
/// Social-only accounts carry no password; they sign in again through a
/// provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub website_id: u32,
    pub store_id: u32,
    pub created_at: DateTime<Utc>,
}

/// Data needed to persist a new account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub scope: StoreScope,
}

/// Canonical form used for email matching: trimmed and lowercased
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Minimal syntactic check applied before an account is stored
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}
