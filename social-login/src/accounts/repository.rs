//! Account storage contract and the in-memory default
//!
//! The repository owns email uniqueness: two concurrent `create` calls for
//! the same new address persist one account and the other call fails with
//! [`RepositoryErrorKind::AlreadyExists`].

use async_trait::async_trait;
use chrono::Utc;
use dashmap::{mapref::entry::Entry, DashMap};
use std::fmt;

use super::model::{is_valid_email, normalize_email, Account, NewAccount};
use crate::ids::AccountId;

/// Operation being performed when the repository error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryOperation {
    FindByEmail,
    FindById,
    Create,
}

impl fmt::Display for RepositoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FindByEmail => write!(f, "find_by_email"),
            Self::FindById => write!(f, "find_by_id"),
            Self::Create => write!(f, "create"),
        }
    }
}

/// Category of repository error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryErrorKind {
    /// Entity was not found
    NotFound,
    /// Entity already exists (duplicate key)
    AlreadyExists,
    /// Validation failed before the write
    ValidationFailed,
    /// Storage backend unreachable
    ConnectionFailed,
    /// Other unclassified error
    Other,
}

impl fmt::Display for RepositoryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::AlreadyExists => write!(f, "already_exists"),
            Self::ValidationFailed => write!(f, "validation_failed"),
            Self::ConnectionFailed => write!(f, "connection_failed"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Structured repository error with operation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryError {
    /// The operation being performed when the error occurred
    pub operation: RepositoryOperation,
    /// The category of error
    pub kind: RepositoryErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Identifier of the entity involved (account id or email)
    pub entity: Option<String>,
}

impl RepositoryError {
    pub fn new(
        operation: RepositoryOperation,
        kind: RepositoryErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            entity: None,
        }
    }

    /// Create a "not found" error for an account id
    pub fn not_found(id: &AccountId) -> Self {
        Self::new(
            RepositoryOperation::FindById,
            RepositoryErrorKind::NotFound,
            "Account not found",
        )
        .with_entity(id.as_str())
    }

    /// Create an "already exists" error for an email
    pub fn already_exists(email: impl Into<String>) -> Self {
        Self::new(
            RepositoryOperation::Create,
            RepositoryErrorKind::AlreadyExists,
            "An account with this email already exists",
        )
        .with_entity(email)
    }

    /// Create a validation failed error
    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::new(
            RepositoryOperation::Create,
            RepositoryErrorKind::ValidationFailed,
            message,
        )
    }

    /// Create a connection failed error
    pub fn connection_failed(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::ConnectionFailed, message)
    }

    #[must_use]
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Repository {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        if let Some(ref entity) = self.entity {
            write!(f, " [{}]", entity)?;
        }
        Ok(())
    }
}

impl std::error::Error for RepositoryError {}

/// Result type for repository operations
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// Account storage
///
/// Implementations must enforce uniqueness of `(website_id, email)` in
/// [`create`](Self::create); email matching is case-insensitive.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Find the account registered with `email` on a website
    async fn find_by_email(&self, email: &str, website_id: u32) -> RepositoryResult<Option<Account>>;

    /// Persist a new account
    async fn create(&self, account: NewAccount) -> RepositoryResult<Account>;

    /// Load an account by id; a missing account is `NotFound`
    async fn get_by_id(&self, id: &AccountId) -> RepositoryResult<Account>;
}

/// Process-local account store
#[derive(Debug, Default)]
pub struct InMemoryAccountRepository {
    accounts: DashMap<AccountId, Account>,
    emails: DashMap<(u32, String), AccountId>,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn find_by_email(&self, email: &str, website_id: u32) -> RepositoryResult<Option<Account>> {
        let key = (website_id, normalize_email(email));
        // Clone the id so the index guard is released before touching `accounts`
        let id = match self.emails.get(&key) {
            Some(entry) => entry.value().clone(),
            None => return Ok(None),
        };
        Ok(self.accounts.get(&id).map(|entry| entry.value().clone()))
    }

    async fn create(&self, account: NewAccount) -> RepositoryResult<Account> {
        if !is_valid_email(&account.email) {
            return Err(RepositoryError::validation_failed("Email format is invalid")
                .with_entity(account.email));
        }

        let key = (account.scope.website_id, normalize_email(&account.email));
        match self.emails.entry(key) {
            Entry::Occupied(_) => Err(RepositoryError::already_exists(account.email)),
            Entry::Vacant(slot) => {
                let stored = Account {
                    id: AccountId::new(),
                    email: account.email.trim().to_string(),
                    first_name: account.first_name,
                    last_name: account.last_name,
                    website_id: account.scope.website_id,
                    store_id: account.scope.store_id,
                    created_at: Utc::now(),
                };
                self.accounts.insert(stored.id.clone(), stored.clone());
                slot.insert(stored.id.clone());
                Ok(stored)
            }
        }
    }

    async fn get_by_id(&self, id: &AccountId) -> RepositoryResult<Account> {
        self.accounts
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RepositoryError::not_found(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::StoreScope;
    use std::sync::Arc;

    fn new_account(email: &str, website_id: u32) -> NewAccount {
        NewAccount {
            email: email.to_string(),
            first_name: "Ana".to_string(),
            last_name: "Silva".to_string(),
            scope: StoreScope {
                website_id,
                store_id: 1,
            },
        }
    }

    #[tokio::test]
    async fn test_create_then_find() {
        let repo = InMemoryAccountRepository::new();
        let created = repo.create(new_account("ana@example.com", 1)).await.unwrap();

        let found = repo
            .find_by_email("ANA@example.com", 1)
            .await
            .unwrap()
            .expect("account should be found case-insensitively");
        assert_eq!(found.id, created.id);

        let fetched = repo.get_by_id(&created.id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_email_unique_per_website() {
        let repo = InMemoryAccountRepository::new();
        repo.create(new_account("ana@example.com", 1)).await.unwrap();

        let err = repo
            .create(new_account("Ana@Example.com", 1))
            .await
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::AlreadyExists);

        // Another website is a separate scope
        repo.create(new_account("ana@example.com", 2)).await.unwrap();
        assert_eq!(repo.len(), 2);
        assert!(repo.find_by_email("ana@example.com", 3).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalid_email_rejected() {
        let repo = InMemoryAccountRepository::new();
        let err = repo.create(new_account("not-an-email", 1)).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::ValidationFailed);
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_get_missing_account() {
        let repo = InMemoryAccountRepository::new();
        let err = repo.get_by_id(&AccountId::new()).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::NotFound);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_persist_one_account() {
        let repo = Arc::new(InMemoryAccountRepository::new());

        let attempts = (0..16).map(|_| {
            let repo = Arc::clone(&repo);
            tokio::spawn(async move { repo.create(new_account("race@example.com", 1)).await })
        });
        let results = futures::future::join_all(attempts).await;

        let (won, lost): (Vec<_>, Vec<_>) = results
            .into_iter()
            .map(|joined| joined.unwrap())
            .partition(|result| result.is_ok());
        assert_eq!(won.len(), 1);
        assert_eq!(lost.len(), 15);
        assert!(lost
            .iter()
            .all(|r| r.as_ref().unwrap_err().kind == RepositoryErrorKind::AlreadyExists));
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn test_error_display() {
        let err = RepositoryError::already_exists("ana@example.com");
        assert_eq!(
            err.to_string(),
            "Repository already_exists error during create: An account with this email already exists [ana@example.com]"
        );
    }
}
