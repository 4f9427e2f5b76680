//! Local accounts and their link to social identities

mod linker;
mod model;
mod repository;

pub use linker::{AccountCreateError, AccountLinker};
pub use model::{
    is_valid_email, normalize_email, Account, NewAccount, StoreScope, MISSING_NAME_PLACEHOLDER,
};
pub use repository::{
    AccountRepository, InMemoryAccountRepository, RepositoryError, RepositoryErrorKind,
    RepositoryOperation, RepositoryResult,
};
