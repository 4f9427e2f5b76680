//! Type-safe identifiers in TypeID format
//!
//! Identifiers combine a short prefix with a UUIDv7, so they read well in
//! logs and sort by creation time.
//!
//! - [`RequestId`] (`req_…`) tags every HTTP request for tracing.
//! - [`AccountId`] (`acct_…`) identifies a local account.
//!
//! ```rust
//! use social_login::ids::AccountId;
//!
//! let id = AccountId::new();
//! assert!(id.as_str().starts_with("acct_"));
//! ```

use http::Request;
use mti::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tower_http::request_id::{MakeRequestId, RequestId as TowerRequestId};

/// Error type for typed ID parsing.
#[derive(Debug, thiserror::Error)]
pub enum IdError {
    /// The ID could not be parsed as a valid TypeID.
    #[error("failed to parse ID: {0}")]
    Parse(#[from] MagicTypeIdError),

    /// The prefix was not the expected value.
    #[error("invalid prefix: expected '{expected}', got '{actual}'")]
    InvalidPrefix {
        /// The expected prefix.
        expected: String,
        /// The actual prefix found.
        actual: String,
    },
}

fn parse_prefixed(s: &str, prefix: &str) -> Result<MagicTypeId, IdError> {
    let mti = MagicTypeId::from_str(s)?;
    if mti.prefix().as_str() != prefix {
        return Err(IdError::InvalidPrefix {
            expected: prefix.to_string(),
            actual: mti.prefix().as_str().to_string(),
        });
    }
    Ok(mti)
}

/// A type-safe request identifier for distributed tracing.
///
/// Example: `req_01h455vb4pex5vsknk084sn02q`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(MagicTypeId);

impl RequestId {
    /// The prefix used for request IDs
    pub const PREFIX: &'static str = "req";

    /// Creates a new request ID with a UUIDv7 (time-sortable).
    #[must_use]
    pub fn new() -> Self {
        Self(Self::PREFIX.create_type_id::<V7>())
    }

    /// Returns the request ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_prefixed(s, Self::PREFIX).map(Self)
    }
}

/// Identifier of a local account.
///
/// Serialized as its string form so it can live in session data and JSON
/// responses.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(MagicTypeId);

impl AccountId {
    /// The prefix used for account IDs
    pub const PREFIX: &'static str = "acct";

    /// Creates a new account ID with a UUIDv7 (time-sortable).
    #[must_use]
    pub fn new() -> Self {
        Self(Self::PREFIX.create_type_id::<V7>())
    }

    /// Returns the account ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AccountId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_prefixed(s, Self::PREFIX).map(Self)
    }
}

impl TryFrom<String> for AccountId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AccountId> for String {
    fn from(id: AccountId) -> Self {
        id.0.to_string()
    }
}

/// A `MakeRequestId` implementation that generates `RequestId`s for tower-http.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeTypedRequestId;

impl MakeRequestId for MakeTypedRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<TowerRequestId> {
        let id = RequestId::new();
        let header_value = http::HeaderValue::from_str(id.as_str()).ok()?;
        Some(TowerRequestId::new(header_value))
    }
}
