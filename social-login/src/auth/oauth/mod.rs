//! OAuth 2.0 authorization-code delegate
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use social_login::auth::{InMemoryOAuthStateManager, OAuthDelegate};
//!
//! let states = Arc::new(InMemoryOAuthStateManager::new(600));
//! let delegate = OAuthDelegate::new(states)?;
//! ```

mod client;
mod endpoints;
mod state;

pub use client::OAuthDelegate;
pub use endpoints::ProviderEndpoints;
pub use state::{generate_state, InMemoryOAuthStateManager, OAuthStateManager, StateData};
