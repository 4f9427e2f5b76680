//! # social-login
//!
//! Sign storefront customers in with a third-party identity provider and link
//! the provider profile to a local account.
//!
//! ## Features
//!
//! - **Providers**: Facebook, Google and Windows Live over OAuth 2.0
//! - **Account linking**: one account per email and website, created on first login
//! - **Safe redirects**: post-login destinations are checked against the site origin
//! - **Sessions**: cookie sessions with flash messages via `tower-sessions`
//! - **Checkout configuration**: JSON document telling pages which providers are on
//! - **Middleware stack**: request IDs, header masking, timeouts, body limits, panic recovery
//! - **Graceful shutdown**: SIGTERM and SIGINT drain in-flight requests
//!
//! ## Example
//!
//! ```rust,no_run
//! use social_login::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let state = AppState::builder().config(config.clone()).build()?;
//!
//!     Server::new(config).serve(router(state)).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod accounts;
pub mod auth;
pub mod config;
pub mod config_surface;
pub mod error;
pub mod flow;
pub mod handlers;
pub mod health;
pub mod ids;
pub mod middleware;
pub mod observability;
pub mod providers;
pub mod redirect;
pub mod server;
pub mod session;
pub mod state;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::accounts::{
        Account, AccountCreateError, AccountLinker, AccountRepository, InMemoryAccountRepository,
        NewAccount, RepositoryError, StoreScope,
    };
    pub use crate::auth::{
        AuthDelegate, AuthFailure, AuthRequest, Authentication, CallbackParams,
        InMemoryOAuthStateManager, OAuthDelegate, SocialProfile,
    };
    pub use crate::config::Config;
    pub use crate::config_surface::{CheckoutConfig, ConfigSurface};
    pub use crate::error::{Error, Result};
    pub use crate::flow::{FlowOutcome, FlowRequest, FlowState, SocialLoginFlow};
    pub use crate::handlers::router;
    pub use crate::health::health;
    pub use crate::ids::{AccountId, MakeTypedRequestId, RequestId};
    pub use crate::middleware::{
        request_id_layer, request_id_propagation_layer, sensitive_headers_layer,
        SENSITIVE_HEADERS,
    };
    pub use crate::observability::{init_tracing, shutdown_tracing};
    pub use crate::providers::{ProviderId, ProviderRegistry};
    pub use crate::redirect::{decode_url, encode_url, HostChecker, RedirectResolver};
    pub use crate::server::Server;
    pub use crate::session::{
        CookieStore, FlashKind, FlashMessage, FlashMessages, Session, SessionBinder,
        SessionConfig, SessionStore,
    };
    pub use crate::state::{AppState, AppStateBuilder};
}
