//! Customer session, cookies and flash messages
//!
//! Sessions are cookie-identified and stored in memory through
//! `tower-sessions`. The login flow talks to them through two narrow traits:
//!
//! - [`SessionStore`]: login state and flash messages
//! - [`CookieStore`]: request-scoped cookie reads and writes
//!
//! ```toml
//! # config.toml
//! [session]
//! cookie_name = "session_id"
//! expiry_secs = 86400
//! secure = false  # true in production
//! ```

mod binder;
mod config;
mod cookies;
mod flash;

pub use binder::{AuthSession, SessionBinder, SessionStore, TowerSessionStore};
pub use config::SessionConfig;
pub use cookies::{CookieStore, RequestCookies};
pub use flash::{FlashKind, FlashMessage, FlashMessages};

// Re-export tower-sessions types for convenience
pub use tower_sessions::{Expiry, Session, SessionManagerLayer};
pub use tower_sessions_memory_store::MemoryStore;

use time::Duration;
use tower_sessions::cookie::SameSite;

/// Create an in-memory `SessionManagerLayer` from configuration.
pub fn create_memory_session_layer(config: &SessionConfig) -> SessionManagerLayer<MemoryStore> {
    let store = MemoryStore::default();

    let mut layer = SessionManagerLayer::new(store)
        .with_name(config.cookie_name.clone())
        .with_expiry(session_expiry(config))
        .with_secure(config.secure)
        .with_http_only(config.http_only)
        .with_same_site(parse_same_site(&config.same_site))
        .with_path(config.cookie_path.clone());

    if let Some(domain) = config.cookie_domain.clone() {
        layer = layer.with_domain(domain);
    }

    layer
}

/// Session lifetime; values beyond `i64::MAX` seconds saturate
pub(crate) fn session_expiry(config: &SessionConfig) -> Expiry {
    let seconds = |secs: u64| Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX));

    if config.expiry_secs == 0 {
        Expiry::OnSessionEnd
    } else if let Some(inactivity) = config.inactivity_timeout_secs {
        Expiry::OnInactivity(seconds(inactivity))
    } else {
        Expiry::OnInactivity(seconds(config.expiry_secs))
    }
}

/// Unknown values fall back to `Lax`
pub(crate) fn parse_same_site(value: &str) -> SameSite {
    match value.to_lowercase().as_str() {
        "strict" => SameSite::Strict,
        "none" => SameSite::None,
        _ => SameSite::Lax,
    }
}
