//! Session cookie configuration

use serde::{Deserialize, Serialize};

/// Session configuration.
///
/// Sessions live in process memory; the cookie only carries the session id.
///
/// # Example
///
/// ```toml
/// [session]
/// cookie_name = "session_id"
/// expiry_secs = 86400
/// secure = true
/// same_site = "lax"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session cookie name.
    ///
    /// Default: `"session_id"`
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Session expiry in seconds.
    ///
    /// - `0`: Session cookie (expires when browser closes)
    /// - `> 0`: Persistent cookie with specified lifetime
    ///
    /// Default: `86400` (24 hours)
    #[serde(default = "default_expiry_secs")]
    pub expiry_secs: u64,

    /// Session inactivity timeout in seconds (optional).
    ///
    /// If not set, `expiry_secs` is used as an inactivity timeout.
    #[serde(default)]
    pub inactivity_timeout_secs: Option<u64>,

    /// Cookie path.
    ///
    /// Default: `"/"`
    #[serde(default = "default_cookie_path")]
    pub cookie_path: String,

    /// Cookie domain; the request's host when unset.
    #[serde(default)]
    pub cookie_domain: Option<String>,

    /// Secure cookie flag (HTTPS only).
    ///
    /// Default: `true`
    #[serde(default = "default_secure")]
    pub secure: bool,

    /// HttpOnly cookie flag.
    ///
    /// Default: `true`
    #[serde(default = "default_http_only")]
    pub http_only: bool,

    /// SameSite policy: `"strict"`, `"lax"` or `"none"`.
    ///
    /// Must stay `"lax"` or `"none"` for the session to survive the
    /// top-level redirect back from the provider.
    ///
    /// Default: `"lax"`
    #[serde(default = "default_same_site")]
    pub same_site: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            expiry_secs: default_expiry_secs(),
            inactivity_timeout_secs: None,
            cookie_path: default_cookie_path(),
            cookie_domain: None,
            secure: default_secure(),
            http_only: default_http_only(),
            same_site: default_same_site(),
        }
    }
}

fn default_cookie_name() -> String {
    "session_id".to_string()
}

fn default_expiry_secs() -> u64 {
    86400 // 24 hours
}

fn default_cookie_path() -> String {
    "/".to_string()
}

fn default_secure() -> bool {
    true
}

fn default_http_only() -> bool {
    true
}

fn default_same_site() -> String {
    "lax".to_string()
}
