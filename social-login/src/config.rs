//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: SOCIAL_LOGIN_, nesting separator: `__`)
//! 2. Current working directory: ./config.toml
//! 3. XDG config directory: ~/.config/social-login/{service_name}/config.toml
//! 4. System directory: /etc/social-login/{service_name}/config.toml
//! 5. Default values

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::accounts::StoreScope;
use crate::error::Result;
use crate::session::SessionConfig;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "SOCIAL_LOGIN_";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Service configuration
    #[serde(default)]
    pub service: ServiceConfig,

    /// Middleware configuration
    #[serde(default)]
    pub middleware: MiddlewareConfig,

    /// Public site the login flow belongs to
    #[serde(default)]
    pub site: SiteConfig,

    /// Store scope new accounts are created in
    #[serde(default)]
    pub store: StoreScope,

    /// Social login switches and provider credentials
    #[serde(default)]
    pub social_login: SocialLoginConfig,

    /// Post-login redirect persistence
    #[serde(default)]
    pub redirect: RedirectConfig,

    /// Session cookie settings
    #[serde(default)]
    pub session: SessionConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Environment (dev, staging, production)
    #[serde(default = "default_environment")]
    pub environment: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            port: default_port(),
            log_level: default_log_level(),
            timeout_secs: default_timeout(),
            environment: default_environment(),
        }
    }
}

/// Middleware configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiddlewareConfig {
    /// Request tracking configuration (request IDs, header propagation)
    #[serde(default)]
    pub request_tracking: RequestTrackingConfig,

    /// Request body size limit in MB
    #[serde(default = "default_body_limit_mb")]
    pub body_limit_mb: usize,

    /// CORS configuration
    #[serde(default = "default_cors_mode")]
    pub cors_mode: String,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            request_tracking: RequestTrackingConfig::default(),
            body_limit_mb: default_body_limit_mb(),
            cors_mode: default_cors_mode(),
        }
    }
}

/// Request tracking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestTrackingConfig {
    /// Enable request ID generation
    #[serde(default = "default_true")]
    pub request_id_enabled: bool,

    /// Enable header propagation
    #[serde(default = "default_true")]
    pub propagate_headers: bool,

    /// Enable sensitive header masking in logs
    #[serde(default = "default_true")]
    pub mask_sensitive_headers: bool,
}

impl Default for RequestTrackingConfig {
    fn default() -> Self {
        Self {
            request_id_enabled: true,
            propagate_headers: true,
            mask_sensitive_headers: true,
        }
    }
}

/// Public site configuration
///
/// `base_url` is the origin every redirect target is checked against and the
/// root the provider callback URL is built from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Absolute base URL of the storefront (e.g. `https://shop.example`)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Additional `host[:port]` values treated as the site's own origin
    #[serde(default)]
    pub allowed_hosts: Vec<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            allowed_hosts: Vec::new(),
        }
    }
}

/// Social login configuration
///
/// ```toml
/// [social_login]
/// enabled = true
///
/// [social_login.providers.google]
/// enabled = true
/// api_key = "client-id"
/// api_secret = "client-secret"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialLoginConfig {
    /// Global switch for the whole module
    #[serde(default)]
    pub enabled: bool,

    /// OAuth state TTL in seconds (default: 600 = 10 min)
    #[serde(default = "default_state_ttl")]
    pub state_ttl_secs: u64,

    /// Per-provider settings
    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl Default for SocialLoginConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            state_ttl_secs: default_state_ttl(),
            providers: ProvidersConfig::default(),
        }
    }
}

/// Settings for each supported provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub facebook: ProviderSettings,

    #[serde(default)]
    pub google: ProviderSettings,

    #[serde(default)]
    pub windowslive: ProviderSettings,
}

/// Individual provider settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Provider enabled flag
    #[serde(default)]
    pub enabled: bool,

    /// OAuth client ID issued by the provider
    #[serde(default)]
    pub api_key: String,

    /// OAuth client secret issued by the provider
    #[serde(default)]
    pub api_secret: String,

    /// Scopes requested on top of the provider defaults
    #[serde(default)]
    pub scopes: Vec<String>,
}

/// Redirect persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedirectConfig {
    /// Cookie holding the post-login destination
    #[serde(default = "default_redirect_cookie")]
    pub cookie_name: String,

    /// Lifetime of the redirect cookie in seconds
    #[serde(default = "default_redirect_max_age")]
    pub max_age_secs: u64,

    /// Pre-login cache partitioning cookie removed on login
    #[serde(default = "default_cache_cookie")]
    pub cache_cookie_name: String,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_redirect_cookie(),
            max_age_secs: default_redirect_max_age(),
            cache_cookie_name: default_cache_cookie(),
        }
    }
}

// Default value functions
fn default_service_name() -> String {
    "social-login".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_environment() -> String {
    "dev".to_string()
}

fn default_true() -> bool {
    true
}

fn default_body_limit_mb() -> usize {
    1
}

fn default_cors_mode() -> String {
    "restrictive".to_string()
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_state_ttl() -> u64 {
    600 // 10 minutes
}

fn default_redirect_cookie() -> String {
    "login_redirect".to_string()
}

fn default_redirect_max_age() -> u64 {
    600
}

fn default_cache_cookie() -> String {
    "cache-sessid".to_string()
}

impl Config {
    /// Load configuration from all sources
    ///
    /// Searches for config files in this order (first found wins):
    /// 1. Current working directory: ./config.toml
    /// 2. XDG config directory: ~/.config/social-login/{service_name}/config.toml
    /// 3. System directory: /etc/social-login/{service_name}/config.toml
    ///
    /// Environment variables (SOCIAL_LOGIN_ prefix) override all file-based configs.
    pub fn load() -> Result<Self> {
        let service_name = std::env::current_exe()
            .ok()
            .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_else(default_service_name);

        Self::load_for_service(&service_name)
    }

    /// Load configuration for a specific service name
    pub fn load_for_service(service_name: &str) -> Result<Self> {
        let config_paths = Self::find_config_paths(service_name);

        tracing::debug!("Searching for config files in order:");
        for path in &config_paths {
            tracing::debug!("  - {}", path.display());
        }

        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // Lowest priority first so higher priority files override
        for path in config_paths.iter().rev() {
            if path.exists() {
                tracing::info!("Loading configuration from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config = figment.extract()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    ///
    /// This bypasses XDG directories and loads directly from the given path.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        Ok(config)
    }

    /// Find all possible config file paths for a service, highest priority first
    fn find_config_paths(service_name: &str) -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        let xdg_dirs = xdg::BaseDirectories::with_prefix("social-login");
        let config_file_path = Path::new(service_name).join("config.toml");
        if let Some(path) = xdg_dirs.find_config_file(&config_file_path) {
            paths.push(path);
        }

        paths.push(
            PathBuf::from("/etc/social-login")
                .join(service_name)
                .join("config.toml"),
        );

        paths
    }
}
