//! Application state management

use std::sync::Arc;

use crate::accounts::{AccountLinker, AccountRepository, InMemoryAccountRepository};
use crate::auth::{AuthDelegate, InMemoryOAuthStateManager, OAuthDelegate};
use crate::config::Config;
use crate::config_surface::ConfigSurface;
use crate::error::{Error, Result};
use crate::flow::SocialLoginFlow;
use crate::providers::ProviderRegistry;
use crate::redirect::{HostChecker, RedirectResolver, SiteHostChecker};
use crate::session::SessionBinder;

/// Application state shared across handlers
///
/// Cloning is cheap; every collaborator sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    registry: Arc<ProviderRegistry>,
    resolver: RedirectResolver,
    flow: SocialLoginFlow,
    surface: ConfigSurface,
}

impl AppState {
    /// Create state with the default in-memory collaborators
    pub fn new(config: Config) -> Result<Self> {
        Self::builder().config(config).build()
    }

    /// Create a new builder for AppState
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::new()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn resolver(&self) -> &RedirectResolver {
        &self.resolver
    }

    pub fn flow(&self) -> &SocialLoginFlow {
        &self.flow
    }

    pub fn config_surface(&self) -> &ConfigSurface {
        &self.surface
    }
}

/// Builder for AppState
///
/// Collaborators that are not provided fall back to:
/// - [`InMemoryAccountRepository`] for accounts
/// - [`OAuthDelegate`] with an [`InMemoryOAuthStateManager`] for providers
/// - [`SiteHostChecker`] over `site.base_url` and `site.allowed_hosts`
#[derive(Default)]
pub struct AppStateBuilder {
    config: Option<Config>,
    repository: Option<Arc<dyn AccountRepository>>,
    delegate: Option<Arc<dyn AuthDelegate>>,
    host_checker: Option<Arc<dyn HostChecker>>,
}

impl AppStateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Use a specific account store
    pub fn account_repository(mut self, repository: Arc<dyn AccountRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Use a specific provider authentication delegate
    pub fn auth_delegate(mut self, delegate: Arc<dyn AuthDelegate>) -> Self {
        self.delegate = Some(delegate);
        self
    }

    /// Use a specific own-origin policy
    pub fn host_checker(mut self, checker: Arc<dyn HostChecker>) -> Self {
        self.host_checker = Some(checker);
        self
    }

    /// Wire the collaborators together
    ///
    /// Fails when `site.base_url` is not an absolute URL.
    pub fn build(self) -> Result<AppState> {
        let config = self.config.unwrap_or_default();

        let base_url = url::Url::parse(&config.site.base_url).map_err(|e| {
            Error::Internal(format!("Invalid site.base_url '{}': {e}", config.site.base_url))
        })?;
        let checker = self.host_checker.unwrap_or_else(|| {
            Arc::new(SiteHostChecker::new(&base_url, &config.site.allowed_hosts))
        });
        let resolver = RedirectResolver::new(base_url, checker, &config.redirect);

        let delegate = match self.delegate {
            Some(delegate) => delegate,
            None => {
                let states = Arc::new(InMemoryOAuthStateManager::new(
                    config.social_login.state_ttl_secs,
                ));
                let delegate = OAuthDelegate::new(states)
                    .map_err(|e| Error::Internal(format!("Failed to build OAuth delegate: {e}")))?;
                Arc::new(delegate)
            }
        };

        let repository = self
            .repository
            .unwrap_or_else(|| Arc::new(InMemoryAccountRepository::new()));

        let registry = Arc::new(ProviderRegistry::new(config.social_login.clone()));
        let flow = SocialLoginFlow::new(
            registry.clone(),
            resolver.clone(),
            delegate,
            AccountLinker::new(repository),
            SessionBinder::new(config.redirect.cache_cookie_name.clone()),
            config.store,
        );
        let surface = ConfigSurface::new(registry.clone(), resolver.clone());

        tracing::debug!(
            enabled = registry.is_enabled(),
            base_url = %resolver.base_url(),
            "Social login state initialized"
        );

        Ok(AppState {
            config: Arc::new(config),
            registry,
            resolver,
            flow,
            surface,
        })
    }
}
