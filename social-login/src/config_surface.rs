//! Login configuration exposed to storefront pages

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::providers::{ProviderId, ProviderRegistry};
use crate::redirect::RedirectResolver;

/// Path of the login entry point, relative to the site base URL
pub const ENDPOINT_PATH: &str = "sociallogin/endpoint";

/// Query parameter carrying the encoded post-login destination
pub const REFERER_PARAM: &str = "referer";

/// Top-level document handed to checkout scripts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutConfig {
    #[serde(rename = "socialLogin")]
    pub social_login: SocialLoginSurface,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialLoginSurface {
    pub enabled: bool,
    /// Login entry point with the `referer` parameter already set
    pub redirect_url: String,
    pub providers: ProviderFlags,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderFlags {
    pub facebook: bool,
    pub google: bool,
    pub windowslive: bool,
}

impl ProviderFlags {
    fn set(&mut self, provider: ProviderId, enabled: bool) {
        match provider {
            ProviderId::Facebook => self.facebook = enabled,
            ProviderId::Google => self.google = enabled,
            ProviderId::WindowsLive => self.windowslive = enabled,
        }
    }
}

#[derive(Clone)]
pub struct ConfigSurface {
    registry: Arc<ProviderRegistry>,
    resolver: RedirectResolver,
}

impl ConfigSurface {
    pub fn new(registry: Arc<ProviderRegistry>, resolver: RedirectResolver) -> Self {
        Self { registry, resolver }
    }

    /// Build the checkout configuration
    ///
    /// The caller's `referer` is passed through when it decodes to an
    /// own-origin URL; otherwise the encoded current page is used.
    #[must_use]
    pub fn social_login_config(&self, referer: Option<&str>, current_page: &str) -> CheckoutConfig {
        let referer = match referer {
            Some(raw) if self.resolver.capture_referer(raw).is_some() => raw.to_string(),
            _ => self.resolver.default_referer(current_page).encoded(),
        };

        let mut redirect_url = self.resolver.site_url(ENDPOINT_PATH);
        redirect_url
            .query_pairs_mut()
            .append_pair(REFERER_PARAM, &referer);

        let mut providers = ProviderFlags::default();
        for (provider, enabled) in self.registry.providers() {
            providers.set(provider, enabled);
        }

        CheckoutConfig {
            social_login: SocialLoginSurface {
                enabled: self.registry.is_enabled(),
                redirect_url: redirect_url.to_string(),
                providers,
            },
        }
    }
}
