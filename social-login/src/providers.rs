//! Supported identity providers and their configured switches and credentials

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::{ProviderSettings, SocialLoginConfig};

/// Identity providers the login flow knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Facebook,
    Google,
    WindowsLive,
}

impl ProviderId {
    /// Every supported provider, in display order
    pub const ALL: [ProviderId; 3] = [
        ProviderId::Facebook,
        ProviderId::Google,
        ProviderId::WindowsLive,
    ];

    /// Canonical wire name (`facebook`, `google`, `windowslive`)
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Facebook => "facebook",
            Self::Google => "google",
            Self::WindowsLive => "windowslive",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a provider name is not one of the supported ids
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown provider: {0}")]
pub struct UnknownProvider(pub String);

impl FromStr for ProviderId {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "facebook" => Ok(Self::Facebook),
            "google" => Ok(Self::Google),
            "windowslive" | "windows_live" => Ok(Self::WindowsLive),
            _ => Err(UnknownProvider(s.to_string())),
        }
    }
}

/// API key and secret for one provider
///
/// Both are empty when the provider is unknown or not configured.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ProviderCredentials {
    pub api_key: String,
    pub api_secret: String,
    /// Scopes requested on top of the provider defaults
    pub scopes: Vec<String>,
}

impl ProviderCredentials {
    /// Whether both key and secret are set
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.api_key.is_empty() && !self.api_secret.is_empty()
    }
}

impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Read-only view over the social login configuration
///
/// Lookups never fail: an unknown provider name is simply disabled and has
/// empty credentials.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    config: SocialLoginConfig,
}

impl ProviderRegistry {
    pub fn new(config: SocialLoginConfig) -> Self {
        Self { config }
    }

    /// Global module switch
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Provider flag for a raw provider name
    #[must_use]
    pub fn is_provider_enabled(&self, provider: &str) -> bool {
        provider
            .parse::<ProviderId>()
            .map(|id| self.is_provider_enabled_for(id))
            .unwrap_or(false)
    }

    /// Provider flag for a known provider
    #[must_use]
    pub fn is_provider_enabled_for(&self, provider: ProviderId) -> bool {
        self.settings(provider).enabled
    }

    /// Whether a login through `provider` may start: module and provider both on
    #[must_use]
    pub fn is_usable(&self, provider: ProviderId) -> bool {
        self.is_enabled() && self.is_provider_enabled_for(provider)
    }

    /// Credentials for a raw provider name
    #[must_use]
    pub fn credentials(&self, provider: &str) -> ProviderCredentials {
        provider
            .parse::<ProviderId>()
            .map(|id| self.credentials_for(id))
            .unwrap_or_default()
    }

    /// Credentials for a known provider
    #[must_use]
    pub fn credentials_for(&self, provider: ProviderId) -> ProviderCredentials {
        let settings = self.settings(provider);
        ProviderCredentials {
            api_key: settings.api_key.clone(),
            api_secret: settings.api_secret.clone(),
            scopes: settings.scopes.clone(),
        }
    }

    /// Enabled flag of every provider, in display order
    #[must_use]
    pub fn providers(&self) -> [(ProviderId, bool); 3] {
        ProviderId::ALL.map(|id| (id, self.is_provider_enabled_for(id)))
    }

    fn settings(&self, provider: ProviderId) -> &ProviderSettings {
        let providers = &self.config.providers;
        match provider {
            ProviderId::Facebook => &providers.facebook,
            ProviderId::Google => &providers.google,
            ProviderId::WindowsLive => &providers.windowslive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ProviderRegistry {
        let mut config = SocialLoginConfig {
            enabled: true,
            ..Default::default()
        };
        config.providers.google = ProviderSettings {
            enabled: true,
            api_key: "google-id".to_string(),
            api_secret: "google-secret".to_string(),
            scopes: vec![],
        };
        config.providers.windowslive.enabled = true;
        ProviderRegistry::new(config)
    }

    #[test]
    fn test_provider_id_parsing() {
        assert_eq!("google".parse::<ProviderId>().unwrap(), ProviderId::Google);
        assert_eq!("Facebook".parse::<ProviderId>().unwrap(), ProviderId::Facebook);
        assert_eq!(
            "WindowsLive".parse::<ProviderId>().unwrap(),
            ProviderId::WindowsLive
        );
        assert!("myspace".parse::<ProviderId>().is_err());
        assert_eq!(ProviderId::WindowsLive.to_string(), "windowslive");
    }

    #[test]
    fn test_provider_flags() {
        let registry = registry();
        assert!(registry.is_enabled());
        assert!(registry.is_provider_enabled("google"));
        assert!(registry.is_provider_enabled("WindowsLive"));
        assert!(!registry.is_provider_enabled("facebook"));
        assert_eq!(
            registry.providers(),
            [
                (ProviderId::Facebook, false),
                (ProviderId::Google, true),
                (ProviderId::WindowsLive, true),
            ]
        );
    }

    #[test]
    fn test_unknown_provider_is_disabled_with_empty_credentials() {
        let registry = registry();
        assert!(!registry.is_provider_enabled("myspace"));
        let creds = registry.credentials("myspace");
        assert!(creds.api_key.is_empty());
        assert!(creds.api_secret.is_empty());
        assert!(!creds.is_complete());
    }

    #[test]
    fn test_credentials_lookup() {
        let creds = registry().credentials("google");
        assert_eq!(creds.api_key, "google-id");
        assert_eq!(creds.api_secret, "google-secret");
        assert!(creds.is_complete());
        assert!(!format!("{creds:?}").contains("google-secret"));
    }

    #[test]
    fn test_global_switch_gates_usability() {
        let mut config = SocialLoginConfig::default();
        config.providers.google.enabled = true;
        let registry = ProviderRegistry::new(config);
        assert!(registry.is_provider_enabled("google"));
        assert!(!registry.is_usable(ProviderId::Google));
    }
}
