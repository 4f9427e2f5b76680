//! Provider authentication
//!
//! The login flow never speaks a provider protocol itself. It hands an
//! [`AuthRequest`] to an [`AuthDelegate`] twice: once without callback
//! parameters to obtain the provider's authorization URL, and once with the
//! parameters the provider redirected back with to obtain the profile.
//!
//! [`OAuthDelegate`] is the default delegate; it runs the OAuth 2.0
//! authorization-code flow through the `oauth2` crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::providers::{ProviderCredentials, ProviderId};

pub mod oauth;

pub use oauth::{
    generate_state, InMemoryOAuthStateManager, OAuthDelegate, OAuthStateManager,
    ProviderEndpoints, StateData,
};

/// Identity data returned by a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialProfile {
    pub provider: ProviderId,
    pub provider_user_id: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl SocialProfile {
    /// Trimmed email, `None` when missing or blank
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }
}

/// Query parameters of a provider callback
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Whether the request carries anything a provider sends back
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.code.is_some() || self.state.is_some() || self.error.is_some()
    }
}

/// One authentication step for a provider
#[derive(Debug, Clone)]
pub struct AuthRequest {
    pub provider: ProviderId,
    /// Absolute URL the provider redirects back to
    pub callback_url: String,
    pub credentials: ProviderCredentials,
    /// `None` starts the handshake, `Some` completes it
    pub callback: Option<CallbackParams>,
}

/// Outcome of a successful authentication step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authentication {
    /// Send the browser to the provider
    Redirect(String),
    /// The provider confirmed the identity
    Connected(SocialProfile),
}

/// Any failure while authenticating with a provider
///
/// Callers treat every variant the same way; the detail is for logs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthFailure {
    #[error("provider returned error '{error}'{}", detail_suffix(.description))]
    Provider {
        error: String,
        description: Option<String>,
    },

    #[error("callback carried no authorization code")]
    MissingCode,

    #[error("unknown, expired or reused OAuth state")]
    InvalidState,

    #[error("OAuth state issued for {expected} but callback is for {actual}")]
    ProviderMismatch {
        expected: ProviderId,
        actual: ProviderId,
    },

    #[error("no credentials configured for {0}")]
    MissingCredentials(ProviderId),

    #[error("invalid OAuth client configuration: {0}")]
    Configuration(String),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("user info request failed: {0}")]
    UserInfo(String),

    #[error("malformed provider profile: {0}")]
    MalformedProfile(String),
}

fn detail_suffix(description: &Option<String>) -> String {
    description
        .as_deref()
        .map(|d| format!(": {d}"))
        .unwrap_or_default()
}

/// Performs provider authentication on behalf of the login flow
#[async_trait]
pub trait AuthDelegate: Send + Sync {
    async fn authenticate(&self, request: AuthRequest) -> Result<Authentication, AuthFailure>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(email: Option<&str>) -> SocialProfile {
        SocialProfile {
            provider: ProviderId::Facebook,
            provider_user_id: None,
            email: email.map(str::to_string),
            first_name: None,
            last_name: None,
        }
    }

    #[test]
    fn test_profile_email_trimmed() {
        assert_eq!(profile(Some(" ana@example.com ")).email(), Some("ana@example.com"));
        assert_eq!(profile(Some("  ")).email(), None);
        assert_eq!(profile(None).email(), None);
    }

    #[test]
    fn test_callback_detection() {
        assert!(!CallbackParams::default().is_present());
        let with_error = CallbackParams {
            error: Some("access_denied".to_string()),
            ..Default::default()
        };
        assert!(with_error.is_present());
        let description_only = CallbackParams {
            error_description: Some("x".to_string()),
            ..Default::default()
        };
        assert!(!description_only.is_present());
    }

    #[test]
    fn test_provider_failure_display() {
        let failure = AuthFailure::Provider {
            error: "access_denied".to_string(),
            description: Some("user cancelled".to_string()),
        };
        assert_eq!(
            failure.to_string(),
            "provider returned error 'access_denied': user cancelled"
        );
        let bare = AuthFailure::Provider {
            error: "access_denied".to_string(),
            description: None,
        };
        assert_eq!(bare.to_string(), "provider returned error 'access_denied'");
    }
}
