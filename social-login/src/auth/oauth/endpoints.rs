//! Static endpoint descriptors for the supported providers

use oauth2::AuthType;
use serde_json::Value;

use crate::auth::{AuthFailure, SocialProfile};
use crate::providers::ProviderId;

/// Names of the user-info fields a provider returns
#[derive(Debug)]
struct ProfileFields {
    id: &'static str,
    first_name: &'static str,
    last_name: &'static str,
    email: &'static str,
}

/// Everything needed to run the authorization-code flow against a provider
#[derive(Debug)]
pub struct ProviderEndpoints {
    pub provider: ProviderId,
    pub authorize_url: &'static str,
    pub token_url: &'static str,
    pub userinfo_url: &'static str,
    pub default_scopes: &'static [&'static str],
    /// How the client secret is sent to the token endpoint
    pub client_auth: AuthType,
    fields: ProfileFields,
}

const OIDC_FIELDS: ProfileFields = ProfileFields {
    id: "sub",
    first_name: "given_name",
    last_name: "family_name",
    email: "email",
};

static FACEBOOK: ProviderEndpoints = ProviderEndpoints {
    provider: ProviderId::Facebook,
    authorize_url: "https://www.facebook.com/v19.0/dialog/oauth",
    token_url: "https://graph.facebook.com/v19.0/oauth/access_token",
    userinfo_url: "https://graph.facebook.com/me?fields=id,first_name,last_name,email",
    default_scopes: &["email", "public_profile"],
    client_auth: AuthType::RequestBody,
    fields: ProfileFields {
        id: "id",
        first_name: "first_name",
        last_name: "last_name",
        email: "email",
    },
};

static GOOGLE: ProviderEndpoints = ProviderEndpoints {
    provider: ProviderId::Google,
    authorize_url: "https://accounts.google.com/o/oauth2/v2/auth",
    token_url: "https://oauth2.googleapis.com/token",
    userinfo_url: "https://www.googleapis.com/oauth2/v3/userinfo",
    default_scopes: &["openid", "email", "profile"],
    client_auth: AuthType::BasicAuth,
    fields: OIDC_FIELDS,
};

static WINDOWS_LIVE: ProviderEndpoints = ProviderEndpoints {
    provider: ProviderId::WindowsLive,
    authorize_url: "https://login.microsoftonline.com/consumers/oauth2/v2.0/authorize",
    token_url: "https://login.microsoftonline.com/consumers/oauth2/v2.0/token",
    userinfo_url: "https://graph.microsoft.com/oidc/userinfo",
    default_scopes: &["openid", "email", "profile", "User.Read"],
    client_auth: AuthType::RequestBody,
    fields: OIDC_FIELDS,
};

impl ProviderEndpoints {
    #[must_use]
    pub fn for_provider(provider: ProviderId) -> &'static ProviderEndpoints {
        match provider {
            ProviderId::Facebook => &FACEBOOK,
            ProviderId::Google => &GOOGLE,
            ProviderId::WindowsLive => &WINDOWS_LIVE,
        }
    }

    /// Default scopes followed by any configured extras not already present
    #[must_use]
    pub fn scopes(&self, additional: &[String]) -> Vec<String> {
        let mut scopes: Vec<String> = self.default_scopes.iter().map(|s| s.to_string()).collect();
        for scope in additional {
            if !scopes.contains(scope) {
                scopes.push(scope.clone());
            }
        }
        scopes
    }

    /// Map a user-info response onto a [`SocialProfile`]
    ///
    /// Missing fields stay `None`; only a non-object body is malformed.
    pub fn profile_from_userinfo(&self, body: &Value) -> Result<SocialProfile, AuthFailure> {
        let object = body.as_object().ok_or_else(|| {
            AuthFailure::MalformedProfile(format!("{} user info is not a JSON object", self.provider))
        })?;

        let text = |field: &str| -> Option<String> {
            match object.get(field)? {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            }
        };

        Ok(SocialProfile {
            provider: self.provider,
            provider_user_id: text(self.fields.id),
            email: text(self.fields.email),
            first_name: text(self.fields.first_name),
            last_name: text(self.fields.last_name),
        })
    }
}
