//! Authorization-code flow against the configured providers

use async_trait::async_trait;
use oauth2::{
    basic::BasicErrorResponse, AuthUrl, AuthorizationCode, Client, ClientId, ClientSecret,
    CsrfToken, EmptyExtraTokenFields, RedirectUrl, Scope, StandardRevocableToken,
    StandardTokenIntrospectionResponse, StandardTokenResponse, TokenResponse, TokenUrl,
};
use reqwest::Client as HttpClient;
use std::sync::Arc;

use super::endpoints::ProviderEndpoints;
use super::state::{OAuthStateManager, StateData};
use crate::auth::{AuthDelegate, AuthFailure, AuthRequest, Authentication, CallbackParams};

/// Type alias for our configured OAuth client
type ConfiguredClient = Client<
    BasicErrorResponse,
    StandardTokenResponse<EmptyExtraTokenFields, oauth2::basic::BasicTokenType>,
    StandardTokenIntrospectionResponse<EmptyExtraTokenFields, oauth2::basic::BasicTokenType>,
    StandardRevocableToken,
    BasicErrorResponse,
    oauth2::EndpointSet,
    oauth2::EndpointNotSet,
    oauth2::EndpointNotSet,
    oauth2::EndpointNotSet,
    oauth2::EndpointSet,
>;

/// [`AuthDelegate`] speaking OAuth 2.0 to Facebook, Google and Windows Live
///
/// Credentials arrive with each request, so one delegate serves every
/// provider and picks up configuration changes without a rebuild.
#[derive(Clone)]
pub struct OAuthDelegate {
    http_client: HttpClient,
    states: Arc<dyn OAuthStateManager>,
}

impl OAuthDelegate {
    /// Create a delegate with its own HTTP client
    pub fn new(states: Arc<dyn OAuthStateManager>) -> Result<Self, AuthFailure> {
        let http_client = HttpClient::builder()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("social-login/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AuthFailure::Configuration(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self::with_http_client(http_client, states))
    }

    pub fn with_http_client(http_client: HttpClient, states: Arc<dyn OAuthStateManager>) -> Self {
        Self {
            http_client,
            states,
        }
    }

    fn client(
        &self,
        endpoints: &ProviderEndpoints,
        request: &AuthRequest,
    ) -> Result<ConfiguredClient, AuthFailure> {
        if !request.credentials.is_complete() {
            return Err(AuthFailure::MissingCredentials(request.provider));
        }

        let client = Client::new(ClientId::new(request.credentials.api_key.clone()))
            .set_client_secret(ClientSecret::new(request.credentials.api_secret.clone()))
            .set_auth_uri(
                AuthUrl::new(endpoints.authorize_url.to_string())
                    .map_err(|e| AuthFailure::Configuration(format!("Invalid auth URL: {e}")))?,
            )
            .set_token_uri(
                TokenUrl::new(endpoints.token_url.to_string())
                    .map_err(|e| AuthFailure::Configuration(format!("Invalid token URL: {e}")))?,
            )
            .set_redirect_uri(
                RedirectUrl::new(request.callback_url.clone())
                    .map_err(|e| AuthFailure::Configuration(format!("Invalid redirect URI: {e}")))?,
            )
            .set_auth_type(endpoints.client_auth.clone());

        Ok(client)
    }

    async fn start(
        &self,
        endpoints: &ProviderEndpoints,
        request: &AuthRequest,
    ) -> Result<Authentication, AuthFailure> {
        let client = self.client(endpoints, request)?;
        let state = self
            .states
            .create_state(&StateData::new(request.provider))
            .await?;

        let mut auth_request = client.authorize_url(|| CsrfToken::new(state));
        for scope in endpoints.scopes(&request.credentials.scopes) {
            auth_request = auth_request.add_scope(Scope::new(scope));
        }

        let (url, _) = auth_request.url();
        tracing::debug!(provider = %request.provider, "Issued authorization URL");
        Ok(Authentication::Redirect(url.to_string()))
    }

    async fn finish(
        &self,
        endpoints: &ProviderEndpoints,
        request: &AuthRequest,
        callback: &CallbackParams,
    ) -> Result<Authentication, AuthFailure> {
        if let Some(error) = &callback.error {
            return Err(AuthFailure::Provider {
                error: error.clone(),
                description: callback.error_description.clone(),
            });
        }

        let state = callback.state.as_deref().ok_or(AuthFailure::InvalidState)?;
        let issued = self.states.validate_state(state).await?;
        if issued.provider != request.provider {
            return Err(AuthFailure::ProviderMismatch {
                expected: issued.provider,
                actual: request.provider,
            });
        }

        let code = callback
            .code
            .as_deref()
            .filter(|code| !code.is_empty())
            .ok_or(AuthFailure::MissingCode)?;

        let client = self.client(endpoints, request)?;
        let token_result = client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&self.http_client)
            .await
            .map_err(|e| AuthFailure::TokenExchange(e.to_string()))?;

        let body = self
            .fetch_userinfo(endpoints, token_result.access_token().secret())
            .await?;
        let profile = endpoints.profile_from_userinfo(&body)?;

        tracing::debug!(provider = %request.provider, "Provider returned profile");
        Ok(Authentication::Connected(profile))
    }

    async fn fetch_userinfo(
        &self,
        endpoints: &ProviderEndpoints,
        access_token: &str,
    ) -> Result<serde_json::Value, AuthFailure> {
        let response = self
            .http_client
            .get(endpoints.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthFailure::UserInfo(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthFailure::UserInfo(format!("{status} - {body}")));
        }

        response
            .json()
            .await
            .map_err(|e| AuthFailure::MalformedProfile(e.to_string()))
    }
}

#[async_trait]
impl AuthDelegate for OAuthDelegate {
    async fn authenticate(&self, request: AuthRequest) -> Result<Authentication, AuthFailure> {
        let endpoints = ProviderEndpoints::for_provider(request.provider);
        match &request.callback {
            None => self.start(endpoints, &request).await,
            Some(callback) => self.finish(endpoints, &request, callback).await,
        }
    }
}
