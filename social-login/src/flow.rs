//! The social login state machine
//!
//! ```text
//! Idle ──start──▶ AwaitingProviderCallback ──callback──▶ LinkedSuccess
//!   │                                          │
//!   └──────────────── rejected ────────────────┴──────▶ LinkedFailure
//! ```
//!
//! One request drives one transition. Terminal states send the browser to the
//! remembered destination; failures leave a flash message behind.

use std::fmt;
use std::sync::Arc;

use crate::accounts::{AccountCreateError, AccountLinker, StoreScope};
use crate::auth::{AuthDelegate, AuthRequest, Authentication, CallbackParams, SocialProfile};
use crate::config_surface::ENDPOINT_PATH;
use crate::error::Result;
use crate::providers::{ProviderId, ProviderRegistry};
use crate::redirect::RedirectResolver;
use crate::session::{CookieStore, FlashMessage, SessionBinder, SessionStore};

/// Shown for every failure that is not an account write
pub const LOGIN_FAILED_MESSAGE: &str = "Unable to login, try another way.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    AwaitingProviderCallback,
    LinkedSuccess,
    LinkedFailure,
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::AwaitingProviderCallback => "awaiting_provider_callback",
            Self::LinkedSuccess => "linked_success",
            Self::LinkedFailure => "linked_failure",
        };
        f.write_str(name)
    }
}

/// One hit on the login endpoint
#[derive(Debug, Clone, Default)]
pub struct FlowRequest {
    /// Raw provider name from the query
    pub provider: String,
    /// Encoded destination supplied by the page
    pub referer: Option<String>,
    /// Page the request came from
    pub current_page: String,
    /// Present when the provider redirected back
    pub callback: Option<CallbackParams>,
}

/// Where the browser goes next
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowOutcome {
    pub state: FlowState,
    pub redirect_to: String,
}

#[derive(Clone)]
pub struct SocialLoginFlow {
    registry: Arc<ProviderRegistry>,
    resolver: RedirectResolver,
    delegate: Arc<dyn AuthDelegate>,
    linker: AccountLinker,
    binder: SessionBinder,
    scope: StoreScope,
}

impl SocialLoginFlow {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        resolver: RedirectResolver,
        delegate: Arc<dyn AuthDelegate>,
        linker: AccountLinker,
        binder: SessionBinder,
        scope: StoreScope,
    ) -> Self {
        Self {
            registry,
            resolver,
            delegate,
            linker,
            binder,
            scope,
        }
    }

    /// Advance the flow for one request
    ///
    /// Only session infrastructure failures are returned as errors; every
    /// login problem ends in [`FlowState::LinkedFailure`].
    pub async fn handle(
        &self,
        request: FlowRequest,
        session: &dyn SessionStore,
        cookies: &mut dyn CookieStore,
    ) -> Result<FlowOutcome> {
        let captured = request
            .referer
            .as_deref()
            .and_then(|raw| self.resolver.capture_referer(raw));
        if let Some(target) = &captured {
            self.resolver.persist(target, cookies);
        }

        let provider = match request.provider.parse::<ProviderId>() {
            Ok(provider) if self.registry.is_usable(provider) => provider,
            Ok(provider) => {
                tracing::warn!(%provider, "Login attempted with disabled provider");
                return self.fail(LOGIN_FAILED_MESSAGE, &request, session, cookies).await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Login attempted with unknown provider");
                return self.fail(LOGIN_FAILED_MESSAGE, &request, session, cookies).await;
            }
        };

        // A new handshake replaces whatever an earlier attempt left behind
        if request.callback.is_none() && captured.is_none() {
            let target = self.resolver.default_referer(&request.current_page);
            self.resolver.persist(&target, cookies);
        }

        let auth_request = AuthRequest {
            provider,
            callback_url: self.callback_url(provider),
            credentials: self.registry.credentials_for(provider),
            callback: request.callback.clone(),
        };

        match self.delegate.authenticate(auth_request).await {
            Ok(Authentication::Redirect(url)) => {
                tracing::info!(%provider, state = %FlowState::AwaitingProviderCallback, "Redirecting to provider");
                Ok(FlowOutcome {
                    state: FlowState::AwaitingProviderCallback,
                    redirect_to: url,
                })
            }
            Ok(Authentication::Connected(profile)) => {
                self.link(profile, &request, session, cookies).await
            }
            Err(failure) => {
                tracing::warn!(%provider, error = %failure, "Provider authentication failed");
                self.fail(LOGIN_FAILED_MESSAGE, &request, session, cookies).await
            }
        }
    }

    /// Absolute endpoint URL the provider sends the browser back to
    #[must_use]
    pub fn callback_url(&self, provider: ProviderId) -> String {
        let mut url = self.resolver.site_url(ENDPOINT_PATH);
        url.query_pairs_mut().append_pair("provider", provider.as_str());
        url.to_string()
    }

    async fn link(
        &self,
        profile: SocialProfile,
        request: &FlowRequest,
        session: &dyn SessionStore,
        cookies: &mut dyn CookieStore,
    ) -> Result<FlowOutcome> {
        let provider = profile.provider;
        let account = match self.linker.resolve_or_create(&profile, self.scope).await {
            Ok(Some(account)) => account,
            Ok(None) => {
                tracing::warn!(%provider, "Provider profile has no email");
                return self.fail(LOGIN_FAILED_MESSAGE, request, session, cookies).await;
            }
            Err(e) => return self.account_failure(e, request, session, cookies).await,
        };

        // Activate the stored record, not the in-flight copy
        let account = match self.linker.reload(&account.id).await {
            Ok(account) => account,
            Err(e) => return self.account_failure(e, request, session, cookies).await,
        };

        self.binder.activate(&account, session, cookies).await?;
        tracing::info!(%provider, account_id = %account.id, state = %FlowState::LinkedSuccess, "Social login completed");

        Ok(self.finish(FlowState::LinkedSuccess, request, cookies))
    }

    async fn account_failure(
        &self,
        error: AccountCreateError,
        request: &FlowRequest,
        session: &dyn SessionStore,
        cookies: &mut dyn CookieStore,
    ) -> Result<FlowOutcome> {
        tracing::error!(error = %error, "Account resolution failed");
        self.fail(AccountCreateError::USER_MESSAGE, request, session, cookies)
            .await
    }

    async fn fail(
        &self,
        message: &str,
        request: &FlowRequest,
        session: &dyn SessionStore,
        cookies: &mut dyn CookieStore,
    ) -> Result<FlowOutcome> {
        session.push_message(FlashMessage::error(message)).await?;
        tracing::info!(state = %FlowState::LinkedFailure, "Social login ended without a session");
        Ok(self.finish(FlowState::LinkedFailure, request, cookies))
    }

    fn finish(
        &self,
        state: FlowState,
        request: &FlowRequest,
        cookies: &mut dyn CookieStore,
    ) -> FlowOutcome {
        let target = self
            .resolver
            .resume(cookies)
            .unwrap_or_else(|| self.resolver.default_referer(&request.current_page));
        FlowOutcome {
            state,
            redirect_to: target.into_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::{
        Account, AccountRepository, InMemoryAccountRepository, NewAccount, RepositoryError,
        RepositoryOperation,
    };
    use crate::auth::AuthFailure;
    use crate::config::{RedirectConfig, SiteConfig, SocialLoginConfig};
    use crate::ids::AccountId;
    use crate::redirect::encode_url;
    use crate::session::RequestCookies;
    use async_trait::async_trait;
    use http::{header, HeaderMap, HeaderValue};
    use std::sync::Mutex;

    const PROVIDER_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth?state=abc";

    /// Delegate returning a scripted result and recording what it was asked
    struct ScriptedDelegate {
        result: std::result::Result<Authentication, AuthFailure>,
        requests: Mutex<Vec<AuthRequest>>,
    }

    impl ScriptedDelegate {
        fn new(result: std::result::Result<Authentication, AuthFailure>) -> Arc<Self> {
            Arc::new(Self {
                result,
                requests: Mutex::new(Vec::new()),
            })
        }

        fn connected(email: Option<&str>) -> Arc<Self> {
            Self::with_profile(SocialProfile {
                provider: ProviderId::Google,
                provider_user_id: Some("g-1".to_string()),
                email: email.map(str::to_string),
                first_name: Some("Ana".to_string()),
                last_name: None,
            })
        }

        fn with_profile(profile: SocialProfile) -> Arc<Self> {
            Self::new(Ok(Authentication::Connected(profile)))
        }
    }

    #[async_trait]
    impl AuthDelegate for ScriptedDelegate {
        async fn authenticate(&self, request: AuthRequest) -> std::result::Result<Authentication, AuthFailure> {
            self.requests.lock().unwrap().push(request);
            self.result.clone()
        }
    }

    #[derive(Default)]
    struct MemorySession {
        account: Mutex<Option<AccountId>>,
        messages: Mutex<Vec<FlashMessage>>,
    }

    #[async_trait]
    impl SessionStore for MemorySession {
        async fn set_authenticated(&self, account: &Account) -> Result<()> {
            *self.account.lock().unwrap() = Some(account.id.clone());
            Ok(())
        }

        async fn account_id(&self) -> Result<Option<AccountId>> {
            Ok(self.account.lock().unwrap().clone())
        }

        async fn push_message(&self, message: FlashMessage) -> Result<()> {
            self.messages.lock().unwrap().push(message);
            Ok(())
        }

        async fn take_messages(&self) -> Result<Vec<FlashMessage>> {
            Ok(std::mem::take(&mut *self.messages.lock().unwrap()))
        }
    }

    struct ReadOnlyRepository;

    #[async_trait]
    impl AccountRepository for ReadOnlyRepository {
        async fn find_by_email(&self, _: &str, _: u32) -> std::result::Result<Option<Account>, RepositoryError> {
            Ok(None)
        }

        async fn create(&self, _: NewAccount) -> std::result::Result<Account, RepositoryError> {
            Err(RepositoryError::connection_failed(RepositoryOperation::Create, "read-only"))
        }

        async fn get_by_id(&self, id: &AccountId) -> std::result::Result<Account, RepositoryError> {
            Err(RepositoryError::not_found(id))
        }
    }

    fn social_config(enabled: bool) -> SocialLoginConfig {
        let mut config = SocialLoginConfig {
            enabled,
            ..Default::default()
        };
        config.providers.google.enabled = true;
        config.providers.google.api_key = "id".to_string();
        config.providers.google.api_secret = "secret".to_string();
        config
    }

    fn flow_with(
        config: SocialLoginConfig,
        delegate: Arc<dyn AuthDelegate>,
        repository: Arc<dyn AccountRepository>,
    ) -> SocialLoginFlow {
        let site = SiteConfig {
            base_url: "https://shop.example".to_string(),
            allowed_hosts: vec![],
        };
        SocialLoginFlow::new(
            Arc::new(ProviderRegistry::new(config)),
            RedirectResolver::from_config(&site, &RedirectConfig::default()).unwrap(),
            delegate,
            AccountLinker::new(repository),
            SessionBinder::new("cache-sessid"),
            StoreScope::default(),
        )
    }

    fn start_request(referer: Option<&str>) -> FlowRequest {
        FlowRequest {
            provider: "google".to_string(),
            referer: referer.map(encode_url),
            current_page: "https://shop.example/cart".to_string(),
            callback: None,
        }
    }

    fn callback_request() -> FlowRequest {
        FlowRequest {
            provider: "google".to_string(),
            referer: None,
            current_page: "https://shop.example/".to_string(),
            callback: Some(CallbackParams {
                code: Some("code".to_string()),
                state: Some("abc".to_string()),
                ..Default::default()
            }),
        }
    }

    /// Cookies a browser returning from the provider would send
    fn returning_cookies(target: &str) -> RequestCookies {
        let mut headers = HeaderMap::new();
        let cookie = format!("login_redirect={}; cache-sessid=p1", encode_url(target));
        headers.insert(header::COOKIE, HeaderValue::from_str(&cookie).unwrap());
        RequestCookies::from_headers(&headers)
    }

    fn messages(session: &MemorySession) -> Vec<String> {
        session
            .messages
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.message.clone())
            .collect()
    }

    #[tokio::test]
    async fn test_disabled_module_fails_back_to_referer() {
        let delegate = ScriptedDelegate::new(Ok(Authentication::Redirect(PROVIDER_URL.to_string())));
        let flow = flow_with(social_config(false), delegate.clone(), Arc::new(InMemoryAccountRepository::new()));
        let session = MemorySession::default();
        let mut cookies = RequestCookies::new();

        let outcome = flow
            .handle(start_request(Some("https://shop.example/checkout/")), &session, &mut cookies)
            .await
            .unwrap();

        assert_eq!(outcome.state, FlowState::LinkedFailure);
        assert_eq!(outcome.redirect_to, "https://shop.example/checkout/");
        assert_eq!(messages(&session), vec![LOGIN_FAILED_MESSAGE]);
        assert!(delegate.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_provider_fails() {
        let flow = flow_with(
            social_config(true),
            ScriptedDelegate::new(Ok(Authentication::Redirect(PROVIDER_URL.to_string()))),
            Arc::new(InMemoryAccountRepository::new()),
        );
        let session = MemorySession::default();
        let mut request = start_request(None);
        request.provider = "myspace".to_string();

        let outcome = flow
            .handle(request, &session, &mut RequestCookies::new())
            .await
            .unwrap();
        assert_eq!(outcome.state, FlowState::LinkedFailure);
        assert_eq!(outcome.redirect_to, "https://shop.example/cart");
    }

    #[tokio::test]
    async fn test_start_redirects_to_provider_and_remembers_page() {
        let delegate = ScriptedDelegate::new(Ok(Authentication::Redirect(PROVIDER_URL.to_string())));
        let flow = flow_with(social_config(true), delegate.clone(), Arc::new(InMemoryAccountRepository::new()));
        let session = MemorySession::default();
        let mut cookies = RequestCookies::new();

        let outcome = flow.handle(start_request(None), &session, &mut cookies).await.unwrap();

        assert_eq!(outcome.state, FlowState::AwaitingProviderCallback);
        assert_eq!(outcome.redirect_to, PROVIDER_URL);
        assert!(messages(&session).is_empty());
        assert_eq!(
            cookies.get("login_redirect"),
            Some(encode_url("https://shop.example/cart"))
        );

        let requests = delegate.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].callback.is_none());
        assert_eq!(
            requests[0].callback_url,
            "https://shop.example/sociallogin/endpoint?provider=google"
        );
        assert_eq!(requests[0].credentials.api_key, "id");
    }

    #[tokio::test]
    async fn test_start_prefers_captured_referer() {
        let flow = flow_with(
            social_config(true),
            ScriptedDelegate::new(Ok(Authentication::Redirect(PROVIDER_URL.to_string()))),
            Arc::new(InMemoryAccountRepository::new()),
        );
        let mut cookies = RequestCookies::new();

        flow.handle(
            start_request(Some("https://shop.example/checkout/")),
            &MemorySession::default(),
            &mut cookies,
        )
        .await
        .unwrap();

        assert_eq!(
            cookies.get("login_redirect"),
            Some(encode_url("https://shop.example/checkout/"))
        );
    }

    #[tokio::test]
    async fn test_foreign_referer_is_ignored() {
        let flow = flow_with(
            social_config(true),
            ScriptedDelegate::new(Ok(Authentication::Redirect(PROVIDER_URL.to_string()))),
            Arc::new(InMemoryAccountRepository::new()),
        );
        let mut cookies = RequestCookies::new();

        flow.handle(
            start_request(Some("https://evil.example/")),
            &MemorySession::default(),
            &mut cookies,
        )
        .await
        .unwrap();

        assert_eq!(
            cookies.get("login_redirect"),
            Some(encode_url("https://shop.example/cart"))
        );
    }

    #[tokio::test]
    async fn test_new_start_replaces_leftover_target() {
        let flow = flow_with(
            social_config(true),
            ScriptedDelegate::new(Ok(Authentication::Redirect(PROVIDER_URL.to_string()))),
            Arc::new(InMemoryAccountRepository::new()),
        );
        // Left behind by an abandoned login started on another page
        let mut cookies = returning_cookies("https://shop.example/product-a");

        let outcome = flow
            .handle(
                start_request(Some("https://evil.example/x")),
                &MemorySession::default(),
                &mut cookies,
            )
            .await
            .unwrap();

        assert_eq!(outcome.state, FlowState::AwaitingProviderCallback);
        assert_eq!(
            cookies.get("login_redirect"),
            Some(encode_url("https://shop.example/cart"))
        );
    }

    #[tokio::test]
    async fn test_callback_creates_account_and_logs_in() {
        let repository = Arc::new(InMemoryAccountRepository::new());
        let flow = flow_with(
            social_config(true),
            ScriptedDelegate::connected(Some("ana@example.com")),
            repository.clone(),
        );
        let session = MemorySession::default();
        let mut cookies = returning_cookies("https://shop.example/checkout/");

        let outcome = flow.handle(callback_request(), &session, &mut cookies).await.unwrap();

        assert_eq!(outcome.state, FlowState::LinkedSuccess);
        assert_eq!(outcome.redirect_to, "https://shop.example/checkout/");
        assert!(messages(&session).is_empty());

        let account = repository
            .find_by_email("ana@example.com", 1)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(account.first_name, "Ana");
        assert_eq!(account.last_name, "-");
        assert_eq!(session.account_id().await.unwrap(), Some(account.id));

        // Redirect and cache cookies are both expired
        assert_eq!(cookies.get("login_redirect"), None);
        assert_eq!(cookies.get("cache-sessid"), None);
        assert_eq!(cookies.set_cookie_headers().len(), 2);
    }

    #[tokio::test]
    async fn test_callback_reuses_existing_account() {
        let repository = Arc::new(InMemoryAccountRepository::new());
        let existing = repository
            .create(NewAccount {
                email: "Ana@Example.com".to_string(),
                first_name: "Ana".to_string(),
                last_name: "Silva".to_string(),
                scope: StoreScope::default(),
            })
            .await
            .unwrap();
        let flow = flow_with(
            social_config(true),
            ScriptedDelegate::with_profile(SocialProfile {
                provider: ProviderId::Google,
                provider_user_id: Some("g-1".to_string()),
                email: Some("ana@example.com".to_string()),
                first_name: Some("Ana".to_string()),
                last_name: Some("Souza".to_string()),
            }),
            repository.clone(),
        );
        let session = MemorySession::default();

        let outcome = flow
            .handle(callback_request(), &session, &mut returning_cookies("https://shop.example/"))
            .await
            .unwrap();

        assert_eq!(outcome.state, FlowState::LinkedSuccess);
        assert_eq!(session.account_id().await.unwrap(), Some(existing.id.clone()));
        assert_eq!(repository.len(), 1);

        // Stored names are never overwritten by the provider profile
        let stored = repository.get_by_id(&existing.id).await.unwrap();
        assert_eq!(stored.last_name, "Silva");
        assert_eq!(stored, existing);
    }

    #[tokio::test]
    async fn test_profile_with_blank_email_fails() {
        let mut config = social_config(true);
        config.providers.facebook.enabled = true;
        let repository = Arc::new(InMemoryAccountRepository::new());
        let flow = flow_with(
            config,
            ScriptedDelegate::with_profile(SocialProfile {
                provider: ProviderId::Facebook,
                provider_user_id: Some("fb-1".to_string()),
                email: Some(String::new()),
                first_name: Some("Ana".to_string()),
                last_name: Some("Silva".to_string()),
            }),
            repository.clone(),
        );
        let session = MemorySession::default();
        let mut request = callback_request();
        request.provider = "facebook".to_string();

        let outcome = flow
            .handle(request, &session, &mut returning_cookies("https://shop.example/checkout/"))
            .await
            .unwrap();

        assert_eq!(outcome.state, FlowState::LinkedFailure);
        assert_eq!(outcome.redirect_to, "https://shop.example/checkout/");
        assert_eq!(messages(&session), vec![LOGIN_FAILED_MESSAGE]);
        assert_eq!(session.account_id().await.unwrap(), None);
        assert!(repository.is_empty());
    }

    #[tokio::test]
    async fn test_profile_without_email_fails() {
        let repository = Arc::new(InMemoryAccountRepository::new());
        let flow = flow_with(social_config(true), ScriptedDelegate::connected(None), repository.clone());
        let session = MemorySession::default();

        let outcome = flow
            .handle(callback_request(), &session, &mut RequestCookies::new())
            .await
            .unwrap();

        assert_eq!(outcome.state, FlowState::LinkedFailure);
        assert_eq!(messages(&session), vec![LOGIN_FAILED_MESSAGE]);
        assert!(repository.is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_fails() {
        let flow = flow_with(
            social_config(true),
            ScriptedDelegate::new(Err(AuthFailure::InvalidState)),
            Arc::new(InMemoryAccountRepository::new()),
        );
        let session = MemorySession::default();

        let outcome = flow
            .handle(callback_request(), &session, &mut RequestCookies::new())
            .await
            .unwrap();

        assert_eq!(outcome.state, FlowState::LinkedFailure);
        assert_eq!(outcome.redirect_to, "https://shop.example/");
        assert_eq!(messages(&session), vec![LOGIN_FAILED_MESSAGE]);
    }

    #[tokio::test]
    async fn test_account_write_failure_reports_create_error() {
        let flow = flow_with(
            social_config(true),
            ScriptedDelegate::connected(Some("ana@example.com")),
            Arc::new(ReadOnlyRepository),
        );
        let session = MemorySession::default();

        let outcome = flow
            .handle(callback_request(), &session, &mut RequestCookies::new())
            .await
            .unwrap();

        assert_eq!(outcome.state, FlowState::LinkedFailure);
        assert_eq!(messages(&session), vec![AccountCreateError::USER_MESSAGE]);
        assert_eq!(session.account_id().await.unwrap(), None);
    }
}
