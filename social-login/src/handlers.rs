//! HTTP routes of the login module
//!
//! | Route                         | Purpose                                   |
//! |-------------------------------|-------------------------------------------|
//! | `GET /sociallogin/endpoint`   | start or finish a provider login (303)    |
//! | `GET /sociallogin/config`     | checkout configuration JSON               |
//! | `GET /sociallogin/session`    | login state and pending flash messages    |
//! | `GET /health`                 | liveness check                            |

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::auth::CallbackParams;
use crate::config_surface::CheckoutConfig;
use crate::error::Result;
use crate::flow::FlowRequest;
use crate::health::health;
use crate::session::{
    create_memory_session_layer, AuthSession, FlashMessage, FlashMessages, RequestCookies, Session,
    TowerSessionStore,
};
use crate::state::AppState;

/// Build the module router with its session layer
pub fn router(state: AppState) -> Router {
    let sessions = create_memory_session_layer(&state.config().session);

    Router::new()
        .route("/sociallogin/endpoint", get(endpoint))
        .route("/sociallogin/config", get(social_login_config))
        .route("/sociallogin/session", get(session_info))
        .route("/health", get(health))
        .layer(sessions)
        .with_state(state)
}

/// Query string of the login endpoint
#[derive(Debug, Default, Deserialize)]
pub struct EndpointQuery {
    pub provider: Option<String>,
    pub referer: Option<String>,
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl EndpointQuery {
    fn into_flow_request(self, current_page: String) -> FlowRequest {
        let callback = CallbackParams {
            code: self.code,
            state: self.state,
            error: self.error,
            error_description: self.error_description,
        };

        FlowRequest {
            provider: self.provider.unwrap_or_default(),
            referer: self.referer,
            current_page,
            callback: callback.is_present().then_some(callback),
        }
    }
}

/// Login entry point and provider callback target
pub async fn endpoint(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    query: std::result::Result<Query<EndpointQuery>, QueryRejection>,
) -> Result<Response> {
    let Query(query) = query?;
    let current_page = current_page(&state, &headers);
    let mut cookies = RequestCookies::from_headers(&headers);
    let store = TowerSessionStore::new(session);

    let outcome = state
        .flow()
        .handle(query.into_flow_request(current_page), &store, &mut cookies)
        .await?;
    tracing::debug!(state = %outcome.state, "Login endpoint responded");

    let mut response = Redirect::to(&outcome.redirect_to).into_response();
    cookies.apply(response.headers_mut());
    Ok(response)
}

#[derive(Debug, Default, Deserialize)]
pub struct ConfigQuery {
    pub referer: Option<String>,
}

pub async fn social_login_config(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: std::result::Result<Query<ConfigQuery>, QueryRejection>,
) -> Result<Json<CheckoutConfig>> {
    let Query(query) = query?;
    let current_page = current_page(&state, &headers);
    Ok(Json(
        state
            .config_surface()
            .social_login_config(query.referer.as_deref(), &current_page),
    ))
}

/// Login state of the current session
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionView {
    pub authenticated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<AuthSession>,
    pub messages: Vec<FlashMessage>,
}

/// Report the session and consume its flash messages
pub async fn session_info(
    Extension(session): Extension<Session>,
    flash: FlashMessages,
) -> Result<Json<SessionView>> {
    let auth = TowerSessionStore::new(session).auth().await?;

    Ok(Json(SessionView {
        authenticated: auth.is_authenticated(),
        account: auth.is_authenticated().then_some(auth),
        messages: flash.into_messages(),
    }))
}

/// Page the request came from: the `Referer` header when it is on this site
fn current_page(state: &AppState, headers: &HeaderMap) -> String {
    headers
        .get(header::REFERER)
        .and_then(|value| value.to_str().ok())
        .filter(|page| state.resolver().is_own_origin(page))
        .map(str::to_string)
        .unwrap_or_else(|| state.resolver().base_url().to_string())
}
