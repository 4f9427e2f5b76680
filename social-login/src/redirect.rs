//! Post-login redirect resolution
//!
//! The page a shopper started from travels as an encoded `referer` query
//! parameter, is parked in a short-lived cookie while the provider handshake
//! runs, and is read back once the flow ends. Every value is checked against
//! the site's own origin before it is trusted.
//!
//! Referers use the storefront URL encoding: URL-safe base64 with `=`
//! padding written as `,`.

use base64::{
    alphabet,
    engine::{general_purpose::URL_SAFE, DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use std::fmt;
use std::sync::Arc;
use tower_sessions::cookie::{Cookie, SameSite};
use url::Url;

use crate::config::{RedirectConfig, SiteConfig};
use crate::session::CookieStore;

const LENIENT_URL_SAFE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Encode a URL for use as a `referer` parameter
#[must_use]
pub fn encode_url(url: &str) -> String {
    URL_SAFE.encode(url).replace('=', ",")
}

/// Decode a `referer` parameter; `None` for anything that is not base64 UTF-8
#[must_use]
pub fn decode_url(encoded: &str) -> Option<String> {
    let normalized = encoded.trim().replace(',', "=");
    let bytes = LENIENT_URL_SAFE.decode(normalized).ok()?;
    String::from_utf8(bytes).ok()
}

/// Decides whether a URL belongs to this site
pub trait HostChecker: Send + Sync {
    fn is_own_origin(&self, url: &str) -> bool;
}

/// Own-origin check against the configured base URL and extra hosts
///
/// Relative paths starting with a single `/` are own-origin. Absolute URLs
/// must be `http` or `https` and match one of the known `host[:port]` values.
#[derive(Debug, Clone)]
pub struct SiteHostChecker {
    hosts: Vec<String>,
}

impl SiteHostChecker {
    pub fn new(base_url: &Url, allowed_hosts: &[String]) -> Self {
        let mut hosts: Vec<String> = authority(base_url).into_iter().collect();
        hosts.extend(
            allowed_hosts
                .iter()
                .map(|host| host.trim().to_ascii_lowercase())
                .filter(|host| !host.is_empty()),
        );
        Self { hosts }
    }
}

impl HostChecker for SiteHostChecker {
    fn is_own_origin(&self, url: &str) -> bool {
        let url = url.trim();
        if url.starts_with('/') {
            // `//host` and `/\host` are protocol-relative to browsers
            return !(url.starts_with("//") || url.starts_with("/\\"));
        }

        match Url::parse(url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => authority(&parsed)
                .map(|host| self.hosts.contains(&host))
                .unwrap_or(false),
            _ => false,
        }
    }
}

/// Lowercase `host[:port]`, port omitted when it is the scheme default
fn authority(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_ascii_lowercase();
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host,
    })
}

/// An absolute URL on this site the shopper is sent to after login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget(String);

impl RedirectTarget {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Storefront encoding of the target, as used in `referer` parameters
    #[must_use]
    pub fn encoded(&self) -> String {
        encode_url(&self.0)
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for RedirectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validates, persists and restores the post-login destination
#[derive(Clone)]
pub struct RedirectResolver {
    base_url: Url,
    checker: Arc<dyn HostChecker>,
    cookie_name: String,
    max_age_secs: i64,
}

impl RedirectResolver {
    pub fn new(base_url: Url, checker: Arc<dyn HostChecker>, config: &RedirectConfig) -> Self {
        Self {
            base_url: with_trailing_slash(base_url),
            checker,
            cookie_name: config.cookie_name.clone(),
            max_age_secs: i64::try_from(config.max_age_secs).unwrap_or(i64::MAX),
        }
    }

    /// Resolver for a site using [`SiteHostChecker`]
    pub fn from_config(site: &SiteConfig, redirect: &RedirectConfig) -> Result<Self, url::ParseError> {
        let base_url = Url::parse(&site.base_url)?;
        let checker = Arc::new(SiteHostChecker::new(&base_url, &site.allowed_hosts));
        Ok(Self::new(base_url, checker, redirect))
    }

    /// Site base URL, always ending in `/`
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL of a site path
    #[must_use]
    pub fn site_url(&self, path: &str) -> Url {
        self.base_url
            .join(path.trim_start_matches('/'))
            .unwrap_or_else(|_| self.base_url.clone())
    }

    #[must_use]
    pub fn is_own_origin(&self, url: &str) -> bool {
        self.checker.is_own_origin(url)
    }

    /// Accept an encoded referer only when it decodes to an own-origin URL
    #[must_use]
    pub fn capture_referer(&self, raw: &str) -> Option<RedirectTarget> {
        let decoded = decode_url(raw)?;
        self.validate(&decoded)
    }

    /// Target for the page the login started from, falling back to the site root
    #[must_use]
    pub fn default_referer(&self, current_page: &str) -> RedirectTarget {
        self.validate(current_page)
            .unwrap_or_else(|| RedirectTarget(self.base_url.to_string()))
    }

    /// Remember `target` for the end of the flow, replacing any earlier value
    pub fn persist(&self, target: &RedirectTarget, cookies: &mut dyn CookieStore) {
        let cookie = Cookie::build((self.cookie_name.clone(), target.encoded()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::seconds(self.max_age_secs))
            .build();
        cookies.set(cookie);
    }

    /// Read and forget the remembered target
    ///
    /// The cookie is removed even when its value no longer validates.
    pub fn resume(&self, cookies: &mut dyn CookieStore) -> Option<RedirectTarget> {
        let stored = cookies.get(&self.cookie_name)?;
        cookies.remove(&self.cookie_name, "/");
        self.capture_referer(&stored)
    }

    /// Resolve an own-origin URL to an absolute target without fragment
    fn validate(&self, url: &str) -> Option<RedirectTarget> {
        if !self.checker.is_own_origin(url) {
            return None;
        }
        let mut resolved = self.base_url.join(url.trim()).ok()?;
        resolved.set_fragment(None);
        let resolved = resolved.to_string();
        // Re-check: joining must not have moved the URL off-site
        self.checker
            .is_own_origin(&resolved)
            .then_some(RedirectTarget(resolved))
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);
    url
}
