//! Request-scoped cookie access
//!
//! [`RequestCookies`] starts from the request's `Cookie` headers and records
//! every change as a delta that is written back as `Set-Cookie` headers.

use http::{header, HeaderMap, HeaderValue};
use tower_sessions::cookie::{Cookie, CookieJar};

/// Cookie access used by the redirect resolver and the session binder
pub trait CookieStore: Send + Sync {
    /// Current value of a cookie, reflecting changes made in this request
    fn get(&self, name: &str) -> Option<String>;

    /// Add or replace a cookie
    fn set(&mut self, cookie: Cookie<'static>);

    /// Expire a cookie previously set with `path`
    fn remove(&mut self, name: &str, path: &str);
}

/// Cookie jar built from an incoming request
#[derive(Debug, Default, Clone)]
pub struct RequestCookies {
    jar: CookieJar,
}

impl RequestCookies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse every `Cookie` header; malformed pairs are skipped
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut jar = CookieJar::new();
        for value in headers.get_all(header::COOKIE) {
            let Ok(value) = value.to_str() else {
                continue;
            };
            for pair in value.split(';') {
                let pair = pair.trim();
                if pair.is_empty() {
                    continue;
                }
                if let Ok(cookie) = Cookie::parse(pair.to_owned()) {
                    jar.add_original(cookie);
                }
            }
        }
        Self { jar }
    }

    /// `Set-Cookie` values for every change made in this request
    pub fn set_cookie_headers(&self) -> Vec<HeaderValue> {
        self.jar
            .delta()
            .filter_map(|cookie| HeaderValue::from_str(&cookie.to_string()).ok())
            .collect()
    }

    /// Append the pending changes to a response's headers
    pub fn apply(&self, headers: &mut HeaderMap) {
        for value in self.set_cookie_headers() {
            headers.append(header::SET_COOKIE, value);
        }
    }
}

impl CookieStore for RequestCookies {
    fn get(&self, name: &str) -> Option<String> {
        self.jar.get(name).map(|cookie| cookie.value().to_string())
    }

    fn set(&mut self, cookie: Cookie<'static>) {
        self.jar.add(cookie);
    }

    fn remove(&mut self, name: &str, path: &str) {
        self.jar
            .remove(Cookie::build((name.to_owned(), "")).path(path.to_owned()));
    }
}
