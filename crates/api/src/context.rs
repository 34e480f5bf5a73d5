//! Per-request state carried in extensions: parsed cookies, the JSON body and
//! the CSRF context handlers use to issue tokens.

use std::{
    collections::HashMap,
    sync::{Arc, OnceLock},
};

use cookie::{Cookie, SameSite};
use keystone_auth::{CsrfError, CsrfSecret, issue_token};

/// Name of the cookie holding the per-client CSRF secret.
pub const CSRF_SECRET_COOKIE: &str = "_csrf";

/// Name of the script-readable cookie carrying an issued CSRF token.
pub const XSRF_TOKEN_COOKIE: &str = "XSRF-TOKEN";

/// Cookies sent with the request, keyed by name.
///
/// Values are percent-decoded. When a name appears more than once the first
/// occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestCookies {
    cookies: HashMap<String, String>,
}

impl RequestCookies {
    pub fn new(cookies: HashMap<String, String>) -> Self {
        Self { cookies }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

/// Parsed JSON request body.
///
/// Requests without a JSON body carry an empty object, so handlers can always
/// extract this.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonBody(pub serde_json::Value);

impl Default for JsonBody {
    fn default() -> Self {
        Self(serde_json::Value::Object(serde_json::Map::new()))
    }
}

/// CSRF state for a request.
///
/// [`CsrfContext::token`] issues a token bound to the client's secret; repeated
/// calls within one request return the same token.
#[derive(Debug, Clone)]
pub struct CsrfContext {
    inner: Arc<CsrfInner>,
}

#[derive(Debug)]
struct CsrfInner {
    secret: CsrfSecret,
    secure: bool,
    token: OnceLock<String>,
}

impl CsrfContext {
    pub fn new(secret: CsrfSecret, secure: bool) -> Self {
        Self {
            inner: Arc::new(CsrfInner {
                secret,
                secure,
                token: OnceLock::new(),
            }),
        }
    }

    pub fn secret(&self) -> &CsrfSecret {
        &self.inner.secret
    }

    pub fn token(&self) -> Result<String, CsrfError> {
        if let Some(token) = self.inner.token.get() {
            return Ok(token.clone());
        }

        let token = issue_token(&self.inner.secret)?;
        Ok(self.inner.token.get_or_init(|| token).clone())
    }

    /// `Set-Cookie` value persisting the secret (`HttpOnly`; `Secure` and
    /// `SameSite=Lax` in production).
    pub fn secret_cookie(&self) -> String {
        let mut cookie = Cookie::build((CSRF_SECRET_COOKIE, self.inner.secret.encode()))
            .path("/")
            .http_only(true)
            .build();
        self.harden(&mut cookie);
        cookie.encoded().to_string()
    }

    /// `Set-Cookie` value exposing `token` to client scripts.
    pub fn readable_cookie(&self, token: &str) -> String {
        let mut cookie = Cookie::build((XSRF_TOKEN_COOKIE, token.to_string()))
            .path("/")
            .build();
        self.harden(&mut cookie);
        cookie.encoded().to_string()
    }

    fn harden(&self, cookie: &mut Cookie<'static>) {
        if self.inner.secure {
            cookie.set_secure(true);
            cookie.set_same_site(SameSite::Lax);
        }
    }
}
