//! Session cookie handling: extraction from request headers and the
//! `Set-Cookie` values used on login and logout.

use axum::http::{
    HeaderMap, HeaderValue,
    header::{COOKIE, InvalidHeaderValue},
};

use crate::recoleta::config::SessionConfig;

/// `SameSite` attribute for the session cookie.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
}

impl SameSite {
    fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::Lax => "Lax",
        }
    }
}

/// Read the named cookie from all `Cookie` headers on the request.
///
/// Blank values count as missing.
#[must_use]
pub fn extract_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            let (Some(key), Some(val)) = (parts.next(), parts.next()) else {
                continue;
            };
            if key.trim() == cookie_name {
                let val = val.trim();
                if !val.is_empty() {
                    return Some(val.to_string());
                }
            }
        }
    }
    None
}

/// Build the `HttpOnly` session cookie issued on login.
///
/// # Errors
/// Returns an error if the token contains bytes not allowed in a header.
pub fn session_cookie(
    config: &SessionConfig,
    token: &str,
    same_site: SameSite,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let cookie = format!(
        "{}={token}; Path=/; HttpOnly; SameSite={}; Max-Age={}",
        config.cookie_name(),
        same_site.as_str(),
        config.session_ttl_seconds()
    );
    HeaderValue::from_str(&with_secure(cookie, config.secure_cookies()))
}

/// Build an expired cookie that makes the browser drop `name`.
///
/// # Errors
/// Returns an error if the name contains bytes not allowed in a header.
pub fn clear_cookie(
    config: &SessionConfig,
    name: &str,
    same_site: SameSite,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let cookie = format!(
        "{name}=; Path=/; HttpOnly; SameSite={}; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
        same_site.as_str()
    );
    HeaderValue::from_str(&with_secure(cookie, config.secure_cookies()))
}

fn with_secure(mut cookie: String, secure: bool) -> String {
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}
