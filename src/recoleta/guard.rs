//! Route guard: the request-time gate in front of every page.
//!
//! The routing decision is a pure function ([`decide`]) over the path, the
//! query string and whether the visitor is authenticated. The axum middleware
//! ([`route_guard`]) only gathers those inputs and applies the decision.

use anyhow::{Result, anyhow};
use axum::{
    extract::{Request, State},
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, EXPIRES, PRAGMA},
    },
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::debug;
use url::form_urlencoded;

use super::{AppState, session::cookie::extract_token};

pub const LOGIN_PATH: &str = "/login";
pub const LANDING_PATH: &str = "/dashboard";
pub const CALLBACK_PARAM: &str = "callbackUrl";
pub const DEFAULT_PRIVATE_ROUTES: [&str; 3] = ["/dashboard", "/discard", "/wastes"];

const SKIP_PREFIXES: [&str; 2] = ["/_next/", "/api/"];

#[derive(Clone, Debug, PartialEq, Eq)]
enum PrivateRoute {
    /// The route itself and everything below it.
    Subtree(String),
    /// Written `route/*`: any path starting with `route`.
    Prefix(String),
}

impl PrivateRoute {
    fn parse(route: &str) -> Result<Self> {
        let route = route.trim();
        if !route.starts_with('/') {
            return Err(anyhow!("private route must start with '/': {route:?}"));
        }
        if let Some(base) = route.strip_suffix("/*") {
            return Ok(Self::Prefix(base.to_string()));
        }
        let normalized = if route.len() > 1 {
            route.trim_end_matches('/')
        } else {
            route
        };
        Ok(Self::Subtree(normalized.to_string()))
    }

    fn matches(&self, path: &str) -> bool {
        match self {
            Self::Subtree(route) if route == "/" => true,
            Self::Subtree(route) => {
                path == route
                    || path
                        .strip_prefix(route.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
            Self::Prefix(base) => path.starts_with(base.as_str()),
        }
    }
}

/// Static partition of paths into private and public.
#[derive(Clone, Debug)]
pub struct RoutePolicy {
    private_routes: Vec<PrivateRoute>,
    login_path: String,
    landing_path: String,
}

impl RoutePolicy {
    /// # Errors
    /// Returns an error if any route does not start with `/`.
    pub fn new<I, S>(private_routes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let private_routes = private_routes
            .into_iter()
            .filter(|route| !route.as_ref().trim().is_empty())
            .map(|route| PrivateRoute::parse(route.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            private_routes,
            login_path: LOGIN_PATH.to_string(),
            landing_path: LANDING_PATH.to_string(),
        })
    }

    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    #[must_use]
    pub fn landing_path(&self) -> &str {
        &self.landing_path
    }

    /// Internal assets, API routes and public file-like paths are never guarded.
    ///
    /// Files under a private route, or named after one, stay guarded.
    #[must_use]
    pub fn is_skipped(&self, path: &str) -> bool {
        SKIP_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
            || (file_name(path).contains('.') && !self.is_private(path))
    }

    /// `/dashboard.html` counts as `/dashboard`.
    #[must_use]
    pub fn is_private(&self, path: &str) -> bool {
        let stem = strip_extension(path);
        self.private_routes
            .iter()
            .any(|route| route.matches(path) || route.matches(stem))
    }

    /// Only private routes and the login page depend on the session.
    #[must_use]
    pub fn requires_session(&self, path: &str) -> bool {
        self.is_private(path) || path == self.login_path
    }

    fn login_redirect(&self, path: &str) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair(CALLBACK_PARAM, path)
            .finish();
        format!("{}?{query}", self.login_path)
    }

    /// Where a signed-in visitor on the login page should go.
    fn after_login(&self, query: Option<&str>) -> String {
        query
            .and_then(|query| {
                form_urlencoded::parse(query.as_bytes())
                    .find(|(key, _)| key == CALLBACK_PARAM)
                    .map(|(_, value)| value.into_owned())
            })
            .filter(|callback| self.is_local_callback(callback))
            .unwrap_or_else(|| self.landing_path.clone())
    }

    fn is_local_callback(&self, callback: &str) -> bool {
        let path = callback.split(['?', '#']).next().unwrap_or_default();
        callback.starts_with('/')
            && !callback.starts_with("//")
            && !callback.contains('\\')
            && path != self.login_path
    }
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self {
            private_routes: DEFAULT_PRIVATE_ROUTES
                .iter()
                .map(|route| PrivateRoute::Subtree((*route).to_string()))
                .collect(),
            login_path: LOGIN_PATH.to_string(),
            landing_path: LANDING_PATH.to_string(),
        }
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or_default()
}

fn strip_extension(path: &str) -> &str {
    let name = file_name(path);
    match name.split_once('.') {
        Some((stem, _)) if !stem.is_empty() => &path[..path.len() - name.len() + stem.len()],
        _ => path,
    }
}

/// Canonical form of a request path, as the static file server resolves it.
///
/// Percent-escapes are decoded once, empty and `.` segments dropped and a
/// trailing slash removed. Returns `None` for `..` segments and for paths
/// that do not decode to UTF-8.
#[must_use]
pub fn normalize_path(raw: &str) -> Option<String> {
    let decoded = urlencoding::decode(raw).ok()?;
    let mut segments = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => return None,
            segment => segments.push(segment),
        }
    }
    Some(format!("/{}", segments.join("/")))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardDecision {
    /// Not guarded at all.
    Skip,
    /// Forward; private responses get cache-disabling headers.
    Allow { private: bool },
    Redirect(String),
}

/// Route a request given its authentication state.
///
/// `path` must already be normalized with [`normalize_path`].
#[must_use]
pub fn decide(
    policy: &RoutePolicy,
    path: &str,
    query: Option<&str>,
    authenticated: bool,
) -> GuardDecision {
    if policy.is_skipped(path) {
        return GuardDecision::Skip;
    }

    let private = policy.is_private(path);
    if private && !authenticated {
        return GuardDecision::Redirect(policy.login_redirect(path));
    }

    if authenticated && path == policy.login_path() {
        return GuardDecision::Redirect(policy.after_login(query));
    }

    GuardDecision::Allow { private }
}

/// axum middleware applying [`decide`] to every page request.
///
/// The session is only checked when the path depends on it; any checker
/// failure has already been collapsed to unauthenticated.
pub async fn route_guard(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let policy = state.policy();
    let Some(path) = normalize_path(request.uri().path()) else {
        debug!(path = request.uri().path(), "route guard rejected path");
        return StatusCode::BAD_REQUEST.into_response();
    };

    if policy.is_skipped(&path) {
        return next.run(request).await;
    }

    let authenticated = if policy.requires_session(&path) {
        match extract_token(request.headers(), state.config().cookie_name()) {
            Some(token) => state.sessions().check_session(&token).await.is_authenticated(),
            None => false,
        }
    } else {
        false
    };

    let decision = decide(policy, &path, request.uri().query(), authenticated);
    debug!(path = %path, authenticated, ?decision, "route guard");

    match decision {
        GuardDecision::Skip => next.run(request).await,
        GuardDecision::Allow { private } => {
            let mut response = next.run(request).await;
            if private {
                disable_caching(&mut response);
            }
            response
        }
        GuardDecision::Redirect(location) => Redirect::temporary(&location).into_response(),
    }
}

/// Keep protected pages out of browser and back-forward caches.
pub fn disable_caching(response: &mut Response) {
    let headers = response.headers_mut();
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(EXPIRES, HeaderValue::from_static("0"));
}
