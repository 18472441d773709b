use anyhow::{Context, Result, anyhow};
use axum::{
    Extension, Router,
    body::Body,
    extract::MatchedPath,
    http::{
        HeaderName, HeaderValue, Method, Request, StatusCode,
        header::{CONTENT_TYPE, COOKIE},
    },
    middleware,
    response::IntoResponse,
    routing::options,
};
use std::{path::PathBuf, sync::Arc};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    services::{ServeDir, ServeFile},
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{Span, info, info_span};
use ulid::Ulid;
use url::Url;

pub mod backend;
pub mod config;
pub mod guard;
pub mod handlers;
pub mod session;
// Route registration shared with the `openapi` binary.
mod openapi;

pub use openapi::openapi;

use backend::BackendClient;
use config::SessionConfig;
use guard::RoutePolicy;
use session::{SessionCheck, validator::TokenValidator};

/// Everything a request needs, built once at startup.
pub struct AppState {
    config: SessionConfig,
    policy: RoutePolicy,
    sessions: Arc<dyn SessionCheck>,
    backend: BackendClient,
}

impl AppState {
    /// Wire the backend client and the token validator from `config`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: SessionConfig, policy: RoutePolicy) -> Result<Self> {
        let backend =
            BackendClient::new(&config).context("Failed to build backend HTTP client")?;
        let sessions = Arc::new(TokenValidator::new(backend.clone(), config.transport()));
        Ok(Self {
            config,
            policy,
            sessions,
            backend,
        })
    }

    /// Replace the session checker, e.g. with a stub in tests.
    #[must_use]
    pub fn with_sessions(mut self, sessions: Arc<dyn SessionCheck>) -> Self {
        self.sessions = sessions;
        self
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub fn policy(&self) -> &RoutePolicy {
        &self.policy
    }

    #[must_use]
    pub fn sessions(&self) -> &dyn SessionCheck {
        self.sessions.as_ref()
    }

    #[must_use]
    pub fn backend(&self) -> &BackendClient {
        &self.backend
    }
}

/// Assemble the API routes and the guarded `pages` router.
///
/// The guard wraps everything but skips `/api/` and asset paths itself.
pub fn router(state: Arc<AppState>, pages: Router) -> Router {
    let (api, _openapi) = openapi::api_router().split_for_parts();
    api.route("/health", options(handlers::health::health))
        .merge(pages)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            guard::route_guard,
        ))
        .layer(Extension(state))
}

/// Frontend pages: the static build with an SPA `index.html` fallback, or 404s.
pub fn pages(static_dir: Option<PathBuf>) -> Router {
    match static_dir {
        Some(dir) => {
            let index = ServeFile::new(dir.join("index.html"));
            Router::new().fallback_service(ServeDir::new(dir).fallback(index))
        }
        None => Router::new().fallback(not_found),
    }
}

async fn not_found() -> impl IntoResponse {
    StatusCode::NOT_FOUND
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    state: Arc<AppState>,
    static_dir: Option<PathBuf>,
    frontend_origin: Option<&str>,
) -> Result<()> {
    let mut app = router(state, pages(static_dir)).layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span)),
    );

    if let Some(origin) = frontend_origin {
        let cors = CorsLayer::new()
            .allow_headers([CONTENT_TYPE, COOKIE])
            .allow_methods([Method::GET, Method::POST, Method::DELETE])
            .allow_origin(AllowOrigin::exact(cors_origin(origin)?))
            .allow_credentials(true);
        app = app.layer(cors);
    }

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {err}");
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

fn cors_origin(frontend_origin: &str) -> Result<HeaderValue> {
    let parsed = Url::parse(frontend_origin)
        .with_context(|| format!("Invalid frontend origin: {frontend_origin}"))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| anyhow!("Frontend origin must include a valid host: {frontend_origin}"))?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build frontend origin header")
}
