//! Shared wiring for the integration suites: a stub backend and the router
//! built on top of it.

#![allow(dead_code)]

use anyhow::Result;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, header::COOKIE},
};
use recoleta::recoleta::{AppState, config::SessionConfig, guard::RoutePolicy, pages, router};
use serde_json::{Value, json};
use std::{net::TcpListener, path::Path, sync::Arc};
use tower::ServiceExt;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path},
};

pub const COOKIE_NAME: &str = "recoleta_access_token";
pub const GOOD_TOKEN: &str = "good-token";
pub const PAGE_BODY: &str = "page";

pub fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

pub fn valid_body() -> Value {
    json!({
        "success": true,
        "message": "Token validated successfully",
        "code": "SUCCESS",
        "data": {
            "valid": true,
            "payload": {
                "id": "u-42",
                "name": "Ana",
                "email": "ana@recoleta.dev",
                "iat": 1_700_000_000,
                "exp": 1_700_604_800
            }
        }
    })
}

/// Backend that accepts only `GOOD_TOKEN` on the header transport.
pub async fn mount_validate(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/auth/validate"))
        .and(header("authorization", format!("Bearer {GOOD_TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(valid_body()))
        .with_priority(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/auth/validate"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "success": false,
            "message": "Invalid token",
            "code": "UNAUTHORIZED"
        })))
        .mount(server)
        .await;
}

pub fn config_for(api_url: &str) -> Result<SessionConfig> {
    SessionConfig::parse(api_url)
}

/// The full router with a stand-in for the frontend pages.
pub fn app(config: SessionConfig) -> Result<Router> {
    let state = Arc::new(AppState::new(config, RoutePolicy::default())?);
    let pages = Router::new().fallback(|| async { PAGE_BODY });
    Ok(router(state, pages))
}

/// The full router serving a real frontend build from `dir`.
pub fn app_with_static_dir(config: SessionConfig, dir: &Path) -> Result<Router> {
    let state = Arc::new(AppState::new(config, RoutePolicy::default())?);
    Ok(router(state, pages(Some(dir.to_path_buf()))))
}

pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    json_body: Option<Value>,
) -> Result<Response<Body>> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = cookie {
        builder = builder.header(COOKIE, format!("{COOKIE_NAME}={token}"));
    }
    let body = match json_body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&value)?)
        }
        None => Body::empty(),
    };
    Ok(app.clone().oneshot(builder.body(body)?).await?)
}

pub async fn body_json(response: Response<Body>) -> Result<Value> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

pub async fn body_text(response: Response<Body>) -> Result<String> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn header_str<'a>(response: &'a Response<Body>, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|value| value.to_str().ok())
}
