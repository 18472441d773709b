//! Client for the remote ReColeta backend.
//!
//! One `reqwest::Client` is built at startup and shared; every call carries
//! the configured timeout and the crate user agent.

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use url::Url;

use crate::{APP_USER_AGENT, recoleta::config::SessionConfig};

/// Response envelope used by every backend auth endpoint.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    pub data: Option<T>,
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("request to backend failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid backend path {path}: {source}")]
    Path {
        path: String,
        source: url::ParseError,
    },
}

/// Raw backend answer: status plus the decoded body, if it decoded.
#[derive(Debug)]
pub struct BackendResponse<T> {
    pub status: StatusCode,
    pub body: Option<T>,
}

#[derive(Clone, Debug)]
pub struct BackendClient {
    client: Client,
    base_url: Url,
}

impl BackendClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &SessionConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(config.validate_timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: config.api_url().clone(),
        })
    }

    /// Resolve `path` against the base URL, keeping any base path prefix.
    ///
    /// # Errors
    /// Returns an error if the joined URL is invalid.
    pub fn url(&self, path: &str) -> Result<Url, BackendError> {
        join_path(&self.base_url, path).map_err(|source| BackendError::Path {
            path: path.to_string(),
            source,
        })
    }

    /// # Errors
    /// Returns an error if the URL is invalid.
    pub fn get(&self, path: &str) -> Result<RequestBuilder, BackendError> {
        Ok(self.client.get(self.url(path)?))
    }

    /// # Errors
    /// Returns an error if the URL is invalid.
    pub fn post(&self, path: &str) -> Result<RequestBuilder, BackendError> {
        Ok(self.client.post(self.url(path)?))
    }

    /// Send a request and decode the body leniently, usually as an [`Envelope`].
    ///
    /// Non-2xx answers are returned, not raised; a body that does not decode
    /// as `T` yields `body: None`.
    ///
    /// # Errors
    /// Returns an error only on transport failure.
    pub async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<BackendResponse<T>, BackendError> {
        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        let body = serde_json::from_slice::<T>(&bytes).ok();
        Ok(BackendResponse { status, body })
    }
}

/// Append `path` to `base`, keeping any path prefix `base` already has.
///
/// `Url::join` would replace that prefix for absolute paths.
///
/// # Errors
/// Returns an error if the joined URL is invalid.
pub fn join_path(base: &Url, path: &str) -> Result<Url, url::ParseError> {
    let base = base.as_str().trim_end_matches('/');
    Url::parse(&format!("{base}/{}", path.trim_start_matches('/')))
}
