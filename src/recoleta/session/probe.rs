//! `SessionCheck` backed by a running gateway's identity endpoint.
//!
//! This is what a client-side caller uses: it cannot see the backend, only
//! the gateway, and it presents the token the way a browser would, as the
//! session cookie.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header::COOKIE};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{Identity, SessionCheck, SessionStatus, usable_token};
use crate::{
    APP_USER_AGENT,
    recoleta::{backend::join_path, config::DEFAULT_VALIDATE_TIMEOUT_SECONDS},
};

pub const IDENTITY_PATH: &str = "/api/auth/me";

#[derive(Clone, Debug)]
pub struct IdentityProbe {
    client: Client,
    identity_url: Url,
    cookie_name: String,
}

impl IdentityProbe {
    /// # Errors
    /// Returns an error if the server URL is invalid or the HTTP client cannot be built.
    pub fn new(server_url: &str, cookie_name: &str) -> anyhow::Result<Self> {
        let base = Url::parse(server_url.trim())?;
        let identity_url = join_path(&base, IDENTITY_PATH)?;
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(Duration::from_secs(DEFAULT_VALIDATE_TIMEOUT_SECONDS))
            .build()?;
        Ok(Self {
            client,
            identity_url,
            cookie_name: cookie_name.to_string(),
        })
    }
}

#[async_trait]
impl SessionCheck for IdentityProbe {
    async fn check_session(&self, token: &str) -> SessionStatus {
        let Some(token) = usable_token(token) else {
            return SessionStatus::Unauthenticated;
        };

        let response = match self
            .client
            .get(self.identity_url.clone())
            .header(COOKIE, format!("{}={token}", self.cookie_name))
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                debug!("Identity check failed: {err}");
                return SessionStatus::Unauthenticated;
            }
        };

        if response.status() != StatusCode::OK {
            debug!("Identity check answered {}", response.status());
            return SessionStatus::Unauthenticated;
        }

        match response.json::<Identity>().await {
            Ok(identity) => SessionStatus::Authenticated(Some(identity.into())),
            Err(err) => {
                debug!("Identity response could not be decoded: {err}");
                SessionStatus::Unauthenticated
            }
        }
    }
}
