//! Backend token validation.
//!
//! The backend is asked once per call; results are never cached and failures
//! are never retried. Every failure kind collapses to
//! [`ValidationResult::invalid`] so callers fail closed.

use async_trait::async_trait;
use reqwest::{StatusCode, header::AUTHORIZATION};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::{SessionCheck, SessionStatus, TokenPayload, ValidationResult, usable_token};
use crate::recoleta::{
    backend::{BackendClient, BackendError, Envelope},
    config::Transport,
};

pub const VALIDATE_HEADER_PATH: &str = "/api/auth/validate";
pub const VALIDATE_BODY_PATH: &str = "/api/auth/validate-token";

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("backend answered {0}")]
    Status(StatusCode),
    #[error("backend response could not be decoded")]
    Decode,
    #[error("backend rejected the token")]
    Rejected,
}

#[derive(Debug, Deserialize)]
struct ValidateData {
    #[serde(default)]
    valid: bool,
    /// Kept raw: its shape varies between backend builds and must not
    /// affect validity.
    #[serde(default)]
    payload: Option<serde_json::Value>,
}

impl ValidateData {
    fn into_result(self) -> ValidationResult {
        let payload = self.payload.and_then(|raw| {
            serde_json::from_value::<TokenPayload>(raw)
                .map_err(|err| debug!("Token payload not usable: {err}"))
                .ok()
        });
        ValidationResult::valid(payload)
    }
}

#[derive(Serialize)]
struct ValidateBody<'a> {
    token: &'a str,
}

#[derive(Clone, Debug)]
pub struct TokenValidator {
    backend: BackendClient,
    transport: Transport,
}

impl TokenValidator {
    #[must_use]
    pub fn new(backend: BackendClient, transport: Transport) -> Self {
        Self { backend, transport }
    }

    /// Ask the backend whether `token` is valid.
    ///
    /// Blank tokens return invalid without a network call. This never fails.
    pub async fn validate(&self, token: &str) -> ValidationResult {
        let Some(token) = usable_token(token) else {
            return ValidationResult::invalid();
        };
        let token = SecretString::from(token.to_string());

        match self.request(&token).await {
            Ok(result) => result,
            Err(ValidationError::Rejected) => {
                debug!("Token rejected by backend");
                ValidationResult::invalid()
            }
            Err(err) => {
                warn!("Token validation failed: {err}");
                ValidationResult::invalid()
            }
        }
    }

    #[instrument(skip_all, fields(transport = ?self.transport))]
    async fn request(&self, token: &SecretString) -> Result<ValidationResult, ValidationError> {
        let request = match self.transport {
            Transport::Header => self
                .backend
                .get(VALIDATE_HEADER_PATH)?
                .header(AUTHORIZATION, format!("Bearer {}", token.expose_secret())),
            Transport::Body => self.backend.post(VALIDATE_BODY_PATH)?.json(&ValidateBody {
                token: token.expose_secret(),
            }),
        };

        let response = self
            .backend
            .send::<Envelope<ValidateData>>(request)
            .await?;
        if !response.status.is_success() {
            return Err(ValidationError::Status(response.status));
        }

        let envelope = response.body.ok_or(ValidationError::Decode)?;
        match envelope.data {
            Some(data) if envelope.success && data.valid => Ok(data.into_result()),
            _ => Err(ValidationError::Rejected),
        }
    }
}

#[async_trait]
impl SessionCheck for TokenValidator {
    async fn check_session(&self, token: &str) -> SessionStatus {
        self.validate(token).await.into()
    }
}
