//! Shared session contract.
//!
//! A session is an opaque bearer token. Whether it is valid is decided by the
//! backend and expressed through [`SessionCheck`], the single capability
//! consumed by the route guard, the identity endpoint and the client bootstrap.

pub mod bootstrap;
pub mod cookie;
pub mod probe;
pub mod validator;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Identity claims decoded from a valid session token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TokenPayload {
    /// Subject (user id). Older backend builds send `sub` instead of `id`.
    #[serde(rename = "id", alias = "sub")]
    pub subject: String,
    pub name: String,
    pub email: String,
    #[serde(rename = "iat")]
    pub issued_at: i64,
    #[serde(rename = "exp")]
    pub expires_at: i64,
}

/// Body of the identity endpoint (`GET /api/auth/me`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Identity {
    pub user: IdentityUser,
    pub token: IdentityToken,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct IdentityUser {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct IdentityToken {
    pub iat: i64,
    pub exp: i64,
}

impl From<TokenPayload> for Identity {
    fn from(payload: TokenPayload) -> Self {
        Self {
            user: IdentityUser {
                id: payload.subject,
                name: payload.name,
                email: payload.email,
            },
            token: IdentityToken {
                iat: payload.issued_at,
                exp: payload.expires_at,
            },
        }
    }
}

impl From<Identity> for TokenPayload {
    fn from(identity: Identity) -> Self {
        Self {
            subject: identity.user.id,
            name: identity.user.name,
            email: identity.user.email,
            issued_at: identity.token.iat,
            expires_at: identity.token.exp,
        }
    }
}

/// Result of asking the backend about a token. Produced fresh per call.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<TokenPayload>,
}

impl ValidationResult {
    #[must_use]
    pub fn invalid() -> Self {
        Self {
            valid: false,
            payload: None,
        }
    }

    #[must_use]
    pub fn valid(payload: Option<TokenPayload>) -> Self {
        Self {
            valid: true,
            payload,
        }
    }
}

/// Collapsed view of a session: every failure kind is `Unauthenticated`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    Authenticated(Option<TokenPayload>),
    Unauthenticated,
}

impl SessionStatus {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    #[must_use]
    pub fn payload(&self) -> Option<&TokenPayload> {
        match self {
            Self::Authenticated(payload) => payload.as_ref(),
            Self::Unauthenticated => None,
        }
    }
}

impl From<ValidationResult> for SessionStatus {
    fn from(result: ValidationResult) -> Self {
        if result.valid {
            Self::Authenticated(result.payload)
        } else {
            Self::Unauthenticated
        }
    }
}

/// Decide whether a token belongs to a live session.
///
/// Implementations never fail: transport and decoding problems are reported
/// as [`SessionStatus::Unauthenticated`].
#[async_trait]
pub trait SessionCheck: Send + Sync {
    async fn check_session(&self, token: &str) -> SessionStatus;
}

/// Treat blank tokens as absent so callers never send them over the wire.
///
/// A usable token is returned unchanged, whitespace included.
pub(crate) fn usable_token(token: &str) -> Option<&str> {
    (!token.trim().is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_accepts_sub_or_id() -> Result<(), serde_json::Error> {
        let with_id: TokenPayload = serde_json::from_value(json!({
            "id": "u-1", "name": "Ana", "email": "ana@recoleta.dev", "iat": 1, "exp": 2
        }))?;
        let with_sub: TokenPayload = serde_json::from_value(json!({
            "sub": "u-1", "name": "Ana", "email": "ana@recoleta.dev", "iat": 1, "exp": 2
        }))?;
        assert_eq!(with_id, with_sub);
        assert_eq!(with_id.subject, "u-1");
        assert_eq!(with_id.expires_at, 2);
        Ok(())
    }

    #[test]
    fn invalid_result_omits_payload() -> Result<(), serde_json::Error> {
        let value = serde_json::to_value(ValidationResult::invalid())?;
        assert_eq!(value, json!({ "valid": false }));
        Ok(())
    }

    #[test]
    fn status_from_result() {
        assert_eq!(
            SessionStatus::from(ValidationResult::invalid()),
            SessionStatus::Unauthenticated
        );
        let status = SessionStatus::from(ValidationResult::valid(None));
        assert!(status.is_authenticated());
        assert!(status.payload().is_none());
    }

    #[test]
    fn usable_token_rejects_blank() {
        assert_eq!(usable_token(""), None);
        assert_eq!(usable_token("   "), None);
        assert_eq!(usable_token(" abc "), Some(" abc "));
    }
}
