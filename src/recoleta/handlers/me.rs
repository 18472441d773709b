//! Identity endpoint: who owns the session cookie on this request.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::debug;

use super::MessageBody;
use crate::recoleta::{
    AppState,
    session::{Identity, SessionStatus, cookie::extract_token},
};

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Identity behind the session cookie.", body = Identity),
        (status = 401, description = "Missing, invalid or expired session.", body = MessageBody),
    ),
    tag = "auth"
)]
pub async fn me(headers: HeaderMap, state: Extension<Arc<AppState>>) -> Response {
    let Some(token) = extract_token(&headers, state.config().cookie_name()) else {
        return unauthorized("Token not found");
    };

    match state.sessions().check_session(&token).await {
        SessionStatus::Authenticated(Some(payload)) => {
            (StatusCode::OK, Json(Identity::from(payload))).into_response()
        }
        SessionStatus::Authenticated(None) => {
            debug!("Session valid but backend sent no payload");
            unauthorized("Invalid token")
        }
        SessionStatus::Unauthenticated => unauthorized("Invalid token"),
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(MessageBody {
            message: message.to_string(),
        }),
    )
        .into_response()
}
