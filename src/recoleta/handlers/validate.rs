use axum::{Json, extract::Extension, http::StatusCode, response::Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use super::{ApiCode, ApiResponse, required};
use crate::recoleta::{
    AppState,
    session::{SessionStatus, ValidationResult},
};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ValidateRequest {
    token: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/auth/validate",
    request_body = ValidateRequest,
    responses(
        (status = 200, description = "Token is valid.", body = ApiResponse<ValidationResult>),
        (status = 400, description = "No token supplied.", body = ApiResponse<ValidationResult>),
        (status = 401, description = "Token is invalid or could not be checked.", body = ApiResponse<ValidationResult>),
    ),
    tag = "auth"
)]
pub async fn validate(
    state: Extension<Arc<AppState>>,
    payload: Option<Json<ValidateRequest>>,
) -> Response {
    let token = payload.as_ref().and_then(|Json(body)| required(body.token.as_ref()));
    let Some(token) = token else {
        return ApiResponse::failure(ApiCode::ValidationError, "Token not provided")
            .with_data(ValidationResult::invalid())
            .reply(StatusCode::BAD_REQUEST);
    };

    match state.sessions().check_session(token).await {
        SessionStatus::Authenticated(payload) => {
            ApiResponse::success("Token validated successfully", ValidationResult::valid(payload))
                .reply(StatusCode::OK)
        }
        SessionStatus::Unauthenticated => {
            ApiResponse::failure(ApiCode::ValidationError, "Invalid token")
                .with_data(ValidationResult::invalid())
                .reply(StatusCode::UNAUTHORIZED)
        }
    }
}
