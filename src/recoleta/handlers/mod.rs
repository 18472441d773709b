//! API handlers and the response envelope they share.
//!
//! Every `/api/auth` route answers with [`ApiResponse`]; only `/api/auth/me`
//! keeps the bare identity shape the frontend already consumes.

pub mod auth;
pub mod health;
pub mod me;
pub mod validate;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiCode {
    Success,
    ValidationError,
    NotFound,
    Conflict,
    InternalError,
}

/// One rejected input field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub code: ApiCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: &str, data: T) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            code: ApiCode::Success,
            data: Some(data),
            errors: Vec::new(),
        }
    }

    pub fn failure(code: ApiCode, message: &str) -> Self {
        Self {
            success: false,
            message: message.to_string(),
            code,
            data: None,
            errors: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_data(mut self, data: T) -> Self {
        self.data = Some(data);
        self
    }

    #[must_use]
    pub fn with_errors(mut self, errors: Vec<FieldError>) -> Self {
        self.errors = errors;
        self
    }

    pub fn reply(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

/// Plain `{ "message": ... }` body used by the identity endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageBody {
    pub message: String,
}

/// Lightweight email sanity check run before forwarding to the backend.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

/// Trimmed, non-empty value of an optional input field.
pub(crate) fn required(value: Option<&String>) -> Option<&str> {
    value.map(|value| value.trim()).filter(|value| !value.is_empty())
}
