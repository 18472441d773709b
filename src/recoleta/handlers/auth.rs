//! Sign-in, sign-out and registration, proxied to the backend.
//!
//! Flow Overview:
//! 1) Check the required fields locally and answer 400 with per-field errors.
//! 2) Forward the request to the backend.
//! 3) Map the backend status onto the shared envelope; never echo its body.
//! 4) On sign-in, issue the session cookie; on sign-out, expire it.

use axum::{
    Json,
    extract::Extension,
    http::{StatusCode, header::SET_COOKIE},
    response::Response,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};
use utoipa::ToSchema;

use super::{ApiCode, ApiResponse, FieldError, required, valid_email};
use crate::recoleta::{
    AppState,
    backend::Envelope,
    config::DEFAULT_COOKIE_NAME,
    guard::disable_caching,
    session::{
        Identity, IdentityUser,
        cookie::{SameSite, clear_cookie, session_cookie},
    },
};

pub const SIGN_IN_PATH: &str = "/api/auth/signIn";
pub const REGISTER_PATH: &str = "/user";

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterRequest {
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct LoginData {
    /// Present when the fresh token validated with a payload.
    user: Option<IdentityUser>,
}

/// Whatever the backend returned for the new account.
#[derive(ToSchema, Serialize, Debug)]
pub struct RegisterData {
    #[schema(value_type = Object)]
    account: serde_json::Value,
}

#[derive(Deserialize, Debug)]
struct SignInData {
    #[serde(default, alias = "accessToken")]
    access_token: Option<String>,
}

/// Sign-in answer: `{access_token, user}` at the top level, or the same
/// fields wrapped in the backend envelope's `data`.
#[derive(Deserialize, Debug)]
struct SignInBody {
    #[serde(flatten)]
    top: SignInData,
    #[serde(default)]
    data: Option<SignInData>,
}

impl SignInBody {
    fn access_token(self) -> Option<String> {
        self.top
            .access_token
            .or_else(|| self.data.and_then(|data| data.access_token))
            .filter(|token| !token.trim().is_empty())
    }
}

#[derive(Serialize)]
struct RegisterBody<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

#[utoipa::path(
    post,
    path = "/api/auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in; the session cookie is set.", body = ApiResponse<LoginData>),
        (status = 400, description = "Missing email or password.", body = ApiResponse<LoginData>),
        (status = 401, description = "Invalid credentials.", body = ApiResponse<LoginData>),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    state: Extension<Arc<AppState>>,
    payload: Option<Json<LoginRequest>>,
) -> Response {
    let request = payload.map(|Json(request)| request);
    let email = request.as_ref().and_then(|r| required(r.email.as_ref()));
    let password = request.as_ref().and_then(|r| required(r.password.as_ref()));

    let (Some(email), Some(password)) = (email, password) else {
        let mut errors = Vec::new();
        if email.is_none() {
            errors.push(FieldError::new("email", "Email is required"));
        }
        if password.is_none() {
            errors.push(FieldError::new("password", "Password is required"));
        }
        return ApiResponse::<LoginData>::failure(ApiCode::ValidationError, "Missing required fields")
            .with_errors(errors)
            .reply(StatusCode::BAD_REQUEST);
    };

    let backend = state.backend();
    let response = match backend.post(SIGN_IN_PATH) {
        Ok(request) => {
            backend
                .send::<SignInBody>(request.form(&[("email", email), ("password", password)]))
                .await
        }
        Err(err) => Err(err),
    };
    let response = match response {
        Ok(response) => response,
        Err(err) => {
            error!("Sign-in request failed: {err}");
            return ApiResponse::<LoginData>::failure(ApiCode::InternalError, "Internal server error")
                .reply(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    if response.status == StatusCode::UNAUTHORIZED {
        debug!("Backend rejected credentials");
        return ApiResponse::<LoginData>::failure(ApiCode::NotFound, "Invalid credentials")
            .reply(StatusCode::UNAUTHORIZED);
    }

    if !response.status.is_success() {
        warn!("Sign-in answered {}", response.status);
        return ApiResponse::<LoginData>::failure(ApiCode::ValidationError, "Sign-in failed")
            .reply(response.status);
    }

    let Some(token) = response.body.and_then(SignInBody::access_token) else {
        error!("Sign-in succeeded without an access token");
        return ApiResponse::<LoginData>::failure(
            ApiCode::ValidationError,
            "Backend did not return an access token",
        )
        .reply(StatusCode::INTERNAL_SERVER_ERROR);
    };
    let cookie = match session_cookie(state.config(), &token, SameSite::Strict) {
        Ok(cookie) => cookie,
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            return ApiResponse::<LoginData>::failure(ApiCode::InternalError, "Internal server error")
                .reply(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let user = state
        .sessions()
        .check_session(&token)
        .await
        .payload()
        .cloned()
        .map(|payload| Identity::from(payload).user);

    let mut response =
        ApiResponse::success("Signed in", LoginData { user }).reply(StatusCode::OK);
    response.headers_mut().insert(SET_COOKIE, cookie);
    response
}

#[utoipa::path(
    delete,
    path = "/api/auth",
    responses(
        (status = 200, description = "Session cookie cleared.", body = ApiResponse<bool>),
    ),
    tag = "auth"
)]
pub async fn logout(state: Extension<Arc<AppState>>) -> Response {
    let config = state.config();
    let mut names = vec![config.cookie_name()];
    if config.cookie_name() != DEFAULT_COOKIE_NAME {
        names.push(DEFAULT_COOKIE_NAME);
    }

    let mut response = ApiResponse::success("Signed out", true).reply(StatusCode::OK);
    for name in names {
        match clear_cookie(config, name, SameSite::Strict) {
            Ok(cookie) => {
                response.headers_mut().append(SET_COOKIE, cookie);
            }
            Err(err) => error!("Failed to build clearing cookie for {name}: {err}"),
        }
    }
    disable_caching(&mut response);
    response
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created.", body = ApiResponse<RegisterData>),
        (status = 400, description = "Missing fields or invalid email.", body = ApiResponse<RegisterData>),
        (status = 409, description = "Email already registered.", body = ApiResponse<RegisterData>),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn register(
    state: Extension<Arc<AppState>>,
    payload: Option<Json<RegisterRequest>>,
) -> Response {
    let request = payload.map(|Json(request)| request);
    let name = request.as_ref().and_then(|r| required(r.name.as_ref()));
    let email = request.as_ref().and_then(|r| required(r.email.as_ref()));
    let password = request.as_ref().and_then(|r| required(r.password.as_ref()));

    let mut errors = Vec::new();
    if name.is_none() {
        errors.push(FieldError::new("name", "Name is required"));
    }
    match email {
        None => errors.push(FieldError::new("email", "Email is required")),
        Some(email) if !valid_email(email) => {
            errors.push(FieldError::new("email", "Invalid email"));
        }
        Some(_) => (),
    }
    if password.is_none() {
        errors.push(FieldError::new("password", "Password is required"));
    }

    let (Some(name), Some(email), Some(password), true) = (name, email, password, errors.is_empty())
    else {
        return ApiResponse::<RegisterData>::failure(ApiCode::ValidationError, "Invalid input")
            .with_errors(errors)
            .reply(StatusCode::BAD_REQUEST);
    };

    let backend = state.backend();
    let body = RegisterBody {
        name,
        email,
        password,
    };
    let response = match backend.post(REGISTER_PATH) {
        Ok(request) => {
            backend
                .send::<Envelope<serde_json::Value>>(request.json(&body))
                .await
        }
        Err(err) => Err(err),
    };
    let response = match response {
        Ok(response) => response,
        Err(err) => {
            error!("Register request failed: {err}");
            return ApiResponse::<RegisterData>::failure(
                ApiCode::InternalError,
                "Internal server error",
            )
            .reply(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    if response.status == StatusCode::CONFLICT {
        return ApiResponse::<RegisterData>::failure(ApiCode::Conflict, "Email already registered")
            .reply(StatusCode::CONFLICT);
    }

    if !response.status.is_success() {
        warn!("Register answered {}", response.status);
        return ApiResponse::<RegisterData>::failure(
            ApiCode::ValidationError,
            "Could not create account",
        )
        .reply(response.status);
    }

    let account = response
        .body
        .and_then(|envelope| envelope.data)
        .unwrap_or(serde_json::Value::Null);
    ApiResponse::success("Account created", RegisterData { account }).reply(StatusCode::CREATED)
}
