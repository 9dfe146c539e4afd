// handlers/public/auth.rs - token acquisition endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::auth::{self, AuthError, Claims};
use crate::database::models::{NewUser, Role, User};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /auth/register - create an account and start a session
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload?;
    validate_registration(&request)?;

    let password_hash = auth::hash_password(&request.password)?;
    let user = state
        .users()
        .create(NewUser {
            email: request.email.trim().to_string(),
            name: request.name.trim().to_string(),
            password_hash,
            role: Role::User,
        })
        .await?;

    tracing::info!("Registered user {} ({})", user.id, user.email);
    session_response(&state, StatusCode::CREATED, user)
}

/// POST /auth/login - exchange credentials for a session
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload?;

    let user = state
        .users()
        .find_by_email(request.email.trim())
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    if !auth::verify_password(&request.password, &user.password_hash)? {
        tracing::info!("Failed login for {}", user.email);
        return Err(AuthError::InvalidCredentials.into());
    }

    tracing::info!("User {} logged in", user.id);
    session_response(&state, StatusCode::OK, user)
}

/// POST /auth/logout - expire the session cookie
pub async fn logout(State(state): State<AppState>) -> Response {
    let cookie = auth::clear_session_cookie(&state.config.security);
    ([(header::SET_COOKIE, cookie)], Json(json!({ "success": true }))).into_response()
}

fn session_response(state: &AppState, status: StatusCode, user: User) -> ApiResult<Response> {
    let security = &state.config.security;
    let token = auth::generate_jwt(&Claims::for_user(&user, security), security)?;
    let cookie = auth::session_cookie(&token, security);

    Ok((
        status,
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "user": user, "token": token })),
    )
        .into_response())
}

fn validate_registration(request: &RegisterRequest) -> Result<(), ApiError> {
    let email = request.email.trim();
    let valid_email = email
        .split_once('@')
        .map(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.starts_with('.'))
        .unwrap_or(false);
    if !valid_email {
        return Err(ApiError::bad_request("A valid email is required"));
    }
    if request.name.trim().is_empty() {
        return Err(ApiError::bad_request("name is required"));
    }
    if request.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}
