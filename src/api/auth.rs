//! Signup, activation and session endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::user::{Account, LoginRequest, LoginResponse, ResendActivation, SignupForm, SignupResponse},
    AppState,
};

use super::AuthenticatedUser;

pub const SIGNUP_MESSAGE: &str = "Confirm your email address to finalize registration process, please!";
const RESEND_MESSAGE: &str = "If an inactive account uses this address, a new activation link has been sent.";

/// Activated account with a fresh session
#[derive(Serialize, ToSchema)]
pub struct ActivationResponse {
    pub message: String,
    pub account: Account,
    pub session: LoginResponse,
}

/// Register a new reader
#[utoipa::path(
    post,
    path = "/auth/signup",
    tag = "auth",
    request_body = SignupForm,
    responses(
        (status = 201, description = "Account created, activation email sent", body = SignupResponse),
        (status = 400, description = "Invalid form", body = crate::error::ErrorResponse),
        (status = 404, description = "Picked city or street does not exist"),
        (status = 409, description = "Username already taken")
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(form): Json<SignupForm>,
) -> AppResult<(StatusCode, Json<SignupResponse>)> {
    state.services.users.signup(form).await?;
    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: SIGNUP_MESSAGE.to_string(),
        }),
    ))
}

/// Follow the emailed activation link
#[utoipa::path(
    get,
    path = "/auth/activate/{uidb64}/{token}",
    tag = "auth",
    params(
        ("uidb64" = String, Path, description = "URL-safe base64 account id"),
        ("token" = String, Path, description = "Activation token")
    ),
    responses(
        (status = 200, description = "Account activated and logged in", body = ActivationResponse),
        (status = 400, description = "Invalid activation link!", body = crate::error::ErrorResponse)
    )
)]
pub async fn activate(
    State(state): State<AppState>,
    Path((uidb64, token)): Path<(String, String)>,
) -> AppResult<Json<ActivationResponse>> {
    let (account, session) = state.services.users.activate(&uidb64, &token).await?;
    Ok(Json(ActivationResponse {
        message: "Thank you for your email confirmation. Your account is now active.".to_string(),
        account,
        session,
    }))
}

/// Send a new activation link
#[utoipa::path(
    post,
    path = "/auth/activation/resend",
    tag = "auth",
    request_body = ResendActivation,
    responses(
        (status = 202, description = "Request accepted", body = SignupResponse),
        (status = 400, description = "Invalid email address", body = crate::error::ErrorResponse)
    )
)]
pub async fn resend_activation(
    State(state): State<AppState>,
    Json(request): Json<ResendActivation>,
) -> AppResult<(StatusCode, Json<SignupResponse>)> {
    state.services.users.resend_activation(request).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(SignupResponse {
            message: RESEND_MESSAGE.to_string(),
        }),
    ))
}

/// Login with username and password
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials or inactive account", body = crate::error::ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let response = state.services.users.login(request).await?;
    Ok(Json(response))
}

/// Get current user info
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = Account),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn me(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Account>> {
    let account = state.services.users.me(&claims).await?;
    Ok(Json(account))
}
