use axum::{extract::State, Json};
use tracing::{info, instrument};
use validator::Validate;

use super::{
    service::AuthService,
    types::{
        AuthResponse, ForgotPasswordRequest, ResetPasswordRequest, SigninRequest, SignupRequest,
        SocialLoginRequest,
    },
};
use crate::shared::{validation_error, AppError, AppState, MessageResponse};

/// HTTP handler for account creation
///
/// POST /api/signup
#[instrument(name = "signup", skip(state, request))]
pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    request.validate().map_err(validation_error)?;

    let service = AuthService::from_state(&state);
    let response = service.signup(request).await?;

    Ok(Json(response))
}

/// HTTP handler for signing in
///
/// POST /api/signin
/// Returns a signed session token and the public account fields
#[instrument(name = "signin", skip(state, request))]
pub async fn signin(
    State(state): State<AppState>,
    Json(request): Json<SigninRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let service = AuthService::from_state(&state);
    let response = service.signin(request).await?;

    info!(user_id = %response.user.id, "Signin completed");
    Ok(Json(response))
}

/// HTTP handler for signing out
///
/// GET /api/signout
/// Session tokens are not persisted server-side, so signout is a client
/// operation; the endpoint exists for clients that expect it.
#[instrument(name = "signout")]
pub async fn signout() -> Json<MessageResponse> {
    Json(MessageResponse::new("Signout success!"))
}

/// HTTP handler for starting a password reset
///
/// PUT /api/forgot-password
#[instrument(name = "forgot_password", skip(state, request))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(request): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    request.validate().map_err(validation_error)?;

    let service = AuthService::from_state(&state);
    let response = service.forgot_password(request).await?;

    Ok(Json(response))
}

/// HTTP handler for completing a password reset
///
/// PUT /api/reset-password
#[instrument(name = "reset_password", skip(state, request))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    request.validate().map_err(validation_error)?;

    let service = AuthService::from_state(&state);
    let response = service.reset_password(request).await?;

    Ok(Json(response))
}

/// HTTP handler for social sign-in
///
/// POST /api/social-login
#[instrument(name = "social_login", skip(state, request))]
pub async fn social_login(
    State(state): State<AppState>,
    Json(request): Json<SocialLoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    request.validate().map_err(validation_error)?;

    let service = AuthService::from_state(&state);
    let response = service.social_login(request).await?;

    Ok(Json(response))
}
