use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::user::models::UserModel;

/// Claims embedded in a session token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionClaims {
    pub sub: String,  // User identifier
    pub role: String, // Role tag carried for authorization decisions
    pub exp: usize,   // Expiration timestamp (standard JWT claim)
    pub iat: usize,   // Issued at timestamp (standard JWT claim)
}

/// Claims embedded in a password-reset token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetClaims {
    pub sub: String,
    pub iat: usize,
}

/// Request payload for account creation
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(
        email(message = "Email must contain @"),
        length(min = 3, max = 32, message = "Email must be between 3 to 32 characters")
    )]
    pub email: String,
    #[validate(
        length(min = 6, message = "Password must contain at least 6 characters"),
        custom(function = "password_contains_digit")
    )]
    pub password: String,
}

/// Request payload for signing in
#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

/// Request payload for starting a password reset
#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
}

/// Request payload for completing a password reset
#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    pub reset_password_token: String,
    #[validate(
        length(min = 6, message = "Password must be at least 6 chars long"),
        custom(function = "password_contains_digit")
    )]
    pub new_password: String,
}

/// Request payload for social sign-in
#[derive(Debug, Deserialize, Validate)]
pub struct SocialLoginRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
}

/// Public view of an account returned next to a freshly issued token
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct AuthUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
}

impl From<&UserModel> for AuthUser {
    fn from(user: &UserModel) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
        }
    }
}

/// Response for successful sign-in
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct AuthResponse {
    pub token: String,
    pub user: AuthUser,
}

fn password_contains_digit(password: &str) -> Result<(), ValidationError> {
    if password.chars().any(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        let mut error = ValidationError::new("digit");
        error.message = Some("Password must contain a number".into());
        Err(error)
    }
}
