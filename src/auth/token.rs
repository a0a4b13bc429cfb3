use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use tracing::{debug, instrument};

use super::types::{ResetClaims, SessionClaims};
use crate::shared::AppError;

/// Configuration for signed token operations.
///
/// The signing key is loaded once at process start and the same key is used
/// for both issuance and validation. Constructed explicitly so tests can
/// inject distinct keys.
#[derive(Clone)]
pub struct TokenConfig {
    secret: String,
    pub expiration_days: i64,
}

impl TokenConfig {
    pub fn new(secret: impl Into<String>, expiration_days: i64) -> Self {
        Self {
            secret: secret.into(),
            expiration_days,
        }
    }

    /// Loads the signing key and session lifetime from the environment.
    pub fn from_env() -> Self {
        let expiration_days = std::env::var("SESSION_EXPIRATION_DAYS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(7);

        Self {
            secret: std::env::var("JWT_SECRET")
                .unwrap_or_else(|_| "your-secret-key-change-in-production".to_string()),
            expiration_days,
        }
    }

    /// Creates a signed session token embedding the user identifier and role.
    /// The token is never persisted server-side.
    #[instrument(skip(self, user_id, role))]
    pub fn issue_session_token(&self, user_id: &str, role: &str) -> Result<String, AppError> {
        let now = Utc::now();
        let exp = (now + Duration::days(self.expiration_days)).timestamp() as usize;

        debug!(
            expiration_days = self.expiration_days,
            exp_timestamp = exp,
            "Creating session token with expiration"
        );

        let claims = SessionClaims {
            sub: user_id.to_string(),
            role: role.to_string(),
            exp,
            iat: now.timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )
        .map_err(|e| {
            debug!(error = %e, "Failed to encode session token");
            AppError::Internal
        })
    }

    /// Validates a session token signature and returns the claims if valid.
    /// A forged, tampered or expired token is reported as a generic
    /// authentication failure.
    #[instrument(skip(self, token))]
    pub fn validate_session_token(&self, token: &str) -> Result<SessionClaims, AppError> {
        debug!("Decoding and validating session token");

        decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &Validation::default(),
        )
        .map(|data| {
            debug!(
                user_id = %data.claims.sub,
                role = %data.claims.role,
                exp = data.claims.exp,
                "Session token decoded successfully"
            );
            data.claims
        })
        .map_err(|e| {
            debug!(error = %e, "Failed to decode session token");
            AppError::Unauthorized("Invalid or expired session".to_string())
        })
    }

    /// Creates a signed single-use password-reset token embedding the user
    /// identifier. The caller persists it on the account for later exact-match
    /// redemption.
    #[instrument(skip(self, user_id))]
    pub fn issue_reset_token(&self, user_id: &str) -> Result<String, AppError> {
        let claims = ResetClaims {
            sub: user_id.to_string(),
            iat: Utc::now().timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )
        .map_err(|e| {
            debug!(error = %e, "Failed to encode reset token");
            AppError::Internal
        })
    }
}
