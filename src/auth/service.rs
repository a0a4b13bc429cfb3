use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{
    password,
    token::TokenConfig,
    types::{
        AuthResponse, AuthUser, ForgotPasswordRequest, ResetPasswordRequest, SigninRequest,
        SignupRequest, SocialLoginRequest,
    },
};
use crate::email::{EmailMessage, Mailer};
use crate::shared::{AppError, AppState, MessageResponse};
use crate::user::models::UserModel;
use crate::user::repository::UserRepository;

// One message for unknown email and wrong password alike, so responses do
// not reveal which accounts exist.
const SIGNIN_FAILED: &str = "Email and password do not match";

/// Service for credential handling and session-token issuance
pub struct AuthService {
    repository: Arc<dyn UserRepository + Send + Sync>,
    token_config: TokenConfig,
    mailer: Arc<dyn Mailer>,
    client_url: String,
}

impl AuthService {
    pub fn new(
        repository: Arc<dyn UserRepository + Send + Sync>,
        token_config: TokenConfig,
        mailer: Arc<dyn Mailer>,
        client_url: String,
    ) -> Self {
        Self {
            repository,
            token_config,
            mailer,
            client_url,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            Arc::clone(&state.user_repository),
            state.token_config.clone(),
            Arc::clone(&state.mailer),
            state.client_url.clone(),
        )
    }

    /// Creates a new account with freshly salted credentials
    #[instrument(skip(self, request))]
    pub async fn signup(&self, request: SignupRequest) -> Result<MessageResponse, AppError> {
        if self.repository.find_by_email(&request.email).await?.is_some() {
            warn!("Signup attempted with an already registered email");
            return Err(AppError::Forbidden("Email is taken".to_string()));
        }

        let mut user = UserModel::new(request.name, request.email);
        password::set_password(&mut user, &request.password);
        self.repository.create_user(&user).await?;

        info!(user_id = %user.id, "User signed up successfully");
        Ok(MessageResponse::new("Signup success! Please signin."))
    }

    /// Verifies credentials and issues a session token
    #[instrument(skip(self, request))]
    pub async fn signin(&self, request: SigninRequest) -> Result<AuthResponse, AppError> {
        let user = self
            .repository
            .find_by_email(&request.email)
            .await?
            .ok_or_else(|| AppError::Unauthorized(SIGNIN_FAILED.to_string()))?;

        if !password::verify_password(&user, &request.password) {
            warn!(user_id = %user.id, "Signin failed password verification");
            return Err(AppError::Unauthorized(SIGNIN_FAILED.to_string()));
        }

        let token = self
            .token_config
            .issue_session_token(&user.id, &user.role)?;

        info!(user_id = %user.id, "User signed in successfully");
        Ok(AuthResponse {
            token,
            user: AuthUser::from(&user),
        })
    }

    /// Issues a reset token, persists it and hands it to the mailer.
    /// Delivery is best-effort: a mail failure never fails the request.
    #[instrument(skip(self, request))]
    pub async fn forgot_password(
        &self,
        request: ForgotPasswordRequest,
    ) -> Result<MessageResponse, AppError> {
        let user = self
            .repository
            .find_by_email(&request.email)
            .await?
            .ok_or_else(|| {
                AppError::NotFound("User with that email does not exist".to_string())
            })?;

        let token = self.token_config.issue_reset_token(&user.id)?;
        self.repository.set_reset_token(&user.id, &token).await?;

        let message = EmailMessage {
            to: user.email.clone(),
            subject: "Password Reset Instructions".to_string(),
            body: format!(
                "Please use the following link to reset your password: {}/reset-password/{}",
                self.client_url, token
            ),
        };
        if let Err(e) = self.mailer.send(message).await {
            warn!(error = %e, user_id = %user.id, "Reset email could not be delivered");
        }

        info!(user_id = %user.id, "Password reset issued");
        Ok(MessageResponse::new(format!(
            "Email has been sent to {}. Follow the instructions to reset your password.",
            user.email
        )))
    }

    /// Redeems a pending reset token and installs the new password
    #[instrument(skip(self, request))]
    pub async fn reset_password(
        &self,
        request: ResetPasswordRequest,
    ) -> Result<MessageResponse, AppError> {
        let salt = password::generate_salt();
        let hashed = password::hash_password(&salt, &request.new_password)
            .ok_or_else(|| AppError::Unauthorized("Password could not be updated".to_string()))?;

        let user = self
            .repository
            .redeem_reset_token(&request.reset_password_token, &salt, &hashed)
            .await?
            .ok_or(AppError::InvalidResetToken)?;

        info!(user_id = %user.id, "Password reset completed");
        Ok(MessageResponse::new(
            "Great! Now you can signin with your new password.",
        ))
    }

    /// Signs in via a social identity, creating the account on first contact.
    /// The account lookup and creation are a single upsert keyed on email, so
    /// two concurrent first logins cannot both insert.
    #[instrument(skip(self, request))]
    pub async fn social_login(
        &self,
        request: SocialLoginRequest,
    ) -> Result<AuthResponse, AppError> {
        let mut candidate = UserModel::new(request.name, request.email);
        // Social accounts never sign in with a password; give them an
        // unguessable placeholder credential.
        password::set_password(&mut candidate, &password::generate_salt());

        let (user, created) = self.repository.upsert_by_email(candidate).await?;

        info!(user_id = %user.id, created, "Social login resolved");

        let token = self
            .token_config
            .issue_session_token(&user.id, &user.role)?;

        Ok(AuthResponse {
            token,
            user: AuthUser::from(&user),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_utils::{FailingMailer, RecordingMailer};
    use crate::user::repository::InMemoryUserRepository;

    fn service_with(
        repo: Arc<InMemoryUserRepository>,
        mailer: Arc<dyn Mailer>,
    ) -> AuthService {
        AuthService::new(
            repo,
            TokenConfig::new("test-secret", 7),
            mailer,
            "http://localhost:3000".to_string(),
        )
    }

    fn signup_request(name: &str, email: &str, password: &str) -> SignupRequest {
        SignupRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_signup_then_signin() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let service = service_with(repo.clone(), Arc::new(RecordingMailer::new()));

        service
            .signup(signup_request("alice", "alice@example.com", "hunter22"))
            .await
            .unwrap();

        let response = service
            .signin(SigninRequest {
                email: "alice@example.com".to_string(),
                password: "hunter22".to_string(),
            })
            .await
            .unwrap();

        assert!(!response.token.is_empty());
        assert!(response.token.contains('.')); // JWTs have dots
        assert_eq!(response.user.name, "alice");
        assert_eq!(response.user.role, "subscriber");
    }

    #[tokio::test]
    async fn test_signup_duplicate_email() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let service = service_with(repo, Arc::new(RecordingMailer::new()));

        service
            .signup(signup_request("alice", "alice@example.com", "hunter22"))
            .await
            .unwrap();

        let result = service
            .signup(signup_request("imposter", "alice@example.com", "hunter22"))
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_signin_failures_are_indistinguishable() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let service = service_with(repo, Arc::new(RecordingMailer::new()));

        service
            .signup(signup_request("alice", "alice@example.com", "hunter22"))
            .await
            .unwrap();

        let wrong_password = service
            .signin(SigninRequest {
                email: "alice@example.com".to_string(),
                password: "hunter2".to_string(),
            })
            .await
            .unwrap_err();

        let unknown_email = service
            .signin(SigninRequest {
                email: "nobody@example.com".to_string(),
                password: "hunter22".to_string(),
            })
            .await
            .unwrap_err();

        match (wrong_password, unknown_email) {
            (AppError::Unauthorized(a), AppError::Unauthorized(b)) => assert_eq!(a, b),
            other => panic!("expected two Unauthorized errors, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_session_token_round_trips_identity_and_role() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let service = service_with(repo.clone(), Arc::new(RecordingMailer::new()));

        service
            .signup(signup_request("alice", "alice@example.com", "hunter22"))
            .await
            .unwrap();
        let response = service
            .signin(SigninRequest {
                email: "alice@example.com".to_string(),
                password: "hunter22".to_string(),
            })
            .await
            .unwrap();

        let config = TokenConfig::new("test-secret", 7);
        let claims = config.validate_session_token(&response.token).unwrap();
        assert_eq!(claims.sub, response.user.id);
        assert_eq!(claims.role, "subscriber");
    }

    #[tokio::test]
    async fn test_forgot_password_persists_token_and_sends_email() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let mailer = Arc::new(RecordingMailer::new());
        let service = service_with(repo.clone(), mailer.clone());

        service
            .signup(signup_request("alice", "alice@example.com", "hunter22"))
            .await
            .unwrap();

        service
            .forgot_password(ForgotPasswordRequest {
                email: "alice@example.com".to_string(),
            })
            .await
            .unwrap();

        let user = repo.find_by_email("alice@example.com").await.unwrap().unwrap();
        let token = user.reset_password_token.expect("token should be pending");
        assert!(!token.is_empty());

        assert_eq!(mailer.sent_count(), 1);
        assert_eq!(mailer.last_recipient().as_deref(), Some("alice@example.com"));
        let sent = mailer.sent.lock().unwrap();
        assert!(sent[0].body.contains(&token));
    }

    #[tokio::test]
    async fn test_forgot_password_survives_mail_failure() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let service = service_with(repo.clone(), Arc::new(FailingMailer));

        service
            .signup(signup_request("alice", "alice@example.com", "hunter22"))
            .await
            .unwrap();

        // Delivery failure must not fail the request or drop the token
        service
            .forgot_password(ForgotPasswordRequest {
                email: "alice@example.com".to_string(),
            })
            .await
            .unwrap();

        let user = repo.find_by_email("alice@example.com").await.unwrap().unwrap();
        assert!(user.reset_password_token.is_some());
    }

    #[tokio::test]
    async fn test_reset_flow_end_to_end() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let service = service_with(repo.clone(), Arc::new(RecordingMailer::new()));

        service
            .signup(signup_request("alice", "alice@example.com", "hunter22"))
            .await
            .unwrap();
        service
            .forgot_password(ForgotPasswordRequest {
                email: "alice@example.com".to_string(),
            })
            .await
            .unwrap();

        let token = repo
            .find_by_email("alice@example.com")
            .await
            .unwrap()
            .unwrap()
            .reset_password_token
            .unwrap();

        service
            .reset_password(ResetPasswordRequest {
                reset_password_token: token.clone(),
                new_password: "newpass1".to_string(),
            })
            .await
            .unwrap();

        let user = repo.find_by_email("alice@example.com").await.unwrap().unwrap();
        assert!(user.reset_password_token.is_none());
        assert!(password::verify_password(&user, "newpass1"));
        assert!(!password::verify_password(&user, "hunter22"));

        // The token was consumed; a second redemption fails
        let result = service
            .reset_password(ResetPasswordRequest {
                reset_password_token: token,
                new_password: "again1".to_string(),
            })
            .await;
        assert!(matches!(result, Err(AppError::InvalidResetToken)));
    }

    #[tokio::test]
    async fn test_reset_with_never_issued_token() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let service = service_with(repo.clone(), Arc::new(RecordingMailer::new()));

        service
            .signup(signup_request("alice", "alice@example.com", "hunter22"))
            .await
            .unwrap();

        let result = service
            .reset_password(ResetPasswordRequest {
                reset_password_token: "never-issued".to_string(),
                new_password: "newpass1".to_string(),
            })
            .await;
        assert!(matches!(result, Err(AppError::InvalidResetToken)));

        // Nothing changed
        let user = repo.find_by_email("alice@example.com").await.unwrap().unwrap();
        assert!(password::verify_password(&user, "hunter22"));
    }

    #[tokio::test]
    async fn test_social_login_creates_then_reuses_account() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let service = service_with(repo.clone(), Arc::new(RecordingMailer::new()));

        let first = service
            .social_login(SocialLoginRequest {
                name: "alice".to_string(),
                email: "alice@example.com".to_string(),
            })
            .await
            .unwrap();

        let second = service
            .social_login(SocialLoginRequest {
                name: "alice-updated".to_string(),
                email: "alice@example.com".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(first.user.id, second.user.id);
        assert_eq!(second.user.name, "alice-updated");
        assert_eq!(repo.user_count(), 1);
    }
}
