// Library crate for the gramlet social API server
// This file exposes the public API for integration tests

pub mod auth;
pub mod email;
pub mod post;
pub mod routes;
pub mod shared;
pub mod user;

// Re-export commonly used types for easier access in tests
pub use auth::{token::TokenConfig, SessionClaims};
pub use email::{EmailMessage, Mailer};
pub use post::{models::PostModel, repository::PostRepository};
pub use routes::api_router;
pub use shared::{AppError, AppState};
pub use user::{models::UserModel, repository::UserRepository};
