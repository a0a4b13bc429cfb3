// Public API - what other modules can use
pub use handlers::{forgot_password, reset_password, signin, signout, signup, social_login};
pub use middleware::jwt_auth;
pub use types::SessionClaims;

// Internal modules
mod handlers;
mod middleware;
pub mod password;
pub mod service;
pub mod token;
pub mod types;
