// Public API - what other modules can use
pub use handlers::{
    delete_user, find_people, follow, get_user, list_users, unfollow, update_user, user_photo,
};

// Internal modules
mod handlers;
pub mod models;
pub mod repository;
pub mod service;
pub mod types;
