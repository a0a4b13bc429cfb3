// Public API - what other modules can use
pub use handlers::{
    comment, create_post, delete_post, like, list_posts, post_photo, posts_by_user, single_post,
    uncomment, unlike, update_post,
};

// Internal modules
mod handlers;
pub mod models;
pub mod repository;
pub mod service;
pub mod types;
