use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::user::types::UserSummary;

/// Comment with its author resolved to {id, name}
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CommentResponse {
    pub id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub posted_by: UserSummary,
}

/// Post with poster and commenters resolved. Photo bytes never appear here;
/// the photo is served through its own endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: String,
    pub title: String,
    pub body: String,
    pub posted_by: UserSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub likes: Vec<String>,
    pub comments: Vec<CommentResponse>,
}

/// Multipart fields accepted when creating or updating a post
#[derive(Debug, Default, Validate)]
pub struct PostForm {
    #[validate(length(
        min = 4,
        max = 150,
        message = "Title must be between 4 to 150 characters"
    ))]
    pub title: Option<String>,
    #[validate(length(
        min = 4,
        max = 2000,
        message = "Body must be between 4 to 2000 characters"
    ))]
    pub body: Option<String>,
}

/// Request payload for liking or unliking a post
#[derive(Debug, Deserialize)]
pub struct LikeRequest {
    pub post_id: String,
}

/// Request payload for commenting on a post
#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub post_id: String,
    pub text: String,
}

/// Request payload for removing a comment
#[derive(Debug, Deserialize)]
pub struct UncommentRequest {
    pub post_id: String,
    pub comment_id: String,
}
