use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::user::models::Photo;

/// Comment embedded in a post document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommentModel {
    pub id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub posted_by: String, // Commenting user id
}

impl CommentModel {
    pub fn new(text: String, posted_by: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text,
            created_at: Utc::now(),
            posted_by,
        }
    }
}

/// Database model for the posts collection
#[derive(Debug, Clone)]
pub struct PostModel {
    pub id: String, // UUID v4 as string
    pub title: String,
    pub body: String,
    pub photo: Option<Photo>,
    pub posted_by: String, // Authoring user id
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub likes: Vec<String>, // User ids that liked this post
    pub comments: Vec<CommentModel>,
}

impl PostModel {
    /// Creates a new post model with generated ID
    pub fn new(title: String, body: String, posted_by: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            body,
            photo: None,
            posted_by,
            created_at: Utc::now(),
            updated_at: None,
            likes: vec![],
            comments: vec![],
        }
    }

    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.likes.iter().any(|id| id == user_id)
    }
}

/// Allow-listed post update. Anything not named here cannot be changed
/// through the update endpoint.
#[derive(Debug, Clone, Default)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub body: Option<String>,
    pub photo: Option<Photo>,
}
