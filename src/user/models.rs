use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Raw uploaded image bytes plus the content type they were uploaded with
#[derive(Debug, Clone, PartialEq)]
pub struct Photo {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// Database model for the users collection
#[derive(Debug, Clone)]
pub struct UserModel {
    pub id: String, // UUID v4 as string
    pub name: String,
    pub email: String,
    pub salt: String,            // Random per-account value, never exposed
    pub hashed_password: String, // hash(salt, plaintext), never exposed
    pub about: Option<String>,
    pub photo: Option<Photo>,
    pub following: Vec<String>, // User ids this user follows
    pub followers: Vec<String>, // User ids following this user
    pub reset_password_token: Option<String>, // Present only while a reset is pending
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserModel {
    /// Creates a new user model with generated ID and default role
    pub fn new(name: String, email: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            email,
            salt: String::new(),
            hashed_password: String::new(),
            about: None,
            photo: None,
            following: vec![],
            followers: vec![],
            reset_password_token: None,
            role: "subscriber".to_string(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    pub fn is_following(&self, user_id: &str) -> bool {
        self.following.iter().any(|id| id == user_id)
    }

    pub fn has_follower(&self, user_id: &str) -> bool {
        self.followers.iter().any(|id| id == user_id)
    }
}

/// Allow-listed profile update. Anything not named here cannot be changed
/// through the update endpoint.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub about: Option<String>,
    pub photo: Option<Photo>,
}
