use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimal user reference embedded in populated responses
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserSummary {
    pub id: String,
    pub name: String,
}

/// Entry in the all-users listing
#[derive(Debug, Serialize, Deserialize)]
pub struct UserListItem {
    pub id: String,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Full public profile. Credentials and photo bytes never appear here;
/// the photo is served through its own endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub about: Option<String>,
    pub role: String,
    pub following: Vec<UserSummary>,
    pub followers: Vec<UserSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Request payload for following another user
#[derive(Debug, Deserialize)]
pub struct FollowRequest {
    pub follow_id: String,
}

/// Request payload for unfollowing a user
#[derive(Debug, Deserialize)]
pub struct UnfollowRequest {
    pub unfollow_id: String,
}
