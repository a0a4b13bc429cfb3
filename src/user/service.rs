use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::{
    models::{Photo, UserModel, UserUpdate},
    repository::UserRepository,
    types::{UserListItem, UserResponse, UserSummary},
};
use crate::shared::AppError;

/// Service for handling user profile and follow business logic
pub struct UserService {
    repository: Arc<dyn UserRepository + Send + Sync>,
}

impl UserService {
    pub fn new(repository: Arc<dyn UserRepository + Send + Sync>) -> Self {
        Self { repository }
    }

    /// Lists all users with their public listing fields
    #[instrument(skip(self))]
    pub async fn list_users(&self) -> Result<Vec<UserListItem>, AppError> {
        let users = self.repository.list_users().await?;

        info!(user_count = users.len(), "Users retrieved successfully");

        Ok(users
            .into_iter()
            .map(|user| UserListItem {
                id: user.id,
                name: user.name,
                email: user.email,
                created_at: user.created_at,
                updated_at: user.updated_at,
            })
            .collect())
    }

    /// Gets a single user with followers and following populated
    #[instrument(skip(self))]
    pub async fn get_user(&self, user_id: &str) -> Result<UserResponse, AppError> {
        let user = self
            .repository
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        self.to_response(user).await
    }

    /// Applies an allow-listed profile update
    #[instrument(skip(self, update))]
    pub async fn update_user(
        &self,
        user_id: &str,
        update: UserUpdate,
    ) -> Result<UserResponse, AppError> {
        let user = self
            .repository
            .update_user(user_id, &update)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        info!(user_id = %user.id, "User profile updated");
        self.to_response(user).await
    }

    /// Deletes a user account
    #[instrument(skip(self))]
    pub async fn delete_user(&self, user_id: &str) -> Result<(), AppError> {
        self.repository.delete_user(user_id).await?;
        info!(user_id = %user_id, "User deleted");
        Ok(())
    }

    /// Fetches the stored profile photo
    #[instrument(skip(self))]
    pub async fn photo(&self, user_id: &str) -> Result<Photo, AppError> {
        let user = self
            .repository
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        user.photo
            .ok_or_else(|| AppError::NotFound("User has no photo".to_string()))
    }

    /// Records a follow and returns the followed user's populated profile
    #[instrument(skip(self))]
    pub async fn follow(
        &self,
        follower_id: &str,
        followed_id: &str,
    ) -> Result<UserResponse, AppError> {
        let followed = self
            .repository
            .follow(follower_id, followed_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        info!(
            follower_id = %follower_id,
            followed_id = %followed_id,
            "Follow recorded"
        );
        self.to_response(followed).await
    }

    /// Removes a follow and returns the unfollowed user's populated profile
    #[instrument(skip(self))]
    pub async fn unfollow(
        &self,
        follower_id: &str,
        followed_id: &str,
    ) -> Result<UserResponse, AppError> {
        let followed = self
            .repository
            .unfollow(follower_id, followed_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        info!(
            follower_id = %follower_id,
            followed_id = %followed_id,
            "Unfollow recorded"
        );
        self.to_response(followed).await
    }

    /// Suggests users the given user does not follow yet
    #[instrument(skip(self))]
    pub async fn find_people(&self, user_id: &str) -> Result<Vec<UserSummary>, AppError> {
        let people = self.repository.find_people(user_id).await?;

        debug!(suggestion_count = people.len(), "Follow suggestions computed");

        Ok(people
            .into_iter()
            .map(|user| UserSummary {
                id: user.id,
                name: user.name,
            })
            .collect())
    }

    /// Builds the public response, resolving follow lists to {id, name} pairs
    async fn to_response(&self, user: UserModel) -> Result<UserResponse, AppError> {
        let mut related: HashSet<String> = HashSet::new();
        related.extend(user.following.iter().cloned());
        related.extend(user.followers.iter().cloned());

        let related_ids: Vec<String> = related.into_iter().collect();
        let names: HashMap<String, String> = self
            .repository
            .get_users_by_ids(&related_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u.name))
            .collect();

        let summarize = |ids: &[String]| {
            ids.iter()
                .filter_map(|id| {
                    names.get(id).map(|name| UserSummary {
                        id: id.clone(),
                        name: name.clone(),
                    })
                })
                .collect::<Vec<_>>()
        };

        Ok(UserResponse {
            following: summarize(&user.following),
            followers: summarize(&user.followers),
            id: user.id,
            name: user.name,
            email: user.email,
            about: user.about,
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        })
    }
}
