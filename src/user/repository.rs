use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::models::{Photo, UserModel, UserUpdate};
use crate::shared::AppError;

/// Trait for user repository operations
#[async_trait]
pub trait UserRepository {
    async fn create_user(&self, user: &UserModel) -> Result<(), AppError>;
    async fn get_user(&self, user_id: &str) -> Result<Option<UserModel>, AppError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<UserModel>, AppError>;
    async fn list_users(&self) -> Result<Vec<UserModel>, AppError>;
    async fn get_users_by_ids(&self, user_ids: &[String]) -> Result<Vec<UserModel>, AppError>;

    /// Applies an allow-listed update and returns the updated user
    async fn update_user(
        &self,
        user_id: &str,
        update: &UserUpdate,
    ) -> Result<Option<UserModel>, AppError>;

    async fn delete_user(&self, user_id: &str) -> Result<(), AppError>;

    /// Stores a pending reset token verbatim on the account
    async fn set_reset_token(&self, user_id: &str, token: &str) -> Result<(), AppError>;

    /// Atomically matches the pending reset token, installs the new
    /// credentials and clears the token, so a token can be redeemed at most
    /// once even under concurrent attempts. Returns None when no account
    /// carries the presented token.
    async fn redeem_reset_token(
        &self,
        token: &str,
        salt: &str,
        hashed_password: &str,
    ) -> Result<Option<UserModel>, AppError>;

    /// Atomically inserts the user or, when the email already exists, updates
    /// the display name of the existing account. Returns the stored user and
    /// whether the record was newly created.
    async fn upsert_by_email(&self, user: UserModel) -> Result<(UserModel, bool), AppError>;

    /// Records the follow on both sides and returns the followed user
    async fn follow(
        &self,
        follower_id: &str,
        followed_id: &str,
    ) -> Result<Option<UserModel>, AppError>;

    /// Removes the follow from both sides and returns the unfollowed user
    async fn unfollow(
        &self,
        follower_id: &str,
        followed_id: &str,
    ) -> Result<Option<UserModel>, AppError>;

    /// Users the given user does not follow yet, excluding the user themselves
    async fn find_people(&self, user_id: &str) -> Result<Vec<UserModel>, AppError>;
}

/// In-memory implementation of UserRepository for development and testing
///
/// Data is stored in memory and lost when the application restarts.
pub struct InMemoryUserRepository {
    users: Mutex<HashMap<String, UserModel>>,
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryUserRepository {
    /// Creates a new empty in-memory repository
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the current number of users in the repository
    pub fn user_count(&self) -> usize {
        self.users.lock().unwrap().len()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    #[instrument(skip(self, user))]
    async fn create_user(&self, user: &UserModel) -> Result<(), AppError> {
        debug!(user_id = %user.id, email = %user.email, "Creating user in memory");

        let mut users = self.users.lock().unwrap();
        if users.contains_key(&user.id) {
            warn!(user_id = %user.id, "User already exists in memory");
            return Err(AppError::DatabaseError("User already exists".to_string()));
        }
        if users.values().any(|u| u.email == user.email) {
            warn!(email = %user.email, "Email already registered in memory");
            return Err(AppError::DatabaseError(
                "Email already registered".to_string(),
            ));
        }
        users.insert(user.id.clone(), user.clone());

        debug!(user_id = %user.id, "User created successfully in memory");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_user(&self, user_id: &str) -> Result<Option<UserModel>, AppError> {
        let users = self.users.lock().unwrap();
        Ok(users.get(user_id).cloned())
    }

    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> Result<Option<UserModel>, AppError> {
        let users = self.users.lock().unwrap();
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    #[instrument(skip(self))]
    async fn list_users(&self) -> Result<Vec<UserModel>, AppError> {
        let users = self.users.lock().unwrap();
        Ok(users.values().cloned().collect())
    }

    #[instrument(skip(self, user_ids))]
    async fn get_users_by_ids(&self, user_ids: &[String]) -> Result<Vec<UserModel>, AppError> {
        let users = self.users.lock().unwrap();
        Ok(user_ids
            .iter()
            .filter_map(|id| users.get(id).cloned())
            .collect())
    }

    #[instrument(skip(self, update))]
    async fn update_user(
        &self,
        user_id: &str,
        update: &UserUpdate,
    ) -> Result<Option<UserModel>, AppError> {
        let mut users = self.users.lock().unwrap();

        let user = match users.get_mut(user_id) {
            Some(user) => user,
            None => {
                debug!(user_id = %user_id, "User not found for update in memory");
                return Ok(None);
            }
        };

        if let Some(name) = &update.name {
            user.name = name.clone();
        }
        if let Some(about) = &update.about {
            user.about = Some(about.clone());
        }
        if let Some(photo) = &update.photo {
            user.photo = Some(photo.clone());
        }
        user.updated_at = Some(Utc::now());

        debug!(user_id = %user_id, "User updated successfully in memory");
        Ok(Some(user.clone()))
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, user_id: &str) -> Result<(), AppError> {
        let mut users = self.users.lock().unwrap();
        if users.remove(user_id).is_none() {
            warn!(user_id = %user_id, "User not found for deletion in memory");
            return Err(AppError::NotFound("User not found".to_string()));
        }

        debug!(user_id = %user_id, "User deleted successfully from memory");
        Ok(())
    }

    #[instrument(skip(self, token))]
    async fn set_reset_token(&self, user_id: &str, token: &str) -> Result<(), AppError> {
        let mut users = self.users.lock().unwrap();
        match users.get_mut(user_id) {
            Some(user) => {
                user.reset_password_token = Some(token.to_string());
                Ok(())
            }
            None => {
                warn!(user_id = %user_id, "User not found when storing reset token");
                Err(AppError::NotFound("User not found".to_string()))
            }
        }
    }

    #[instrument(skip(self, token, salt, hashed_password))]
    async fn redeem_reset_token(
        &self,
        token: &str,
        salt: &str,
        hashed_password: &str,
    ) -> Result<Option<UserModel>, AppError> {
        let mut users = self.users.lock().unwrap();

        // Match and clear under the same lock so a token redeems at most once
        let user = users
            .values_mut()
            .find(|u| u.reset_password_token.as_deref() == Some(token));

        match user {
            Some(user) => {
                user.salt = salt.to_string();
                user.hashed_password = hashed_password.to_string();
                user.reset_password_token = None;
                user.updated_at = Some(Utc::now());
                debug!(user_id = %user.id, "Reset token redeemed in memory");
                Ok(Some(user.clone()))
            }
            None => {
                debug!("No account carries the presented reset token");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, user))]
    async fn upsert_by_email(&self, user: UserModel) -> Result<(UserModel, bool), AppError> {
        let mut users = self.users.lock().unwrap();

        // Decide created-vs-existing under one lock to avoid a double insert
        let existing_id = users
            .values()
            .find(|u| u.email == user.email)
            .map(|u| u.id.clone());

        match existing_id {
            Some(id) => {
                let existing = users.get_mut(&id).unwrap();
                existing.name = user.name;
                existing.updated_at = Some(Utc::now());
                debug!(user_id = %id, "Upsert matched existing user in memory");
                Ok((existing.clone(), false))
            }
            None => {
                let stored = user.clone();
                users.insert(user.id.clone(), user);
                debug!(user_id = %stored.id, "Upsert created new user in memory");
                Ok((stored, true))
            }
        }
    }

    #[instrument(skip(self))]
    async fn follow(
        &self,
        follower_id: &str,
        followed_id: &str,
    ) -> Result<Option<UserModel>, AppError> {
        let mut users = self.users.lock().unwrap();

        if !users.contains_key(follower_id) || !users.contains_key(followed_id) {
            debug!(follower_id = %follower_id, followed_id = %followed_id, "Follow target missing");
            return Ok(None);
        }

        {
            let follower = users.get_mut(follower_id).unwrap();
            if !follower.is_following(followed_id) {
                follower.following.push(followed_id.to_string());
            }
        }
        let followed = users.get_mut(followed_id).unwrap();
        if !followed.has_follower(follower_id) {
            followed.followers.push(follower_id.to_string());
        }

        Ok(Some(followed.clone()))
    }

    #[instrument(skip(self))]
    async fn unfollow(
        &self,
        follower_id: &str,
        followed_id: &str,
    ) -> Result<Option<UserModel>, AppError> {
        let mut users = self.users.lock().unwrap();

        if !users.contains_key(follower_id) || !users.contains_key(followed_id) {
            debug!(follower_id = %follower_id, followed_id = %followed_id, "Unfollow target missing");
            return Ok(None);
        }

        {
            let follower = users.get_mut(follower_id).unwrap();
            follower.following.retain(|id| id != followed_id);
        }
        let followed = users.get_mut(followed_id).unwrap();
        followed.followers.retain(|id| id != follower_id);

        Ok(Some(followed.clone()))
    }

    #[instrument(skip(self))]
    async fn find_people(&self, user_id: &str) -> Result<Vec<UserModel>, AppError> {
        let users = self.users.lock().unwrap();

        let user = users
            .get(user_id)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let mut excluded = user.following.clone();
        excluded.push(user.id.clone());

        Ok(users
            .values()
            .filter(|u| !excluded.contains(&u.id))
            .cloned()
            .collect())
    }
}

/// PostgreSQL implementation of user repository
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = "id, name, email, salt, hashed_password, about, photo, \
     photo_content_type, following, followers, reset_password_token, role, created_at, updated_at";

fn user_from_row(row: &PgRow) -> UserModel {
    let photo_data: Option<Vec<u8>> = row.get("photo");
    let photo_content_type: Option<String> = row.get("photo_content_type");
    let photo = match (photo_data, photo_content_type) {
        (Some(data), Some(content_type)) => Some(Photo { data, content_type }),
        _ => None,
    };

    UserModel {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        salt: row.get("salt"),
        hashed_password: row.get("hashed_password"),
        about: row.get("about"),
        photo,
        following: row.get("following"),
        followers: row.get("followers"),
        reset_password_token: row.get("reset_password_token"),
        role: row.get("role"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    #[instrument(skip(self, user))]
    async fn create_user(&self, user: &UserModel) -> Result<(), AppError> {
        debug!(user_id = %user.id, email = %user.email, "Creating user in database");

        sqlx::query(
            "INSERT INTO users (id, name, email, salt, hashed_password, about, photo, \
             photo_content_type, following, followers, reset_password_token, role, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.salt)
        .bind(&user.hashed_password)
        .bind(&user.about)
        .bind(user.photo.as_ref().map(|p| p.data.clone()))
        .bind(user.photo.as_ref().map(|p| p.content_type.clone()))
        .bind(&user.following)
        .bind(&user.followers)
        .bind(&user.reset_password_token)
        .bind(&user.role)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to create user in database");
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_user(&self, user_id: &str) -> Result<Option<UserModel>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, user_id = %user_id, "Failed to fetch user from database");
                AppError::DatabaseError(e.to_string())
            })?;

        Ok(row.as_ref().map(user_from_row))
    }

    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> Result<Option<UserModel>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to fetch user by email from database");
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(row.as_ref().map(user_from_row))
    }

    #[instrument(skip(self))]
    async fn list_users(&self) -> Result<Vec<UserModel>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM users ORDER BY created_at",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to list users from database");
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(rows.iter().map(user_from_row).collect())
    }

    #[instrument(skip(self, user_ids))]
    async fn get_users_by_ids(&self, user_ids: &[String]) -> Result<Vec<UserModel>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM users WHERE id = ANY($1)",
            USER_COLUMNS
        ))
        .bind(user_ids.to_vec())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to fetch users by ids from database");
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(rows.iter().map(user_from_row).collect())
    }

    #[instrument(skip(self, update))]
    async fn update_user(
        &self,
        user_id: &str,
        update: &UserUpdate,
    ) -> Result<Option<UserModel>, AppError> {
        let row = sqlx::query(&format!(
            "UPDATE users SET name = COALESCE($2, name), about = COALESCE($3, about), \
             photo = COALESCE($4, photo), photo_content_type = COALESCE($5, photo_content_type), \
             updated_at = $6 WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(user_id)
        .bind(&update.name)
        .bind(&update.about)
        .bind(update.photo.as_ref().map(|p| p.data.clone()))
        .bind(update.photo.as_ref().map(|p| p.content_type.clone()))
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, user_id = %user_id, "Failed to update user in database");
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(row.as_ref().map(user_from_row))
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, user_id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, user_id = %user_id, "Failed to delete user from database");
                AppError::DatabaseError(e.to_string())
            })?;

        if result.rows_affected() == 0 {
            warn!(user_id = %user_id, "User not found for deletion");
            return Err(AppError::NotFound("User not found".to_string()));
        }

        Ok(())
    }

    #[instrument(skip(self, token))]
    async fn set_reset_token(&self, user_id: &str, token: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET reset_password_token = $2 WHERE id = $1")
            .bind(user_id)
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, user_id = %user_id, "Failed to store reset token");
                AppError::DatabaseError(e.to_string())
            })?;

        if result.rows_affected() == 0 {
            warn!(user_id = %user_id, "User not found when storing reset token");
            return Err(AppError::NotFound("User not found".to_string()));
        }

        Ok(())
    }

    #[instrument(skip(self, token, salt, hashed_password))]
    async fn redeem_reset_token(
        &self,
        token: &str,
        salt: &str,
        hashed_password: &str,
    ) -> Result<Option<UserModel>, AppError> {
        // Single conditional UPDATE: the row matches on the pending token and
        // the token is cleared in the same statement, so concurrent redeems
        // cannot both succeed.
        let row = sqlx::query(&format!(
            "UPDATE users SET salt = $2, hashed_password = $3, reset_password_token = NULL, \
             updated_at = $4 WHERE reset_password_token = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(token)
        .bind(salt)
        .bind(hashed_password)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to redeem reset token in database");
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(row.as_ref().map(user_from_row))
    }

    #[instrument(skip(self, user))]
    async fn upsert_by_email(&self, user: UserModel) -> Result<(UserModel, bool), AppError> {
        // xmax = 0 distinguishes a fresh insert from a conflict update
        let row = sqlx::query(&format!(
            "INSERT INTO users (id, name, email, salt, hashed_password, about, photo, \
             photo_content_type, following, followers, reset_password_token, role, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             ON CONFLICT (email) DO UPDATE SET name = EXCLUDED.name, updated_at = EXCLUDED.created_at \
             RETURNING {}, (xmax = 0) AS inserted",
            USER_COLUMNS
        ))
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.salt)
        .bind(&user.hashed_password)
        .bind(&user.about)
        .bind(user.photo.as_ref().map(|p| p.data.clone()))
        .bind(user.photo.as_ref().map(|p| p.content_type.clone()))
        .bind(&user.following)
        .bind(&user.followers)
        .bind(&user.reset_password_token)
        .bind(&user.role)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to upsert user in database");
            AppError::DatabaseError(e.to_string())
        })?;

        let created: bool = row.get("inserted");
        Ok((user_from_row(&row), created))
    }

    #[instrument(skip(self))]
    async fn follow(
        &self,
        follower_id: &str,
        followed_id: &str,
    ) -> Result<Option<UserModel>, AppError> {
        sqlx::query(
            "UPDATE users SET following = array_append(following, $2) \
             WHERE id = $1 AND NOT ($2 = ANY(following))",
        )
        .bind(follower_id)
        .bind(followed_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to record following in database");
            AppError::DatabaseError(e.to_string())
        })?;

        sqlx::query(
            "UPDATE users SET followers = array_append(followers, $2) \
             WHERE id = $1 AND NOT ($2 = ANY(followers))",
        )
        .bind(followed_id)
        .bind(follower_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to record follower in database");
            AppError::DatabaseError(e.to_string())
        })?;

        self.get_user(followed_id).await
    }

    #[instrument(skip(self))]
    async fn unfollow(
        &self,
        follower_id: &str,
        followed_id: &str,
    ) -> Result<Option<UserModel>, AppError> {
        sqlx::query("UPDATE users SET following = array_remove(following, $2) WHERE id = $1")
            .bind(follower_id)
            .bind(followed_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to remove following in database");
                AppError::DatabaseError(e.to_string())
            })?;

        sqlx::query("UPDATE users SET followers = array_remove(followers, $2) WHERE id = $1")
            .bind(followed_id)
            .bind(follower_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to remove follower in database");
                AppError::DatabaseError(e.to_string())
            })?;

        self.get_user(followed_id).await
    }

    #[instrument(skip(self))]
    async fn find_people(&self, user_id: &str) -> Result<Vec<UserModel>, AppError> {
        let user = self
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let mut excluded = user.following;
        excluded.push(user.id);

        let rows = sqlx::query(&format!(
            "SELECT {} FROM users WHERE NOT (id = ANY($1))",
            USER_COLUMNS
        ))
        .bind(excluded)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to find people in database");
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(rows.iter().map(user_from_row).collect())
    }
}
