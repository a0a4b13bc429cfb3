use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::models::{CommentModel, PostModel, PostUpdate};
use crate::shared::AppError;
use crate::user::models::Photo;

/// Trait for post repository operations
#[async_trait]
pub trait PostRepository {
    async fn create_post(&self, post: &PostModel) -> Result<(), AppError>;
    async fn get_post(&self, post_id: &str) -> Result<Option<PostModel>, AppError>;

    /// All posts, newest first
    async fn list_posts(&self) -> Result<Vec<PostModel>, AppError>;
    async fn list_posts_by_user(&self, user_id: &str) -> Result<Vec<PostModel>, AppError>;

    /// Applies an allow-listed update and returns the updated post
    async fn update_post(
        &self,
        post_id: &str,
        update: &PostUpdate,
    ) -> Result<Option<PostModel>, AppError>;

    async fn delete_post(&self, post_id: &str) -> Result<(), AppError>;

    /// Records a like (at most one per user) and returns the updated post
    async fn like(&self, post_id: &str, user_id: &str) -> Result<Option<PostModel>, AppError>;

    /// Removes a like and returns the updated post
    async fn unlike(&self, post_id: &str, user_id: &str) -> Result<Option<PostModel>, AppError>;

    /// Appends a comment and returns the updated post
    async fn add_comment(
        &self,
        post_id: &str,
        comment: &CommentModel,
    ) -> Result<Option<PostModel>, AppError>;

    /// Removes a comment by id and returns the updated post
    async fn remove_comment(
        &self,
        post_id: &str,
        comment_id: &str,
    ) -> Result<Option<PostModel>, AppError>;
}

/// In-memory implementation of PostRepository for development and testing
pub struct InMemoryPostRepository {
    posts: Mutex<HashMap<String, PostModel>>,
}

impl Default for InMemoryPostRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPostRepository {
    /// Creates a new empty in-memory repository
    pub fn new() -> Self {
        Self {
            posts: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the current number of posts in the repository
    pub fn post_count(&self) -> usize {
        self.posts.lock().unwrap().len()
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    #[instrument(skip(self, post))]
    async fn create_post(&self, post: &PostModel) -> Result<(), AppError> {
        debug!(post_id = %post.id, posted_by = %post.posted_by, "Creating post in memory");

        let mut posts = self.posts.lock().unwrap();
        if posts.contains_key(&post.id) {
            warn!(post_id = %post.id, "Post already exists in memory");
            return Err(AppError::DatabaseError("Post already exists".to_string()));
        }
        posts.insert(post.id.clone(), post.clone());

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_post(&self, post_id: &str) -> Result<Option<PostModel>, AppError> {
        let posts = self.posts.lock().unwrap();
        Ok(posts.get(post_id).cloned())
    }

    #[instrument(skip(self))]
    async fn list_posts(&self) -> Result<Vec<PostModel>, AppError> {
        let posts = self.posts.lock().unwrap();
        let mut list: Vec<PostModel> = posts.values().cloned().collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    #[instrument(skip(self))]
    async fn list_posts_by_user(&self, user_id: &str) -> Result<Vec<PostModel>, AppError> {
        let posts = self.posts.lock().unwrap();
        let mut list: Vec<PostModel> = posts
            .values()
            .filter(|p| p.posted_by == user_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    #[instrument(skip(self, update))]
    async fn update_post(
        &self,
        post_id: &str,
        update: &PostUpdate,
    ) -> Result<Option<PostModel>, AppError> {
        let mut posts = self.posts.lock().unwrap();

        let post = match posts.get_mut(post_id) {
            Some(post) => post,
            None => {
                debug!(post_id = %post_id, "Post not found for update in memory");
                return Ok(None);
            }
        };

        if let Some(title) = &update.title {
            post.title = title.clone();
        }
        if let Some(body) = &update.body {
            post.body = body.clone();
        }
        if let Some(photo) = &update.photo {
            post.photo = Some(photo.clone());
        }
        post.updated_at = Some(Utc::now());

        Ok(Some(post.clone()))
    }

    #[instrument(skip(self))]
    async fn delete_post(&self, post_id: &str) -> Result<(), AppError> {
        let mut posts = self.posts.lock().unwrap();
        if posts.remove(post_id).is_none() {
            warn!(post_id = %post_id, "Post not found for deletion in memory");
            return Err(AppError::NotFound("Post not found".to_string()));
        }

        debug!(post_id = %post_id, "Post deleted successfully from memory");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn like(&self, post_id: &str, user_id: &str) -> Result<Option<PostModel>, AppError> {
        let mut posts = self.posts.lock().unwrap();

        let post = match posts.get_mut(post_id) {
            Some(post) => post,
            None => return Ok(None),
        };

        if !post.is_liked_by(user_id) {
            post.likes.push(user_id.to_string());
        }

        Ok(Some(post.clone()))
    }

    #[instrument(skip(self))]
    async fn unlike(&self, post_id: &str, user_id: &str) -> Result<Option<PostModel>, AppError> {
        let mut posts = self.posts.lock().unwrap();

        let post = match posts.get_mut(post_id) {
            Some(post) => post,
            None => return Ok(None),
        };

        post.likes.retain(|id| id != user_id);

        Ok(Some(post.clone()))
    }

    #[instrument(skip(self, comment))]
    async fn add_comment(
        &self,
        post_id: &str,
        comment: &CommentModel,
    ) -> Result<Option<PostModel>, AppError> {
        let mut posts = self.posts.lock().unwrap();

        let post = match posts.get_mut(post_id) {
            Some(post) => post,
            None => return Ok(None),
        };

        post.comments.push(comment.clone());

        Ok(Some(post.clone()))
    }

    #[instrument(skip(self))]
    async fn remove_comment(
        &self,
        post_id: &str,
        comment_id: &str,
    ) -> Result<Option<PostModel>, AppError> {
        let mut posts = self.posts.lock().unwrap();

        let post = match posts.get_mut(post_id) {
            Some(post) => post,
            None => return Ok(None),
        };

        post.comments.retain(|c| c.id != comment_id);

        Ok(Some(post.clone()))
    }
}

/// PostgreSQL implementation of post repository
pub struct PostgresPostRepository {
    pool: PgPool,
}

impl PostgresPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const POST_COLUMNS: &str =
    "id, title, body, photo, photo_content_type, posted_by, created_at, updated_at, likes, comments";

fn post_from_row(row: &PgRow) -> PostModel {
    let photo_data: Option<Vec<u8>> = row.get("photo");
    let photo_content_type: Option<String> = row.get("photo_content_type");
    let photo = match (photo_data, photo_content_type) {
        (Some(data), Some(content_type)) => Some(Photo { data, content_type }),
        _ => None,
    };

    let comments: Json<Vec<CommentModel>> = row.get("comments");

    PostModel {
        id: row.get("id"),
        title: row.get("title"),
        body: row.get("body"),
        photo,
        posted_by: row.get("posted_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        likes: row.get("likes"),
        comments: comments.0,
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    #[instrument(skip(self, post))]
    async fn create_post(&self, post: &PostModel) -> Result<(), AppError> {
        debug!(post_id = %post.id, posted_by = %post.posted_by, "Creating post in database");

        sqlx::query(
            "INSERT INTO posts (id, title, body, photo, photo_content_type, posted_by, \
             created_at, updated_at, likes, comments) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(&post.id)
        .bind(&post.title)
        .bind(&post.body)
        .bind(post.photo.as_ref().map(|p| p.data.clone()))
        .bind(post.photo.as_ref().map(|p| p.content_type.clone()))
        .bind(&post.posted_by)
        .bind(post.created_at)
        .bind(post.updated_at)
        .bind(&post.likes)
        .bind(Json(&post.comments))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to create post in database");
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_post(&self, post_id: &str) -> Result<Option<PostModel>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM posts WHERE id = $1", POST_COLUMNS))
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, post_id = %post_id, "Failed to fetch post from database");
                AppError::DatabaseError(e.to_string())
            })?;

        Ok(row.as_ref().map(post_from_row))
    }

    #[instrument(skip(self))]
    async fn list_posts(&self) -> Result<Vec<PostModel>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM posts ORDER BY created_at DESC",
            POST_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to list posts from database");
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(rows.iter().map(post_from_row).collect())
    }

    #[instrument(skip(self))]
    async fn list_posts_by_user(&self, user_id: &str) -> Result<Vec<PostModel>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM posts WHERE posted_by = $1 ORDER BY created_at DESC",
            POST_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to list posts by user from database");
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(rows.iter().map(post_from_row).collect())
    }

    #[instrument(skip(self, update))]
    async fn update_post(
        &self,
        post_id: &str,
        update: &PostUpdate,
    ) -> Result<Option<PostModel>, AppError> {
        let row = sqlx::query(&format!(
            "UPDATE posts SET title = COALESCE($2, title), body = COALESCE($3, body), \
             photo = COALESCE($4, photo), photo_content_type = COALESCE($5, photo_content_type), \
             updated_at = $6 WHERE id = $1 RETURNING {}",
            POST_COLUMNS
        ))
        .bind(post_id)
        .bind(&update.title)
        .bind(&update.body)
        .bind(update.photo.as_ref().map(|p| p.data.clone()))
        .bind(update.photo.as_ref().map(|p| p.content_type.clone()))
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, post_id = %post_id, "Failed to update post in database");
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(row.as_ref().map(post_from_row))
    }

    #[instrument(skip(self))]
    async fn delete_post(&self, post_id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, post_id = %post_id, "Failed to delete post from database");
                AppError::DatabaseError(e.to_string())
            })?;

        if result.rows_affected() == 0 {
            warn!(post_id = %post_id, "Post not found for deletion");
            return Err(AppError::NotFound("Post not found".to_string()));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn like(&self, post_id: &str, user_id: &str) -> Result<Option<PostModel>, AppError> {
        // The CASE keeps the statement a no-op when the user already liked
        // the post, so a like lands at most once.
        let row = sqlx::query(&format!(
            "UPDATE posts SET likes = CASE WHEN $2 = ANY(likes) THEN likes \
             ELSE array_append(likes, $2) END WHERE id = $1 RETURNING {}",
            POST_COLUMNS
        ))
        .bind(post_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, post_id = %post_id, "Failed to record like in database");
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(row.as_ref().map(post_from_row))
    }

    #[instrument(skip(self))]
    async fn unlike(&self, post_id: &str, user_id: &str) -> Result<Option<PostModel>, AppError> {
        let row = sqlx::query(&format!(
            "UPDATE posts SET likes = array_remove(likes, $2) WHERE id = $1 RETURNING {}",
            POST_COLUMNS
        ))
        .bind(post_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, post_id = %post_id, "Failed to remove like in database");
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(row.as_ref().map(post_from_row))
    }

    #[instrument(skip(self, comment))]
    async fn add_comment(
        &self,
        post_id: &str,
        comment: &CommentModel,
    ) -> Result<Option<PostModel>, AppError> {
        let row = sqlx::query(&format!(
            "UPDATE posts SET comments = comments || $2 WHERE id = $1 RETURNING {}",
            POST_COLUMNS
        ))
        .bind(post_id)
        .bind(Json(comment))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, post_id = %post_id, "Failed to add comment in database");
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(row.as_ref().map(post_from_row))
    }

    #[instrument(skip(self))]
    async fn remove_comment(
        &self,
        post_id: &str,
        comment_id: &str,
    ) -> Result<Option<PostModel>, AppError> {
        let row = sqlx::query(&format!(
            "UPDATE posts SET comments = (SELECT COALESCE(jsonb_agg(c), '[]'::jsonb) \
             FROM jsonb_array_elements(comments) AS c WHERE c->>'id' <> $2) \
             WHERE id = $1 RETURNING {}",
            POST_COLUMNS
        ))
        .bind(post_id)
        .bind(comment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, post_id = %post_id, "Failed to remove comment in database");
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(row.as_ref().map(post_from_row))
    }
}
