use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::{
    models::{CommentModel, PostModel, PostUpdate},
    repository::PostRepository,
    types::{CommentResponse, PostResponse},
};
use crate::shared::AppError;
use crate::user::models::Photo;
use crate::user::repository::UserRepository;
use crate::user::types::UserSummary;

/// Service for handling post, like and comment business logic
pub struct PostService {
    posts: Arc<dyn PostRepository + Send + Sync>,
    users: Arc<dyn UserRepository + Send + Sync>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository + Send + Sync>,
        users: Arc<dyn UserRepository + Send + Sync>,
    ) -> Self {
        Self { posts, users }
    }

    /// Lists all posts, newest first, with authors resolved
    #[instrument(skip(self))]
    pub async fn list_posts(&self) -> Result<Vec<PostResponse>, AppError> {
        let posts = self.posts.list_posts().await?;
        info!(post_count = posts.len(), "Posts retrieved successfully");
        self.to_responses(posts).await
    }

    /// Creates a post owned by the given user
    #[instrument(skip(self, title, body, photo))]
    pub async fn create_post(
        &self,
        posted_by: &str,
        title: String,
        body: String,
        photo: Option<Photo>,
    ) -> Result<PostResponse, AppError> {
        // The poster must still exist; a token can outlive its account
        self.users
            .get_user(posted_by)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let mut post = PostModel::new(title, body, posted_by.to_string());
        post.photo = photo;
        self.posts.create_post(&post).await?;

        info!(post_id = %post.id, posted_by = %posted_by, "Post created successfully");
        self.to_response(post).await
    }

    /// Lists posts authored by one user, newest first
    #[instrument(skip(self))]
    pub async fn posts_by_user(&self, user_id: &str) -> Result<Vec<PostResponse>, AppError> {
        self.users
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let posts = self.posts.list_posts_by_user(user_id).await?;
        self.to_responses(posts).await
    }

    /// Gets a single post with its author resolved
    #[instrument(skip(self))]
    pub async fn single_post(&self, post_id: &str) -> Result<PostResponse, AppError> {
        let post = self
            .posts
            .get_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

        self.to_response(post).await
    }

    /// Applies an allow-listed update; only the poster may edit
    #[instrument(skip(self, update))]
    pub async fn update_post(
        &self,
        post_id: &str,
        auth_user_id: &str,
        update: PostUpdate,
    ) -> Result<PostResponse, AppError> {
        self.ensure_poster(post_id, auth_user_id).await?;

        let post = self
            .posts
            .update_post(post_id, &update)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

        info!(post_id = %post_id, "Post updated successfully");
        self.to_response(post).await
    }

    /// Deletes a post; only the poster may delete
    #[instrument(skip(self))]
    pub async fn delete_post(&self, post_id: &str, auth_user_id: &str) -> Result<(), AppError> {
        self.ensure_poster(post_id, auth_user_id).await?;

        self.posts.delete_post(post_id).await?;
        info!(post_id = %post_id, "Post deleted");
        Ok(())
    }

    /// Fetches the stored post photo
    #[instrument(skip(self))]
    pub async fn photo(&self, post_id: &str) -> Result<Photo, AppError> {
        let post = self
            .posts
            .get_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

        post.photo
            .ok_or_else(|| AppError::NotFound("Post has no photo".to_string()))
    }

    /// Records a like and returns the updated post
    #[instrument(skip(self))]
    pub async fn like(&self, post_id: &str, user_id: &str) -> Result<PostResponse, AppError> {
        let post = self
            .posts
            .like(post_id, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

        debug!(post_id = %post_id, like_count = post.likes.len(), "Like recorded");
        self.to_response(post).await
    }

    /// Removes a like and returns the updated post
    #[instrument(skip(self))]
    pub async fn unlike(&self, post_id: &str, user_id: &str) -> Result<PostResponse, AppError> {
        let post = self
            .posts
            .unlike(post_id, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

        debug!(post_id = %post_id, like_count = post.likes.len(), "Like removed");
        self.to_response(post).await
    }

    /// Appends a comment and returns the updated post
    #[instrument(skip(self, text))]
    pub async fn comment(
        &self,
        post_id: &str,
        user_id: &str,
        text: String,
    ) -> Result<PostResponse, AppError> {
        let comment = CommentModel::new(text, user_id.to_string());
        let post = self
            .posts
            .add_comment(post_id, &comment)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

        debug!(post_id = %post_id, comment_id = %comment.id, "Comment added");
        self.to_response(post).await
    }

    /// Removes a comment by id and returns the updated post
    #[instrument(skip(self))]
    pub async fn uncomment(
        &self,
        post_id: &str,
        comment_id: &str,
    ) -> Result<PostResponse, AppError> {
        let post = self
            .posts
            .remove_comment(post_id, comment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

        debug!(post_id = %post_id, comment_id = %comment_id, "Comment removed");
        self.to_response(post).await
    }

    async fn ensure_poster(&self, post_id: &str, auth_user_id: &str) -> Result<(), AppError> {
        let post = self
            .posts
            .get_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

        if post.posted_by != auth_user_id {
            return Err(AppError::Forbidden("User is not authorized".to_string()));
        }
        Ok(())
    }

    async fn to_response(&self, post: PostModel) -> Result<PostResponse, AppError> {
        Ok(self
            .to_responses(vec![post])
            .await?
            .pop()
            .expect("one post in, one response out"))
    }

    /// Resolves poster and commenter names with a single batched lookup
    async fn to_responses(&self, posts: Vec<PostModel>) -> Result<Vec<PostResponse>, AppError> {
        let mut author_ids: HashSet<String> = HashSet::new();
        for post in &posts {
            author_ids.insert(post.posted_by.clone());
            for comment in &post.comments {
                author_ids.insert(comment.posted_by.clone());
            }
        }

        let ids: Vec<String> = author_ids.into_iter().collect();
        let names: HashMap<String, String> = self
            .users
            .get_users_by_ids(&ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u.name))
            .collect();

        let summarize = |id: &str| UserSummary {
            id: id.to_string(),
            name: names.get(id).cloned().unwrap_or_default(),
        };

        Ok(posts
            .into_iter()
            .map(|post| PostResponse {
                posted_by: summarize(&post.posted_by),
                comments: post
                    .comments
                    .iter()
                    .map(|c| CommentResponse {
                        id: c.id.clone(),
                        text: c.text.clone(),
                        created_at: c.created_at,
                        posted_by: summarize(&c.posted_by),
                    })
                    .collect(),
                id: post.id,
                title: post.title,
                body: post.body,
                created_at: post.created_at,
                updated_at: post.updated_at,
                likes: post.likes,
            })
            .collect())
    }
}
