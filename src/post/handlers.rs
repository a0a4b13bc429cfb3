use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::{IntoResponse, Response},
    Extension, Json,
};
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use super::{
    models::PostUpdate,
    service::PostService,
    types::{CommentRequest, LikeRequest, PostForm, PostResponse, UncommentRequest},
};
use crate::auth::SessionClaims;
use crate::shared::{validation_error, AppError, AppState, MessageResponse};
use crate::user::models::Photo;

fn service(state: &AppState) -> PostService {
    PostService::new(
        Arc::clone(&state.post_repository),
        Arc::clone(&state.user_repository),
    )
}

/// HTTP handler for listing all posts
///
/// GET /api/posts
#[instrument(name = "list_posts", skip(state))]
pub async fn list_posts(State(state): State<AppState>) -> Result<Json<Vec<PostResponse>>, AppError> {
    let posts = service(&state).list_posts().await?;

    Ok(Json(posts))
}

/// HTTP handler for creating a post
///
/// POST /api/post/new/:user_id (multipart: title, body, photo)
#[instrument(name = "create_post", skip(state, claims, multipart))]
pub async fn create_post(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path(user_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<PostResponse>, AppError> {
    if claims.sub != user_id {
        return Err(AppError::Forbidden(
            "User is not authorized to perform this action".to_string(),
        ));
    }

    let (form, photo) = parse_post_form(&mut multipart).await?;
    let title = form
        .title
        .clone()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Validation("Write a title".to_string()))?;
    let body = form
        .body
        .clone()
        .filter(|b| !b.is_empty())
        .ok_or_else(|| AppError::Validation("Write a body".to_string()))?;
    form.validate().map_err(validation_error)?;

    let post = service(&state)
        .create_post(&user_id, title, body, photo)
        .await?;

    info!(post_id = %post.id, "Post created successfully");
    Ok(Json(post))
}

/// HTTP handler for listing posts by one user
///
/// GET /api/posts/by/:user_id
#[instrument(name = "posts_by_user", skip(state, _claims))]
pub async fn posts_by_user(
    State(state): State<AppState>,
    Extension(_claims): Extension<SessionClaims>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<PostResponse>>, AppError> {
    let posts = service(&state).posts_by_user(&user_id).await?;

    Ok(Json(posts))
}

/// HTTP handler for fetching a single post
///
/// GET /api/post/:post_id
#[instrument(name = "single_post", skip(state))]
pub async fn single_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Json<PostResponse>, AppError> {
    let post = service(&state).single_post(&post_id).await?;

    Ok(Json(post))
}

/// HTTP handler for updating a post the caller authored
///
/// PUT /api/post/:post_id (multipart: title, body, photo)
#[instrument(name = "update_post", skip(state, claims, multipart))]
pub async fn update_post(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path(post_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<PostResponse>, AppError> {
    let (form, photo) = parse_post_form(&mut multipart).await?;
    form.validate().map_err(validation_error)?;

    let update = PostUpdate {
        title: form.title,
        body: form.body,
        photo,
    };
    let post = service(&state)
        .update_post(&post_id, &claims.sub, update)
        .await?;

    info!(post_id = %post_id, "Post updated successfully");
    Ok(Json(post))
}

/// HTTP handler for deleting a post the caller authored
///
/// DELETE /api/post/:post_id
#[instrument(name = "delete_post", skip(state, claims))]
pub async fn delete_post(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path(post_id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    service(&state).delete_post(&post_id, &claims.sub).await?;

    Ok(Json(MessageResponse::new("Post deleted successfully")))
}

/// HTTP handler serving a post's photo bytes
///
/// GET /api/post/photo/:post_id
#[instrument(name = "post_photo", skip(state))]
pub async fn post_photo(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Response, AppError> {
    let photo = service(&state).photo(&post_id).await?;

    Ok(([(header::CONTENT_TYPE, photo.content_type)], photo.data).into_response())
}

/// HTTP handler for liking a post
///
/// PUT /api/post/like
pub async fn like(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Json(request): Json<LikeRequest>,
) -> Result<Json<PostResponse>, AppError> {
    let post = service(&state).like(&request.post_id, &claims.sub).await?;

    Ok(Json(post))
}

/// HTTP handler for unliking a post
///
/// PUT /api/post/unlike
pub async fn unlike(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Json(request): Json<LikeRequest>,
) -> Result<Json<PostResponse>, AppError> {
    let post = service(&state).unlike(&request.post_id, &claims.sub).await?;

    Ok(Json(post))
}

/// HTTP handler for commenting on a post
///
/// PUT /api/post/comment
pub async fn comment(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Json(request): Json<CommentRequest>,
) -> Result<Json<PostResponse>, AppError> {
    let post = service(&state)
        .comment(&request.post_id, &claims.sub, request.text)
        .await?;

    Ok(Json(post))
}

/// HTTP handler for removing a comment
///
/// PUT /api/post/uncomment
pub async fn uncomment(
    State(state): State<AppState>,
    Extension(_claims): Extension<SessionClaims>,
    Json(request): Json<UncommentRequest>,
) -> Result<Json<PostResponse>, AppError> {
    let post = service(&state)
        .uncomment(&request.post_id, &request.comment_id)
        .await?;

    Ok(Json(post))
}

/// Reads the allow-listed post fields out of a multipart form.
/// Unknown fields are ignored rather than merged into the record.
async fn parse_post_form(
    multipart: &mut Multipart,
) -> Result<(PostForm, Option<Photo>), AppError> {
    let mut form = PostForm::default();
    let mut photo = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::Validation("Image could not be uploaded".to_string()))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "title" => {
                form.title = Some(field.text().await.map_err(|_| {
                    AppError::Validation("Image could not be uploaded".to_string())
                })?);
            }
            "body" => {
                form.body = Some(field.text().await.map_err(|_| {
                    AppError::Validation("Image could not be uploaded".to_string())
                })?);
            }
            "photo" => {
                let content_type = field
                    .content_type()
                    .map(|mime| mime.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|_| AppError::Validation("Image could not be uploaded".to_string()))?
                    .to_vec();
                photo = Some(Photo { data, content_type });
            }
            _ => {}
        }
    }

    Ok((form, photo))
}
