use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::{IntoResponse, Response},
    Extension, Json,
};
use std::sync::Arc;
use tracing::{info, instrument};

use super::{
    models::{Photo, UserUpdate},
    service::UserService,
    types::{FollowRequest, UnfollowRequest, UserListItem, UserResponse, UserSummary},
};
use crate::auth::SessionClaims;
use crate::shared::{AppError, AppState, MessageResponse};

fn ensure_owner(claims: &SessionClaims, user_id: &str) -> Result<(), AppError> {
    if claims.sub != user_id {
        return Err(AppError::Forbidden(
            "User is not authorized to perform this action".to_string(),
        ));
    }
    Ok(())
}

/// HTTP handler for listing all users
///
/// GET /api/users
#[instrument(name = "list_users", skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserListItem>>, AppError> {
    let service = UserService::new(Arc::clone(&state.user_repository));
    let users = service.list_users().await?;

    Ok(Json(users))
}

/// HTTP handler for fetching a single user profile
///
/// GET /api/user/:user_id
#[instrument(name = "get_user", skip(state, _claims))]
pub async fn get_user(
    State(state): State<AppState>,
    Extension(_claims): Extension<SessionClaims>,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    let service = UserService::new(Arc::clone(&state.user_repository));
    let user = service.get_user(&user_id).await?;

    Ok(Json(user))
}

/// HTTP handler for updating the caller's own profile
///
/// PUT /api/user/:user_id (multipart: name, about, photo)
#[instrument(name = "update_user", skip(state, claims, multipart))]
pub async fn update_user(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path(user_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<UserResponse>, AppError> {
    ensure_owner(&claims, &user_id)?;

    let update = parse_profile_form(&mut multipart).await?;

    let service = UserService::new(Arc::clone(&state.user_repository));
    let user = service.update_user(&user_id, update).await?;

    info!(user_id = %user_id, "User profile updated successfully");
    Ok(Json(user))
}

/// HTTP handler for deleting the caller's own account
///
/// DELETE /api/user/:user_id
#[instrument(name = "delete_user", skip(state, claims))]
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path(user_id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    ensure_owner(&claims, &user_id)?;

    let service = UserService::new(Arc::clone(&state.user_repository));
    service.delete_user(&user_id).await?;

    Ok(Json(MessageResponse::new("User deleted successfully")))
}

/// HTTP handler serving a user's profile photo bytes
///
/// GET /api/user/photo/:user_id
#[instrument(name = "user_photo", skip(state))]
pub async fn user_photo(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Response, AppError> {
    let service = UserService::new(Arc::clone(&state.user_repository));
    let photo = service.photo(&user_id).await?;

    Ok(([(header::CONTENT_TYPE, photo.content_type)], photo.data).into_response())
}

/// HTTP handler for following another user
///
/// PUT /api/user/follow
pub async fn follow(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Json(request): Json<FollowRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let service = UserService::new(Arc::clone(&state.user_repository));
    let followed = service.follow(&claims.sub, &request.follow_id).await?;

    Ok(Json(followed))
}

/// HTTP handler for unfollowing a user
///
/// PUT /api/user/unfollow
pub async fn unfollow(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Json(request): Json<UnfollowRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let service = UserService::new(Arc::clone(&state.user_repository));
    let unfollowed = service.unfollow(&claims.sub, &request.unfollow_id).await?;

    Ok(Json(unfollowed))
}

/// HTTP handler suggesting users to follow
///
/// GET /api/user/findpeople/:user_id
#[instrument(name = "find_people", skip(state, _claims))]
pub async fn find_people(
    State(state): State<AppState>,
    Extension(_claims): Extension<SessionClaims>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<UserSummary>>, AppError> {
    let service = UserService::new(Arc::clone(&state.user_repository));
    let people = service.find_people(&user_id).await?;

    Ok(Json(people))
}

/// Reads the allow-listed profile fields out of a multipart form.
/// Unknown fields are ignored rather than merged into the record.
async fn parse_profile_form(multipart: &mut Multipart) -> Result<UserUpdate, AppError> {
    let mut update = UserUpdate::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::Validation("Photo could not be uploaded".to_string()))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "name" => {
                update.name = Some(field.text().await.map_err(|_| {
                    AppError::Validation("Photo could not be uploaded".to_string())
                })?);
            }
            "about" => {
                update.about = Some(field.text().await.map_err(|_| {
                    AppError::Validation("Photo could not be uploaded".to_string())
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
                    .map_err(|_| AppError::Validation("Photo could not be uploaded".to_string()))?
                    .to_vec();
                update.photo = Some(Photo { data, content_type });
            }
            _ => {}
        }
    }

    Ok(update)
}
