use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::auth::{
    forgot_password, jwt_auth, reset_password, signin, signout, signup, social_login,
};
use crate::post::{
    comment, create_post, delete_post, like, list_posts, post_photo, posts_by_user, single_post,
    uncomment, unlike, update_post,
};
use crate::shared::AppState;
use crate::user::{
    delete_user, find_people, follow, get_user, list_users, unfollow, update_user, user_photo,
};

/// Builds the /api router. Routes that require an authenticated caller carry
/// the jwt_auth layer; everything else is public.
pub fn api_router(state: AppState) -> Router {
    let auth = middleware::from_fn_with_state(state.clone(), jwt_auth);

    let api = Router::new()
        // auth
        .route("/signup", post(signup))
        .route("/signin", post(signin))
        .route("/signout", get(signout))
        .route("/forgot-password", put(forgot_password))
        .route("/reset-password", put(reset_password))
        .route("/social-login", post(social_login))
        // users
        .route("/users", get(list_users))
        .route("/user/photo/:user_id", get(user_photo))
        .route("/user/follow", put(follow).route_layer(auth.clone()))
        .route("/user/unfollow", put(unfollow).route_layer(auth.clone()))
        .route(
            "/user/findpeople/:user_id",
            get(find_people).route_layer(auth.clone()),
        )
        .route(
            "/user/:user_id",
            get(get_user)
                .put(update_user)
                .delete(delete_user)
                .route_layer(auth.clone()),
        )
        // posts
        .route("/posts", get(list_posts))
        .route("/post/photo/:post_id", get(post_photo))
        .route(
            "/post/new/:user_id",
            post(create_post).route_layer(auth.clone()),
        )
        .route(
            "/posts/by/:user_id",
            get(posts_by_user).route_layer(auth.clone()),
        )
        .route("/post/like", put(like).route_layer(auth.clone()))
        .route("/post/unlike", put(unlike).route_layer(auth.clone()))
        .route("/post/comment", put(comment).route_layer(auth.clone()))
        .route("/post/uncomment", put(uncomment).route_layer(auth.clone()))
        .route(
            "/post/:post_id",
            get(single_post).merge(put(update_post).delete(delete_post).route_layer(auth)),
        );

    Router::new().nest("/api", api).with_state(state)
}
