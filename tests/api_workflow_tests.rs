// End-to-end workflows through the full /api router:
// signup -> signin -> follow -> post -> like -> comment, plus the password
// reset flow and the authorization failure paths.

mod utils;

use axum::http::StatusCode;
use serde_json::json;

use gramlet::user::repository::UserRepository;
use utils::*;

#[tokio::test]
async fn test_signup_signin_and_profile_workflow() {
    let app = test_app();

    let (alice_id, alice_token) =
        signup_and_signin(&app, "alice", "alice@example.com", "hunter22").await;

    // Public user listing shows the new account
    let response = send(
        &app.router,
        axum::http::Request::builder()
            .uri("/api/users")
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let users: serde_json::Value = body_json(response).await;
    assert_eq!(users.as_array().unwrap().len(), 1);
    assert_eq!(users[0]["name"], "alice");
    // Credentials never leave the server
    assert!(users[0].get("hashed_password").is_none());
    assert!(users[0].get("salt").is_none());

    // Fetching a profile requires a token
    let response = send(
        &app.router,
        axum::http::Request::builder()
            .uri(format!("/api/user/{}", alice_id))
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(
        &app.router,
        authed_request("GET", &format!("/api/user/{}", alice_id), &alice_token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let profile: serde_json::Value = body_json(response).await;
    assert_eq!(profile["email"], "alice@example.com");
    assert_eq!(profile["role"], "subscriber");
}

#[tokio::test]
async fn test_follow_and_unfollow_workflow() {
    let app = test_app();

    let (alice_id, alice_token) =
        signup_and_signin(&app, "alice", "alice@example.com", "hunter22").await;
    let (bob_id, _bob_token) = signup_and_signin(&app, "bob", "bob@example.com", "hunter22").await;

    // Alice follows Bob
    let response = send(
        &app.router,
        authed_json_request(
            "PUT",
            "/api/user/follow",
            &alice_token,
            json!({"follow_id": bob_id}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let bob_profile: serde_json::Value = body_json(response).await;
    assert_eq!(bob_profile["followers"][0]["name"], "alice");

    // Suggestions no longer include Bob (or Alice herself)
    let response = send(
        &app.router,
        authed_request(
            "GET",
            &format!("/api/user/findpeople/{}", alice_id),
            &alice_token,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let people: serde_json::Value = body_json(response).await;
    assert_eq!(people.as_array().unwrap().len(), 0);

    // Unfollow restores the suggestion
    let response = send(
        &app.router,
        authed_json_request(
            "PUT",
            "/api/user/unfollow",
            &alice_token,
            json!({"unfollow_id": bob_id}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &app.router,
        authed_request(
            "GET",
            &format!("/api/user/findpeople/{}", alice_id),
            &alice_token,
        ),
    )
    .await;
    let people: serde_json::Value = body_json(response).await;
    assert_eq!(people[0]["name"], "bob");
}

#[tokio::test]
async fn test_post_like_comment_workflow() {
    let app = test_app();

    let (alice_id, alice_token) =
        signup_and_signin(&app, "alice", "alice@example.com", "hunter22").await;
    let (_bob_id, bob_token) = signup_and_signin(&app, "bob", "bob@example.com", "hunter22").await;

    // Alice creates a post with a photo via multipart upload
    let body = multipart_body(
        &[("title", "First post"), ("body", "Hello from the tests")],
        Some(("image/jpeg", &[0xff, 0xd8, 0xff, 0xe0])),
    );
    let response = send(
        &app.router,
        multipart_request(
            "POST",
            &format!("/api/post/new/{}", alice_id),
            &alice_token,
            body,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let post: serde_json::Value = body_json(response).await;
    let post_id = post["id"].as_str().unwrap().to_string();
    assert_eq!(post["posted_by"]["name"], "alice");

    // The uploaded bytes come back under the stored content type
    let response = send(
        &app.router,
        axum::http::Request::builder()
            .uri(format!("/api/post/photo/{}", post_id))
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "image/jpeg"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(bytes.as_ref(), &[0xff, 0xd8, 0xff, 0xe0]);

    // Bob likes and comments
    let response = send(
        &app.router,
        authed_json_request(
            "PUT",
            "/api/post/like",
            &bob_token,
            json!({"post_id": post_id}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let liked: serde_json::Value = body_json(response).await;
    assert_eq!(liked["likes"].as_array().unwrap().len(), 1);

    let response = send(
        &app.router,
        authed_json_request(
            "PUT",
            "/api/post/comment",
            &bob_token,
            json!({"post_id": post_id, "text": "nice post"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let commented: serde_json::Value = body_json(response).await;
    assert_eq!(commented["comments"][0]["text"], "nice post");
    assert_eq!(commented["comments"][0]["posted_by"]["name"], "bob");
    let comment_id = commented["comments"][0]["id"].as_str().unwrap().to_string();

    // The feed shows the post, newest first, fully populated
    let response = send(
        &app.router,
        axum::http::Request::builder()
            .uri("/api/posts")
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let feed: serde_json::Value = body_json(response).await;
    assert_eq!(feed.as_array().unwrap().len(), 1);
    assert_eq!(feed[0]["comments"][0]["posted_by"]["name"], "bob");

    // Uncomment and unlike return the post to its original state
    let response = send(
        &app.router,
        authed_json_request(
            "PUT",
            "/api/post/uncomment",
            &bob_token,
            json!({"post_id": post_id, "comment_id": comment_id}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let uncommented: serde_json::Value = body_json(response).await;
    assert_eq!(uncommented["comments"].as_array().unwrap().len(), 0);

    let response = send(
        &app.router,
        authed_json_request(
            "PUT",
            "/api/post/unlike",
            &bob_token,
            json!({"post_id": post_id}),
        ),
    )
    .await;
    let unliked: serde_json::Value = body_json(response).await;
    assert_eq!(unliked["likes"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_only_the_poster_can_edit_or_delete() {
    let app = test_app();

    let (alice_id, alice_token) =
        signup_and_signin(&app, "alice", "alice@example.com", "hunter22").await;
    let (_bob_id, bob_token) = signup_and_signin(&app, "bob", "bob@example.com", "hunter22").await;

    let body = multipart_body(&[("title", "First post"), ("body", "Hello there")], None);
    let response = send(
        &app.router,
        multipart_request(
            "POST",
            &format!("/api/post/new/{}", alice_id),
            &alice_token,
            body,
        ),
    )
    .await;
    let post: serde_json::Value = body_json(response).await;
    let post_id = post["id"].as_str().unwrap();

    // Bob cannot edit Alice's post
    let body = multipart_body(&[("title", "Hijacked title")], None);
    let response = send(
        &app.router,
        multipart_request("PUT", &format!("/api/post/{}", post_id), &bob_token, body),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Bob cannot delete it either
    let response = send(
        &app.router,
        authed_request("DELETE", &format!("/api/post/{}", post_id), &bob_token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Alice can
    let body = multipart_body(&[("title", "Edited title")], None);
    let response = send(
        &app.router,
        multipart_request("PUT", &format!("/api/post/{}", post_id), &alice_token, body),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let edited: serde_json::Value = body_json(response).await;
    assert_eq!(edited["title"], "Edited title");
    assert_eq!(edited["body"], "Hello there");

    let response = send(
        &app.router,
        authed_request("DELETE", &format!("/api/post/{}", post_id), &alice_token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.post_repository.post_count(), 0);
}

#[tokio::test]
async fn test_password_reset_workflow() {
    let app = test_app();

    signup_and_signin(&app, "alice", "alice@example.com", "hunter22").await;

    // Request a reset; the token lands on the stored account
    let response = send(
        &app.router,
        json_request(
            "PUT",
            "/api/forgot-password",
            json!({"email": "alice@example.com"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let token = app
        .user_repository
        .find_by_email("alice@example.com")
        .await
        .unwrap()
        .unwrap()
        .reset_password_token
        .expect("reset token should be pending");

    // Redeem it
    let response = send(
        &app.router,
        json_request(
            "PUT",
            "/api/reset-password",
            json!({"reset_password_token": token, "new_password": "newpass1"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Old password no longer works, new one does
    let response = send(
        &app.router,
        json_request(
            "POST",
            "/api/signin",
            json!({"email": "alice@example.com", "password": "hunter22"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(
        &app.router,
        json_request(
            "POST",
            "/api/signin",
            json!({"email": "alice@example.com", "password": "newpass1"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // The token was consumed on first use
    let token = app
        .user_repository
        .find_by_email("alice@example.com")
        .await
        .unwrap()
        .unwrap()
        .reset_password_token;
    assert!(token.is_none());
}

#[tokio::test]
async fn test_social_login_workflow() {
    let app = test_app();

    // First contact creates the account
    let response = send(
        &app.router,
        json_request(
            "POST",
            "/api/social-login",
            json!({"name": "alice", "email": "alice@example.com"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let first: serde_json::Value = body_json(response).await;
    let first_id = first["user"]["id"].as_str().unwrap().to_string();
    assert!(!first["token"].as_str().unwrap().is_empty());

    // Second contact reuses it
    let response = send(
        &app.router,
        json_request(
            "POST",
            "/api/social-login",
            json!({"name": "alice-updated", "email": "alice@example.com"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let second: serde_json::Value = body_json(response).await;
    assert_eq!(second["user"]["id"].as_str().unwrap(), first_id);
    assert_eq!(second["user"]["name"], "alice-updated");
}

#[tokio::test]
async fn test_profile_update_is_owner_only_and_allow_listed() {
    let app = test_app();

    let (alice_id, alice_token) =
        signup_and_signin(&app, "alice", "alice@example.com", "hunter22").await;
    let (_bob_id, bob_token) = signup_and_signin(&app, "bob", "bob@example.com", "hunter22").await;

    // Bob cannot update Alice's profile
    let body = multipart_body(&[("name", "not-alice")], None);
    let response = send(
        &app.router,
        multipart_request("PUT", &format!("/api/user/{}", alice_id), &bob_token, body),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Alice updates her own profile with a photo
    let body = multipart_body(
        &[("about", "rustacean")],
        Some(("image/png", &[0x89, 0x50, 0x4e, 0x47])),
    );
    let response = send(
        &app.router,
        multipart_request(
            "PUT",
            &format!("/api/user/{}", alice_id),
            &alice_token,
            body,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let profile: serde_json::Value = body_json(response).await;
    assert_eq!(profile["about"], "rustacean");
    assert_eq!(profile["name"], "alice");

    // Stored credentials were untouched by the update
    let response = send(
        &app.router,
        json_request(
            "POST",
            "/api/signin",
            json!({"email": "alice@example.com", "password": "hunter22"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Photo is served back publicly
    let response = send(
        &app.router,
        axum::http::Request::builder()
            .uri(format!("/api/user/photo/{}", alice_id))
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "image/png"
    );
}

#[tokio::test]
async fn test_tampered_token_is_rejected_everywhere() {
    let app = test_app();

    let (alice_id, alice_token) =
        signup_and_signin(&app, "alice", "alice@example.com", "hunter22").await;

    let mut tampered = alice_token.clone();
    tampered.pop();
    tampered.push('x');

    let response = send(
        &app.router,
        authed_request("GET", &format!("/api/user/{}", alice_id), &tampered),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(
        &app.router,
        authed_json_request(
            "PUT",
            "/api/user/follow",
            &tampered,
            json!({"follow_id": alice_id}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
