mod auth;
mod email;
mod post;
mod routes;
mod shared;
mod user;

use auth::token::TokenConfig;
use email::{LogMailer, Mailer, SmtpMailer};
use post::repository::{InMemoryPostRepository, PostRepository, PostgresPostRepository};
use routes::api_router;
use shared::AppState;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use user::repository::{InMemoryUserRepository, PostgresUserRepository, UserRepository};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gramlet=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting gramlet API server");

    // Create shared application state with dependency injection.
    // With DATABASE_URL set the repositories run on PostgreSQL; otherwise
    // everything lives in memory, which is enough for local development.
    let (user_repository, post_repository): (
        Arc<dyn UserRepository + Send + Sync>,
        Arc<dyn PostRepository + Send + Sync>,
    ) = match std::env::var("DATABASE_URL") {
        Ok(database_url) => {
            let pool = sqlx::PgPool::connect(&database_url)
                .await
                .expect("Failed to connect to database");
            info!("Connected to PostgreSQL");
            (
                Arc::new(PostgresUserRepository::new(pool.clone())),
                Arc::new(PostgresPostRepository::new(pool)),
            )
        }
        Err(_) => {
            info!("DATABASE_URL not set, using in-memory repositories");
            (
                Arc::new(InMemoryUserRepository::new()),
                Arc::new(InMemoryPostRepository::new()),
            )
        }
    };

    // With SMTP_HOST set outbound email goes over SMTP; otherwise messages
    // are logged, which is enough for local development.
    let mailer: Arc<dyn Mailer> = match std::env::var("SMTP_HOST") {
        Ok(_) => Arc::new(SmtpMailer::from_env().expect("Failed to configure SMTP mailer")),
        Err(_) => {
            info!("SMTP_HOST not set, logging outbound email instead");
            Arc::new(LogMailer)
        }
    };

    let client_url =
        std::env::var("CLIENT_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

    let app_state = AppState::new(
        user_repository,
        post_repository,
        TokenConfig::from_env(),
        mailer,
        client_url,
    );

    // Build the application with routes, request tracing and permissive CORS
    // so a frontend on another port can talk to the API
    let app = api_router(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .expect("Failed to bind port");
    info!("Server running on http://localhost:{}", port);
    axum::serve(listener, app).await.expect("Server error");
}
