//! API layer - HTTP handlers and routing
//!
//! The admin JSON surface over the persistence layer:
//! - Setup (first-user registration)
//! - Post lifecycle endpoints
//! - Blog settings endpoints
//! - User profile endpoints
//!
//! Handlers are the system's clock: they call `Utc::now()` once per
//! request and pass the timestamp down, so nothing below this layer
//! generates time. Session auth stays external to this build; mutating
//! handlers act as the registered administrator.

pub mod blog;
pub mod posts;
pub mod users;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db::{DynDatabasePool, StoreError};
use crate::services::{PostService, SettingsService, UserService};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub posts: Arc<PostService>,
    pub users: Arc<UserService>,
    pub settings: Arc<SettingsService>,
}

/// Error response envelope for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    /// Map a service-layer error onto the envelope, keeping a not-found
    /// from the store visible as a 404 instead of a blanket 500.
    pub fn from_service(err: anyhow::Error) -> Self {
        if let Some(StoreError::NotFound { entity, id }) = err.downcast_ref::<StoreError>() {
            return Self::not_found(format!("{} {} not found", entity, id));
        }
        tracing::warn!("request failed: {:#}", err);
        Self::internal_error(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

/// Build the admin API router
pub fn build_api_router() -> Router<AppState> {
    Router::new()
        .route("/setup", post(users::setup_handler))
        .route("/posts", get(posts::list_posts_handler).post(posts::create_post_handler))
        .route(
            "/posts/{id}",
            get(posts::get_post_handler)
                .put(posts::update_post_handler)
                .delete(posts::delete_post_handler),
        )
        .route("/blog", get(blog::get_blog_handler).put(blog::update_blog_handler))
        .route("/blog/theme", put(blog::update_theme_handler))
        .route(
            "/users/{id}",
            get(users::get_user_handler).put(users::update_user_handler),
        )
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(
            cors_origin
                .parse::<HeaderValue>()
                .unwrap_or_else(|_| HeaderValue::from_static("http://localhost:3000")),
        )
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .nest("/api", build_api_router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::db::repositories::{
        SqlxPostRepository, SqlxSettingsRepository, SqlxTagRepository, SqlxUserRepository,
    };
    use crate::db::{create_test_pool, schema};
    use chrono::Utc;

    /// In-memory state with schema, seeds and settings defaults applied.
    pub async fn test_state() -> AppState {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        schema::ensure_schema(&pool)
            .await
            .expect("Failed to ensure schema");

        let posts = Arc::new(PostService::new(
            SqlxPostRepository::boxed(pool.clone()),
            SqlxTagRepository::boxed(pool.clone()),
        ));
        let users = Arc::new(UserService::new(SqlxUserRepository::boxed(pool.clone())));
        let settings = Arc::new(SettingsService::new(
            SqlxSettingsRepository::boxed(pool.clone()),
            "http://blog.example",
        ));
        settings
            .ensure_defaults(Utc::now(), 1)
            .await
            .expect("Failed to seed settings");

        AppState {
            pool,
            posts,
            users,
            settings,
        }
    }

    /// A test server over the full router.
    pub async fn test_server() -> axum_test::TestServer {
        let (server, _) = test_server_with_state().await;
        server
    }

    /// A test server plus the state behind it, for tests that need to
    /// inspect the services directly.
    pub async fn test_server_with_state() -> (axum_test::TestServer, AppState) {
        let state = test_state().await;
        let server = axum_test::TestServer::new(build_router(state.clone(), "http://localhost:3000"))
            .expect("Failed to start test server");
        (server, state)
    }

    /// Register the administrator and return their id.
    pub async fn register_admin(server: &axum_test::TestServer) -> i64 {
        let response = server
            .post("/api/setup")
            .json(&serde_json::json!({
                "name": "Ada Lovelace",
                "email": "ada@example.com",
                "password": "difference engine"
            }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json::<serde_json::Value>()["id"]
            .as_i64()
            .expect("user id")
    }
}
