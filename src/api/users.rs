//! User API endpoints
//!
//! - POST /api/setup - Register the blog's author (one-time)
//! - GET /api/users/{id} - Read a user profile
//! - PUT /api/users/{id} - Update a profile, optionally rotating the
//!   password when both password fields are present and match

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::posts::acting_user;
use crate::api::{ApiError, AppState};
use crate::models::{User, UserProfile};

/// Request body for first-user registration
#[derive(Debug, Deserialize)]
pub struct SetupPayload {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Request body for a profile update.
///
/// `password`/`password_confirm` are optional; the password is rotated
/// only when both are present and equal, otherwise the pair is ignored
/// and the profile update stands on its own.
#[derive(Debug, Deserialize)]
pub struct UserPayload {
    #[serde(flatten)]
    pub profile: UserProfile,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub password_confirm: Option<String>,
}

/// Response for a single user; the password hash never leaves the
/// server.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub uuid: String,
    pub name: String,
    pub slug: String,
    pub email: String,
    pub image: String,
    pub cover: String,
    pub bio: String,
    pub website: String,
    pub location: String,
    pub created_at: String,
    pub updated_at: String,
    pub last_login: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            uuid: user.uuid,
            name: user.name,
            slug: user.slug,
            email: user.email,
            image: user.image,
            cover: user.cover,
            bio: user.bio,
            website: user.website,
            location: user.location,
            created_at: user.created_at.to_rfc3339(),
            updated_at: user.updated_at.to_rfc3339(),
            last_login: user.last_login.map(|dt| dt.to_rfc3339()),
        }
    }
}

/// POST /api/setup
pub async fn setup_handler(
    State(state): State<AppState>,
    Json(payload): Json<SetupPayload>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    if payload.name.trim().is_empty()
        || payload.email.trim().is_empty()
        || payload.password.is_empty()
    {
        return Err(ApiError::validation_error(
            "name, email and password are required",
        ));
    }

    if state
        .users
        .is_set_up()
        .await
        .map_err(ApiError::from_service)?
    {
        return Err(ApiError::conflict("blog is already set up"));
    }

    let id = state
        .users
        .register(&payload.name, &payload.email, &payload.password, Utc::now())
        .await
        .map_err(ApiError::from_service)?;

    let user = state
        .users
        .get(id)
        .await
        .map_err(ApiError::from_service)?
        .ok_or_else(|| ApiError::internal_error("user vanished after insert"))?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// GET /api/users/{id}
pub async fn get_user_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .users
        .get(id)
        .await
        .map_err(ApiError::from_service)?
        .ok_or_else(|| ApiError::not_found(format!("user {} not found", id)))?;

    Ok(Json(UserResponse::from(user)))
}

/// PUT /api/users/{id}
pub async fn update_user_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UserPayload>,
) -> Result<Json<UserResponse>, ApiError> {
    if payload.profile.name.trim().is_empty() || payload.profile.slug.trim().is_empty() {
        return Err(ApiError::validation_error("name and slug are required"));
    }

    state
        .users
        .get(id)
        .await
        .map_err(ApiError::from_service)?
        .ok_or_else(|| ApiError::not_found(format!("user {} not found", id)))?;

    let actor = acting_user(&state).await?;
    let now = Utc::now();

    state
        .users
        .update_profile(id, &payload.profile, now, actor)
        .await
        .map_err(ApiError::from_service)?;

    // Password rotation rides along only when both fields agree; a
    // missing or mismatched pair is skipped, never an error.
    if let (Some(password), Some(confirm)) = (&payload.password, &payload.password_confirm) {
        if !password.is_empty() && password == confirm {
            state
                .users
                .change_password(id, password, now, actor)
                .await
                .map_err(ApiError::from_service)?;
        }
    }

    let user = state
        .users
        .get(id)
        .await
        .map_err(ApiError::from_service)?
        .ok_or_else(|| ApiError::not_found(format!("user {} not found", id)))?;

    Ok(Json(UserResponse::from(user)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{register_admin, test_server, test_server_with_state};
    use chrono::Utc;
    use serde_json::json;

    fn profile(name: &str, slug: &str) -> serde_json::Value {
        json!({
            "name": name,
            "slug": slug,
            "email": "ada@example.com",
            "bio": "Analyst",
        })
    }

    #[tokio::test]
    async fn test_setup_then_refused() {
        let server = test_server().await;

        let id = register_admin(&server).await;
        assert_eq!(id, 1);

        let response = server
            .post("/api/setup")
            .json(&json!({
                "name": "Eve",
                "email": "eve@example.com",
                "password": "pw"
            }))
            .await;
        response.assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_setup_validation() {
        let server = test_server().await;

        let response = server
            .post("/api/setup")
            .json(&json!({"name": "", "email": "a@b.c", "password": "pw"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_user_hides_password() {
        let server = test_server().await;
        let id = register_admin(&server).await;

        let response = server.get(&format!("/api/users/{}", id)).await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["slug"], "ada-lovelace");
        assert!(body.get("password").is_none());

        let response = server.get("/api/users/999").await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_profile_without_password() {
        let server = test_server().await;
        let id = register_admin(&server).await;

        let response = server
            .put(&format!("/api/users/{}", id))
            .json(&profile("Ada King", "ada-king"))
            .await;
        response.assert_status_ok();
        let user: UserResponse = response.json();
        assert_eq!(user.name, "Ada King");
        assert_eq!(user.slug, "ada-king");
        assert_eq!(user.bio, "Analyst");
    }

    #[tokio::test]
    async fn test_update_with_matching_passwords_rotates() {
        let (server, state) = test_server_with_state().await;
        let id = register_admin(&server).await;

        let mut body = profile("Ada", "ada");
        body["password"] = json!("new secret");
        body["password_confirm"] = json!("new secret");
        let response = server.put(&format!("/api/users/{}", id)).json(&body).await;
        response.assert_status_ok();

        assert!(state
            .users
            .verify_login("ada", "new secret", Utc::now())
            .await
            .expect("login")
            .is_some());
        assert!(state
            .users
            .verify_login("ada", "difference engine", Utc::now())
            .await
            .expect("login")
            .is_none());
    }

    #[tokio::test]
    async fn test_mismatched_passwords_skip_rotation() {
        let (server, state) = test_server_with_state().await;
        let id = register_admin(&server).await;

        let mut body = profile("Ada King", "ada-king");
        body["password"] = json!("one");
        body["password_confirm"] = json!("two");
        let response = server.put(&format!("/api/users/{}", id)).json(&body).await;
        response.assert_status_ok();

        // The profile edit stands, the password does not move.
        let user: UserResponse = response.json();
        assert_eq!(user.name, "Ada King");
        assert!(state
            .users
            .verify_login("ada-king", "difference engine", Utc::now())
            .await
            .expect("login")
            .is_some());
        assert!(state
            .users
            .verify_login("ada-king", "one", Utc::now())
            .await
            .expect("login")
            .is_none());
    }
}
