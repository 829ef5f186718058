//! Post API endpoints
//!
//! Handles HTTP requests for the post lifecycle:
//! - GET /api/posts - List posts with pagination
//! - GET /api/posts/{id} - Get post by id
//! - POST /api/posts - Create new post
//! - PUT /api/posts/{id} - Update post
//! - DELETE /api/posts/{id} - Delete post
//!
//! Payloads carry both the markdown source and the already-rendered
//! HTML; rendering and slug generation happen in the admin client, not
//! here.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::{ApiError, AppState};
use crate::models::{Post, PostInput, Tag};
use crate::services::{clamp_page, parse_tag_list};

/// Query parameters for listing posts
#[derive(Debug, Deserialize)]
pub struct ListPostsQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
}

fn default_page() -> i64 {
    1
}

fn default_per_page() -> i64 {
    15
}

/// Request body for creating or updating a post
#[derive(Debug, Deserialize)]
pub struct PostPayload {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub markdown: String,
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub page: bool,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub meta_description: String,
    #[serde(default)]
    pub image: String,
    /// Comma-separated tag names
    #[serde(default)]
    pub tags: String,
}

impl PostPayload {
    fn into_input(self) -> PostInput {
        PostInput {
            title: self.title,
            slug: self.slug,
            markdown: self.markdown,
            html: self.html,
            featured: self.featured,
            page: self.page,
            published: self.published,
            meta_description: self.meta_description,
            image: self.image,
        }
    }
}

/// Response for a single post
#[derive(Debug, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: i64,
    pub uuid: String,
    pub title: String,
    pub slug: String,
    pub markdown: String,
    pub html: String,
    pub featured: bool,
    pub page: bool,
    pub status: String,
    pub meta_description: String,
    pub image: String,
    pub author_id: i64,
    pub created_at: String,
    pub updated_at: String,
    pub published_at: Option<String>,
    pub published_by: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<TagInfo>>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TagInfo {
    pub id: i64,
    pub slug: String,
    pub name: String,
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            uuid: post.uuid,
            title: post.title,
            slug: post.slug,
            markdown: post.markdown,
            html: post.html,
            featured: post.featured,
            page: post.page,
            status: post.status.to_string(),
            meta_description: post.meta_description,
            image: post.image,
            author_id: post.author_id,
            created_at: post.created_at.to_rfc3339(),
            updated_at: post.updated_at.to_rfc3339(),
            published_at: post.published_at.map(|dt| dt.to_rfc3339()),
            published_by: post.published_by,
            tags: None,
        }
    }
}

impl PostResponse {
    fn with_tags(mut self, tags: Vec<Tag>) -> Self {
        self.tags = Some(
            tags.into_iter()
                .map(|t| TagInfo {
                    id: t.id,
                    slug: t.slug,
                    name: t.name,
                })
                .collect(),
        );
        self
    }
}

/// Response for the post list
#[derive(Debug, Serialize, Deserialize)]
pub struct PostListResponse {
    pub posts: Vec<PostResponse>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

/// GET /api/posts
pub async fn list_posts_handler(
    State(state): State<AppState>,
    Query(query): Query<ListPostsQuery>,
) -> Result<Json<PostListResponse>, ApiError> {
    let (posts, total) = state
        .posts
        .list(query.page, query.per_page)
        .await
        .map_err(ApiError::from_service)?;

    // Echo the values the listing actually served, not the raw query.
    let (page, per_page) = clamp_page(query.page, query.per_page);
    Ok(Json(PostListResponse {
        posts: posts.into_iter().map(PostResponse::from).collect(),
        total,
        page,
        per_page,
    }))
}

/// GET /api/posts/{id}
pub async fn get_post_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PostResponse>, ApiError> {
    let (post, tags) = state
        .posts
        .get(id)
        .await
        .map_err(ApiError::from_service)?
        .ok_or_else(|| ApiError::not_found(format!("post {} not found", id)))?;

    Ok(Json(PostResponse::from(post).with_tags(tags)))
}

/// POST /api/posts
pub async fn create_post_handler(
    State(state): State<AppState>,
    Json(payload): Json<PostPayload>,
) -> Result<(StatusCode, Json<PostResponse>), ApiError> {
    if payload.title.trim().is_empty() || payload.slug.trim().is_empty() {
        return Err(ApiError::validation_error("title and slug are required"));
    }

    let actor = acting_user(&state).await?;
    let now = Utc::now();
    let drafts = parse_tag_list(&payload.tags);

    let id = state
        .posts
        .create(&payload.into_input(), &drafts, now, actor)
        .await
        .map_err(ApiError::from_service)?;

    let (post, tags) = state
        .posts
        .get(id)
        .await
        .map_err(ApiError::from_service)?
        .ok_or_else(|| ApiError::internal_error("post vanished after insert"))?;

    Ok((
        StatusCode::CREATED,
        Json(PostResponse::from(post).with_tags(tags)),
    ))
}

/// PUT /api/posts/{id}
pub async fn update_post_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<PostPayload>,
) -> Result<Json<PostResponse>, ApiError> {
    if payload.title.trim().is_empty() || payload.slug.trim().is_empty() {
        return Err(ApiError::validation_error("title and slug are required"));
    }

    let actor = acting_user(&state).await?;
    let now = Utc::now();
    let drafts = parse_tag_list(&payload.tags);

    state
        .posts
        .update(id, &payload.into_input(), &drafts, now, actor)
        .await
        .map_err(ApiError::from_service)?;

    let (post, tags) = state
        .posts
        .get(id)
        .await
        .map_err(ApiError::from_service)?
        .ok_or_else(|| ApiError::not_found(format!("post {} not found", id)))?;

    Ok(Json(PostResponse::from(post).with_tags(tags)))
}

/// DELETE /api/posts/{id}
pub async fn delete_post_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state
        .posts
        .get(id)
        .await
        .map_err(ApiError::from_service)?
        .ok_or_else(|| ApiError::not_found(format!("post {} not found", id)))?;

    state.posts.delete(id).await.map_err(ApiError::from_service)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Resolve the administrator as the acting user for mutations.
pub(crate) async fn acting_user(state: &AppState) -> Result<i64, ApiError> {
    state
        .users
        .administrator_id()
        .await
        .map_err(ApiError::from_service)?
        .ok_or_else(|| ApiError::conflict("blog is not set up yet"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{register_admin, test_server};
    use serde_json::json;

    fn payload(slug: &str, published: bool, tags: &str) -> serde_json::Value {
        json!({
            "title": format!("Post {}", slug),
            "slug": slug,
            "markdown": "# Hi",
            "html": "<h1>Hi</h1>",
            "published": published,
            "tags": tags,
        })
    }

    #[tokio::test]
    async fn test_draft_to_published_over_http() {
        let server = test_server().await;
        register_admin(&server).await;

        let response = server.post("/api/posts").json(&payload("hello", false, "")).await;
        response.assert_status(StatusCode::CREATED);
        let created: PostResponse = response.json();
        assert_eq!(created.status, "draft");
        assert!(created.published_at.is_none());

        let mut body = payload("hello", true, "");
        body["title"] = json!("Post hello");
        let response = server
            .put(&format!("/api/posts/{}", created.id))
            .json(&body)
            .await;
        response.assert_status_ok();
        let updated: PostResponse = response.json();
        assert_eq!(updated.status, "published");
        let stamped_at = updated.published_at.clone().expect("stamped");

        // A later edit must not move the stamp.
        let response = server
            .put(&format!("/api/posts/{}", created.id))
            .json(&payload("hello", true, ""))
            .await;
        response.assert_status_ok();
        let edited: PostResponse = response.json();
        assert_eq!(edited.published_at, Some(stamped_at));
    }

    #[tokio::test]
    async fn test_create_with_tags_and_list() {
        let server = test_server().await;
        register_admin(&server).await;

        let response = server
            .post("/api/posts")
            .json(&payload("tagged", false, "Rust, Web"))
            .await;
        response.assert_status(StatusCode::CREATED);
        let created: PostResponse = response.json();
        let tags = created.tags.expect("tags");
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].slug, "rust");

        let response = server.get("/api/posts").await;
        response.assert_status_ok();
        let list: PostListResponse = response.json();
        assert_eq!(list.total, 1);
        assert_eq!(list.posts[0].slug, "tagged");
    }

    #[tokio::test]
    async fn test_list_echoes_clamped_pagination() {
        let server = test_server().await;
        register_admin(&server).await;

        server.post("/api/posts").json(&payload("one", false, "")).await;

        let response = server.get("/api/posts?page=0&per_page=1000").await;
        response.assert_status_ok();
        let list: PostListResponse = response.json();
        assert_eq!(list.page, 1);
        assert_eq!(list.per_page, 100);
        assert_eq!(list.total, 1);
    }

    #[tokio::test]
    async fn test_delete_post() {
        let server = test_server().await;
        register_admin(&server).await;

        let response = server.post("/api/posts").json(&payload("gone", false, "Rust")).await;
        let created: PostResponse = response.json();

        let response = server.delete(&format!("/api/posts/{}", created.id)).await;
        response.assert_status(StatusCode::NO_CONTENT);

        let response = server.get(&format!("/api/posts/{}", created.id)).await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_mutations_refused_before_setup() {
        let server = test_server().await;

        let response = server.post("/api/posts").json(&payload("early", false, "")).await;
        response.assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_validation_rejects_blank_title() {
        let server = test_server().await;
        register_admin(&server).await;

        let response = server
            .post("/api/posts")
            .json(&json!({"title": " ", "slug": "x"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_missing_post_is_404() {
        let server = test_server().await;
        register_admin(&server).await;

        let response = server.put("/api/posts/999").json(&payload("ghost", true, "")).await;
        response.assert_status(StatusCode::NOT_FOUND);
    }
}
