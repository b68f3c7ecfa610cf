use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// Canonical identity record stored in the `users` table. The credential is
/// comparison-only: it never serializes into a response and is never logged.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    // The user's primary identifier, unique across the table.
    pub email: String,
    // Opaque credential. Excluded from all serialized output.
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    #[schema(ignore)]
    pub password: String,
    pub name: Option<String>,
    // The RBAC field: admins may delete any post but publish only their own.
    pub is_admin: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Post
///
/// A blog post from the `posts` table. This is the primary data structure for
/// the core business logic.
///
/// Lifecycle: created as a draft (`published = false`), published exactly once
/// by its author, and terminated by hard delete. There is no unpublish.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Post {
    pub id: Uuid,
    // FK to users.id (owner).
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    // Draft/published flag. Listing only ever exposes published rows.
    pub published: bool,
    // Denormalized counter over post_likes. Maintained exclusively by the
    // repository's add_like transaction.
    pub like_count: i64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// PostSummary
///
/// A listing entry: the post joined with its author's display name and
/// annotated with whether the requesting identity has already liked it
/// (`false` for anonymous readers).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct PostSummary {
    pub id: Uuid,
    pub author_id: Uuid,
    // Loaded via a JOIN with users in the repository query.
    pub author_name: Option<String>,
    pub title: String,
    pub content: String,
    pub like_count: i64,
    pub has_liked: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Like
///
/// A single row of the `post_likes` join table. Created only through the
/// add_like transaction, never updated, and deleted only as a cascade of post
/// or user deletion.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Like {
    pub id: Uuid,
    pub user_id: Uuid,
    pub post_id: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// SignupRequest
///
/// Input payload for POST /signup. The password is persisted as an opaque
/// string; hashing policy belongs to the deployment, not this service.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

/// SigninRequest
///
/// Input payload for POST /signin.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

/// CreatePostRequest
///
/// Input payload for submitting a new draft (POST /posts).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
}

/// UpdatePostRequest
///
/// Payload for rewriting an existing post's title and content
/// (PUT /posts/{id}). Both fields are required, matching the create shape.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdatePostRequest {
    pub title: String,
    pub content: String,
}

// --- Response Schemas (Output) ---

/// TokenResponse
///
/// Output of signup/signin: the signed session token the client presents as
/// `Authorization: Bearer <token>` on every subsequent request.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct TokenResponse {
    pub token: String,
}

/// LikeResponse
///
/// Output of POST /posts/{id}/like: the post's like count after the new like
/// was recorded.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LikeResponse {
    pub like_count: i64,
}

/// Pagination
///
/// Listing metadata returned alongside the page of posts.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Pagination {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

/// PostPage
///
/// Output of GET /posts: one page of published posts plus pagination metadata.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PostPage {
    pub posts: Vec<PostSummary>,
    pub pagination: Pagination,
}

/// UserProfile
///
/// Output schema for the authenticated user's profile (GET /me).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub is_admin: bool,
}
