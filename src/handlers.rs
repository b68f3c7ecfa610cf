use crate::{
    AppState,
    auth::{AuthUser, MaybeAuthUser, issue_token},
    error::ApiError,
    models::{
        self, CreatePostRequest, LikeResponse, Pagination, Post, PostPage, SigninRequest,
        SignupRequest, TokenResponse, UpdatePostRequest, UserProfile,
    },
    policy,
    repository::RepoError,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

// --- Filter Structs ---

/// PageParams
///
/// Accepted query parameters for the public post listing (GET /posts).
/// Used by Axum's Query extractor to safely bind pagination inputs.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct PageParams {
    /// 1-based page number. Defaults to 1.
    pub page: Option<i64>,
    /// Page size. Defaults to the configured size, capped at 50.
    pub limit: Option<i64>,
}

// --- Validation Helpers ---

/// Title and content must be non-empty after trimming. Shared by create and
/// update so the two paths cannot drift.
fn validate_post_input(title: &str, content: &str) -> Result<(), ApiError> {
    if title.trim().is_empty() {
        return Err(ApiError::Validation("title must not be empty".to_string()));
    }
    if content.trim().is_empty() {
        return Err(ApiError::Validation(
            "content must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_signup(req: &SignupRequest) -> Result<(), ApiError> {
    // Shape check only; deliverability is not this service's concern.
    if !req.email.contains('@') || req.email.trim().is_empty() {
        return Err(ApiError::Validation("invalid email".to_string()));
    }
    if req.password.len() < 6 {
        return Err(ApiError::Validation(
            "password must be at least 6 characters".to_string(),
        ));
    }
    Ok(())
}

// --- Auth Handlers ---

/// signup
///
/// [Public Route] Creates an account and returns a signed session token, so
/// the client is logged in immediately after registration.
///
/// *Conflict*: A duplicate email surfaces as 409 from the users.email UNIQUE
/// constraint, not from a racy pre-check.
#[utoipa::path(
    post,
    path = "/signup",
    request_body = SignupRequest,
    responses(
        (status = 200, description = "Registered", body = TokenResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    validate_signup(&payload)?;

    let user = state
        .repo
        .create_user(&payload.email, &payload.password, payload.name.as_deref())
        .await
        .map_err(|e| match e {
            RepoError::Conflict => ApiError::Conflict("email already registered".to_string()),
            other => ApiError::Storage(other),
        })?;

    let token = issue_token(user.id, &state.config.jwt_secret, state.config.token_ttl_secs)
        .map_err(|_| ApiError::Internal)?;

    Ok(Json(TokenResponse { token }))
}

/// signin
///
/// [Public Route] Exchanges a credential for a session token.
///
/// *Security*: Unknown email and wrong password collapse to the same 401 so
/// the endpoint cannot be used to probe for registered addresses.
#[utoipa::path(
    post,
    path = "/signin",
    request_body = SigninRequest,
    responses(
        (status = 200, description = "Signed in", body = TokenResponse),
        (status = 401, description = "Incorrect credentials")
    )
)]
pub async fn signin(
    State(state): State<AppState>,
    Json(payload): Json<SigninRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = state
        .repo
        .get_user_by_email(&payload.email)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    // Opaque comparison; the stored credential's format is not our concern.
    if user.password != payload.password {
        return Err(ApiError::Unauthorized);
    }

    let token = issue_token(user.id, &state.config.jwt_secret, state.config.token_ttl_secs)
        .map_err(|_| ApiError::Internal)?;

    Ok(Json(TokenResponse { token }))
}

/// get_me
///
/// [Authenticated Route] Returns the authenticated user's profile.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Profile", body = UserProfile))
)]
pub async fn get_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserProfile>, ApiError> {
    let user = state
        .repo
        .get_user(id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    Ok(Json(UserProfile {
        id: user.id,
        email: user.email,
        name: user.name,
        is_admin: user.is_admin,
    }))
}

// --- Post Handlers ---

/// create_post
///
/// [Authenticated Route] Submits a new post. Every post starts as a draft;
/// publication is a separate, owner-only action. The author id is taken from
/// the authenticated session, never from the payload.
#[utoipa::path(
    post,
    path = "/posts",
    request_body = CreatePostRequest,
    responses(
        (status = 200, description = "Created", body = Post),
        (status = 400, description = "Invalid input")
    )
)]
pub async fn create_post(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<Json<models::Post>, ApiError> {
    validate_post_input(&payload.title, &payload.content)?;
    let post = state
        .repo
        .create_post(id, &payload.title, &payload.content)
        .await?;
    Ok(Json(post))
}

/// update_post
///
/// [Authenticated Route] Rewrites a post's title and content.
///
/// *Authorization*: fetch-then-check. The post is loaded first so a missing
/// post answers 404 while a denied one answers 403; owner or admin may
/// mutate.
#[utoipa::path(
    put,
    path = "/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Updated", body = Post),
        (status = 403, description = "Not owner"),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_post(
    AuthUser { id: user_id, is_admin }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<Json<models::Post>, ApiError> {
    let post = state
        .repo
        .get_post(id)
        .await?
        .ok_or(ApiError::NotFound("post"))?;

    if !policy::can_mutate(user_id, is_admin, &post) {
        return Err(ApiError::Forbidden);
    }

    validate_post_input(&payload.title, &payload.content)?;

    let post = state
        .repo
        .update_post(id, &payload.title, &payload.content)
        .await?;
    Ok(Json(post))
}

/// publish_post
///
/// [Authenticated Route] Transitions a draft to published. Strictly
/// owner-only: admins cannot publish another author's draft. Publishing an
/// already-published post is a no-op success.
#[utoipa::path(
    post,
    path = "/posts/{id}/publish",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Published", body = Post),
        (status = 403, description = "Not owner"),
        (status = 404, description = "Not found")
    )
)]
pub async fn publish_post(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<models::Post>, ApiError> {
    let post = state
        .repo
        .get_post(id)
        .await?
        .ok_or(ApiError::NotFound("post"))?;

    if !policy::can_publish(user_id, &post) {
        return Err(ApiError::Forbidden);
    }

    if post.published {
        // Already live; repeating the call changes nothing.
        return Ok(Json(post));
    }

    let post = state.repo.publish_post(id).await?;
    Ok(Json(post))
}

/// delete_post
///
/// [Authenticated Route] Hard-deletes a post. Two tiers of authorization:
/// admins may delete any post, everyone else only their own. Dependent likes
/// are removed by the schema cascade, not application code.
#[utoipa::path(
    delete,
    path = "/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not owner"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_post(
    AuthUser { id: user_id, is_admin }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let post = state
        .repo
        .get_post(id)
        .await?
        .ok_or(ApiError::NotFound("post"))?;

    if !policy::can_mutate(user_id, is_admin, &post) {
        return Err(ApiError::Forbidden);
    }

    state.repo.delete_post(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// get_post
///
/// [Public Route] Retrieves a single published post by ID. Drafts answer 404
/// here; their authors read them through GET /me/posts.
#[utoipa::path(
    get,
    path = "/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Found", body = Post),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<models::Post>, ApiError> {
    match state.repo.get_post(id).await? {
        Some(post) if post.published => Ok(Json(post)),
        // A draft is indistinguishable from a missing post for the public.
        _ => Err(ApiError::NotFound("post")),
    }
}

/// list_posts
///
/// [Public Route] Lists published posts, newest first, paginated. When the
/// request carries a valid credential each entry is annotated with whether
/// that reader already liked it; anonymous readers get `has_liked = false`.
#[utoipa::path(
    get,
    path = "/posts",
    params(PageParams),
    responses((status = 200, description = "One page of published posts", body = PostPage))
)]
pub async fn list_posts(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<PostPage>, ApiError> {
    let page = params.page.unwrap_or(1).max(1);
    let limit = params
        .limit
        .unwrap_or(state.config.default_page_size)
        .clamp(1, 50);
    // Saturating arithmetic: an absurd page number must yield an empty page,
    // not an overflow or a negative OFFSET.
    let offset = page.saturating_sub(1).saturating_mul(limit);

    let viewer_id = viewer.map(|u| u.id);
    let (posts, total) = state.repo.list_published(viewer_id, limit, offset).await?;

    Ok(Json(PostPage {
        posts,
        pagination: Pagination {
            total,
            page,
            limit,
            total_pages: (total + limit - 1) / limit,
        },
    }))
}

/// get_my_posts
///
/// [Authenticated Route] Lists all posts owned by the requesting user,
/// drafts included, newest first.
#[utoipa::path(
    get,
    path = "/me/posts",
    responses((status = 200, description = "My posts", body = [Post]))
)]
pub async fn get_my_posts(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<models::Post>>, ApiError> {
    let posts = state.repo.list_by_author(id).await?;
    Ok(Json(posts))
}

// --- Like Handler ---

/// like_post
///
/// [Authenticated Route] Records a like for a post and returns the updated
/// count.
///
/// *Idempotency*: at most one like per (user, post); a repeat answers 400
/// with the counter untouched. The insert and the counter increment are one
/// atomic unit inside the repository. There is no unlike.
#[utoipa::path(
    post,
    path = "/posts/{id}/like",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Liked", body = LikeResponse),
        (status = 400, description = "Already liked"),
        (status = 404, description = "Not found")
    )
)]
pub async fn like_post(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> Result<Json<LikeResponse>, ApiError> {
    let like_count = state
        .repo
        .add_like(user_id, post_id)
        .await
        .map_err(|e| match e {
            RepoError::NotFound => ApiError::NotFound("post"),
            RepoError::Conflict => ApiError::AlreadyLiked,
            other => ApiError::Storage(other),
        })?;

    Ok(Json(LikeResponse { like_count }))
}
