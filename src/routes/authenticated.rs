use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post, put},
};

/// Authenticated Router Module
///
/// Routes for any user who has passed the authentication layer: post
/// authoring, the publish transition, liking, and profile access.
///
/// Access Control Strategy:
/// Every handler here relies on the `AuthUser` extractor middleware applied
/// on the router layer above this module, so each handler receives a
/// validated identity. Ownership and admin checks (update/publish/delete)
/// are then made against the fetched post via the policy predicates inside
/// the handlers.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        // The authenticated user's profile.
        .route("/me", get(handlers::get_me))
        // GET /me/posts
        // All posts owned by the user, drafts included.
        .route("/me/posts", get(handlers::get_my_posts))
        // POST /posts
        // Submits a new draft. The author id comes from the session.
        .route("/posts", post(handlers::create_post))
        // PUT/DELETE /posts/{id}
        // Rewrite or remove a post. Owner-or-admin, enforced in the handler
        // after the row is fetched (403 vs 404 stay distinguishable).
        .route(
            "/posts/{id}",
            put(handlers::update_post).delete(handlers::delete_post),
        )
        // POST /posts/{id}/publish
        // One-way draft -> published transition, strictly owner-only.
        .route("/posts/{id}/publish", post(handlers::publish_post))
        // POST /posts/{id}/like
        // Records a like; at most one per (user, post), counter maintained
        // atomically with the like row.
        .route("/posts/{id}/like", post(handlers::like_post))
}
