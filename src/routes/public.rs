use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a credential: the signup/signin gateway and
/// read-only access to published posts.
///
/// Visibility mandate: every read handler here answers only for
/// `published = true` rows; drafts are indistinguishable from missing posts.
/// The listing still accepts an *optional* credential (MaybeAuthUser) so it
/// can annotate `has_liked` for logged-in readers without gating the route.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Unauthenticated endpoint for monitoring and load balancer checks.
        .route("/health", get(|| async { "ok" }))
        // POST /signup
        // Creates an account and returns a session token.
        .route("/signup", post(handlers::signup))
        // POST /signin
        // Exchanges a credential for a session token.
        .route("/signin", post(handlers::signin))
        // GET /posts?page=...&limit=...
        // One page of published posts, newest first, with like counts and the
        // optional per-reader has_liked annotation.
        .route("/posts", get(handlers::list_posts))
        // GET /posts/{id}
        // A single published post.
        .route("/posts/{id}", get(handlers::get_post))
}
