use crate::models::{Post, PostSummary, User};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// RepoError
///
/// Failure modes of the persistence layer. `NotFound` and `Conflict` are
/// expected outcomes the handlers translate into their own taxonomy;
/// `Database` is a genuine storage failure, surfaced (never swallowed, never
/// retried) and answered as a generic 500 at the boundary.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("record not found")]
    NotFound,
    #[error("duplicate record")]
    Conflict,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Repository Trait
///
/// The abstract contract for all persistence operations, letting handlers
/// interact with the data layer without knowing the concrete implementation
/// (Postgres in production, mocks in tests).
///
/// **Send + Sync + async_trait** make the trait object (`Arc<dyn Repository>`)
/// safely shareable across Axum's asynchronous task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepoError>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;
    // Fails with `Conflict` when the email is already registered.
    async fn create_user(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<User, RepoError>;

    // --- Posts ---
    // Always creates a draft (published = false).
    async fn create_post(
        &self,
        author_id: Uuid,
        title: &str,
        content: &str,
    ) -> Result<Post, RepoError>;
    async fn get_post(&self, id: Uuid) -> Result<Option<Post>, RepoError>;
    // Rewrites title/content. Ownership is the caller's concern; the row must exist.
    async fn update_post(&self, id: Uuid, title: &str, content: &str) -> Result<Post, RepoError>;
    // One-way transition to published = true.
    async fn publish_post(&self, id: Uuid) -> Result<Post, RepoError>;
    // Hard delete; dependent likes go with the row via the schema cascade.
    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError>;
    // Published posts only, newest-created-first, annotated with `has_liked`
    // for `viewer` (always false when None). Returns the page plus the total
    // count of published posts.
    async fn list_published(
        &self,
        viewer: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<PostSummary>, i64), RepoError>;
    // All posts by one author, drafts included, newest first.
    async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<Post>, RepoError>;

    // --- Likes ---
    // Records a like and bumps the denormalized counter in one atomic unit.
    // Returns the new like count; fails `NotFound` for a missing post and
    // `Conflict` for a duplicate (user, post) pair. This is the only code
    // path anywhere that mutates posts.like_count.
    async fn add_like(&self, user_id: Uuid, post_id: Uuid) -> Result<i64, RepoError>;
    async fn has_liked(&self, user_id: Uuid, post_id: Uuid) -> Result<bool, RepoError>;
    // Reads the denormalized counter (authoritative; not recomputed from the
    // like rows). `NotFound` once the post is gone.
    async fn like_count(&self, post_id: Uuid) -> Result<i64, RepoError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the
/// application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by the
/// PostgreSQL database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Postgres error code for unique_violation, used to map constraint hits on
// users.email and post_likes (user_id, post_id) to RepoError::Conflict.
const UNIQUE_VIOLATION: &str = "23505";

fn map_insert_error(e: sqlx::Error) -> RepoError {
    if let sqlx::Error::Database(ref db) = e {
        if db.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return RepoError::Conflict;
        }
    }
    RepoError::Database(e)
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password, name, is_admin, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password, name, is_admin, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// create_user
    ///
    /// Inserts a new account. The UNIQUE constraint on users.email is the
    /// source of truth for duplicates; a violation maps to `Conflict` rather
    /// than being pre-checked with a racy SELECT.
    async fn create_user(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<User, RepoError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, password, name, is_admin, created_at)
            VALUES ($1, $2, $3, $4, false, NOW())
            RETURNING id, email, password, name, is_admin, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(password)
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(map_insert_error)
    }

    /// create_post
    ///
    /// Inserts a new post. All new posts start as drafts (`published = false`)
    /// with a zero like count; publication is a separate, owner-only action.
    async fn create_post(
        &self,
        author_id: Uuid,
        title: &str,
        content: &str,
    ) -> Result<Post, RepoError> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (id, author_id, title, content, published, like_count, created_at)
            VALUES ($1, $2, $3, $4, false, 0, NOW())
            RETURNING id, author_id, title, content, published, like_count, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(author_id)
        .bind(title)
        .bind(content)
        .fetch_one(&self.pool)
        .await?;
        Ok(post)
    }

    async fn get_post(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, author_id, title, content, published, like_count, created_at
            FROM posts WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(post)
    }

    async fn update_post(&self, id: Uuid, title: &str, content: &str) -> Result<Post, RepoError> {
        sqlx::query_as::<_, Post>(
            r#"
            UPDATE posts SET title = $2, content = $3
            WHERE id = $1
            RETURNING id, author_id, title, content, published, like_count, created_at
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(content)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepoError::NotFound)
    }

    /// publish_post
    ///
    /// Sets `published = true`. The transition is one-way; re-publishing an
    /// already-published row is a harmless overwrite with the same value.
    async fn publish_post(&self, id: Uuid) -> Result<Post, RepoError> {
        sqlx::query_as::<_, Post>(
            r#"
            UPDATE posts SET published = true
            WHERE id = $1
            RETURNING id, author_id, title, content, published, like_count, created_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepoError::NotFound)
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError> {
        let res = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    /// list_published
    ///
    /// The public listing query. Visibility (`published = true`) is enforced
    /// unconditionally here, not in the handler. `has_liked` is computed with
    /// an EXISTS subquery against the viewer id; a NULL viewer makes the
    /// subquery vacuously false, which is exactly the anonymous case.
    async fn list_published(
        &self,
        viewer: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<PostSummary>, i64), RepoError> {
        let posts = sqlx::query_as::<_, PostSummary>(
            r#"
            SELECT
                p.id, p.author_id, u.name AS author_name, p.title, p.content,
                p.like_count, p.created_at,
                EXISTS(
                    SELECT 1 FROM post_likes l
                    WHERE l.post_id = p.id AND l.user_id = $1
                ) AS has_liked
            FROM posts p
            JOIN users u ON p.author_id = u.id
            WHERE p.published = true
            ORDER BY p.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(viewer)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM posts WHERE published = true",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok((posts, total))
    }

    async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<Post>, RepoError> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, author_id, title, content, published, like_count, created_at
            FROM posts WHERE author_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(author_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(posts)
    }

    /// add_like
    ///
    /// The one operation in the system that needs an explicit transaction:
    /// the like row and the denormalized counter must move together.
    ///
    /// Inside a single transaction:
    /// 1. Lock the post row (`FOR UPDATE`); absent row fails `NotFound` and
    ///    the lock serializes concurrent likers of the same post.
    /// 2. Insert the like with `ON CONFLICT DO NOTHING`; zero rows affected
    ///    means a duplicate (user, post) pair and fails `Conflict` (the
    ///    transaction rolls back on drop, so nothing is half-written).
    /// 3. Increment `like_count` and return the new value.
    ///
    /// Under N concurrent calls for the same pair, the unique index
    /// guarantees exactly one insert wins; every loser observes `Conflict`
    /// and the counter moves by exactly one.
    async fn add_like(&self, user_id: Uuid, post_id: Uuid) -> Result<i64, RepoError> {
        let mut tx = self.pool.begin().await?;

        let post_exists =
            sqlx::query_scalar::<_, i32>("SELECT 1 FROM posts WHERE id = $1 FOR UPDATE")
                .bind(post_id)
                .fetch_optional(&mut *tx)
                .await?;
        if post_exists.is_none() {
            return Err(RepoError::NotFound);
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO post_likes (id, user_id, post_id, created_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (user_id, post_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(post_id)
        .execute(&mut *tx)
        .await?;
        if inserted.rows_affected() == 0 {
            return Err(RepoError::Conflict);
        }

        let new_count = sqlx::query_scalar::<_, i64>(
            "UPDATE posts SET like_count = like_count + 1 WHERE id = $1 RETURNING like_count",
        )
        .bind(post_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(new_count)
    }

    async fn has_liked(&self, user_id: Uuid, post_id: Uuid) -> Result<bool, RepoError> {
        let liked = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM post_likes WHERE user_id = $1 AND post_id = $2)",
        )
        .bind(user_id)
        .bind(post_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(liked)
    }

    async fn like_count(&self, post_id: Uuid) -> Result<i64, RepoError> {
        sqlx::query_scalar::<_, i64>("SELECT like_count FROM posts WHERE id = $1")
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepoError::NotFound)
    }
}
