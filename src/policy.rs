//! Ownership predicates consulted before every post mutation.
//!
//! These are pure functions of the identity and the fetched post row. Keeping
//! them in one place (rather than folded into SQL WHERE clauses) lets the
//! handlers distinguish a missing post (404) from a denied one (403).

use uuid::Uuid;

use crate::models::Post;

/// True when `user_id` authored the post.
pub fn is_owner(user_id: Uuid, post: &Post) -> bool {
    post.author_id == user_id
}

/// Authorization predicate for update and delete: the owner, or any admin.
pub fn can_mutate(user_id: Uuid, is_admin: bool, post: &Post) -> bool {
    is_admin || is_owner(user_id, post)
}

/// Authorization predicate for publish: strictly the owner. Admins may not
/// publish another author's draft.
pub fn can_publish(user_id: Uuid, post: &Post) -> bool {
    is_owner(user_id, post)
}
