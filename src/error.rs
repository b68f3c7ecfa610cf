use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::repository::RepoError;

/// ApiError
///
/// The full error taxonomy surfaced by this service. Every variant maps 1:1
/// to an HTTP status and a structured `{ "message": ... }` body; nothing is
/// swallowed and nothing is retried. Handlers return `Result<_, ApiError>`
/// and rely on the `IntoResponse` impl below for boundary translation.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing, malformed, invalid, or expired credential.
    #[error("unauthorized")]
    Unauthorized,
    /// Authenticated, but lacking ownership/admin rights for the mutation.
    #[error("forbidden")]
    Forbidden,
    /// Referenced post or user does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),
    /// Malformed input shape (e.g., empty title).
    #[error("{0}")]
    Validation(String),
    /// Second like from the same user for the same post.
    #[error("post already liked")]
    AlreadyLiked,
    /// Idempotency/uniqueness violation outside the like path (e.g., signup
    /// with an email that is already registered).
    #[error("{0}")]
    Conflict(String),
    /// Underlying store unreachable or a transaction aborted. Not retried
    /// here; surfaced as a generic failure.
    #[error("internal error")]
    Storage(#[from] RepoError),
    /// Server-side fault outside the store (e.g., token signing failed).
    #[error("internal error")]
    Internal,
}

/// Wire shape for every error response.
#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            // The like-conflict is part of the like endpoint's documented
            // contract and answers 400, unlike the generic 409 conflict.
            ApiError::Validation(_) | ApiError::AlreadyLiked => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Storage(e) => {
                // Log the cause, answer a generic message. RepoError::NotFound
                // and Conflict are expected to be translated by the caller; if
                // one leaks here it still gets a sane status.
                match e {
                    RepoError::NotFound => return ApiError::NotFound("record").into_response(),
                    RepoError::Conflict => {
                        return ApiError::Conflict("duplicate record".to_string()).into_response();
                    }
                    RepoError::Database(cause) => {
                        tracing::error!("storage failure: {:?}", cause);
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                }
            }
        };

        let body = ErrorBody {
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
