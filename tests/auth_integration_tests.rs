use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{Method, Request, StatusCode, Uri, header, request::Parts},
};
use blog_portal::{
    AppState,
    auth::{AuthUser, MaybeAuthUser, issue_token, verify_token},
    config::Env,
    models::{Post, PostSummary, User},
    repository::{RepoError, Repository},
};
use std::sync::Arc;
use uuid::Uuid;

// --- Mock Repository for Auth Logic ---

#[derive(Default)]
struct MockAuthRepo {
    user_to_return: Option<User>,
}

#[async_trait]
impl Repository for MockAuthRepo {
    async fn get_user(&self, _id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.user_to_return.clone())
    }
    // The auth path only touches get_user; everything else is unreachable here.
    async fn get_user_by_email(&self, _email: &str) -> Result<Option<User>, RepoError> {
        Ok(None)
    }
    async fn create_user(
        &self,
        _email: &str,
        _password: &str,
        _name: Option<&str>,
    ) -> Result<User, RepoError> {
        Ok(User::default())
    }
    async fn create_post(
        &self,
        _author_id: Uuid,
        _title: &str,
        _content: &str,
    ) -> Result<Post, RepoError> {
        Ok(Post::default())
    }
    async fn get_post(&self, _id: Uuid) -> Result<Option<Post>, RepoError> {
        Ok(None)
    }
    async fn update_post(
        &self,
        _id: Uuid,
        _title: &str,
        _content: &str,
    ) -> Result<Post, RepoError> {
        Err(RepoError::NotFound)
    }
    async fn publish_post(&self, _id: Uuid) -> Result<Post, RepoError> {
        Err(RepoError::NotFound)
    }
    async fn delete_post(&self, _id: Uuid) -> Result<(), RepoError> {
        Err(RepoError::NotFound)
    }
    async fn list_published(
        &self,
        _viewer: Option<Uuid>,
        _limit: i64,
        _offset: i64,
    ) -> Result<(Vec<PostSummary>, i64), RepoError> {
        Ok((vec![], 0))
    }
    async fn list_by_author(&self, _author_id: Uuid) -> Result<Vec<Post>, RepoError> {
        Ok(vec![])
    }
    async fn add_like(&self, _user_id: Uuid, _post_id: Uuid) -> Result<i64, RepoError> {
        Err(RepoError::NotFound)
    }
    async fn has_liked(&self, _user_id: Uuid, _post_id: Uuid) -> Result<bool, RepoError> {
        Ok(false)
    }
    async fn like_count(&self, _post_id: Uuid) -> Result<i64, RepoError> {
        Err(RepoError::NotFound)
    }
}

// --- Helper Functions ---

const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";
const TEST_USER_ID: Uuid = Uuid::from_u128(1);

fn known_user(id: Uuid, is_admin: bool) -> User {
    User {
        id,
        email: "test@example.com".to_string(),
        password: "hunter22".to_string(),
        name: Some("Test".to_string()),
        is_admin,
        created_at: chrono::Utc::now(),
    }
}

fn create_app_state(env: Env, repo: MockAuthRepo, jwt_secret: String) -> AppState {
    let mut config = blog_portal::config::AppConfig::default();
    config.env = env;
    config.jwt_secret = jwt_secret;

    AppState {
        repo: Arc::new(repo),
        config,
    }
}

/// Helper to get the mutable Parts struct from a generated Request
fn get_request_parts(method: Method, uri: Uri) -> Parts {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let (parts, _) = request.into_parts();
    parts
}

fn bearer_parts(token: &str) -> Parts {
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );
    parts
}

// --- Token Codec Tests ---

#[test]
fn test_token_round_trip() {
    let token = issue_token(TEST_USER_ID, TEST_JWT_SECRET, 3600).unwrap();
    let subject = verify_token(&token, TEST_JWT_SECRET).unwrap();
    assert_eq!(subject, TEST_USER_ID);
}

#[test]
fn test_token_rejected_with_wrong_secret() {
    let token = issue_token(TEST_USER_ID, TEST_JWT_SECRET, 3600).unwrap();
    assert!(verify_token(&token, "a-different-secret").is_err());
}

fn stale_token(expired_secs_ago: i64) -> String {
    let exp = chrono::Utc::now().timestamp() - expired_secs_ago;
    let claims = blog_portal::auth::Claims {
        sub: TEST_USER_ID,
        iat: (exp - 10) as usize,
        exp: exp as usize,
    };
    let key = jsonwebtoken::EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes());
    jsonwebtoken::encode(&jsonwebtoken::Header::default(), &claims, &key).unwrap()
}

#[test]
fn test_expired_token_rejected() {
    // Correctly signed claims whose exp is firmly in the past.
    assert!(verify_token(&stale_token(600), TEST_JWT_SECRET).is_err());
}

#[test]
fn test_expiry_has_no_grace_window() {
    // Verification carries no leeway: a token just past its exp is already
    // invalid, not merely nearly so.
    assert!(verify_token(&stale_token(5), TEST_JWT_SECRET).is_err());
}

#[test]
fn test_tampered_token_rejected() {
    let token = issue_token(TEST_USER_ID, TEST_JWT_SECRET, 3600).unwrap();

    // Flip one character in each of the three segments in turn; every
    // variant must fail verification.
    let bytes = token.as_bytes();
    for idx in [2, token.len() / 2, token.len() - 2] {
        let mut mutated = bytes.to_vec();
        mutated[idx] = if mutated[idx] == b'A' { b'B' } else { b'A' };
        let mutated = String::from_utf8(mutated).unwrap();
        if mutated == token {
            continue;
        }
        assert!(
            verify_token(&mutated, TEST_JWT_SECRET).is_err(),
            "tampered token at byte {} was accepted",
            idx
        );
    }
}

#[test]
fn test_garbage_token_rejected() {
    assert!(verify_token("not-a-token", TEST_JWT_SECRET).is_err());
    assert!(verify_token("", TEST_JWT_SECRET).is_err());
}

// --- AuthUser Extractor Tests ---

#[tokio::test]
async fn test_auth_success_with_valid_token() {
    let token = issue_token(TEST_USER_ID, TEST_JWT_SECRET, 3600).unwrap();

    let mock_repo = MockAuthRepo {
        user_to_return: Some(known_user(TEST_USER_ID, false)),
    };
    let app_state = create_app_state(Env::Production, mock_repo, TEST_JWT_SECRET.to_string());

    let mut parts = bearer_parts(&token);
    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert!(auth_user.is_ok());
    let user = auth_user.unwrap();
    assert_eq!(user.id, TEST_USER_ID);
    assert!(!user.is_admin);
}

#[tokio::test]
async fn test_auth_resolves_admin_flag_from_store() {
    let token = issue_token(TEST_USER_ID, TEST_JWT_SECRET, 3600).unwrap();
    let mock_repo = MockAuthRepo {
        user_to_return: Some(known_user(TEST_USER_ID, true)),
    };
    let app_state = create_app_state(Env::Production, mock_repo, TEST_JWT_SECRET.to_string());

    let mut parts = bearer_parts(&token);
    let user = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();
    assert!(user.is_admin);
}

#[tokio::test]
async fn test_auth_failure_with_missing_header() {
    let app_state = create_app_state(
        Env::Production,
        MockAuthRepo::default(),
        TEST_JWT_SECRET.to_string(),
    );

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert!(auth_user.is_err());
    assert_eq!(auth_user.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_failure_without_bearer_prefix() {
    // A valid token presented raw (no "Bearer " prefix) must be rejected;
    // the prefix is part of the contract.
    let token = issue_token(TEST_USER_ID, TEST_JWT_SECRET, 3600).unwrap();
    let mock_repo = MockAuthRepo {
        user_to_return: Some(known_user(TEST_USER_ID, false)),
    };
    let app_state = create_app_state(Env::Production, mock_repo, TEST_JWT_SECRET.to_string());

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&token).unwrap(),
    );

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;
    assert!(auth_user.is_err());
    assert_eq!(auth_user.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_failure_when_user_deleted() {
    // Token is valid, but the subject no longer exists in the store.
    let token = issue_token(TEST_USER_ID, TEST_JWT_SECRET, 3600).unwrap();
    let app_state = create_app_state(
        Env::Production,
        MockAuthRepo::default(),
        TEST_JWT_SECRET.to_string(),
    );

    let mut parts = bearer_parts(&token);
    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert!(auth_user.is_err());
    assert_eq!(auth_user.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_local_bypass_success() {
    let mock_user_id = Uuid::new_v4();
    let mock_repo = MockAuthRepo {
        user_to_return: Some(known_user(mock_user_id, true)),
    };
    let app_state = create_app_state(Env::Local, mock_repo, TEST_JWT_SECRET.to_string());

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::HeaderName::from_static("x-user-id"),
        header::HeaderValue::from_str(&mock_user_id.to_string()).unwrap(),
    );

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert!(auth_user.is_ok());
    let user = auth_user.unwrap();
    assert_eq!(user.id, mock_user_id);
    assert!(user.is_admin);
}

#[tokio::test]
async fn test_local_bypass_disabled_in_prod() {
    let mock_user_id = Uuid::new_v4();
    let app_state = create_app_state(
        Env::Production,
        MockAuthRepo::default(),
        TEST_JWT_SECRET.to_string(),
    );

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    // Provide ONLY the local bypass header
    parts.headers.insert(
        header::HeaderName::from_static("x-user-id"),
        header::HeaderValue::from_str(&mock_user_id.to_string()).unwrap(),
    );

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert!(auth_user.is_err());
    assert_eq!(auth_user.unwrap_err(), StatusCode::UNAUTHORIZED);
}

// --- MaybeAuthUser Tests ---

#[tokio::test]
async fn test_maybe_auth_anonymous_is_none() {
    let app_state = create_app_state(
        Env::Production,
        MockAuthRepo::default(),
        TEST_JWT_SECRET.to_string(),
    );

    let mut parts = get_request_parts(Method::GET, "/posts".parse().unwrap());
    let MaybeAuthUser(viewer) = MaybeAuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();
    assert!(viewer.is_none());
}

#[tokio::test]
async fn test_maybe_auth_invalid_token_is_none() {
    // A bad credential on a public read never rejects; it just de-personalizes.
    let app_state = create_app_state(
        Env::Production,
        MockAuthRepo::default(),
        TEST_JWT_SECRET.to_string(),
    );

    let mut parts = bearer_parts("definitely-not-a-token");
    let MaybeAuthUser(viewer) = MaybeAuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();
    assert!(viewer.is_none());
}

#[tokio::test]
async fn test_maybe_auth_valid_token_is_some() {
    let token = issue_token(TEST_USER_ID, TEST_JWT_SECRET, 3600).unwrap();
    let mock_repo = MockAuthRepo {
        user_to_return: Some(known_user(TEST_USER_ID, false)),
    };
    let app_state = create_app_state(Env::Production, mock_repo, TEST_JWT_SECRET.to_string());

    let mut parts = bearer_parts(&token);
    let MaybeAuthUser(viewer) = MaybeAuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();
    assert_eq!(viewer.map(|u| u.id), Some(TEST_USER_ID));
}
