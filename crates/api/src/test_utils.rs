//! Shared test utilities for API handler tests.
//!
//! Provides common mock factories and a flexible `TestStateBuilder` for constructing
//! `AppState` instances with only the mocks needed for each test.
//!
//! ## Usage
//!
//! ```ignore
//! use crate::test_utils::{TestStateBuilder, mock_user, mock_note};
//!
//! let mut user_repo = MockUserRepo::new();
//! user_repo.expect_find_by_username().returning(|_| Ok(Some(mock_user("alice"))));
//!
//! let state = TestStateBuilder::new()
//!     .with_user_repo(user_repo)
//!     .build();
//! ```

use std::sync::Arc;

use axum::http::{HeaderMap, header::COOKIE};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use uuid::Uuid;

use crate::cache::{ManualClock, ResponseCache};
use crate::config::Config;
use crate::models::{AuthMethod, Comment, Note, User};
use crate::repos::{
    CommentRepo, MockCommentRepo, MockNoteRepo, MockStatusRepo, MockUserRepo, NoteRepo, Repos,
    UserRepo,
};
use crate::services::{
    AuthFlow, CacheTtls, MockObjectStore, MockPasswordHasher, NoteService, PasswordHasher,
    TokenService, TokenTtls,
};
use crate::state::AppState;
use crate::stores::{MockRateLimiter, MockStatusStore, RateLimiter, Stores};

/// Creates a test configuration with dummy values.
pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 3500,
        database_url: "postgres://test".to_string(),
        redis_url: "redis://test".to_string(),
        access_token_secret: "test-access-secret".to_string(),
        refresh_token_secret: "test-refresh-secret".to_string(),
        temp_token_secret: "test-temp-secret".to_string(),
        bucket_name: "test-bucket".to_string(),
        region: "us-east-1".to_string(),
        public_bucket_url: Some("https://cdn.test".to_string()),
        allowed_origins: "http://localhost:3000".to_string(),
        listing_cache_ttl_secs: 60,
        trending_cache_ttl_secs: 300,
        env: "test".to_string(),
        sentry_dsn: None,
    }
}

/// Token service keyed with the secrets of `test_config`.
pub fn test_tokens() -> TokenService {
    TokenService::new(
        "test-access-secret",
        "test-refresh-secret",
        "test-temp-secret",
        TokenTtls::default(),
    )
}

/// `Authorization` header value for `username` with the default role.
pub fn bearer(username: &str) -> String {
    let token = test_tokens()
        .issue_access_token(username, &["Employee".to_string()])
        .unwrap();
    format!("Bearer {token}")
}

/// Cookie jar as the extractor would build it from a `Cookie` request header.
pub fn cookie_jar(cookies: &[(&str, &str)]) -> CookieJar {
    let header = cookies
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("; ");

    let mut headers = HeaderMap::new();
    headers.insert(COOKIE, header.parse().unwrap());
    CookieJar::from_headers(&headers)
}

/// Creates an active, onboarded local user. Its password hash is `"hashed"`.
pub fn mock_user(username: &str) -> User {
    User {
        id: Uuid::new_v4(),
        username: Some(username.to_string()),
        password_hash: "hashed".to_string(),
        email: Some(format!("{username}@example.com")),
        name: None,
        roles: vec!["Employee".to_string()],
        active: true,
        auth_method: AuthMethod::Local,
        is_temporary: false,
        following: vec![],
        followers: vec![],
        created_at: Utc::now(),
    }
}

/// Creates a fresh note with no votes or views.
pub fn mock_note(user_id: Uuid, title: &str) -> Note {
    Note {
        id: Uuid::new_v4(),
        user_id,
        title: title.to_string(),
        text: "text".to_string(),
        image_url: None,
        completed: false,
        likes: 0,
        views: 0,
        liked_by: vec![],
        disliked_by: vec![],
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// Creates a comment on `note_id` by `username`.
pub fn mock_comment(note_id: Uuid, username: &str) -> Comment {
    Comment {
        id: Uuid::new_v4(),
        note_id,
        username: username.to_string(),
        text: "nice".to_string(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// Builder for constructing test `AppState` with custom mocks.
///
/// Uses default (empty) mocks for any repo/store/service not explicitly set.
/// This allows tests to only configure the mocks they actually need.
pub struct TestStateBuilder {
    user_repo: Option<MockUserRepo>,
    note_repo: Option<MockNoteRepo>,
    comment_repo: Option<MockCommentRepo>,
    status_repo: Option<MockStatusRepo>,
    rate_limiter: Option<MockRateLimiter>,
    status_store: Option<MockStatusStore>,
    hasher: Option<MockPasswordHasher>,
    object_store: Option<MockObjectStore>,
}

impl TestStateBuilder {
    /// Creates a new builder with no mocks configured.
    pub fn new() -> Self {
        Self {
            user_repo: None,
            note_repo: None,
            comment_repo: None,
            status_repo: None,
            rate_limiter: None,
            status_store: None,
            hasher: None,
            object_store: None,
        }
    }

    pub fn with_user_repo(mut self, repo: MockUserRepo) -> Self {
        self.user_repo = Some(repo);
        self
    }

    pub fn with_note_repo(mut self, repo: MockNoteRepo) -> Self {
        self.note_repo = Some(repo);
        self
    }

    pub fn with_comment_repo(mut self, repo: MockCommentRepo) -> Self {
        self.comment_repo = Some(repo);
        self
    }

    pub fn with_status_repo(mut self, repo: MockStatusRepo) -> Self {
        self.status_repo = Some(repo);
        self
    }

    pub fn with_rate_limiter(mut self, limiter: MockRateLimiter) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    pub fn with_status_store(mut self, store: MockStatusStore) -> Self {
        self.status_store = Some(store);
        self
    }

    pub fn with_hasher(mut self, hasher: MockPasswordHasher) -> Self {
        self.hasher = Some(hasher);
        self
    }

    pub fn with_object_store(mut self, store: MockObjectStore) -> Self {
        self.object_store = Some(store);
        self
    }

    /// Builds the `AppState` using configured mocks or defaults.
    ///
    /// Services share the same repo mocks as `state.repos`.
    pub fn build(self) -> AppState {
        let config = test_config();

        let users: Arc<dyn UserRepo> = Arc::new(self.user_repo.unwrap_or_else(MockUserRepo::new));
        let notes: Arc<dyn NoteRepo> = Arc::new(self.note_repo.unwrap_or_else(MockNoteRepo::new));
        let comments: Arc<dyn CommentRepo> =
            Arc::new(self.comment_repo.unwrap_or_else(MockCommentRepo::new));

        let repos = Repos {
            users: users.clone(),
            notes: notes.clone(),
            comments,
            status: Arc::new(self.status_repo.unwrap_or_else(MockStatusRepo::new)),
        };

        let rate_limiter: Arc<dyn RateLimiter> =
            Arc::new(self.rate_limiter.unwrap_or_else(MockRateLimiter::new));
        let stores = Stores {
            rate_limiter: rate_limiter.clone(),
            status: Arc::new(self.status_store.unwrap_or_else(MockStatusStore::new)),
        };

        let tokens = Arc::new(TokenService::from_config(&config));
        let hasher: Arc<dyn PasswordHasher> =
            Arc::new(self.hasher.unwrap_or_else(MockPasswordHasher::new));
        let storage = Arc::new(self.object_store.unwrap_or_else(MockObjectStore::new))
            as Arc<dyn crate::services::ObjectStore>;

        let cache = ResponseCache::new(Arc::new(ManualClock::new(Utc::now())));
        let note_service = Arc::new(NoteService::new(
            users.clone(),
            notes,
            cache,
            CacheTtls::from_config(&config),
        ));
        let auth = Arc::new(AuthFlow::new(
            users,
            rate_limiter,
            tokens.clone(),
            hasher.clone(),
        ));

        AppState {
            config,
            repos,
            stores,
            tokens,
            hasher,
            storage,
            notes: note_service,
            auth,
        }
    }
}

impl Default for TestStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
