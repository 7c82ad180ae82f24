//! Session flows: local login, external login with username onboarding, and
//! access-token refresh.
//!
//! ```text
//! Anonymous ──login──────────────────────────────▶ Authenticated
//! Anonymous ──external login (returning)─────────▶ Authenticated
//! Anonymous ──external login (first)──▶ PendingUsername ──set-username──▶ Authenticated
//! ```
//!
//! Logout is cookie handling only and lives in the handler.

use std::sync::Arc;

use shared::api::DEFAULT_ROLE;
use uuid::Uuid;

use super::{
    password::{PasswordHasher, unusable_password},
    tokens::TokenService,
};
use crate::{
    error::AppError,
    models::{AuthMethod, NewUser, User},
    repos::{UserRepo, is_unique_violation},
    stores::RateLimiter,
};

const LOGIN_ATTEMPTS: i64 = 5;
const LOGIN_WINDOW_SECS: u64 = 60;

/// Access token for the response body plus refresh token for the cookie.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug)]
pub enum ExternalLogin {
    /// Account still needs a username; only a setup token is issued.
    FirstTime { setup_token: String },
    Authenticated(TokenPair),
}

pub struct AuthFlow {
    users: Arc<dyn UserRepo>,
    rate_limiter: Arc<dyn RateLimiter>,
    tokens: Arc<TokenService>,
    hasher: Arc<dyn PasswordHasher>,
}

impl AuthFlow {
    pub fn new(
        users: Arc<dyn UserRepo>,
        rate_limiter: Arc<dyn RateLimiter>,
        tokens: Arc<TokenService>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self {
            users,
            rate_limiter,
            tokens,
            hasher,
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, AppError> {
        let key = format!("ratelimit:login:{}", username.to_lowercase());
        let attempts = self
            .rate_limiter
            .check_simple(&key, LOGIN_ATTEMPTS, LOGIN_WINDOW_SECS)
            .await?;
        if !attempts.is_allowed() {
            tracing::warn!(username, "login rate limit exceeded");
            return Err(AppError::too_many_requests(
                "Too many login attempts, please try again after 60 seconds",
            ));
        }

        let user = self
            .users
            .find_by_username(username)
            .await?
            .filter(|u| u.active)
            .ok_or_else(|| AppError::unauthorized("Unauthorized"))?;

        if !self.hasher.verify(password, &user.password_hash)? {
            return Err(AppError::unauthorized("Unauthorized"));
        }

        tracing::info!(user_id = %user.id, "user logged in");
        self.issue_pair(&user)
    }

    pub async fn external_login(&self, name: &str, email: &str) -> Result<ExternalLogin, AppError> {
        let user = match self.users.find_by_email(email).await? {
            Some(user) => user,
            None => {
                let user = self
                    .users
                    .create(NewUser {
                        username: None,
                        password_hash: self.hasher.hash(&unusable_password())?,
                        email: Some(email.to_string()),
                        name: Some(name.to_string()),
                        roles: vec![DEFAULT_ROLE.to_string()],
                        auth_method: AuthMethod::Google,
                        is_temporary: true,
                    })
                    .await?;
                tracing::info!(user_id = %user.id, "external account created");
                user
            }
        };

        if !user.is_onboarded() {
            let setup_token = self.tokens.issue_setup_token(user.id)?;
            return Ok(ExternalLogin::FirstTime { setup_token });
        }

        if !user.active {
            return Err(AppError::unauthorized("Unauthorized"));
        }

        tracing::info!(user_id = %user.id, "user logged in via external provider");
        Ok(ExternalLogin::Authenticated(self.issue_pair(&user)?))
    }

    /// Give a pending external account its username and log it in.
    pub async fn complete_setup(
        &self,
        username: &str,
        setup_token: &str,
    ) -> Result<TokenPair, AppError> {
        let claims = self
            .tokens
            .verify_setup(setup_token)
            .map_err(|_| AppError::unauthorized("Invalid or expired setup token"))?;

        let mut user = self.pending_user(claims.user_id).await?;

        if self.users.username_taken(username, Some(user.id)).await? {
            return Err(AppError::conflict("Username already taken"));
        }

        user.username = Some(username.to_string());
        user.is_temporary = false;
        let user = self.users.update(&user).await.map_err(|e| {
            if is_unique_violation(&e) {
                AppError::conflict("Username already taken")
            } else {
                AppError::Internal(e)
            }
        })?;

        tracing::info!(user_id = %user.id, username, "username set");
        self.issue_pair(&user)
    }

    /// New access token for the holder of a refresh token. The refresh token
    /// itself is not rotated.
    pub async fn refresh(&self, refresh_token: Option<&str>) -> Result<String, AppError> {
        let token = refresh_token.ok_or_else(|| AppError::unauthorized("Unauthorized"))?;

        let claims = self
            .tokens
            .verify_refresh(token)
            .map_err(|_| AppError::forbidden("Forbidden"))?;

        let user = self
            .users
            .find_by_username(&claims.username)
            .await?
            .filter(|u| u.active)
            .ok_or_else(|| AppError::unauthorized("Unauthorized"))?;

        Ok(self.tokens.issue_access_token(&claims.username, &user.roles)?)
    }

    async fn pending_user(&self, id: Uuid) -> Result<User, AppError> {
        self.users
            .find_by_id(id)
            .await?
            .filter(|u| u.is_temporary)
            .ok_or_else(|| AppError::unauthorized("Invalid or expired setup token"))
    }

    fn issue_pair(&self, user: &User) -> Result<TokenPair, AppError> {
        let username = user
            .username
            .as_deref()
            .ok_or_else(|| AppError::unauthorized("Unauthorized"))?;

        Ok(TokenPair {
            access_token: self.tokens.issue_access_token(username, &user.roles)?,
            refresh_token: self.tokens.issue_refresh_token(username)?,
        })
    }
}
