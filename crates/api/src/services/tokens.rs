//! JWT issuing and verification.
//!
//! Three token classes, each signed with its own HS256 secret so one class
//! can never be replayed as another:
//!
//! | Token   | Claims             | Default TTL | Transport        |
//! |---------|--------------------|-------------|------------------|
//! | access  | username, roles    | 15 minutes  | JSON body/bearer |
//! | refresh | username           | 7 days      | `jwt` cookie     |
//! | setup   | pending user id    | 10 minutes  | JSON body        |
//!
//! Bad signatures, malformed tokens and expired tokens all surface as the
//! same `TokenError::Invalid`.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::config::Config;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("invalid or expired token")]
    Invalid,
    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub username: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    #[serde(rename = "UserInfo")]
    pub user_info: UserInfo,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupClaims {
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    pub iat: i64,
    pub exp: i64,
}

/// Lifetimes of the three token classes.
#[derive(Debug, Clone, Copy)]
pub struct TokenTtls {
    pub access: Duration,
    pub refresh: Duration,
    pub setup: Duration,
}

impl Default for TokenTtls {
    fn default() -> Self {
        Self {
            access: Duration::minutes(15),
            refresh: Duration::days(7),
            setup: Duration::minutes(10),
        }
    }
}

struct SigningKey {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKey {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

pub struct TokenService {
    access: SigningKey,
    refresh: SigningKey,
    setup: SigningKey,
    ttls: TokenTtls,
    validation: Validation,
}

impl TokenService {
    pub fn new(
        access_secret: &str,
        refresh_secret: &str,
        setup_secret: &str,
        ttls: TokenTtls,
    ) -> Self {
        let mut validation = Validation::default();
        validation.leeway = 0;

        Self {
            access: SigningKey::from_secret(access_secret),
            refresh: SigningKey::from_secret(refresh_secret),
            setup: SigningKey::from_secret(setup_secret),
            ttls,
            validation,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.access_token_secret,
            &config.refresh_token_secret,
            &config.temp_token_secret,
            TokenTtls::default(),
        )
    }

    pub fn ttls(&self) -> TokenTtls {
        self.ttls
    }

    pub fn issue_access_token(&self, username: &str, roles: &[String]) -> Result<String, TokenError> {
        let (iat, exp) = Self::window(self.ttls.access);
        let claims = AccessClaims {
            user_info: UserInfo {
                username: username.to_string(),
                roles: roles.to_vec(),
            },
            iat,
            exp,
        };
        Ok(encode(&Header::default(), &claims, &self.access.encoding)?)
    }

    pub fn issue_refresh_token(&self, username: &str) -> Result<String, TokenError> {
        let (iat, exp) = Self::window(self.ttls.refresh);
        let claims = RefreshClaims {
            username: username.to_string(),
            iat,
            exp,
        };
        Ok(encode(&Header::default(), &claims, &self.refresh.encoding)?)
    }

    pub fn issue_setup_token(&self, pending_user_id: Uuid) -> Result<String, TokenError> {
        let (iat, exp) = Self::window(self.ttls.setup);
        let claims = SetupClaims {
            user_id: pending_user_id,
            iat,
            exp,
        };
        Ok(encode(&Header::default(), &claims, &self.setup.encoding)?)
    }

    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        self.verify(token, &self.access)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        self.verify(token, &self.refresh)
    }

    pub fn verify_setup(&self, token: &str) -> Result<SetupClaims, TokenError> {
        self.verify(token, &self.setup)
    }

    fn verify<C: DeserializeOwned>(&self, token: &str, key: &SigningKey) -> Result<C, TokenError> {
        decode::<C>(token, &key.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(reason = %e, "token rejected");
                TokenError::Invalid
            })
    }

    fn window(ttl: Duration) -> (i64, i64) {
        let now = Utc::now();
        (now.timestamp(), (now + ttl).timestamp())
    }
}
