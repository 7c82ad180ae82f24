use serde::{Deserialize, Serialize};

fn default_allowed_origins() -> String {
    "http://localhost:3000".to_string()
}

fn default_listing_cache_ttl() -> u64 {
    60
}

fn default_trending_cache_ttl() -> u64 {
    300
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub redis_url: String,
    /// Signs access tokens (15 minutes).
    pub access_token_secret: String,
    /// Signs refresh tokens (7 days).
    pub refresh_token_secret: String,
    /// Signs username setup tokens for first-time external logins.
    pub temp_token_secret: String,
    /// S3 bucket holding note images.
    pub bucket_name: String,
    pub region: String,
    /// Base URL used to build public image links. Defaults to the bucket's S3 endpoint.
    #[serde(default)]
    pub public_bucket_url: Option<String>,
    /// Comma-separated list of origins allowed to make credentialed requests.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: String,
    #[serde(default = "default_listing_cache_ttl")]
    pub listing_cache_ttl_secs: u64,
    #[serde(default = "default_trending_cache_ttl")]
    pub trending_cache_ttl_secs: u64,
    /// Set to "production" for JSON logging, anything else for human-readable.
    #[serde(default)]
    pub env: String,
    /// Sentry DSN for error tracking
    #[serde(default)]
    pub sentry_dsn: Option<String>,
}

impl Config {
    pub fn is_production(&self) -> bool {
        self.env == "production"
    }

    pub fn allowed_origins(&self) -> Vec<String> {
        self.allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn public_bucket_url(&self) -> String {
        match &self.public_bucket_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}.s3.{}.amazonaws.com", self.bucket_name, self.region),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::test_utils::test_config;

    #[test]
    fn allowed_origins_splits_and_trims() {
        let mut config = test_config();
        config.allowed_origins = "http://localhost:3000, https://notes.example.com,".into();

        assert_eq!(
            config.allowed_origins(),
            vec!["http://localhost:3000", "https://notes.example.com"]
        );
    }

    #[test]
    fn public_bucket_url_falls_back_to_s3_endpoint() {
        let mut config = test_config();
        config.public_bucket_url = None;
        assert_eq!(
            config.public_bucket_url(),
            "https://test-bucket.s3.us-east-1.amazonaws.com"
        );

        config.public_bucket_url = Some("https://cdn.example.com/".into());
        assert_eq!(config.public_bucket_url(), "https://cdn.example.com");
    }
}
