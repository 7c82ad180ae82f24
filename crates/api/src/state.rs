use std::sync::Arc;

use crate::{
    config::Config,
    repos::Repos,
    services::{AuthFlow, NoteService, ObjectStore, PasswordHasher, TokenService},
    stores::Stores,
};

#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Database repositories.
    pub repos: Repos,
    /// Ephemeral stores (Redis).
    pub stores: Stores,
    /// JWT issuing and verification.
    pub tokens: Arc<TokenService>,
    /// Password hashing.
    pub hasher: Arc<dyn PasswordHasher>,
    /// Image storage (S3).
    pub storage: Arc<dyn ObjectStore>,
    /// Cached note reads and note writes.
    pub notes: Arc<NoteService>,
    /// Login, onboarding and refresh flows.
    pub auth: Arc<AuthFlow>,
}
