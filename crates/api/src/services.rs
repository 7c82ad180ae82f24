//! Business services and external service abstractions.
//!
//! Collaborators the API talks to (object storage, password hashing) are
//! abstracted behind traits to enable mocking in tests. The note and auth
//! services hold the request-independent logic handlers delegate to.
//!
//! ## Services
//!
//! - **tokens** - JWT issuing/verification (access, refresh, setup)
//! - **password** - Argon2 password hashing
//! - **storage** - Image objects in S3
//! - **votes** - Like/dislike toggle transitions
//! - **notes** - Cached note listings, enrichment and note mutations
//! - **auth** - Login, external login onboarding, refresh
//!
//! ## Usage in Handlers
//!
//! ```ignore
//! async fn handler(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
//!     let page = state.notes.paginated(query.page, query.limit).await?;
//!     let pair = state.auth.login(&payload.username, &payload.password).await?;
//!     let url = state.storage.put_object(&key, bytes, "image/png").await?;
//! }
//! ```

mod auth;
mod notes;
mod password;
mod storage;
mod tokens;
mod votes;

pub use auth::{AuthFlow, ExternalLogin, TokenPair};
pub use notes::{CacheTtls, NoteEdit, NoteService};
pub use password::{Argon2Hasher, PasswordHasher};
pub use storage::{ObjectStore, S3ObjectStore};
pub use tokens::{TokenService, TokenTtls};
pub use votes::VoteAction;

#[cfg(test)]
pub use password::MockPasswordHasher;
#[cfg(test)]
pub use storage::MockObjectStore;
