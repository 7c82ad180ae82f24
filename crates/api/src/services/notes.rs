//! Note reads and writes.
//!
//! Listing and trending reads go through the [`ResponseCache`]; every write
//! except a view bump drops the cached listings. Notes leave this module
//! enriched with their owner's username.

use std::{collections::HashMap, sync::Arc};

use chrono::Duration;
use shared::api::{NotePage, NoteResponse, VoteResponse};
use uuid::Uuid;

use super::votes::{VoteAction, VoteState, apply_vote};
use crate::{
    cache::{ResponseCache, TRENDING_KEY, listing_key},
    config::Config,
    error::AppError,
    models::{NewNote, Note},
    repos::{NoteRepo, UserRepo, is_unique_violation},
};

/// Shown in place of an owner that no longer resolves.
pub const UNKNOWN_USER: &str = "Unknown User";

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

const TRENDING_WINDOW_DAYS: i64 = 7;
const TRENDING_LIMIT: i64 = 20;

#[derive(Debug, Clone, Copy)]
pub struct CacheTtls {
    pub listing: Duration,
    pub trending: Duration,
}

impl CacheTtls {
    pub fn from_config(config: &Config) -> Self {
        Self {
            listing: Duration::seconds(config.listing_cache_ttl_secs as i64),
            trending: Duration::seconds(config.trending_cache_ttl_secs as i64),
        }
    }
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            listing: Duration::seconds(60),
            trending: Duration::seconds(300),
        }
    }
}

/// Replacement values for an existing note.
#[derive(Debug, Clone)]
pub struct NoteEdit {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub text: String,
    pub completed: bool,
    pub image_url: Option<String>,
}

pub struct NoteService {
    users: Arc<dyn UserRepo>,
    notes: Arc<dyn NoteRepo>,
    cache: ResponseCache,
    ttls: CacheTtls,
}

impl NoteService {
    pub fn new(
        users: Arc<dyn UserRepo>,
        notes: Arc<dyn NoteRepo>,
        cache: ResponseCache,
        ttls: CacheTtls,
    ) -> Self {
        Self {
            users,
            notes,
            cache,
            ttls,
        }
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    /// One newest-first page of all notes.
    pub async fn paginated(
        &self,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> Result<NotePage, AppError> {
        let page = page.unwrap_or(DEFAULT_PAGE);
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        if page < 1 || limit < 1 {
            return Err(AppError::bad_request(
                "Page and limit must be positive integers",
            ));
        }
        let limit = limit.min(MAX_LIMIT);

        let (result, _) = self
            .cache
            .get_or_compute(&listing_key(page, limit), self.ttls.listing, || async {
                let skip = page
                    .checked_sub(1)
                    .and_then(|p| p.checked_mul(limit))
                    .ok_or_else(|| AppError::not_found("No notes found"))?;
                let notes = self.notes.list_page(skip, limit).await?;
                if notes.is_empty() {
                    return Err(AppError::not_found("No notes found"));
                }

                let total = self.notes.count().await?;
                Ok(NotePage {
                    notes: self.enrich(notes).await,
                    current_page: page,
                    total_pages: (total + limit - 1) / limit,
                    total_notes: total,
                })
            })
            .await?;

        Ok(result)
    }

    /// Best notes of the last week. An empty list is not an error.
    pub async fn trending(&self) -> Result<Vec<NoteResponse>, AppError> {
        let since = self.cache.now() - Duration::days(TRENDING_WINDOW_DAYS);

        let (result, _) = self
            .cache
            .get_or_compute(TRENDING_KEY, self.ttls.trending, || async {
                let mut notes = self.notes.trending(since, TRENDING_LIMIT).await?;
                notes.retain(|n| n.created_at >= since);
                notes.sort_by(|a, b| {
                    b.likes
                        .cmp(&a.likes)
                        .then(b.views.cmp(&a.views))
                        .then(b.created_at.cmp(&a.created_at))
                });
                notes.truncate(TRENDING_LIMIT as usize);
                Ok::<_, AppError>(self.enrich(notes).await)
            })
            .await?;

        Ok(result)
    }

    pub async fn get(&self, id: Uuid) -> Result<NoteResponse, AppError> {
        let note = self.find(id).await?;
        Ok(self.enrich(vec![note]).await.remove(0))
    }

    /// Newest-first notes owned by `username`.
    pub async fn by_username(&self, username: &str) -> Result<Vec<NoteResponse>, AppError> {
        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;

        let notes = self.notes.list_by_user(user.id).await?;
        if notes.is_empty() {
            return Err(AppError::not_found("No notes found for this user"));
        }

        Ok(self.enrich(notes).await)
    }

    /// Newest-first notes of everyone `username` follows.
    pub async fn following_feed(&self, username: &str) -> Result<Vec<NoteResponse>, AppError> {
        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;

        let notes = if user.following.is_empty() {
            Vec::new()
        } else {
            self.notes.list_by_users(user.following.clone()).await?
        };
        if notes.is_empty() {
            return Err(AppError::not_found("No notes found from followed users"));
        }

        Ok(self.enrich(notes).await)
    }

    /// Attach owner usernames, looking each distinct owner up once.
    async fn enrich(&self, notes: Vec<Note>) -> Vec<NoteResponse> {
        if notes.is_empty() {
            return Vec::new();
        }

        let mut owner_ids: Vec<Uuid> = notes.iter().map(|n| n.user_id).collect();
        owner_ids.sort_unstable();
        owner_ids.dedup();

        let usernames: HashMap<Uuid, String> = match self.users.find_by_ids(owner_ids).await {
            Ok(users) => users
                .into_iter()
                .filter_map(|u| u.username.map(|name| (u.id, name)))
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "owner lookup failed, usernames left unknown");
                HashMap::new()
            }
        };

        notes
            .into_iter()
            .map(|note| {
                let username = usernames
                    .get(&note.user_id)
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN_USER.to_string());
                note.into_view(username)
            })
            .collect()
    }

    async fn find(&self, id: Uuid) -> Result<Note, AppError> {
        self.notes
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Note not found"))
    }

    // ---------------------------------------------------------------------
    // Writes
    // ---------------------------------------------------------------------

    pub async fn create(&self, new: NewNote) -> Result<Note, AppError> {
        if self.notes.find_by_title(&new.title).await?.is_some() {
            return Err(AppError::conflict("Duplicate note title"));
        }

        let note = self.notes.create(new).await.map_err(|e| {
            if is_unique_violation(&e) {
                AppError::conflict("Duplicate note title")
            } else {
                AppError::Internal(e)
            }
        })?;
        self.cache.invalidate_notes();

        tracing::info!(note_id = %note.id, user_id = %note.user_id, "note created");
        Ok(note)
    }

    pub async fn update(&self, edit: NoteEdit) -> Result<Note, AppError> {
        let mut note = self.find(edit.id).await?;

        let holder = self.notes.find_by_title(&edit.title).await?;
        if holder.is_some_and(|existing| existing.id != edit.id) {
            return Err(AppError::conflict("Duplicate note title"));
        }

        note.user_id = edit.user_id;
        note.title = edit.title;
        note.text = edit.text;
        note.completed = edit.completed;
        note.image_url = edit.image_url;

        let note = self.notes.update(&note).await.map_err(|e| {
            if is_unique_violation(&e) {
                AppError::conflict("Duplicate note title")
            } else {
                AppError::Internal(e)
            }
        })?;
        self.cache.invalidate_notes();

        tracing::info!(note_id = %note.id, "note updated");
        Ok(note)
    }

    /// Delete a note and return what was removed.
    pub async fn delete(&self, id: Uuid) -> Result<Note, AppError> {
        let note = self.find(id).await?;

        if !self.notes.delete(id).await? {
            return Err(AppError::not_found("Note not found"));
        }
        self.cache.invalidate_notes();

        tracing::info!(note_id = %id, "note deleted");
        Ok(note)
    }

    /// Toggle a like or dislike by the account named `username`.
    pub async fn vote(
        &self,
        note_id: Uuid,
        username: &str,
        action: VoteAction,
    ) -> Result<VoteResponse, AppError> {
        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::unauthorized("Unauthorized"))?;

        let mut note = self.find(note_id).await?;
        let outcome = apply_vote(&mut note, user.id, action);

        self.notes
            .save_votes(note.id, note.liked_by, note.disliked_by, note.likes)
            .await?;
        self.cache.invalidate_notes();

        let message = match outcome.state {
            VoteState::Neutral => format!("Note no longer {}", action.past_tense()),
            _ => format!("Note {}", action.past_tense()),
        };
        tracing::info!(%note_id, user_id = %user.id, delta = outcome.delta, "vote applied");

        Ok(VoteResponse {
            message,
            user_id: user.id,
            likes: outcome.likes,
            dislikes: outcome.dislikes,
        })
    }

    /// Count a view unless this browser has already been counted.
    pub async fn record_view(&self, id: Uuid, already_seen: bool) -> Result<i64, AppError> {
        if already_seen {
            return Ok(self.find(id).await?.views);
        }

        self.notes
            .increment_views(id)
            .await?
            .ok_or_else(|| AppError::not_found("Note not found"))
    }
}
