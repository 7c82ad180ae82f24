//! Like/dislike toggling.
//!
//! A user's vote on a note is one of three states. Liking a liked note or
//! disliking a disliked note withdraws the vote; voting the other way switches
//! sides. `Note::likes` is always recomputed from the membership sets.

use uuid::Uuid;

use crate::models::Note;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteAction {
    Like,
    Dislike,
}

impl VoteAction {
    pub fn past_tense(self) -> &'static str {
        match self {
            VoteAction::Like => "liked",
            VoteAction::Dislike => "disliked",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteState {
    Neutral,
    Liked,
    Disliked,
}

impl VoteState {
    fn contribution(self) -> i64 {
        match self {
            VoteState::Neutral => 0,
            VoteState::Liked => 1,
            VoteState::Disliked => -1,
        }
    }

    fn of(note: &Note, user_id: Uuid) -> Self {
        if note.liked_by.contains(&user_id) {
            VoteState::Liked
        } else if note.disliked_by.contains(&user_id) {
            VoteState::Disliked
        } else {
            VoteState::Neutral
        }
    }
}

/// Next state and the change in net likes.
pub fn transition(state: VoteState, action: VoteAction) -> (VoteState, i64) {
    let next = match (state, action) {
        (VoteState::Liked, VoteAction::Like) | (VoteState::Disliked, VoteAction::Dislike) => {
            VoteState::Neutral
        }
        (_, VoteAction::Like) => VoteState::Liked,
        (_, VoteAction::Dislike) => VoteState::Disliked,
    };
    (next, next.contribution() - state.contribution())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteOutcome {
    pub state: VoteState,
    pub delta: i64,
    pub likes: i64,
    pub dislikes: i64,
}

/// Apply `action` by `user_id` to `note` in memory.
pub fn apply_vote(note: &mut Note, user_id: Uuid, action: VoteAction) -> VoteOutcome {
    let (state, delta) = transition(VoteState::of(note, user_id), action);

    note.liked_by.retain(|id| *id != user_id);
    note.disliked_by.retain(|id| *id != user_id);
    match state {
        VoteState::Liked => note.liked_by.push(user_id),
        VoteState::Disliked => note.disliked_by.push(user_id),
        VoteState::Neutral => {}
    }

    note.likes = note.liked_by.len() as i64 - note.disliked_by.len() as i64;

    VoteOutcome {
        state,
        delta,
        likes: note.likes,
        dislikes: note.disliked_by.len() as i64,
    }
}
