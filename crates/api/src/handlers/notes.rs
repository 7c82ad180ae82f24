//! Notes: listings, CRUD, votes and views.
//!
//! Endpoints:
//! - GET /notes?page=&limit= - Paginated listing (cached)
//! - POST /notes - Create a note
//! - PATCH /notes - Update a note
//! - DELETE /notes - Delete a note
//! - GET /notes/trending - Best notes of the last week (cached)
//! - GET /notes/{id} - Single note
//! - PATCH /notes/{id}/like, /notes/{id}/dislike - Toggle a vote
//! - PATCH /notes/{id}/view - Count a view once per browser
//! - GET /notes/user/{username} - Notes of one user
//! - GET /notes/following/{username} - Notes of everyone a user follows

use axum::{
    Json, Router, debug_handler,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
};
use axum_extra::extract::cookie::CookieJar;
use garde::Validate;
use shared::api::{
    CreateNotePayload, DeleteByIdPayload, MessageResponse, PaginationQuery, UpdateNotePayload,
    ViewResponse,
};
use uuid::Uuid;

use super::auth::{VISITED_NOTES_COOKIE, cross_site_cookie};
use crate::{
    error::AppError,
    middleware::auth::AuthUser,
    models::NewNote,
    services::{NoteEdit, VoteAction},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(list_notes)
                .post(create_note)
                .patch(update_note)
                .delete(delete_note),
        )
        .route("/trending", get(trending_notes))
        .route("/{id}", get(get_note))
        .route("/{id}/like", patch(like_note))
        .route("/{id}/dislike", patch(dislike_note))
        .route("/{id}/view", patch(view_note))
        .route("/user/{username}", get(user_notes))
        .route("/following/{username}", get(following_notes))
}

fn required<T>(value: Option<T>) -> Result<T, AppError> {
    value.ok_or_else(|| AppError::bad_request("All fields are required"))
}

#[debug_handler]
async fn list_notes(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = state.notes.paginated(query.page, query.limit).await?;
    Ok(Json(page))
}

#[debug_handler]
async fn trending_notes(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.notes.trending().await?))
}

#[debug_handler]
async fn get_note(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.notes.get(id).await?))
}

#[debug_handler]
async fn user_notes(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.notes.by_username(&username).await?))
}

#[debug_handler]
async fn following_notes(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.notes.following_feed(&username).await?))
}

#[debug_handler]
async fn create_note(
    _user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateNotePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::validation)?;

    state
        .notes
        .create(NewNote {
            user_id: required(payload.user)?,
            title: payload.title,
            text: payload.text,
            image_url: payload.image_url,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("New note created")),
    ))
}

#[debug_handler]
async fn update_note(
    _user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateNotePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::validation)?;

    let note = state
        .notes
        .update(NoteEdit {
            id: required(payload.id)?,
            user_id: required(payload.user)?,
            title: payload.title,
            text: payload.text,
            completed: required(payload.completed)?,
            image_url: payload.image_url,
        })
        .await?;

    Ok(Json(MessageResponse::new(format!("'{}' updated", note.title))))
}

#[debug_handler]
async fn delete_note(
    _user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<DeleteByIdPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::validation)?;

    let note = state.notes.delete(required(payload.id)?).await?;

    Ok(Json(MessageResponse::new(format!(
        "Note '{}' with ID {} deleted",
        note.title, note.id
    ))))
}

#[debug_handler]
async fn like_note(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let response = state
        .notes
        .vote(id, &user.username, VoteAction::Like)
        .await?;
    Ok(Json(response))
}

#[debug_handler]
async fn dislike_note(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let response = state
        .notes
        .vote(id, &user.username, VoteAction::Dislike)
        .await?;
    Ok(Json(response))
}

/// Most recent ids kept in `visitedNotes`; keeps the cookie under 4 KB.
const MAX_VISITED_NOTES: usize = 100;

/// Note ids this browser has already been counted for.
fn visited(jar: &CookieJar) -> Vec<String> {
    jar.get(VISITED_NOTES_COOKIE)
        .map(|c| {
            c.value()
                .split(',')
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[debug_handler]
async fn view_note(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut seen = visited(&jar);
    let already_seen = seen.contains(&id.to_string());

    let views = state.notes.record_view(id, already_seen).await?;

    let jar = if already_seen {
        jar
    } else {
        seen.push(id.to_string());
        let overflow = seen.len().saturating_sub(MAX_VISITED_NOTES);
        seen.drain(..overflow);
        let mut cookie = cross_site_cookie(VISITED_NOTES_COOKIE, seen.join(","));
        cookie.set_max_age(time::Duration::days(1));
        jar.add(cookie)
    };

    Ok((jar, Json(ViewResponse { views })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ErrorKind,
        models::Note,
        repos::{MockNoteRepo, MockUserRepo},
        test_utils::{TestStateBuilder, cookie_jar, mock_note, mock_user},
    };
    use axum::{http::header::SET_COOKIE, response::Response};
    use http_body_util::BodyExt;
    use mockall::predicate::eq;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn auth(username: &str) -> AuthUser {
        AuthUser {
            username: username.to_string(),
            roles: vec!["Employee".to_string()],
        }
    }

    #[tokio::test]
    async fn list_notes_returns_page_with_usernames() {
        let owner = mock_user("alice");
        let owner_id = owner.id;

        let mut users = MockUserRepo::new();
        users
            .expect_find_by_ids()
            .returning(move |_| Ok(vec![owner.clone()]));
        let mut notes = MockNoteRepo::new();
        notes
            .expect_list_page()
            .with(eq(0), eq(10))
            .returning(move |_, _| Ok(vec![mock_note(owner_id, "hello")]));
        notes.expect_count().returning(|| Ok(1));

        let state = TestStateBuilder::new()
            .with_user_repo(users)
            .with_note_repo(notes)
            .build();

        let response = list_notes(State(state), Query(PaginationQuery::default()))
            .await
            .unwrap()
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["currentPage"], 1);
        assert_eq!(body["totalPages"], 1);
        assert_eq!(body["totalNotes"], 1);
        assert_eq!(body["notes"][0]["username"], "alice");
        assert_eq!(body["notes"][0]["title"], "hello");
    }

    #[tokio::test]
    async fn create_note_returns_created() {
        let mut notes = MockNoteRepo::new();
        notes.expect_find_by_title().returning(|_| Ok(None));
        notes
            .expect_create()
            .times(1)
            .returning(|new| Ok(mock_note(new.user_id, &new.title)));

        let state = TestStateBuilder::new().with_note_repo(notes).build();

        let response = create_note(
            auth("alice"),
            State(state),
            Json(CreateNotePayload {
                user: Some(Uuid::new_v4()),
                title: "Groceries".into(),
                text: "milk".into(),
                image_url: None,
            }),
        )
        .await
        .unwrap()
        .into_response();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_json(response).await["message"], "New note created");
    }

    #[tokio::test]
    async fn create_note_without_title_is_bad_request() {
        let state = TestStateBuilder::new().build();

        let Err(err) = create_note(
            auth("alice"),
            State(state),
            Json(CreateNotePayload {
                user: Some(Uuid::new_v4()),
                title: String::new(),
                text: "milk".into(),
                image_url: None,
            }),
        )
        .await
        else {
            panic!("expected validation error");
        };

        assert_eq!(err.kind(), Some(ErrorKind::BadRequest));
    }

    #[tokio::test]
    async fn delete_note_reports_title_and_id() {
        let note = mock_note(Uuid::new_v4(), "Old");
        let id = note.id;

        let mut notes = MockNoteRepo::new();
        notes
            .expect_find_by_id()
            .with(eq(id))
            .returning(move |_| Ok(Some(note.clone())));
        notes.expect_delete().with(eq(id)).returning(|_| Ok(true));

        let state = TestStateBuilder::new().with_note_repo(notes).build();

        let response = delete_note(
            auth("alice"),
            State(state),
            Json(DeleteByIdPayload { id: Some(id) }),
        )
        .await
        .unwrap()
        .into_response();

        assert_eq!(
            body_json(response).await["message"],
            format!("Note 'Old' with ID {id} deleted")
        );
    }

    #[tokio::test]
    async fn like_uses_identity_from_token() {
        let voter = mock_user("bob");
        let voter_id = voter.id;
        let note = mock_note(Uuid::new_v4(), "n");
        let note_id = note.id;

        let mut users = MockUserRepo::new();
        users
            .expect_find_by_username()
            .with(eq("bob"))
            .returning(move |_| Ok(Some(voter.clone())));
        let mut notes = MockNoteRepo::new();
        notes
            .expect_find_by_id()
            .returning(move |_| Ok(Some(note.clone())));
        notes
            .expect_save_votes()
            .returning(|_, _, _, _| Ok(()));

        let state = TestStateBuilder::new()
            .with_user_repo(users)
            .with_note_repo(notes)
            .build();

        let response = like_note(auth("bob"), State(state), Path(note_id))
            .await
            .unwrap()
            .into_response();

        let body = body_json(response).await;
        assert_eq!(body["userId"], voter_id.to_string());
        assert_eq!(body["likes"], 1);
        assert_eq!(body["dislikes"], 0);
    }

    #[tokio::test]
    async fn vote_on_missing_note_is_not_found() {
        let mut users = MockUserRepo::new();
        users
            .expect_find_by_username()
            .returning(|_| Ok(Some(mock_user("bob"))));
        let mut notes = MockNoteRepo::new();
        notes.expect_find_by_id().returning(|_| Ok(None));
        notes.expect_save_votes().never();

        let state = TestStateBuilder::new()
            .with_user_repo(users)
            .with_note_repo(notes)
            .build();

        let Err(err) = dislike_note(auth("bob"), State(state), Path(Uuid::new_v4())).await else {
            panic!("expected not found");
        };

        assert_eq!(err.kind(), Some(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn first_view_increments_and_remembers_note() {
        let id = Uuid::new_v4();
        let mut notes = MockNoteRepo::new();
        notes
            .expect_increment_views()
            .with(eq(id))
            .times(1)
            .returning(|_| Ok(Some(1)));

        let state = TestStateBuilder::new().with_note_repo(notes).build();

        let response = view_note(State(state), CookieJar::new(), Path(id))
            .await
            .unwrap()
            .into_response();

        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(cookie.starts_with(&format!("visitedNotes={id}")));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=None"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("Path=/"));
        assert_eq!(body_json(response).await["views"], 1);
    }

    #[tokio::test]
    async fn repeat_view_does_not_increment() {
        let note = mock_note(Uuid::new_v4(), "n");
        let id = note.id;
        let mut notes = MockNoteRepo::new();
        notes.expect_increment_views().never();
        notes
            .expect_find_by_id()
            .returning(move |_| Ok(Some(Note { views: 4, ..note.clone() })));

        let state = TestStateBuilder::new().with_note_repo(notes).build();
        let jar = cookie_jar(&[(VISITED_NOTES_COOKIE, &format!("{},{id}", Uuid::new_v4()))]);

        let response = view_note(State(state), jar, Path(id))
            .await
            .unwrap()
            .into_response();

        assert!(response.headers().get(SET_COOKIE).is_none());
        assert_eq!(body_json(response).await["views"], 4);
    }

    #[tokio::test]
    async fn visited_list_keeps_only_most_recent_ids() {
        let id = Uuid::new_v4();
        let mut notes = MockNoteRepo::new();
        notes.expect_increment_views().returning(|_| Ok(Some(1)));

        let state = TestStateBuilder::new().with_note_repo(notes).build();
        let earlier: Vec<String> = (0..MAX_VISITED_NOTES)
            .map(|_| Uuid::new_v4().to_string())
            .collect();
        let jar = cookie_jar(&[(VISITED_NOTES_COOKIE, &earlier.join(","))]);

        let response = view_note(State(state), jar, Path(id))
            .await
            .unwrap()
            .into_response();

        let cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        let value = cookie
            .strip_prefix("visitedNotes=")
            .and_then(|rest| rest.split(';').next())
            .unwrap();
        let ids: Vec<&str> = value.split(',').collect();

        assert_eq!(ids.len(), MAX_VISITED_NOTES);
        assert!(!ids.contains(&earlier[0].as_str()));
        assert_eq!(ids[0], earlier[1]);
        assert_eq!(ids.last().copied(), Some(id.to_string().as_str()));
        assert!(cookie.len() < 4096);
    }
}
