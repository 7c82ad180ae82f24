//! Session endpoints.
//!
//! Flow:
//! 1. `POST /auth` (or `POST /auth/google` for a returning external account)
//!    returns a short-lived access token and sets the refresh token as the
//!    HttpOnly `jwt` cookie
//! 2. A first external login instead returns `{isFirstTimeUser, setupToken}`;
//!    `POST /auth/set-username` trades the setup token plus a username for
//!    the usual session
//! 3. `GET /auth/refresh` mints a new access token from the cookie
//! 4. `POST /auth/logout` clears the cookies
//!
//! Security notes:
//! - Login attempts are limited to 5 per minute per username (Redis counter)
//! - Inactive accounts are refused before the password is checked
//! - The refresh token is not rotated on refresh

use axum::{
    Json, Router, debug_handler,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use garde::Validate;
use shared::api::{
    AccessTokenResponse, ExternalLoginPayload, FirstTimeUserResponse, LoginPayload,
    MessageResponse, SetUsernamePayload,
};

use crate::{
    error::AppError,
    services::{ExternalLogin, TokenPair},
    state::AppState,
};

pub const REFRESH_COOKIE: &str = "jwt";
pub const VISITED_NOTES_COOKIE: &str = "visitedNotes";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(login))
        .route("/refresh", get(refresh))
        .route("/logout", post(logout))
        .route("/google", post(external_login))
        .route("/set-username", post(set_username))
}

/// HttpOnly cookie the web client can send cross-site.
pub(super) fn cross_site_cookie(name: &'static str, value: impl Into<String>) -> Cookie<'static> {
    Cookie::build((name, value.into()))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::None)
        .path("/")
        .build()
}

fn refresh_cookie(state: &AppState, token: String) -> Cookie<'static> {
    let max_age = state.tokens.ttls().refresh.num_seconds();

    let mut cookie = cross_site_cookie(REFRESH_COOKIE, token);
    cookie.set_max_age(time::Duration::seconds(max_age));
    cookie
}

fn session(state: &AppState, jar: CookieJar, pair: TokenPair) -> Response {
    let jar = jar.add(refresh_cookie(state, pair.refresh_token));
    let body = AccessTokenResponse {
        access_token: pair.access_token,
    };
    (jar, Json(body)).into_response()
}

#[debug_handler]
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginPayload>,
) -> Result<Response, AppError> {
    payload.validate().map_err(AppError::validation)?;

    let pair = state.auth.login(&payload.username, &payload.password).await?;

    Ok(session(&state, jar, pair))
}

#[debug_handler]
async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let token = jar.get(REFRESH_COOKIE).map(|c| c.value().to_string());

    let access_token = state.auth.refresh(token.as_deref()).await?;

    Ok(Json(AccessTokenResponse { access_token }))
}

/// Idempotent: without a session cookie there is nothing to clear.
#[debug_handler]
async fn logout(jar: CookieJar) -> Response {
    if jar.get(REFRESH_COOKIE).is_none() {
        return StatusCode::NO_CONTENT.into_response();
    }

    let jar = jar
        .remove(cross_site_cookie(REFRESH_COOKIE, ""))
        .remove(cross_site_cookie(VISITED_NOTES_COOKIE, ""));

    (jar, Json(MessageResponse::new("Cookie cleared"))).into_response()
}

#[debug_handler]
async fn external_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<ExternalLoginPayload>,
) -> Result<Response, AppError> {
    payload.validate().map_err(AppError::validation)?;

    match state.auth.external_login(&payload.name, &payload.email).await? {
        ExternalLogin::FirstTime { setup_token } => Ok(Json(FirstTimeUserResponse {
            is_first_time_user: true,
            setup_token,
        })
        .into_response()),
        ExternalLogin::Authenticated(pair) => Ok(session(&state, jar, pair)),
    }
}

#[debug_handler]
async fn set_username(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<SetUsernamePayload>,
) -> Result<Response, AppError> {
    payload.validate().map_err(AppError::validation)?;

    let pair = state
        .auth
        .complete_setup(&payload.username, &payload.setup_token)
        .await?;

    Ok(session(&state, jar, pair))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ErrorKind,
        models::{AuthMethod, User},
        repos::MockUserRepo,
        services::MockPasswordHasher,
        stores::{MockRateLimiter, RateLimitResult},
        test_utils::{TestStateBuilder, cookie_jar, mock_user, test_tokens},
    };
    use axum::http::header::SET_COOKIE;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn set_cookies(response: &Response) -> Vec<String> {
        response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    fn allow_all() -> MockRateLimiter {
        let mut limiter = MockRateLimiter::new();
        limiter
            .expect_check_simple()
            .returning(|_, _, _| Ok(RateLimitResult::Allowed(1)));
        limiter
    }

    #[tokio::test]
    async fn login_sets_refresh_cookie_and_returns_access_token() {
        let mut users = MockUserRepo::new();
        users
            .expect_find_by_username()
            .returning(|_| Ok(Some(mock_user("alice"))));
        let mut hasher = MockPasswordHasher::new();
        hasher.expect_verify().returning(|_, _| Ok(true));

        let state = TestStateBuilder::new()
            .with_user_repo(users)
            .with_rate_limiter(allow_all())
            .with_hasher(hasher)
            .build();

        let response = login(
            State(state),
            CookieJar::new(),
            Json(LoginPayload {
                username: "alice".into(),
                password: "secret".into(),
            }),
        )
        .await
        .unwrap();

        let cookies = set_cookies(&response);
        assert_eq!(cookies.len(), 1);
        let cookie = &cookies[0];
        assert!(cookie.starts_with("jwt="));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=None"));
        assert!(cookie.contains("Max-Age=604800"));

        let body = body_json(response).await;
        let access = body["accessToken"].as_str().unwrap();
        assert_eq!(
            test_tokens().verify_access(access).unwrap().user_info.username,
            "alice"
        );
    }

    #[tokio::test]
    async fn login_with_missing_password_is_bad_request() {
        let state = TestStateBuilder::new().build();

        let Err(err) = login(
            State(state),
            CookieJar::new(),
            Json(LoginPayload {
                username: "alice".into(),
                password: String::new(),
            }),
        )
        .await
        else {
            panic!("expected validation error");
        };

        assert_eq!(err.kind(), Some(ErrorKind::BadRequest));
    }

    #[tokio::test]
    async fn refresh_without_cookie_is_unauthorized() {
        let state = TestStateBuilder::new().build();

        let Err(err) = refresh(State(state), CookieJar::new()).await else {
            panic!("expected unauthorized");
        };

        assert_eq!(err.kind(), Some(ErrorKind::Unauthorized));
    }

    #[tokio::test]
    async fn refresh_with_tampered_cookie_is_forbidden() {
        let state = TestStateBuilder::new().build();
        let mut token = test_tokens().issue_refresh_token("alice").unwrap();
        token.push('x');
        let jar = cookie_jar(&[(REFRESH_COOKIE, &token)]);

        let Err(err) = refresh(State(state), jar).await else {
            panic!("expected forbidden");
        };

        assert_eq!(err.kind(), Some(ErrorKind::Forbidden));
    }

    #[tokio::test]
    async fn refresh_with_valid_cookie_returns_access_token() {
        let mut users = MockUserRepo::new();
        users
            .expect_find_by_username()
            .returning(|_| Ok(Some(mock_user("alice"))));
        let state = TestStateBuilder::new().with_user_repo(users).build();
        let token = test_tokens().issue_refresh_token("alice").unwrap();
        let jar = cookie_jar(&[(REFRESH_COOKIE, &token)]);

        let response = refresh(State(state), jar)
            .await
            .unwrap()
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_json(response).await["accessToken"].is_string());
    }

    #[tokio::test]
    async fn logout_without_cookie_is_no_content() {
        let response = logout(CookieJar::new()).await;

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(set_cookies(&response).is_empty());
    }

    #[tokio::test]
    async fn logout_clears_session_and_visit_cookies() {
        let jar = cookie_jar(&[(REFRESH_COOKIE, "token"), (VISITED_NOTES_COOKIE, "a")]);

        let response = logout(jar).await;

        assert_eq!(response.status(), StatusCode::OK);
        let cookies = set_cookies(&response);
        for name in [REFRESH_COOKIE, VISITED_NOTES_COOKIE] {
            let removal = cookies
                .iter()
                .find(|c| c.starts_with(&format!("{name}=;")))
                .unwrap();
            assert!(removal.contains("Max-Age=0"));
            assert!(removal.contains("HttpOnly"));
            assert!(removal.contains("SameSite=None"));
            assert!(removal.contains("Secure"));
            assert!(removal.contains("Path=/"));
        }
        assert_eq!(body_json(response).await["message"], "Cookie cleared");
    }

    #[tokio::test]
    async fn first_external_login_returns_setup_token_without_cookie() {
        let mut users = MockUserRepo::new();
        users.expect_find_by_email().returning(|_| Ok(None));
        users.expect_create().returning(|new| {
            Ok(User {
                username: None,
                is_temporary: true,
                auth_method: AuthMethod::Google,
                email: new.email,
                ..mock_user("unused")
            })
        });
        let mut hasher = MockPasswordHasher::new();
        hasher.expect_hash().returning(|_| Ok("h".into()));

        let state = TestStateBuilder::new()
            .with_user_repo(users)
            .with_hasher(hasher)
            .build();

        let response = external_login(
            State(state),
            CookieJar::new(),
            Json(ExternalLoginPayload {
                name: "Gee".into(),
                email: "g@example.com".into(),
            }),
        )
        .await
        .unwrap();

        assert!(set_cookies(&response).is_empty());
        let body = body_json(response).await;
        assert_eq!(body["isFirstTimeUser"], true);
        assert!(body["setupToken"].is_string());
    }

    #[tokio::test]
    async fn set_username_completes_onboarding_with_session() {
        let pending = User {
            username: None,
            is_temporary: true,
            auth_method: AuthMethod::Google,
            ..mock_user("unused")
        };
        let setup_token = test_tokens().issue_setup_token(pending.id).unwrap();

        let mut users = MockUserRepo::new();
        users
            .expect_find_by_id()
            .returning(move |_| Ok(Some(pending.clone())));
        users.expect_username_taken().returning(|_, _| Ok(false));
        users.expect_update().returning(|u| Ok(u.clone()));

        let state = TestStateBuilder::new().with_user_repo(users).build();

        let response = set_username(
            State(state),
            CookieJar::new(),
            Json(SetUsernamePayload {
                username: "gee".into(),
                setup_token,
            }),
        )
        .await
        .unwrap();

        assert_eq!(set_cookies(&response).len(), 1);
        assert!(body_json(response).await["accessToken"].is_string());
    }
}
