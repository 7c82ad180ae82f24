use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use shared::api::MessageResponse;

/// Client-visible failure categories. Mapped to a status code only in `IntoResponse`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed input.
    BadRequest,
    /// Missing or invalid credentials, or no session.
    Unauthorized,
    /// Token present but invalid, expired, or owned by someone else.
    Forbidden,
    NotFound,
    /// Uniqueness violation.
    Conflict,
    TooManyRequests,
}

impl ErrorKind {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

#[derive(Debug)]
pub enum AppError {
    /// Unexpected persistence/storage failures - logged, reported, returned as 500
    Internal(anyhow::Error),
    /// Expected failures with a message that is safe to show
    External(ErrorKind, String),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::External(ErrorKind::BadRequest, message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::External(ErrorKind::Unauthorized, message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::External(ErrorKind::Forbidden, message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::External(ErrorKind::NotFound, message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::External(ErrorKind::Conflict, message.into())
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::External(ErrorKind::TooManyRequests, message.into())
    }

    /// Garde validation report as a 400.
    pub fn validation(report: garde::Report) -> Self {
        Self::bad_request(report.to_string())
    }

    /// `None` for internal errors.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            AppError::Internal(_) => None,
            AppError::External(kind, _) => Some(*kind),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Internal(err) => {
                tracing::error!("internal error: {:?}", err);
                sentry::capture_error(
                    err.as_ref() as &(dyn std::error::Error + Send + Sync + 'static)
                );

                // The underlying message is surfaced; callers are trusted first-party clients.
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(MessageResponse::new(err.to_string())),
                )
                    .into_response()
            }
            AppError::External(kind, message) => {
                (kind.status(), Json(MessageResponse::new(message))).into_response()
            }
        }
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Internal(err.into())
    }
}
