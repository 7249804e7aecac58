use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

pub type AppResult<T> = Result<T, AppError>;

/// Request-level failures and their wire mapping.
///
/// Authorization failures are deliberately opaque: the response never says
/// which check failed (missing cookie, unknown credential, ownership
/// mismatch all collapse to the same `Unauthorized` tag).
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("user not found")]
    UserNotFound,
    #[error("group not found")]
    GroupNotFound,
    #[error("person not found")]
    PersonNotFound,
    #[error("email already registered")]
    EmailInUse,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("rate limited")]
    RateLimited,
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("database error")]
    Database(#[from] sqlx::Error),
    #[error("internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::FORBIDDEN,
            AppError::UserNotFound | AppError::GroupNotFound | AppError::PersonNotFound => {
                StatusCode::NOT_FOUND
            }
            AppError::EmailInUse => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Configuration(_) | AppError::Database(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn tag(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "Unauthorized",
            AppError::UserNotFound => "UserNotFound",
            AppError::GroupNotFound => "GroupNotFound",
            AppError::PersonNotFound => "PersonNotFound",
            AppError::EmailInUse => "EmailInUse",
            AppError::BadRequest(_) => "BadRequest",
            AppError::RateLimited => "RateLimited",
            AppError::Configuration(_) | AppError::Database(_) | AppError::Internal(_) => {
                "InternalServerError"
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    #[serde(rename = "_tag")]
    tag: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // 5xx detail stays in the logs; the body only carries the tag.
        match &self {
            AppError::Configuration(_) | AppError::Database(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "request failed");
            }
            _ => {}
        }

        // Only validation errors carry a message; everything else is tag-only.
        let message = match &self {
            AppError::BadRequest(msg) => Some(msg.clone()),
            _ => None,
        };

        let payload = ErrorBody {
            tag: self.tag(),
            message,
        };

        (self.status(), Json(payload)).into_response()
    }
}
