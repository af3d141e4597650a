use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::error::Error;
use std::fmt;

/// Entities the persistence layer can report as missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Ad,
    User,
    Category,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Entity::Ad => "ad",
            Entity::User => "user",
            Entity::Category => "category",
        })
    }
}

/// Classified failure of a persistence workflow.
///
/// The kind is decided where the condition is detected, so callers dispatch on the
/// variant instead of inspecting messages.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// The row being operated on does not exist.
    #[error("{entity} with id {id} does not exist")]
    NotFound { entity: Entity, id: i64 },
    /// A foreign key of the row being written does not resolve.
    #[error("referenced {entity} with id {id} does not exist")]
    MissingReference { entity: Entity, id: i64 },
    /// A unique constraint rejected the write.
    #[error("duplicate value for {field}")]
    Duplicate { field: &'static str },
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;

/// The HTTP-facing error type.
///
/// Every variant renders as `{"error": "<message>"}`.
#[derive(Debug)]
pub enum AppError {
    /// Malformed or missing input, including dangling references.
    BadRequest(String),
    /// Missing or wrong `Key` header.
    Unauthorized,
    NotFound(String),
    Conflict(String),
    /// The request did not finish within `server.request_timeout_secs`.
    Timeout,
    /// Unexpected failure. `message` is what the client sees, `source` is only logged.
    Internal { message: String, source: anyhow::Error },
}

impl AppError {
    pub fn internal(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        AppError::Internal { message: message.into(), source: source.into() }
    }

    /// Translates a persistence failure. `failure` is the client message for storage errors.
    pub fn from_repo(err: RepoError, failure: &str) -> Self {
        match err {
            RepoError::NotFound { entity, .. } => AppError::NotFound(format!("{} not found", entity)),
            RepoError::MissingReference { entity, .. } => {
                AppError::BadRequest(format!("{} does not exist", entity))
            }
            RepoError::Duplicate { field: "email" } => {
                AppError::Conflict("user with this email already exists".into())
            }
            RepoError::Duplicate { field } => AppError::Conflict(format!("duplicate {}", field)),
            RepoError::Storage(e) => AppError::internal(failure, e),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Timeout => StatusCode::REQUEST_TIMEOUT,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Unauthorized => write!(f, "Unauthorized"),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::Timeout => write!(f, "Request timed out"),
            AppError::Internal { message, source } => write!(f, "Internal error: {}: {}", message, source),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AppError::Internal { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::Internal { message, source } => {
                let error_id = uuid::Uuid::new_v4();
                tracing::error!(%error_id, "{}: {:?}", message, source);
                message
            }
            AppError::Unauthorized => "unauthorized".to_string(),
            AppError::Timeout => "request timed out".to_string(),
            AppError::BadRequest(msg) | AppError::NotFound(msg) | AppError::Conflict(msg) => msg,
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// Body of every error response.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    #[schema(example = "ad not found")]
    pub error: String,
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::internal("internal server error", err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::internal("internal server error", err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::internal("internal server error", err)
    }
}

/// A type alias for `Result<T, AppError>`, used throughout the handlers.
pub type AppResult<T> = Result<T, AppError>;

/// Input validation for request payloads. Runs before any storage access.
pub mod validation {
    use super::*;

    pub const MAX_TITLE_CHARS: usize = 200;
    pub const MAX_NAME_CHARS: usize = 100;
    pub const MAX_EMAIL_CHARS: usize = 150;

    pub fn parse_id(raw: &str, what: &str) -> AppResult<i64> {
        raw.trim().parse::<i64>().map_err(|_| AppError::BadRequest(format!("invalid {} id", what)))
    }

    /// Parses a form field holding a foreign-key id.
    pub fn parse_ref_id(raw: Option<&str>, field: &str) -> AppResult<i64> {
        raw.and_then(|v| v.trim().parse::<i64>().ok())
            .ok_or_else(|| AppError::BadRequest(format!("invalid {}", field)))
    }

    pub fn validate_title(title: &str) -> AppResult<()> {
        if title.trim().is_empty() {
            return Err(AppError::BadRequest("title is required".into()));
        }
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(AppError::BadRequest(format!(
                "title must be at most {} characters",
                MAX_TITLE_CHARS
            )));
        }
        Ok(())
    }

    pub fn validate_description(description: &str) -> AppResult<()> {
        if description.trim().is_empty() {
            return Err(AppError::BadRequest("description is required".into()));
        }
        Ok(())
    }

    /// Rejects non-numeric, non-finite and negative prices.
    pub fn parse_price(raw: &str) -> AppResult<f64> {
        match raw.trim().parse::<f64>() {
            Ok(p) if p.is_finite() && p >= 0.0 => Ok(p),
            _ => Err(AppError::BadRequest("invalid price".into())),
        }
    }

    pub fn validate_user_name(name: &str) -> AppResult<()> {
        let len = name.trim().chars().count();
        if len == 0 || name.chars().count() > MAX_NAME_CHARS {
            return Err(AppError::BadRequest(format!(
                "name must be between 1 and {} characters",
                MAX_NAME_CHARS
            )));
        }
        Ok(())
    }

    pub fn validate_email(email: &str) -> AppResult<()> {
        let invalid = || AppError::BadRequest("invalid email".into());
        if email.chars().count() > MAX_EMAIL_CHARS || email.chars().any(char::is_whitespace) {
            return Err(invalid());
        }
        let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
        if local.is_empty() || domain.contains('@') {
            return Err(invalid());
        }
        match domain.rsplit_once('.') {
            Some((host, tld)) if !host.is_empty() && !tld.is_empty() && !host.ends_with('.') => Ok(()),
            _ => Err(invalid()),
        }
    }
}
