use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

/// Every failure a request can end in. Handlers return [`AppResult`] and let
/// `IntoResponse` turn the error into `{"error": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    #[error("{0}")]
    Conflict(String),

    #[error("authentication required")]
    Unauthorized,

    #[error("operation not allowed for role {role}")]
    Forbidden { role: String },

    /// Find-or-create of a brand or variant failed during ingress.
    #[error("could not create brand/variant: {0}")]
    Catalog(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::Catalog(_) | AppError::Database(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message shown to the caller. Persistence causes stay in the log.
    fn public_message(&self) -> String {
        match self {
            AppError::Catalog(_) => "could not create brand/variant".to_string(),
            AppError::Database(_) => "database error".to_string(),
            AppError::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("request failed: {}", self);
        }
        let body = json!({ "error": self.public_message() });
        (status, Json(body)).into_response()
    }
}

impl From<askama::Error> for AppError {
    fn from(err: askama::Error) -> Self {
        AppError::Internal(format!("template rendering failed: {}", err))
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::Internal(format!("csv export failed: {}", err))
    }
}

/// Turns a unique-index violation into a `Conflict` carrying `message`.
pub fn map_unique_violation(err: sqlx::Error, message: impl FnOnce() -> String) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return AppError::Conflict(message());
        }
    }
    AppError::Database(err)
}
