//! HTTP error mapping.
//!
//! Every failure leaves a handler as [`AppError`] and is rendered as
//! `{ "error": …, "code": … }`, plus `"retryable": true` for rolled-back
//! structural writes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use coursepath_core::error::CoreError;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type AppResult<T> = Result<T, AppError>;

const INTERNAL_MESSAGE: &str = "An internal error occurred";

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    retryable: bool,
}

impl ErrorBody {
    fn new(code: &'static str, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code,
            retryable: false,
        }
    }

    fn internal() -> Self {
        Self::new("INTERNAL_ERROR", INTERNAL_MESSAGE)
    }
}

impl AppError {
    /// Classify an error raised by a transactional structural write.
    ///
    /// Input rejected mid-transaction carries its [`CoreError`] through
    /// `sqlx::Error::Encode` and is surfaced as-is. Duplicate keys stay
    /// conflicts. Any other failure means the transaction was dropped and
    /// rolled back, which the caller may retry.
    pub fn from_structural(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Encode(inner) => match inner.downcast::<CoreError>() {
                Ok(core) => AppError::Core(*core),
                Err(other) => AppError::Core(CoreError::TransactionAborted(other.to_string())),
            },
            err if coursepath_db::is_unique_violation(&err) => AppError::Database(err),
            other => {
                tracing::warn!(error = %other, "Structural transaction rolled back");
                AppError::Core(CoreError::TransactionAborted(other.to_string()))
            }
        }
    }

    fn render(&self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Core(core) => render_core(core),
            AppError::Database(err) => render_sqlx(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.render();
        (status, Json(body)).into_response()
    }
}

fn render_core(err: &CoreError) -> (StatusCode, ErrorBody) {
    match err {
        CoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            ErrorBody::new("NOT_FOUND", format!("{entity} with id {id} not found")),
        ),
        CoreError::Validation(msg) => (
            StatusCode::BAD_REQUEST,
            ErrorBody::new("VALIDATION_ERROR", msg.as_str()),
        ),
        CoreError::Conflict(msg) => (StatusCode::CONFLICT, ErrorBody::new("CONFLICT", msg.as_str())),
        CoreError::TransactionAborted(msg) => {
            tracing::warn!(error = %msg, "Transaction aborted");
            let mut body = ErrorBody::new(
                "TRANSACTION_ABORTED",
                "The change was rolled back; retry the request",
            );
            body.retryable = true;
            (StatusCode::SERVICE_UNAVAILABLE, body)
        }
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            (StatusCode::INTERNAL_SERVER_ERROR, ErrorBody::internal())
        }
    }
}

/// `RowNotFound` is a 404 and a duplicate on a `uq_` constraint a 409.
/// Anything else is logged and hidden behind a 500.
fn render_sqlx(err: &sqlx::Error) -> (StatusCode, ErrorBody) {
    if matches!(err, sqlx::Error::RowNotFound) {
        return (
            StatusCode::NOT_FOUND,
            ErrorBody::new("NOT_FOUND", "Resource not found"),
        );
    }
    if coursepath_db::is_unique_violation(err) {
        if let sqlx::Error::Database(db_err) = err {
            let constraint = db_err.constraint().unwrap_or("unknown");
            if constraint.starts_with("uq_") {
                return (
                    StatusCode::CONFLICT,
                    ErrorBody::new(
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    ),
                );
            }
        }
    }
    tracing::error!(error = %err, "Database error");
    (StatusCode::INTERNAL_SERVER_ERROR, ErrorBody::internal())
}
