//! Tests for `AppError` → HTTP response mapping.
//!
//! These call `IntoResponse` directly on `AppError` values; no HTTP server
//! or database is involved.

use assert_matches::assert_matches;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use coursepath_api::error::AppError;
use coursepath_core::error::CoreError;
use http_body_util::BodyExt;

/// Helper: convert an `AppError` into its status code and parsed JSON body.
async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

#[tokio::test]
async fn not_found_error_returns_404() {
    let err = AppError::Core(CoreError::NotFound {
        entity: "Section",
        id: 42,
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["error"], "Section with id 42 not found");
}

#[tokio::test]
async fn validation_error_returns_400() {
    let err = AppError::Core(CoreError::Validation("number must be >= 1, got 0".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"], "number must be >= 1, got 0");
}

#[tokio::test]
async fn conflict_error_returns_409() {
    let err = AppError::Core(CoreError::Conflict("Section 3 is not complete".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "CONFLICT");
}

#[tokio::test]
async fn transaction_aborted_returns_503_and_is_retryable() {
    let err = AppError::Core(CoreError::TransactionAborted("deadlock detected".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["code"], "TRANSACTION_ABORTED");
    assert_eq!(json["retryable"], true);
    assert!(!json["error"].as_str().unwrap().contains("deadlock"));
}

#[tokio::test]
async fn non_retryable_errors_omit_retryable_flag() {
    let (_, json) = error_to_response(CoreError::Validation("nope".into()).into()).await;
    assert!(json.get("retryable").is_none());
}

#[tokio::test]
async fn internal_core_error_returns_500_and_sanitizes_message() {
    let err = AppError::from(CoreError::Internal("secret database credentials leaked".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], "An internal error occurred");
}

#[tokio::test]
async fn row_not_found_returns_404() {
    let (status, json) = error_to_response(AppError::Database(sqlx::Error::RowNotFound)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
}

#[test]
fn structural_encode_error_surfaces_core_error() {
    let err = sqlx::Error::Encode(Box::new(CoreError::Validation("bad number".into())));
    assert_matches!(
        AppError::from_structural(err),
        AppError::Core(CoreError::Validation(msg)) if msg == "bad number"
    );
}

#[test]
fn structural_failure_becomes_transaction_aborted() {
    assert_matches!(
        AppError::from_structural(sqlx::Error::PoolTimedOut),
        AppError::Core(CoreError::TransactionAborted(_))
    );
}
