//! Verifies the stable error contract: every failure maps to
//! `{"error": {message, type, code}}` with the right status, and rate-limit
//! rejections carry a Retry-After header.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use bugrelay::errors::AppError;
use serde_json::Value;

async fn response_parts(err: AppError) -> (StatusCode, axum::http::HeaderMap, Value) {
    let response = err.into_response();
    let (parts, body) = response.into_parts();
    let bytes = axum::body::to_bytes(body, 64 * 1024).await.unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    (parts.status, parts.headers, json)
}

#[tokio::test]
async fn test_rate_limit_is_429_with_retry_after() {
    let (status, headers, body) = response_parts(AppError::RateLimitExceeded).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(headers.get("retry-after").unwrap(), "60");
    assert_eq!(body["error"]["type"], "rate_limit_error");
    assert_eq!(body["error"]["code"], "rate_limit_exceeded");
}

#[tokio::test]
async fn test_validation_is_400_with_reason() {
    let (status, _, body) =
        response_parts(AppError::Validation("projectKey is required".into())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "projectKey is required");
    assert_eq!(body["error"]["type"], "invalid_request_error");
}

#[tokio::test]
async fn test_oversized_attachment_is_413_and_distinct() {
    let (status, _, body) = response_parts(AppError::AttachmentTooLarge).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"]["code"], "attachment_too_large");
    let msg = body["error"]["message"].as_str().unwrap();
    assert!(msg.contains("size limit"), "message must say it was too large");
}

#[tokio::test]
async fn test_tracker_statuses_map_to_user_facing_errors() {
    let (status, _, body) = response_parts(AppError::TrackerAuth).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["type"], "authentication_error");

    let (status, _, body) = response_parts(AppError::TrackerForbidden).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["type"], "permission_error");

    let (status, _, body) = response_parts(AppError::TrackerNotFound).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["type"], "not_found_error");
}

#[tokio::test]
async fn test_internal_errors_never_leak_details() {
    let (status, _, body) =
        response_parts(AppError::Internal(anyhow::anyhow!("secret db password leaked"))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["message"], "internal server error");
}

#[tokio::test]
async fn test_timeout_is_504() {
    let (status, _, body) = response_parts(AppError::Timeout).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["error"]["type"], "timeout_error");
}
