use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// How much of an upstream tracker error body we echo back to the caller.
const TRACKER_ERROR_TRUNCATE: usize = 300;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("tracker authentication failed")]
    TrackerAuth,

    #[error("tracker permission denied")]
    TrackerForbidden,

    #[error("tracker resource not found")]
    TrackerNotFound,

    #[error("rate limit exceeded")]
    RateLimitExceeded,

    #[error("attachment too large")]
    AttachmentTooLarge,

    #[error("upstream timed out")]
    Timeout,

    #[error("tracker error ({status}): {detail}")]
    Tracker { status: u16, detail: String },

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Builds the catch-all tracker error, truncating whatever the tracker
    /// sent back so giant HTML error pages never reach the caller.
    pub fn tracker(status: u16, body: &str) -> Self {
        let mut detail: String = body.chars().take(TRACKER_ERROR_TRUNCATE).collect();
        if body.chars().count() > TRACKER_ERROR_TRUNCATE {
            detail.push('…');
        }
        AppError::Tracker { status, detail }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, code, msg) = match &self {
            AppError::Validation(reason) => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "validation_failed",
                reason.clone(),
            ),
            AppError::TrackerAuth => (
                StatusCode::UNAUTHORIZED,
                "authentication_error",
                "tracker_auth_failed",
                "tracker rejected the credentials — check email and API token".to_string(),
            ),
            AppError::TrackerForbidden => (
                StatusCode::FORBIDDEN,
                "permission_error",
                "tracker_forbidden",
                "the tracker account lacks permission for this operation".to_string(),
            ),
            AppError::TrackerNotFound => (
                StatusCode::NOT_FOUND,
                "not_found_error",
                "tracker_not_found",
                "tracker project or resource not found".to_string(),
            ),
            AppError::RateLimitExceeded => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limit_error",
                "rate_limit_exceeded",
                "too many requests — slow down".to_string(),
            ),
            AppError::AttachmentTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "invalid_request_error",
                "attachment_too_large",
                "attachment exceeds the tracker's size limit".to_string(),
            ),
            AppError::Timeout => (
                StatusCode::GATEWAY_TIMEOUT,
                "timeout_error",
                "upstream_timeout",
                "the upstream call timed out".to_string(),
            ),
            AppError::Tracker { status, detail } => (
                StatusCode::BAD_GATEWAY,
                "tracker_error",
                "tracker_failed",
                format!("tracker returned {}: {}", status, detail),
            ),
            AppError::Upstream(e) => (
                StatusCode::BAD_GATEWAY,
                "upstream_error",
                "upstream_failed",
                e.clone(),
            ),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal_server_error",
                    "internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "message": msg,
                "type": error_type,
                "code": code,
            }
        }));

        let mut response = (status, body).into_response();

        // Add Retry-After header for rate limit errors
        if matches!(self, AppError::RateLimitExceeded) {
            response
                .headers_mut()
                .insert("retry-after", axum::http::HeaderValue::from_static("60"));
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_error_truncation() {
        let long = "x".repeat(500);
        match AppError::tracker(502, &long) {
            AppError::Tracker { status, detail } => {
                assert_eq!(status, 502);
                assert_eq!(detail.chars().count(), TRACKER_ERROR_TRUNCATE + 1);
                assert!(detail.ends_with('…'));
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn test_short_tracker_error_kept_verbatim() {
        match AppError::tracker(400, "project key missing") {
            AppError::Tracker { detail, .. } => assert_eq!(detail, "project key missing"),
            other => panic!("unexpected variant: {:?}", other),
        }
    }
}
