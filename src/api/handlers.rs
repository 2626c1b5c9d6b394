use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::Json;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::llm::ChatMessage;
use crate::ticket::draft::TicketDraft;
use crate::ticket::parser;
use crate::tracker::client::{Attachment, CreatedIssue, TrackerCredentials};
use crate::tracker::payload::CustomField;
use crate::tracker::validate::validate_tracker_url;
use crate::AppState;

/// Overall budget for create + attachment uploads.
const SUBMIT_BUDGET: Duration = Duration::from_secs(120);

// ── Request / Response DTOs ──────────────────────────────────

#[derive(Deserialize)]
pub struct GenerateRequest {
    pub messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
pub struct GenerateResponse {
    /// Raw model output, kept so the client can re-edit or re-parse.
    pub text: String,
    pub draft: TicketDraft,
    pub stop_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestConnectionRequest {
    pub url: String,
    pub email: String,
    pub api_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestConnectionResponse {
    pub success: bool,
    pub display_name: String,
    pub email_address: String,
    pub account_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub url: String,
    pub email: String,
    pub api_token: String,
    pub project_key: String,
    pub fields: TicketDraft,
    #[serde(default)]
    pub custom_fields: Vec<CustomField>,
    #[serde(default)]
    pub attachments: Vec<AttachmentUpload>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentUpload {
    pub filename: String,
    pub mime_type: String,
    /// Base64-encoded file payload.
    pub data: String,
}

// ── Handlers ─────────────────────────────────────────────────

/// POST <base>/generate — proxy the content blocks to the LLM and parse the
/// reply into a structured draft.
pub async fn generate(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    let caller = caller_key(&headers, &addr);
    state
        .limiter
        .check("generate", &caller, state.config.generate_rate_limit)?;

    if req.messages.is_empty() {
        return Err(AppError::Validation("messages must not be empty".into()));
    }

    let reply = state.llm.complete(&req.messages).await?;
    let draft = parser::parse(&reply.text);

    Ok(Json(GenerateResponse {
        text: reply.text,
        draft,
        stop_reason: reply.stop_reason,
    }))
}

/// POST <base>/tracker/test — verify tracker credentials.
pub async fn test_tracker_connection(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<TestConnectionRequest>,
) -> Result<Json<TestConnectionResponse>, AppError> {
    let caller = caller_key(&headers, &addr);
    state
        .limiter
        .check("tracker", &caller, state.config.tracker_rate_limit)?;

    let creds = credentials(&state, &req.url, req.email, req.api_token)?;
    let account = state.tracker.test_connection(&creds).await?;

    Ok(Json(TestConnectionResponse {
        success: true,
        display_name: account.display_name,
        email_address: account.email_address,
        account_id: account.account_id,
    }))
}

/// POST <base>/tracker/submit — create the ticket and upload attachments.
pub async fn submit_ticket(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<CreatedIssue>, AppError> {
    let caller = caller_key(&headers, &addr);
    state
        .limiter
        .check("tracker", &caller, state.config.tracker_rate_limit)?;

    let creds = credentials(&state, &req.url, req.email, req.api_token)?;

    if req.project_key.trim().is_empty() {
        return Err(AppError::Validation("projectKey is required".into()));
    }
    if req.fields.title.trim().is_empty() {
        return Err(AppError::Validation("fields.title is required".into()));
    }

    let attachments = decode_attachments(&req.attachments, state.config.max_attachment_bytes)?;

    let created = tokio::time::timeout(
        SUBMIT_BUDGET,
        crate::tracker::submit_ticket(
            &state.tracker,
            &creds,
            req.project_key.trim(),
            &req.fields,
            &req.custom_fields,
            &attachments,
        ),
    )
    .await
    .map_err(|_| AppError::Timeout)??;

    Ok(Json(created))
}

// ── Helpers ──────────────────────────────────────────────────

fn credentials(
    state: &AppState,
    url: &str,
    email: String,
    api_token: String,
) -> Result<TrackerCredentials, AppError> {
    if email.trim().is_empty() || api_token.trim().is_empty() {
        return Err(AppError::Validation("email and apiToken are required".into()));
    }
    let base = validate_tracker_url(url, &state.config.tracker_domain_suffix)?;
    Ok(TrackerCredentials {
        base,
        email,
        api_token,
    })
}

fn decode_attachments(
    uploads: &[AttachmentUpload],
    max_bytes: usize,
) -> Result<Vec<Attachment>, AppError> {
    let mut out = Vec::with_capacity(uploads.len());
    for upload in uploads {
        let data = base64::engine::general_purpose::STANDARD
            .decode(upload.data.trim())
            .map_err(|_| {
                AppError::Validation(format!(
                    "attachment '{}' is not valid base64",
                    upload.filename
                ))
            })?;
        if data.len() > max_bytes {
            return Err(AppError::AttachmentTooLarge);
        }
        out.push(Attachment {
            filename: upload.filename.clone(),
            mime_type: upload.mime_type.clone(),
            data,
        });
    }
    Ok(out)
}

/// Rate-limit key: first hop of x-forwarded-for when deployed behind a
/// proxy, otherwise the peer address.
fn caller_key(headers: &HeaderMap, addr: &SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| addr.ip().to_string())
}
