//! Client for the LLM messages API.
//!
//! The browser sends role-tagged content blocks (text plus inline base64
//! screenshots); this client forwards them with the server-held API key and
//! flattens the model's reply back to text.

use std::time::Duration;

use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::AppError;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;
/// Generation is a "light" call in the request-budget sense: no attachments,
/// one round trip.
const GENERATE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// "user" or "assistant".
    pub role: String,
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    Image { source: ImageSource },
}

/// Inline image: `{"type": "base64", "media_type": "image/png", "data": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSource {
    #[serde(rename = "type")]
    pub kind: String,
    pub media_type: String,
    pub data: String,
}

#[derive(Debug, Clone)]
pub struct LlmReply {
    pub text: String,
    pub stop_reason: Option<String>,
}

pub struct LlmClient {
    client: ClientWithMiddleware,
    base_url: String,
    api_key: String,
    model: String,
}

impl LlmClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self::with_base_url(api_key, model, DEFAULT_BASE_URL.to_string())
    }

    /// Tests point this at a mock server.
    pub fn with_base_url(api_key: String, model: String, base_url: String) -> Self {
        let reqwest_client = reqwest::Client::builder()
            .use_rustls_tls()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .expect("failed to build HTTP client");

        // Transient upstream failures (connection resets, 5xx) get a few
        // retries with backoff. Generation is safe to repeat.
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(2);
        let client = ClientBuilder::new(reqwest_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Self {
            client,
            base_url,
            api_key,
            model,
        }
    }

    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<LlmReply, AppError> {
        let body = json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "messages": messages,
        });

        let resp = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .timeout(GENERATE_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if matches!(&e, reqwest_middleware::Error::Reqwest(inner) if inner.is_timeout()) {
                    return AppError::Timeout;
                }
                tracing::warn!("LLM request failed after retries: {}", e);
                AppError::Upstream(format!("LLM unreachable: {}", e))
            })?;

        let status = resp.status();
        let payload: Value = resp
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("malformed LLM response: {}", e)))?;

        if !status.is_success() {
            return Err(AppError::Upstream(extract_error_message(&payload)));
        }

        Ok(LlmReply {
            text: flatten_text(&payload),
            stop_reason: payload
                .get("stop_reason")
                .and_then(|v| v.as_str())
                .map(String::from),
        })
    }
}

/// Concatenates the text blocks of the model's content array.
fn flatten_text(payload: &Value) -> String {
    payload
        .get("content")
        .and_then(|c| c.as_array())
        .map(|blocks| {
            blocks
                .iter()
                .filter_map(|b| b.get("text").and_then(|t| t.as_str()))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default()
}

/// The upstream error body carries `{"error": {"message": ...}}`.
fn extract_error_message(payload: &Value) -> String {
    payload
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .unwrap_or("LLM returned an error without a message")
        .to_string()
}
