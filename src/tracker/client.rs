use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::errors::AppError;

/// Per-call timeout for light tracker calls (auth check, metadata, create).
const LIGHT_TIMEOUT: Duration = Duration::from_secs(30);
/// Attachment uploads carry real payloads and get the long budget.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Tracker credentials for exactly one request. Never stored server-side —
/// they arrive in the request body and die with it.
#[derive(Debug, Clone)]
pub struct TrackerCredentials {
    pub base: Url,
    pub email: String,
    pub api_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub display_name: String,
    pub email_address: String,
    pub account_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedIssue {
    pub key: String,
    pub id: String,
    /// Browse URL for the created issue.
    pub url: String,
}

/// One file destined for one ticket. Decoded from base64 at the API edge.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// HTTP client for the issue tracker's REST API.
///
/// Calls are not retried — a retried create could duplicate tickets.
pub struct TrackerClient {
    http: reqwest::Client,
}

impl Default for TrackerClient {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackerClient {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .use_rustls_tls()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .expect("failed to build HTTP client");
        Self { http }
    }

    fn api_url(creds: &TrackerCredentials, path: &str) -> String {
        format!(
            "{}/rest/api/2/{}",
            creds.base.as_str().trim_end_matches('/'),
            path
        )
    }

    /// GET /myself — verifies the credentials and returns who they belong to.
    pub async fn test_connection(
        &self,
        creds: &TrackerCredentials,
    ) -> Result<AccountInfo, AppError> {
        let resp = self
            .http
            .get(Self::api_url(creds, "myself"))
            .basic_auth(&creds.email, Some(&creds.api_token))
            .timeout(LIGHT_TIMEOUT)
            .send()
            .await
            .map_err(request_error)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(map_status(status.as_u16(), &body));
        }

        resp.json::<AccountInfo>()
            .await
            .map_err(|e| AppError::Upstream(format!("malformed /myself response: {}", e)))
    }

    /// Best-effort lookup of a select-field option id via createmeta.
    ///
    /// Returns `None` on any failure — the caller submits the bare value
    /// instead. A missing option id degrades the ticket, it must never
    /// block it.
    pub async fn resolve_option_id(
        &self,
        creds: &TrackerCredentials,
        project_key: &str,
        field_id: &str,
        wanted: &str,
    ) -> Option<String> {
        let result = self
            .http
            .get(Self::api_url(creds, "issue/createmeta"))
            .query(&[
                ("projectKeys", project_key),
                ("expand", "projects.issuetypes.fields"),
            ])
            .basic_auth(&creds.email, Some(&creds.api_token))
            .timeout(LIGHT_TIMEOUT)
            .send()
            .await;

        let resp = match result {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                tracing::warn!(
                    field = field_id,
                    status = r.status().as_u16(),
                    "createmeta lookup failed — submitting value without option id"
                );
                return None;
            }
            Err(e) => {
                tracing::warn!(
                    field = field_id,
                    error = %e,
                    "createmeta lookup failed — submitting value without option id"
                );
                return None;
            }
        };

        let meta: Value = match resp.json().await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(field = field_id, error = %e, "createmeta body unreadable");
                return None;
            }
        };

        let id = find_allowed_value_id(&meta, field_id, wanted);
        if id.is_none() {
            tracing::warn!(
                field = field_id,
                value = wanted,
                "no matching option in createmeta — submitting value without option id"
            );
        }
        id
    }

    /// POST /issue — creates the ticket and returns its key/id/browse URL.
    pub async fn create_issue(
        &self,
        creds: &TrackerCredentials,
        payload: &Value,
    ) -> Result<CreatedIssue, AppError> {
        let resp = self
            .http
            .post(Self::api_url(creds, "issue"))
            .basic_auth(&creds.email, Some(&creds.api_token))
            .timeout(LIGHT_TIMEOUT)
            .json(payload)
            .send()
            .await
            .map_err(request_error)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(map_status(status.as_u16(), &body));
        }

        #[derive(Deserialize)]
        struct CreateResponse {
            key: String,
            id: String,
        }

        let created: CreateResponse = resp
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("malformed create response: {}", e)))?;

        let url = format!(
            "{}/browse/{}",
            creds.base.as_str().trim_end_matches('/'),
            created.key
        );
        Ok(CreatedIssue {
            key: created.key,
            id: created.id,
            url,
        })
    }

    /// POST /issue/{key}/attachments — multipart upload of a single file.
    ///
    /// 413 is the one upload failure the caller must see as-is.
    pub async fn upload_attachment(
        &self,
        creds: &TrackerCredentials,
        issue_key: &str,
        attachment: &Attachment,
    ) -> Result<(), AppError> {
        let part = reqwest::multipart::Part::bytes(attachment.data.clone())
            .file_name(attachment.filename.clone())
            .mime_str(&attachment.mime_type)
            .map_err(|_| {
                AppError::Validation(format!(
                    "attachment '{}' has an invalid MIME type",
                    attachment.filename
                ))
            })?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let resp = self
            .http
            .post(Self::api_url(creds, &format!("issue/{}/attachments", issue_key)))
            .basic_auth(&creds.email, Some(&creds.api_token))
            // Required by the tracker to bypass XSRF protection on uploads.
            .header("X-Atlassian-Token", "no-check")
            .timeout(UPLOAD_TIMEOUT)
            .multipart(form)
            .send()
            .await
            .map_err(request_error)?;

        let status = resp.status();
        if status.as_u16() == 413 {
            return Err(AppError::AttachmentTooLarge);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(map_status(status.as_u16(), &body));
        }
        Ok(())
    }
}

/// projects[*].issuetypes[*].fields[field_id].allowedValues[*] — first entry
/// whose `value` (or `name`) matches, case-insensitively.
fn find_allowed_value_id(meta: &Value, field_id: &str, wanted: &str) -> Option<String> {
    let projects = meta.get("projects")?.as_array()?;
    for project in projects {
        let issuetypes = match project.get("issuetypes").and_then(|v| v.as_array()) {
            Some(list) => list,
            None => continue,
        };
        for issuetype in issuetypes {
            let allowed = issuetype
                .get("fields")
                .and_then(|f| f.get(field_id))
                .and_then(|f| f.get("allowedValues"))
                .and_then(|v| v.as_array());
            let allowed = match allowed {
                Some(list) => list,
                None => continue,
            };
            for option in allowed {
                let label = option
                    .get("value")
                    .or_else(|| option.get("name"))
                    .and_then(|v| v.as_str());
                if label.is_some_and(|l| l.eq_ignore_ascii_case(wanted)) {
                    return match option.get("id") {
                        Some(Value::String(id)) => Some(id.clone()),
                        Some(Value::Number(id)) => Some(id.to_string()),
                        _ => None,
                    };
                }
            }
        }
    }
    None
}

/// Status-code mapping the client surfaces to users.
fn map_status(status: u16, body: &str) -> AppError {
    match status {
        401 => AppError::TrackerAuth,
        403 => AppError::TrackerForbidden,
        404 => AppError::TrackerNotFound,
        _ => AppError::tracker(status, body),
    }
}

fn request_error(e: reqwest::Error) -> AppError {
    if e.is_timeout() {
        return AppError::Timeout;
    }
    tracing::warn!("tracker request failed: {}", e);
    AppError::Upstream(format!("tracker unreachable: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta() -> Value {
        json!({
            "projects": [{
                "key": "WEB",
                "issuetypes": [{
                    "name": "Bug",
                    "fields": {
                        "customfield_10042": {
                            "allowedValues": [
                                {"id": "76", "value": "Infra Team"},
                                {"id": "77", "value": "Platform Team"}
                            ]
                        }
                    }
                }]
            }]
        })
    }

    #[test]
    fn test_allowed_value_id_found() {
        assert_eq!(
            find_allowed_value_id(&meta(), "customfield_10042", "Platform Team"),
            Some("77".to_string())
        );
    }

    #[test]
    fn test_allowed_value_match_is_case_insensitive() {
        assert_eq!(
            find_allowed_value_id(&meta(), "customfield_10042", "platform team"),
            Some("77".to_string())
        );
    }

    #[test]
    fn test_allowed_value_id_missing() {
        assert_eq!(
            find_allowed_value_id(&meta(), "customfield_10042", "Design Team"),
            None
        );
        assert_eq!(find_allowed_value_id(&meta(), "customfield_999", "x"), None);
        assert_eq!(find_allowed_value_id(&json!({}), "customfield_10042", "x"), None);
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(map_status(401, ""), AppError::TrackerAuth));
        assert!(matches!(map_status(403, ""), AppError::TrackerForbidden));
        assert!(matches!(map_status(404, ""), AppError::TrackerNotFound));
        assert!(matches!(
            map_status(500, "boom"),
            AppError::Tracker { status: 500, .. }
        ));
    }
}
