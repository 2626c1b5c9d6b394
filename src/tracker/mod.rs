pub mod client;
pub mod payload;
pub mod validate;

use serde_json::json;

use crate::errors::AppError;
use crate::ticket::draft::TicketDraft;

use client::{Attachment, CreatedIssue, TrackerClient, TrackerCredentials};
use payload::{build_issue_payload, CustomField, CustomFieldValue};

/// Full submission flow: resolve option ids (best-effort), build the payload,
/// create the issue, then upload attachments one at a time.
///
/// Attachment uploads are sequential so a failure is attributable to one
/// file. A failed upload is logged and skipped without touching the created
/// issue — except an oversized file, which is fatal for the call.
pub async fn submit_ticket(
    client: &TrackerClient,
    creds: &TrackerCredentials,
    project_key: &str,
    draft: &TicketDraft,
    custom_fields: &[CustomField],
    attachments: &[Attachment],
) -> Result<CreatedIssue, AppError> {
    let mut resolved = Vec::with_capacity(custom_fields.len());
    for cf in custom_fields {
        let value = resolve_custom_field(client, creds, project_key, cf).await;
        resolved.push((cf.field_id.clone(), value));
    }

    let payload = build_issue_payload(project_key, draft, &resolved);
    let created = client.create_issue(creds, &payload).await?;
    tracing::info!(key = %created.key, "ticket created");

    for attachment in attachments {
        match client
            .upload_attachment(creds, &created.key, attachment)
            .await
        {
            Ok(()) => {
                tracing::debug!(key = %created.key, file = %attachment.filename, "attachment uploaded");
            }
            Err(AppError::AttachmentTooLarge) => return Err(AppError::AttachmentTooLarge),
            Err(e) => {
                tracing::warn!(
                    key = %created.key,
                    file = %attachment.filename,
                    error = %e,
                    "attachment upload failed — ticket kept, continuing with remaining files"
                );
            }
        }
    }

    Ok(created)
}

/// Option-id resolution applies to single-select values flagged for it; the
/// resolved id rides along with the value, and a failed lookup degrades to
/// the bare value.
async fn resolve_custom_field(
    client: &TrackerClient,
    creds: &TrackerCredentials,
    project_key: &str,
    cf: &CustomField,
) -> serde_json::Value {
    if cf.resolve_option_id {
        if let CustomFieldValue::ValueObject { value } = &cf.value {
            if let Some(id) = client
                .resolve_option_id(creds, project_key, &cf.field_id, value)
                .await
            {
                return json!({ "value": value, "id": id });
            }
            return json!({ "value": value });
        }
    }
    cf.value.to_field_json()
}
