//! Issue-creation payload assembly.
//!
//! The tracker dictates the JSON shape of every custom field, so the shapes
//! live in a closed enum instead of ad hoc conditionals: a field value is an
//! object-with-name, an object-with-value, or an array of value objects.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::ticket::draft::TicketDraft;

/// The closed set of custom-field value shapes the tracker accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CustomFieldValue {
    /// `{"name": "..."}` — e.g. components, select-by-name fields.
    NameObject { name: String },
    /// `{"value": "..."}` — single-select option fields.
    ValueObject { value: String },
    /// `[{"value": "..."}, ...]` — multi-select option fields.
    ValueArray { values: Vec<String> },
}

impl CustomFieldValue {
    pub fn to_field_json(&self) -> Value {
        match self {
            CustomFieldValue::NameObject { name } => json!({ "name": name }),
            CustomFieldValue::ValueObject { value } => json!({ "value": value }),
            CustomFieldValue::ValueArray { values } => {
                Value::Array(values.iter().map(|v| json!({ "value": v })).collect())
            }
        }
    }
}

/// One custom field in a submission request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomField {
    /// Tracker field id, e.g. "customfield_10042".
    pub field_id: String,
    #[serde(flatten)]
    pub value: CustomFieldValue,
    /// When set, the value is resolved to the tracker's internal option id
    /// via a createmeta lookup before submission (the engineering-team field).
    #[serde(default)]
    pub resolve_option_id: bool,
}

/// Reassembles the draft's sections into the tracker's plain-text
/// description, skipping sections the draft left empty.
pub fn assemble_description(draft: &TicketDraft) -> String {
    let sections: [(&str, &str); 6] = [
        ("Description", &draft.description),
        ("Steps to Reproduce", &draft.steps),
        ("Expected Behavior", &draft.expected),
        ("Actual Behavior", &draft.actual),
        ("Impact", &draft.impact),
        ("Environment", &draft.environment),
    ];

    sections
        .iter()
        .filter(|(_, body)| !body.is_empty())
        .map(|(heading, body)| format!("h3. {}\n{}", heading, body))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Builds the `fields` object for the tracker's issue-creation call.
///
/// `resolved_custom` carries each custom field's final JSON value — any
/// option-id resolution has already happened (or fallen back) by the time
/// this runs.
pub fn build_issue_payload(
    project_key: &str,
    draft: &TicketDraft,
    resolved_custom: &[(String, Value)],
) -> Value {
    let mut fields = Map::new();
    fields.insert("project".into(), json!({ "key": project_key }));
    fields.insert("summary".into(), Value::String(draft.title.clone()));
    fields.insert(
        "description".into(),
        Value::String(assemble_description(draft)),
    );
    fields.insert("issuetype".into(), json!({ "name": "Bug" }));
    fields.insert(
        "priority".into(),
        json!({
            "id": draft.priority.tracker_id(),
            "name": draft.priority.tracker_name(),
        }),
    );

    for (field_id, value) in resolved_custom {
        fields.insert(field_id.clone(), value.clone());
    }

    json!({ "fields": fields })
}
