use serde::{Deserialize, Serialize};

/// Bug priority as emitted by the LLM (P1 highest, P4 lowest).
///
/// Maps one-to-one onto the tracker's default priority scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    P1,
    P2,
    P3,
    P4,
}

impl Priority {
    /// What the parser falls back to when nothing in the text matches.
    pub const DEFAULT: Priority = Priority::P3;

    pub fn code(&self) -> &'static str {
        match self {
            Priority::P1 => "P1",
            Priority::P2 => "P2",
            Priority::P3 => "P3",
            Priority::P4 => "P4",
        }
    }

    /// Numeric priority id in the tracker: P1→"1" … P4→"4".
    pub fn tracker_id(&self) -> &'static str {
        match self {
            Priority::P1 => "1",
            Priority::P2 => "2",
            Priority::P3 => "3",
            Priority::P4 => "4",
        }
    }

    pub fn tracker_name(&self) -> &'static str {
        match self {
            Priority::P1 => "Highest",
            Priority::P2 => "High",
            Priority::P3 => "Medium",
            Priority::P4 => "Low",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "P1" => Some(Priority::P1),
            "P2" => Some(Priority::P2),
            "P3" => Some(Priority::P3),
            "P4" => Some(Priority::P4),
            _ => None,
        }
    }
}

/// Structured bug report recovered from the LLM's labeled text output.
///
/// Always fully populated: sections the model omitted are empty strings and
/// a missing priority resolves to [`Priority::DEFAULT`]. Mutated only by
/// full replacement (regenerate or manual edit), never field-by-field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TicketDraft {
    pub title: String,
    pub description: String,
    pub steps: String,
    pub expected: String,
    pub actual: String,
    pub impact: String,
    pub priority: Priority,
    pub environment: String,
    /// Filenames the model suggested attaching, not the payloads themselves.
    pub attachments: Vec<String>,
}

impl Default for TicketDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            steps: String::new(),
            expected: String::new(),
            actual: String::new(),
            impact: String::new(),
            priority: Priority::DEFAULT,
            environment: String::new(),
            attachments: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_codes_round_trip_through_mapping() {
        for p in [Priority::P1, Priority::P2, Priority::P3, Priority::P4] {
            assert_eq!(Priority::from_code(p.code()), Some(p));
        }
    }

    #[test]
    fn test_p2_maps_to_tracker_id_2() {
        assert_eq!(Priority::P2.tracker_id(), "2");
        assert_eq!(Priority::P2.tracker_name(), "High");
    }

    #[test]
    fn test_from_code_is_case_insensitive() {
        assert_eq!(Priority::from_code(" p1 "), Some(Priority::P1));
        assert_eq!(Priority::from_code("P5"), None);
        assert_eq!(Priority::from_code(""), None);
    }

    #[test]
    fn test_priority_serializes_as_code() {
        let json = serde_json::to_string(&Priority::P2).unwrap();
        assert_eq!(json, "\"P2\"");
    }
}
