//! Recovers a [`TicketDraft`] from the LLM's labeled text output.
//!
//! The model is prompted to emit `**Label:** body` sections separated by
//! `---` lines. Models drift, so extraction is tolerant: each section is
//! matched independently, priority has a chain of fallback patterns, and
//! parsing never fails — anything unrecognized degrades to an empty string
//! or the default priority.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ticket::draft::{Priority, TicketDraft};

struct Patterns {
    title: Regex,
    description: Regex,
    steps: Regex,
    expected: Regex,
    actual: Regex,
    impact: Regex,
    priority_section: Regex,
    environment: Regex,
    attachments: Regex,
    priority_bold: Regex,
    priority_plain: Regex,
    priority_code: Regex,
}

/// Body runs until a `---` separator line, the next bold label, or the end.
fn section_re(label: &str) -> Regex {
    let pattern = format!(
        r"(?si)\*\*{}\s*:?\*\*\s*:?\s*(.*?)\s*(?:\n\s*---\s*(?:\n|$)|\n\s*\*\*[a-z][^*\n]*\*\*|\z)",
        label
    );
    Regex::new(&pattern).expect("section pattern is valid")
}

static PATTERNS: Lazy<Patterns> = Lazy::new(|| Patterns {
    title: section_re("Title"),
    description: section_re("Description"),
    steps: section_re(r"Steps\s+to\s+Reproduce"),
    expected: section_re(r"Expected\s+Behavior"),
    actual: section_re(r"Actual\s+Behavior"),
    impact: section_re("Impact"),
    priority_section: section_re("Priority"),
    environment: section_re("Environment"),
    attachments: section_re("Attachments"),
    priority_bold: Regex::new(r"(?i)\*\*Priority\s*:?\*\*\s*:?\s*\**\s*(P[1-4])\b")
        .expect("priority pattern is valid"),
    priority_plain: Regex::new(r"(?i)\bPriority\s*:?\s*\**\s*(P[1-4])\b")
        .expect("priority pattern is valid"),
    priority_code: Regex::new(r"(?i)\b(P[1-4])\b").expect("priority pattern is valid"),
});

fn section(re: &Regex, text: &str) -> String {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

/// Fallback chain: bold label + code, plain label + code, any code inside
/// the priority section, then the default.
fn extract_priority(text: &str) -> Priority {
    for re in [&PATTERNS.priority_bold, &PATTERNS.priority_plain] {
        if let Some(p) = re
            .captures(text)
            .and_then(|c| c.get(1))
            .and_then(|m| Priority::from_code(m.as_str()))
        {
            return p;
        }
    }

    let near_label = section(&PATTERNS.priority_section, text);
    if let Some(p) = PATTERNS
        .priority_code
        .captures(&near_label)
        .and_then(|c| c.get(1))
        .and_then(|m| Priority::from_code(m.as_str()))
    {
        return p;
    }

    Priority::DEFAULT
}

/// One entry per line or comma, bullets stripped, "none" filtered out.
fn extract_attachments(text: &str) -> Vec<String> {
    section(&PATTERNS.attachments, text)
        .split(|c| c == '\n' || c == ',')
        .map(|s| s.trim().trim_start_matches(['-', '*']).trim())
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("none"))
        .map(String::from)
        .collect()
}

pub fn parse(text: &str) -> TicketDraft {
    TicketDraft {
        title: section(&PATTERNS.title, text),
        description: section(&PATTERNS.description, text),
        steps: section(&PATTERNS.steps, text),
        expected: section(&PATTERNS.expected, text),
        actual: section(&PATTERNS.actual, text),
        impact: section(&PATTERNS.impact, text),
        priority: extract_priority(text),
        environment: section(&PATTERNS.environment, text),
        attachments: extract_attachments(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELL_FORMED: &str = "\
**Title:** Login button unresponsive on mobile Safari
---
**Description:** Tapping the login button on iOS Safari does nothing. The form never submits.
---
**Steps to Reproduce:**
1. Open the site on iOS Safari
2. Fill in credentials
3. Tap Login
---
**Expected Behavior:** The form submits and the user is logged in.
---
**Actual Behavior:** Nothing happens; no network request is made.
---
**Impact:** All mobile users are unable to log in.
---
**Priority:** P1
---
**Environment:** iOS 17.4, Safari, iPhone 14
---
**Attachments:** screen-recording.mp4, console-log.txt
";

    #[test]
    fn test_well_formed_sections_recovered_verbatim() {
        let draft = parse(WELL_FORMED);
        assert_eq!(draft.title, "Login button unresponsive on mobile Safari");
        assert_eq!(
            draft.description,
            "Tapping the login button on iOS Safari does nothing. The form never submits."
        );
        assert_eq!(
            draft.steps,
            "1. Open the site on iOS Safari\n2. Fill in credentials\n3. Tap Login"
        );
        assert_eq!(
            draft.expected,
            "The form submits and the user is logged in."
        );
        assert_eq!(
            draft.actual,
            "Nothing happens; no network request is made."
        );
        assert_eq!(draft.impact, "All mobile users are unable to log in.");
        assert_eq!(draft.priority, Priority::P1);
        assert_eq!(draft.environment, "iOS 17.4, Safari, iPhone 14");
        assert_eq!(
            draft.attachments,
            vec!["screen-recording.mp4", "console-log.txt"]
        );
    }

    #[test]
    fn test_priority_without_bold_markup() {
        let draft = parse("**Title:** x\n---\nPriority: P2\n---\n**Environment:** y");
        assert_eq!(draft.priority, Priority::P2);
    }

    #[test]
    fn test_priority_code_near_label_only() {
        // No "Priority: Pn" pairing anywhere, but the section body holds a code.
        let draft = parse("**Priority:** somewhere around P4, maybe lower\n---");
        assert_eq!(draft.priority, Priority::P4);
    }

    #[test]
    fn test_priority_defaults_to_medium() {
        let draft = parse("**Title:** broken\n---\n**Description:** very broken");
        assert_eq!(draft.priority, Priority::DEFAULT);
        assert_eq!(draft.priority, Priority::P3);
    }

    #[test]
    fn test_missing_sections_become_empty() {
        let draft = parse("**Title:** only a title here");
        assert_eq!(draft.title, "only a title here");
        assert_eq!(draft.description, "");
        assert_eq!(draft.steps, "");
        assert!(draft.attachments.is_empty());
    }

    #[test]
    fn test_never_fails_on_unstructured_text() {
        let draft = parse("the model ignored the format entirely and wrote prose");
        assert_eq!(draft.title, "");
        assert_eq!(draft.priority, Priority::P3);
    }

    #[test]
    fn test_sections_without_separator_lines() {
        // Some models skip the --- separators; the next bold label terminates.
        let text = "**Title:** broken search\n**Description:** results never load\n**Priority:** P2";
        let draft = parse(text);
        assert_eq!(draft.title, "broken search");
        assert_eq!(draft.description, "results never load");
        assert_eq!(draft.priority, Priority::P2);
    }

    #[test]
    fn test_attachments_bulleted_list() {
        let text = "**Attachments:**\n- shot1.png\n- shot2.png\n---";
        assert_eq!(parse(text).attachments, vec!["shot1.png", "shot2.png"]);
    }

    #[test]
    fn test_attachments_none_filtered() {
        let text = "**Attachments:** None\n---";
        assert!(parse(text).attachments.is_empty());
    }

    #[test]
    fn test_label_colon_outside_bold() {
        let draft = parse("**Title**: colon after the bold stars\n---");
        assert_eq!(draft.title, "colon after the bold stars");
    }
}
