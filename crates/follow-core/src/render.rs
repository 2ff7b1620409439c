//! Markdown rendering of a [`SessionRecord`].
//!
//! The byte layout here is a compatibility contract: documents already in
//! the store were produced with it, and [`crate::parse_transcript`] reads it
//! back. Every section ends with a blank line.

use crate::session::SessionRecord;
use std::fmt::Write;

pub(crate) const TITLE_PREFIX: &str = "# Session: ";
pub(crate) const DATE_PREFIX: &str = "**Date:** ";
pub(crate) const SESSION_ID_PREFIX: &str = "**Session ID:** ";
pub(crate) const RULE: &str = "---";
pub(crate) const USER_HEADING: &str = "### 👤 User";
pub(crate) const AI_HEADING: &str = "### 🤖 AI";
pub(crate) const FEEDBACK_HEADING: &str = "## 📊 Feedback";

pub(crate) const UNKNOWN_MODE: &str = "Unknown";
pub(crate) const NOT_AVAILABLE: &str = "N/A";

/// Renders a session as a Markdown document. Never fails.
pub fn render(session: &SessionRecord) -> String {
    let mut md = String::new();

    // Writing into a String cannot fail.
    let _ = write!(
        md,
        "{TITLE_PREFIX}{}\n\n{DATE_PREFIX}{}\n\n{SESSION_ID_PREFIX}{}\n\n{RULE}\n\n",
        session.mode.as_deref().unwrap_or(UNKNOWN_MODE),
        session.date.as_deref().unwrap_or(NOT_AVAILABLE),
        session.session_id.as_deref().unwrap_or(NOT_AVAILABLE),
    );

    for msg in &session.messages {
        let heading = if msg.role.is_user() {
            USER_HEADING
        } else {
            AI_HEADING
        };
        let _ = write!(md, "{heading}\n{}\n\n", msg.content);

        if let Some(ts) = msg.timestamp.as_deref().filter(|t| !t.is_empty()) {
            let _ = write!(md, "*{ts}*\n\n");
        }
    }

    if let Some(feedback) = &session.feedback {
        let _ = write!(md, "{RULE}\n\n{FEEDBACK_HEADING}\n\n");
        for (key, value) in feedback {
            let _ = write!(md, "**{key}:** {value}\n\n");
        }
    }

    md
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::message::{Message, Role};
    use crate::session::Feedback;

    fn example() -> SessionRecord {
        SessionRecord {
            mode: Some("qa".into()),
            date: Some("2024-01-01".into()),
            session_id: Some("abc123".into()),
            messages: vec![
                Message::user("Hi").with_timestamp("10:00"),
                Message::assistant("Hello!"),
            ],
            feedback: None,
        }
    }

    #[test]
    fn test_render_exact_bytes() {
        let expected = "# Session: qa\n\n\
                        **Date:** 2024-01-01\n\n\
                        **Session ID:** abc123\n\n\
                        ---\n\n\
                        ### 👤 User\nHi\n\n\
                        *10:00*\n\n\
                        ### 🤖 AI\nHello!\n\n";
        assert_eq!(render(&example()), expected);
    }

    #[test]
    fn test_render_is_deterministic() {
        let mut record = example();
        record.feedback = Some(Feedback::from([
            ("score".to_string(), "4".to_string()),
            ("advice".to_string(), "ask more".to_string()),
        ]));
        assert_eq!(render(&record), render(&record.clone()));
    }

    #[test]
    fn test_missing_header_fields_use_placeholders() {
        let md = render(&SessionRecord::default());
        assert_eq!(
            md,
            "# Session: Unknown\n\n**Date:** N/A\n\n**Session ID:** N/A\n\n---\n\n"
        );
    }

    #[test]
    fn test_non_user_roles_render_as_ai() {
        for role in ["assistant", "system", "", "bot", "model"] {
            let mut record = SessionRecord::default();
            record.push(Message::new(Role::from(role), "x"));
            let md = render(&record);
            assert!(md.contains("### 🤖 AI\nx\n\n"), "role {role:?}");
            assert!(!md.contains(USER_HEADING), "role {role:?}");
        }
    }

    #[test]
    fn test_empty_timestamp_emits_nothing() {
        let mut record = SessionRecord::default();
        record.push(Message::user("hey").with_timestamp(""));
        assert!(render(&record).ends_with("### 👤 User\nhey\n\n"));
    }

    #[test]
    fn test_feedback_section() {
        let mut record = example();
        record.feedback = Some(Feedback::from([
            ("score".to_string(), "4".to_string()),
            ("advice".to_string(), "ask more".to_string()),
        ]));
        let md = render(&record);
        assert!(md.ends_with(
            "---\n\n## 📊 Feedback\n\n**score:** 4\n\n**advice:** ask more\n\n"
        ));
        assert_eq!(md.matches("**score:**").count(), 1);
    }

    #[test]
    fn test_empty_feedback_still_has_heading() {
        let mut record = SessionRecord::default();
        record.feedback = Some(Feedback::new());
        assert!(render(&record).ends_with("---\n\n## 📊 Feedback\n\n"));
    }
}
