use crate::message::{scalar_to_text, Message};
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

/// Session id used in file names when a record carries none.
pub const DEFAULT_SESSION_NAME: &str = "session";

/// Ordered feedback entries, rendered in insertion order.
pub type Feedback = IndexMap<String, String>;

/// One logged conversational exchange.
///
/// Every field is optional on the wire. Missing values are filled with
/// placeholders at render time rather than rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Practice mode the session ran in (descriptive only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Date reported by the client (descriptive only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Identifier that, together with the log date, names the document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Chat turns in display order.
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Optional evaluation block. `null` is the same as absent.
    #[serde(
        default,
        deserialize_with = "lenient_feedback",
        skip_serializing_if = "Option::is_none"
    )]
    pub feedback: Option<Feedback>,
}

impl SessionRecord {
    /// Creates an empty record for the given session id.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            ..Self::default()
        }
    }

    /// Appends a message at the end of the transcript.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Document name for this record when logged on `date`.
    pub fn document_name(&self, date: NaiveDate) -> String {
        document_name(
            date,
            self.session_id.as_deref().unwrap_or(DEFAULT_SESSION_NAME),
        )
    }
}

/// `{YYYY-MM-DD}_{session_id}.md`
pub fn document_name(date: NaiveDate, session_id: &str) -> String {
    format!("{}_{session_id}.md", date.format("%Y-%m-%d"))
}

fn lenient_feedback<'de, D>(deserializer: D) -> Result<Option<Feedback>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<IndexMap<String, serde_json::Value>>::deserialize(deserializer)?;
    Ok(raw.map(|entries| {
        entries
            .into_iter()
            .map(|(k, v)| {
                let text = scalar_to_text(&v).unwrap_or_default();
                (k, text)
            })
            .collect()
    }))
}
