use serde::{Deserialize, Deserializer, Serialize};

/// The role of the participant that authored a [`Message`].
///
/// Only `"user"` is rendered with the user marker. Every other role string,
/// including ones this crate does not know about, renders as the AI side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    /// A human end-user.
    User,
    /// The AI assistant.
    Assistant,
    /// Any other role string (`"system"`, `"model"`, `"bot"`, `""`, ...).
    Other(String),
}

impl Role {
    /// Returns true only for [`Role::User`].
    pub fn is_user(&self) -> bool {
        matches!(self, Self::User)
    }

    /// The wire form of the role.
    pub fn as_str(&self) -> &str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Other(s) => s,
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::Other("unknown".to_string())
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        match value.as_str() {
            "user" => Self::User,
            "assistant" => Self::Assistant,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

/// A single chat turn inside a [`crate::SessionRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message author. `null` falls back to the default.
    #[serde(default, deserialize_with = "lenient_role")]
    pub role: Role,
    /// Raw message text, rendered verbatim. `null` reads as empty.
    #[serde(default, deserialize_with = "lenient_content")]
    pub content: String,
    /// Free-form timestamp. Clients send strings or epoch numbers.
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<String>,
}

impl Message {
    /// Creates a message with the given role and content and no timestamp.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: None,
        }
    }

    /// Creates a new message with [`Role::User`].
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates a new message with [`Role::Assistant`].
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Sets the timestamp shown under the message.
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }
}

/// Accepts any JSON scalar as text. `null` stays absent.
pub(crate) fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| scalar_to_text(&v)))
}

fn lenient_role<'de, D>(deserializer: D) -> Result<Role, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_text(deserializer)?.map(Role::from).unwrap_or_default())
}

fn lenient_content<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_text(deserializer)?.unwrap_or_default())
}

pub(crate) fn scalar_to_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_wire() {
        assert_eq!(Role::from("user"), Role::User);
        assert_eq!(Role::from("assistant"), Role::Assistant);
        assert_eq!(Role::from("model"), Role::Other("model".into()));
        assert!(!Role::from("").is_user());
        assert!(!Role::from("User").is_user());
    }

    #[test]
    fn test_message_defaults_when_fields_missing() {
        let msg: Message = serde_json::from_str("{}").unwrap();
        assert_eq!(msg.role, Role::Other("unknown".into()));
        assert_eq!(msg.content, "");
        assert!(msg.timestamp.is_none());
    }

    #[test]
    fn test_null_role_and_content_fall_back_to_defaults() {
        let msg: Message =
            serde_json::from_str(r#"{"role":null,"content":null,"timestamp":null}"#).unwrap();
        assert_eq!(msg.role, Role::default());
        assert_eq!(msg.content, "");
        assert!(msg.timestamp.is_none());
    }

    #[test]
    fn test_numeric_timestamp_is_kept_as_text() {
        let msg: Message =
            serde_json::from_str(r#"{"role":"user","content":"hi","timestamp":1704100000000}"#)
                .unwrap();
        assert_eq!(msg.timestamp.as_deref(), Some("1704100000000"));
    }

    #[test]
    fn test_role_serializes_to_original_string() {
        let msg = Message::new(Role::from("system"), "be brief");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "system");
        assert!(json.get("timestamp").is_none());
    }
}
