/// Shared types for the chat layer: wire models and view events
use serde::{Deserialize, Serialize};

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// One entry of a transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: Sender,
    pub content: String,
    /// ISO-8601 instant, kept as the server formatted it
    pub timestamp: String,
    /// Assigned by the service once persisted; `None` for optimistic messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

impl Message {
    /// Locally-synthesized message stamped with the client clock
    pub fn local(sender: Sender, content: impl Into<String>) -> Self {
        Self {
            sender,
            content: content.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            id: None,
        }
    }
}

/// Bot metadata, read-only from the client's point of view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bot {
    pub id: i64,
    pub name: String,
    /// Greeting shown under the name
    #[serde(default)]
    pub salutation: String,
    #[serde(default)]
    pub character_prompt: String,
    #[serde(default)]
    pub ollama_model: String,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub image_filename: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub creator_id: i64,
}

/// Body of a successful append call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyBody {
    pub response: String,
}

/// Body of a successful login call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginBody {
    pub access_token: String,
}

/// Error body returned by the service
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub msg: Option<String>,
}

/// In-flight status of a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No request in flight, input accepted
    Idle,
    /// A submission awaits the service reply
    Sending,
    /// A delete-last-exchange awaits acknowledgement
    Deleting,
}

/// Whether the transcript reflects the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    NotLoaded,
    Loaded,
    Failed(String),
}

/// Real-time events published by a conversation
#[derive(Debug, Clone)]
pub enum ConversationEvent {
    /// Transcript replaced by a history fetch
    HistoryLoaded { bot_id: i64, count: usize },
    /// A message was appended (optimistic user message or bot reply)
    MessageAppended { bot_id: i64, message: Message },
    PhaseChanged { bot_id: i64, phase: Phase },
    /// A failed send was rolled back to the service's transcript
    Resynced { bot_id: i64, count: usize },
    /// An operation failed; `message` is user-facing
    Error { bot_id: i64, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_wire_format() {
        let raw = r#"{"sender":"bot","content":"Hi","timestamp":"2024-01-07T12:00:00","id":7}"#;
        let msg: Message = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.sender, Sender::Bot);
        assert_eq!(msg.id, Some(7));

        let local = Message::local(Sender::User, "Hello");
        let json = serde_json::to_value(&local).unwrap();
        assert_eq!(json["sender"], "user");
        assert!(json.get("id").is_none());
    }

    #[test]
    fn test_bot_optional_fields() {
        let raw = r#"{"id":1,"name":"Ada","creator_id":3}"#;
        let bot: Bot = serde_json::from_str(raw).unwrap();
        assert_eq!(bot.name, "Ada");
        assert!(!bot.is_public);
        assert!(bot.image_filename.is_none());
    }
}
