//! Message types exchanged with the generation service.
//!
//! A flow renders its prompt into one or more messages: text content plus
//! optional media attachments (audio for transcription).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::media::DataUri;

/// The role of a message sender in a provider exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The caller (rendered prompt)
    User,
    /// The model
    Assistant,
    /// System instructions
    System,
}

/// A single message sent to or received from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Media attached to the message, in render order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<DataUri>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            attachments: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    /// Attach media to this message.
    pub fn with_attachments(mut self, attachments: Vec<DataUri>) -> Self {
        self.attachments = attachments;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_message() {
        let msg = Message::user("Summarize this consultation");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Summarize this consultation");
        assert!(msg.attachments.is_empty());
    }

    #[test]
    fn attachments_survive_serialization() {
        let msg = Message::user("Transcribe")
            .with_attachments(vec![DataUri::encode("audio/webm", b"abc")]);
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back.attachments.len(), 1);
        assert_eq!(back.attachments[0].mime_type, "audio/webm");
    }

    #[test]
    fn empty_attachments_are_omitted() {
        let json = serde_json::to_string(&Message::assistant("ok")).unwrap();
        assert!(!json.contains("attachments"));
    }
}
