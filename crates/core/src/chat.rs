//! Conversation turns exchanged between a patient and a doctor.

use serde::{Deserialize, Serialize};

/// Who wrote a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Patient,
    Doctor,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Patient => "patient",
            Self::Doctor => "doctor",
        }
    }
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message in a consultation chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub sender: Sender,
    #[serde(default, deserialize_with = "crate::schema::absent_as_default")]
    pub text: String,
}

impl ChatTurn {
    pub fn patient(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Patient,
            text: text.into(),
        }
    }

    pub fn doctor(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Doctor,
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_uses_lowercase_wire_names() {
        let json = serde_json::to_string(&ChatTurn::doctor("Hello")).unwrap();
        assert_eq!(json, r#"{"sender":"doctor","text":"Hello"}"#);

        let turn: ChatTurn = serde_json::from_str(r#"{"sender":"patient","text":"Hi"}"#).unwrap();
        assert_eq!(turn.sender, Sender::Patient);
    }

    #[test]
    fn turn_without_text_is_empty() {
        let turn: ChatTurn = serde_json::from_str(r#"{"sender":"doctor"}"#).unwrap();
        assert_eq!(turn, ChatTurn::doctor(""));
        let turn: ChatTurn = serde_json::from_str(r#"{"sender":"doctor","text":null}"#).unwrap();
        assert_eq!(turn.text, "");
    }

    #[test]
    fn unknown_sender_is_rejected() {
        let result = serde_json::from_str::<ChatTurn>(r#"{"sender":"nurse","text":"Hi"}"#);
        assert!(result.is_err());
    }
}
