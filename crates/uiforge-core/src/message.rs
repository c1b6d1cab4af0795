// Conversation message types
//
// Messages are the append-only history channel of a session. Clients send
// loosely shaped messages (string or part-array content, "human"/"ai" role
// aliases); `IncomingMessage` normalizes them at the boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
    Tool,
}

impl MessageRole {
    /// Parse a role name, accepting the "human"/"ai" aliases used by chat clients
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "user" | "human" => Some(Self::User),
            "assistant" | "ai" => Some(Self::Assistant),
            "system" => Some(Self::System),
            "tool" => Some(Self::Tool),
            _ => None,
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::System => write!(f, "system"),
            MessageRole::Tool => write!(f, "tool"),
        }
    }
}

/// One part of a message body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text {
        text: String,
    },
    Image {
        #[serde(rename = "imageUrl")]
        image_url: String,
    },
}

/// A message in the session history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: MessageRole,
    pub content: Vec<ContentPart>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a text message with a fresh id
    pub fn text(role: MessageRole, text: impl Into<String>) -> Self {
        Self {
            id: format!("msg-{}", Uuid::now_v7()),
            role,
            content: vec![ContentPart::Text { text: text.into() }],
            created_at: Utc::now(),
        }
    }

    /// Create a user message
    pub fn user(text: impl Into<String>) -> Self {
        Self::text(MessageRole::User, text)
    }

    /// Create an assistant message
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::text(MessageRole::Assistant, text)
    }

    /// Concatenated text of all text parts
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                ContentPart::Image { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// ============================================================================
// Incoming messages (client boundary)
// ============================================================================

/// Message content as sent by clients
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IncomingContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// A message as sent by a client in run input
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    /// Some clients send the role as `type` ("human", "ai")
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    pub content: IncomingContent,
}

impl IncomingMessage {
    /// Normalize into a history message; unknown roles default to user
    pub fn into_message(self) -> Message {
        let role = self
            .role
            .as_deref()
            .or(self.kind.as_deref())
            .and_then(MessageRole::parse)
            .unwrap_or(MessageRole::User);

        let content = match self.content {
            IncomingContent::Text(text) => vec![ContentPart::Text { text }],
            IncomingContent::Parts(parts) => parts,
        };

        Message {
            id: self
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| format!("msg-{}", Uuid::now_v7())),
            role,
            content,
            created_at: Utc::now(),
        }
    }
}

/// Text of the most recent user message that carries any text
pub fn latest_user_text(messages: &[Message]) -> Option<String> {
    messages
        .iter()
        .rev()
        .filter(|m| m.role == MessageRole::User)
        .map(Message::text_content)
        .find(|text| !text.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incoming_string_content_with_alias_role() {
        let incoming: IncomingMessage =
            serde_json::from_value(serde_json::json!({"type": "human", "content": "hello"}))
                .unwrap();
        let message = incoming.into_message();
        assert_eq!(message.role, MessageRole::User);
        assert_eq!(message.text_content(), "hello");
        assert!(message.id.starts_with("msg-"));
    }

    #[test]
    fn test_incoming_parts_content_keeps_id() {
        let incoming: IncomingMessage = serde_json::from_value(serde_json::json!({
            "id": "m1",
            "role": "ai",
            "content": [{"type": "text", "text": "hi"}, {"type": "image", "imageUrl": "data:x"}]
        }))
        .unwrap();
        let message = incoming.into_message();
        assert_eq!(message.id, "m1");
        assert_eq!(message.role, MessageRole::Assistant);
        assert_eq!(message.content.len(), 2);
        assert_eq!(message.text_content(), "hi");
    }

    #[test]
    fn test_latest_user_text_skips_assistant_and_blank() {
        let messages = vec![
            Message::user("first"),
            Message::user("   "),
            Message::assistant("reply"),
        ];
        assert_eq!(latest_user_text(&messages), Some("first".to_string()));
        assert_eq!(latest_user_text(&[Message::assistant("only")]), None);
    }
}
