use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Any role string other than `user` (including the legacy `ai`) reads as the assistant.
    pub fn from_label(label: &str) -> Self {
        if label == "user" {
            Role::User
        } else {
            Role::Assistant
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let label = String::deserialize(deserializer)?;
        Ok(Role::from_label(&label))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// One persisted conversation.
///
/// `id` stays `None` until the first save assigns one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Option<String>,
    pub model: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(default)]
    pub title: String,
}

impl Session {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            id: None,
            model: model.into(),
            messages,
            timestamp: OffsetDateTime::now_utc(),
            title: String::new(),
        }
    }

    pub fn summary(&self) -> Option<SessionSummary> {
        Some(SessionSummary {
            id: self.id.clone()?,
            title: self.title.clone(),
            model: self.model.clone(),
            timestamp: self.timestamp,
        })
    }
}

/// What the history list shows for a session.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionSummary {
    pub id: String,
    pub title: String,
    pub model: String,
    pub timestamp: OffsetDateTime,
}
