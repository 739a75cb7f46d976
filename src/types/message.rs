use serde::{Deserialize, Serialize};
use std::fmt;

/// Who a chat log entry came from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Text the user submitted.
    User,

    /// A reply from the backend.
    Assistant,

    /// Client-generated notices: application errors and connection closes.
    System,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::System => write!(f, "system"),
        }
    }
}

/// Analysis the backend attaches to an assistant reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_crisis: Option<bool>,

    /// Input-guardrail verdict; `safe` when nothing was detected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attack: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal_entry: Option<String>,
}

impl MessageMeta {
    /// True when the backend flagged the turn as a crisis.
    pub fn crisis(&self) -> bool {
        self.is_crisis.unwrap_or(false)
    }

    /// The guardrail label, unless it is absent or `safe`.
    pub fn flagged_attack(&self) -> Option<&str> {
        self.attack.as_deref().filter(|attack| *attack != "safe")
    }
}

/// One entry in the chat log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<MessageMeta>,
}

impl Message {
    /// A message the user typed.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            meta: None,
        }
    }

    /// An assistant reply with its metadata.
    pub fn assistant(content: impl Into<String>, meta: MessageMeta) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            meta: Some(meta),
        }
    }

    /// A client-generated notice.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            meta: None,
        }
    }
}
