use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    User,
    Assistant,
}

impl Origin {
    /// Speaker label used when rendering prompt context.
    pub fn label(self) -> &'static str {
        match self {
            Origin::User => "User",
            Origin::Assistant => "Assistant",
        }
    }
}

/// One immutable unit of conversation.
///
/// Fields are private so a message cannot be edited after creation; only the
/// history that holds it is mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    id: Uuid,
    text: String,
    origin: Origin,
    created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(text: impl Into<String>, origin: Origin) -> Self {
        Self {
            // v7 ids sort by creation time.
            id: Uuid::now_v7(),
            text: text.into(),
            origin,
            created_at: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(text, Origin::User)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(text, Origin::Assistant)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }
}
