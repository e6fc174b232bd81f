use serde::{Deserialize, Serialize};
use std::fmt;

/// Speaker of a conversation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
    Function,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
            Self::Function => "function",
        };
        f.write_str(name)
    }
}

/// One discrete turn of a conversation
///
/// Messages are never split; the trimmer keeps or drops them whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// Speaker
    pub role: Role,

    /// Message text
    pub content: String,
}

impl ConversationMessage {
    /// Create new message
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Text chunk produced by the merger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Chunk text
    pub text: String,

    /// Start byte offset in the merged text
    pub start: usize,

    /// End byte offset in the merged text
    pub end: usize,

    /// Set when the chunk is a single piece that no separator could
    /// bring under the token budget
    pub oversized: bool,
}

impl TextChunk {
    /// Byte length of the chunk text
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl AsRef<str> for TextChunk {
    fn as_ref(&self) -> &str {
        &self.text
    }
}
