//! Chat message value type

use core::fmt;
use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

// ----------------------------------------------------------------------------
// Message
// ----------------------------------------------------------------------------

/// A received chat message
///
/// Immutable once constructed. Server notices carry no author; an empty author string
/// is treated the same as a missing one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    author: Option<String>,
    content: String,
    timestamp: Timestamp,
}

impl Message {
    /// Create a message with an author
    pub fn new(author: impl Into<String>, content: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            author: Some(author.into()),
            content: content.into(),
            timestamp,
        }
    }

    /// Create an authorless message (server notice)
    pub fn notice(content: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            author: None,
            content: content.into(),
            timestamp,
        }
    }

    /// Author name, if the message has a non-empty one
    pub fn author(&self) -> Option<&str> {
        self.author.as_deref().filter(|a| !a.is_empty())
    }

    pub fn has_author(&self) -> bool {
        self.author().is_some()
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Stable per-author seed that render sinks can map to a colour
    ///
    /// Uses the 31-multiplier string hash so a given name always lands on the same
    /// colour across runs and platforms.
    pub fn author_color_seed(&self) -> Option<u32> {
        self.author().map(name_color_seed)
    }
}

/// Colour seed for a participant name (see [`Message::author_color_seed`])
pub fn name_color_seed(name: &str) -> u32 {
    name.encode_utf16()
        .fold(0u32, |h, unit| h.wrapping_mul(31).wrapping_add(unit as u32))
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.author() {
            Some(author) => write!(f, "[{}] {} > {}", self.timestamp, author, self.content),
            None => write!(f, "[{}] {}", self.timestamp, self.content),
        }
    }
}
