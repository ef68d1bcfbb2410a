//! Shared data types for the chat pipeline

use serde::Deserialize;
use serde::Serialize;

/// One titled, flattened unit of resume content eligible for retrieval.
///
/// Fragments are produced by the offline ingestion job and are immutable at
/// query time. A fragment is identified by its position in the flattened
/// sequence; both the dense and lexical indexes refer back to fragments by
/// that position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fragment {
    /// Section path joined for display, e.g. "Projects > AI > Pneumonia Detection"
    pub title: String,
    pub content: String,
}

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Chat message in conversation history
#[derive(Debug, Clone, Serialize, Deserialize)]
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
