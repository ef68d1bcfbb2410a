//! Bounded per-session conversation window
//!
//! The orchestrator is stateless between calls; the caller owns one of these
//! per session (single writer) and passes its contents into each call.

use std::collections::VecDeque;

use crate::models::ChatMessage;

/// Messages retained in the caller's window, oldest evicted first.
/// Independent of the answerer's own generation-call truncation
/// (`rag::answerer::GENERATION_HISTORY_TURNS`).
pub const HISTORY_WINDOW: usize = 5;

/// Fixed-capacity recent-turn window.
#[derive(Debug, Clone)]
pub struct ChatWindow {
    messages: VecDeque<ChatMessage>,
    capacity: usize,
}

impl ChatWindow {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_WINDOW)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a turn, evicting the oldest when the window is full.
    pub fn push(&mut self, message: ChatMessage) {
        if self.messages.len() == self.capacity {
            self.messages.pop_front();
        }
        self.messages.push_back(message);
    }

    /// Window contents in order, oldest first.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.messages.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for ChatWindow {
    fn default() -> Self {
        Self::new()
    }
}
