//! Conversation coverage estimation
//!
//! "Coverage" here is a turn-count-derived engagement fraction shown in the
//! UI: how far along the conversation is toward a fixed number of visitor
//! questions. It is NOT a measure of retrieval quality or answer confidence,
//! despite what the name suggests to a first-time reader.

use crate::models::ChatMessage;
use crate::models::Role;

/// Number of visitor questions that counts as a fully-covered conversation.
pub const COVERAGE_TARGET_QUERIES: usize = 5;

/// Coverage for the query currently being answered, given the history as it
/// stood *before* that query is appended: `min((user_turns + 1) / 5, 1.0)`.
///
/// Pure in the conversation length; independent of whether retrieval
/// succeeded, failed, or returned nothing.
pub fn context_coverage(history: &[ChatMessage]) -> f32 {
    let user_turns = history.iter().filter(|m| m.role == Role::User).count();
    (((user_turns + 1) as f32) / (COVERAGE_TARGET_QUERIES as f32)).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_history() {
        assert!((context_coverage(&[]) - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn test_four_user_turns_is_full() {
        let history: Vec<ChatMessage> = (0..4)
            .flat_map(|i| {
                vec![
                    ChatMessage::user(format!("question {i}")),
                    ChatMessage::assistant("answer"),
                ]
            })
            .collect();
        assert!((context_coverage(&history) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_caps_at_one() {
        let history: Vec<ChatMessage> =
            (0..10).map(|i| ChatMessage::user(format!("q{i}"))).collect();
        assert!((context_coverage(&history) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_assistant_turns_do_not_count() {
        let history = vec![
            ChatMessage::assistant("welcome"),
            ChatMessage::user("hello"),
            ChatMessage::assistant("hi"),
        ];
        // One user turn plus the current query
        assert!((context_coverage(&history) - 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn test_non_decreasing() {
        let mut history = Vec::new();
        let mut previous = 0.0_f32;
        for i in 0..12 {
            let coverage = context_coverage(&history);
            assert!(coverage >= previous);
            previous = coverage;
            history.push(ChatMessage::user(format!("q{i}")));
            history.push(ChatMessage::assistant("a"));
        }
    }
}
