//! Templated responder used when the generative model is out of quota
//!
//! A finite keyword classifier over five topics plus a default, composing
//! canned text from the persona and a freshly retrieved context snippet. Same
//! input and corpus state always yield the same response.

use std::sync::Arc;

use tracing::debug;

use crate::config::PersonaConfig;
use crate::models::ChatMessage;
use crate::models::Role;
use crate::rag::Retriever;

/// Fragments fetched for the canned response; deliberately smaller than the
/// main pipeline's retrieval depth.
pub const FALLBACK_CONTEXT_FRAGMENTS: usize = 2;

/// Leading characters of the retrieved context interpolated into templates.
const SNIPPET_CHARS: usize = 200;

/// Topic categories, checked in this priority order; first match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Topic {
    Greeting,
    Projects,
    Skills,
    Contact,
    About,
}

const GREETING_WORDS: &[&str] = &["hello", "hi", "hey", "greetings"];
const PROJECT_WORDS: &[&str] = &["project", "projects", "work", "built", "developed"];
const SKILL_WORDS: &[&str] = &["skill", "skills", "technology", "programming", "language"];
const CONTACT_WORDS: &[&str] = &["contact", "email", "linkedin", "github"];
const ABOUT_WORDS: &[&str] = &["about", "who", "background", "education"];

/// Classify a message by keyword sets in fixed priority order. Matching is
/// token-wise on lowercased alphanumeric runs, so "this" does not trip "hi".
fn classify(message: &str) -> Option<Topic> {
    let tokens: Vec<String> = message
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(ToString::to_string)
        .collect();

    let contains_any = |words: &[&str]| tokens.iter().any(|t| words.contains(&t.as_str()));

    if contains_any(GREETING_WORDS) {
        Some(Topic::Greeting)
    } else if contains_any(PROJECT_WORDS) {
        Some(Topic::Projects)
    } else if contains_any(SKILL_WORDS) {
        Some(Topic::Skills)
    } else if contains_any(CONTACT_WORDS) {
        Some(Topic::Contact)
    } else if contains_any(ABOUT_WORDS) {
        Some(Topic::About)
    } else {
        None
    }
}

pub struct TemplatedResponder {
    retriever: Arc<Retriever>,
    persona: PersonaConfig,
}

impl TemplatedResponder {
    pub fn new(retriever: Arc<Retriever>, persona: PersonaConfig) -> Self {
        Self { retriever, persona }
    }

    /// Compose a canned response for the most recent user turn.
    ///
    /// Context is re-retrieved here (lexical tier only, no network) rather
    /// than reused from upstream, so this path works standalone even when
    /// every remote service is down.
    pub fn respond(&self, history: &[ChatMessage]) -> String {
        let Some(user_message) = history
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
        else {
            return self.greeting_opener();
        };

        let fragments = self
            .retriever
            .lexical_retrieve(user_message, FALLBACK_CONTEXT_FRAGMENTS);
        let context: String = fragments
            .iter()
            .map(|f| f.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let snippet = (!context.is_empty()).then(|| truncate_chars(&context, SNIPPET_CHARS));

        let topic = classify(user_message);
        debug!("Templated fallback classified message as {:?}", topic);

        let p = &self.persona;
        match topic {
            Some(Topic::Greeting) => format!(
                "Hi! I'm {}, {} from {}.\nWant to explore my projects, skills, or just chat about tech?",
                p.name, p.headline, p.location
            ),
            Some(Topic::Projects) => match snippet {
                Some(snippet) => format!(
                    "Here's what I've worked on:\n{snippet}...\nWant to know more about any specific project?"
                ),
                None => "I've worked on several projects across my portfolio.\nWhich one interests you most?".to_string(),
            },
            Some(Topic::Skills) => match snippet {
                Some(snippet) => format!(
                    "My technical skills include:\n{snippet}...\nWant to discuss any specific technology?"
                ),
                None => "I work with a range of tools and technologies.\nWhat technology would you like to know about?".to_string(),
            },
            Some(Topic::Contact) => format!(
                "You can reach me at:\nEmail: {}\nLinkedIn: {}\nGitHub: {}\nLet's connect!",
                p.email, p.linkedin, p.github
            ),
            Some(Topic::About) => match snippet {
                Some(snippet) => format!("About me:\n{snippet}...\nWant to know more about my background?"),
                None => format!(
                    "I'm {}, {} from {}.\nWhat would you like to know?",
                    p.name, p.headline, p.location
                ),
            },
            None => "I'm not sure what you mean.\nTry asking about my projects, skills, or background!\nHow can I help you today?".to_string(),
        }
    }

    fn greeting_opener(&self) -> String {
        format!(
            "Hi! I'm {}, {}. How can I help you today?",
            self.persona.name, self.persona.headline
        )
    }
}

/// Char-boundary-safe prefix of `text`.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
