//! Answer generation with layered failure handling
//!
//! Prefers the generative model; quota exhaustion falls back to the templated
//! responder and every other failure gets a fixed apology.

use std::sync::Arc;

use tracing::debug;
use tracing::warn;

use crate::config::PersonaConfig;
use crate::llm::LlmFailureKind;
use crate::llm::LlmService;
use crate::models::ChatMessage;
use crate::rag::Retriever;
use crate::rag::TemplatedResponder;

/// Turns of history sent to the model. Intentionally a separate constant from
/// the caller's own history window (`session::HISTORY_WINDOW`); the two bounds
/// need not agree.
pub const GENERATION_HISTORY_TURNS: usize = 5;

/// Hard ceiling on generated answer length.
pub const MAX_ANSWER_TOKENS: u32 = 500;

/// Low temperature keeps the persona on-script.
pub const ANSWER_TEMPERATURE: f32 = 0.3;

/// Returned for transient or fatal generation failures; quota failures get
/// the templated fallback instead.
const GENERIC_APOLOGY: &str =
    "I'm having trouble processing your request right now. Please try again!";

pub struct Answerer {
    llm: Arc<LlmService>,
    fallback: TemplatedResponder,
    persona: PersonaConfig,
}

impl Answerer {
    pub fn new(llm: Arc<LlmService>, retriever: Arc<Retriever>, persona: PersonaConfig) -> Self {
        let fallback = TemplatedResponder::new(retriever, persona.clone());
        Self {
            llm,
            fallback,
            persona,
        }
    }

    /// Produce the final answer text for the conversation so far.
    ///
    /// Never returns an error: generation failures degrade to the templated
    /// fallback (quota) or a fixed apology (everything else).
    pub async fn generate(&self, history: &[ChatMessage], context: &str) -> String {
        let system_prompt = self.system_prompt(context);
        let recent = &history[history.len().saturating_sub(GENERATION_HISTORY_TURNS)..];

        match self
            .llm
            .complete(&system_prompt, recent, MAX_ANSWER_TOKENS, ANSWER_TEMPERATURE)
            .await
        {
            Ok(answer) => answer,
            Err(failure) => {
                warn!("Generation failed ({:?}): {}", failure.kind, failure.message);
                match failure.kind {
                    LlmFailureKind::QuotaExceeded => {
                        debug!("Quota exhausted; composing templated response");
                        self.fallback.respond(history)
                    }
                    LlmFailureKind::Transient | LlmFailureKind::Fatal => {
                        GENERIC_APOLOGY.to_string()
                    }
                }
            }
        }
    }

    /// System instruction: persona identity, behavioral rules, and the
    /// grounding instruction when retrieved context is available.
    fn system_prompt(&self, context: &str) -> String {
        let p = &self.persona;
        let mut prompt = format!(
            "You are {name}, {headline} from {location}.\n\n\
             CORE IDENTITY:\n",
            name = p.name,
            headline = p.headline,
            location = p.location,
        );
        for highlight in &p.highlights {
            prompt.push_str(&format!("- {highlight}\n"));
        }

        prompt.push_str(&format!(
            "\nRESPONSE RULES:\n\
             - Always respond in English, regardless of input language\n\
             - Maximum 4-5 short lines\n\
             - Speak in first person as {name}\n\
             - Be warm, professional, and helpful\n\
             - If unsure, say: \"I'm not sure about that. Feel free to ask about my work or projects!\"\n\
             - End with a friendly follow-up question\n\
             \nGUARDRAILS:\n\
             - Only discuss your background, skills, projects, education, publications, interests, and goals\n\
             - Never invent information not in your resume or context\n\
             - Refuse to answer unrelated questions politely\n\
             - Stay in character as {name}",
            name = p.name,
        ));

        if !context.trim().is_empty() {
            prompt.push_str(&format!(
                "\n\nIMPORTANT: Use this retrieved context to answer questions accurately:\n{context}"
            ));
        }

        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CorpusConfig;
    use crate::config::EmbeddingsConfig;
    use crate::config::LlmConfig;
    use crate::corpus::CorpusStore;
    use crate::embeddings::EmbeddingClient;

    fn persona() -> PersonaConfig {
        PersonaConfig {
            name: "Sarmitha".to_string(),
            headline: "AI/ML Engineer".to_string(),
            location: "Coimbatore".to_string(),
            email: "s@example.com".to_string(),
            linkedin: "linkedin.com/in/s".to_string(),
            github: "github.com/s".to_string(),
            highlights: vec!["B.E. Electronics & Instrumentation".to_string()],
        }
    }

    /// Answer every HTTP request on a local port with 429, the way a
    /// rate-limited completions API does.
    async fn spawn_quota_exhausted_server() -> String {
        use tokio::io::AsyncReadExt;
        use tokio::io::AsyncWriteExt;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = [0u8; 8192];
                    let _ = socket.read(&mut buf).await;
                    let _ = socket
                        .write_all(
                            b"HTTP/1.1 429 Too Many Requests\r\n\
                              content-length: 0\r\n\
                              connection: close\r\n\r\n",
                        )
                        .await;
                });
            }
        });
        format!("http://{addr}")
    }

    fn answerer_with_llm_endpoint(dir: &tempfile::TempDir, llm_endpoint: &str) -> Answerer {
        let corpus = Arc::new(
            CorpusStore::load(CorpusConfig {
                fragments_path: dir.path().join("fragments.json").display().to_string(),
                embeddings_path: dir.path().join("embeddings.json").display().to_string(),
            })
            .unwrap(),
        );
        let embeddings = Arc::new(
            EmbeddingClient::new(&EmbeddingsConfig {
                endpoint: "http://127.0.0.1:9".to_string(),
                api_key: "test".to_string(),
                model: "m".to_string(),
                dimension: 2,
                timeout_secs: 1,
            })
            .unwrap(),
        );
        let retriever = Arc::new(Retriever::new(corpus, embeddings));
        let llm = Arc::new(
            LlmService::new(&LlmConfig {
                endpoint: llm_endpoint.to_string(),
                api_key: "test".to_string(),
                model: "gpt-4o".to_string(),
                timeout_secs: 1,
            })
            .unwrap(),
        );
        Answerer::new(llm, retriever, persona())
    }

    fn offline_answerer(dir: &tempfile::TempDir) -> Answerer {
        answerer_with_llm_endpoint(dir, "http://127.0.0.1:9")
    }

    #[test]
    fn test_system_prompt_includes_context_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let answerer = offline_answerer(&dir);

        let with_context = answerer.system_prompt("Skills: python, tensorflow");
        assert!(with_context.contains("retrieved context"));
        assert!(with_context.contains("python, tensorflow"));

        let without_context = answerer.system_prompt("   ");
        assert!(!without_context.contains("retrieved context"));
        assert!(without_context.contains("Sarmitha"));
        assert!(without_context.contains("B.E. Electronics"));
    }

    #[tokio::test]
    async fn test_quota_exhaustion_yields_templated_response() {
        // 429 from the model must route to the templated fallback, not the
        // apology: the greeting keyword classifies, so the canned persona
        // greeting comes back
        let dir = tempfile::tempdir().unwrap();
        let endpoint = spawn_quota_exhausted_server().await;
        let answerer = answerer_with_llm_endpoint(&dir, &endpoint);

        let answer = answerer
            .generate(&[ChatMessage::user("hi there")], "")
            .await;
        assert!(answer.starts_with("Hi! I'm Sarmitha"));
        assert_ne!(answer, GENERIC_APOLOGY);
    }

    #[tokio::test]
    async fn test_quota_exhaustion_with_no_user_turn_greets() {
        let dir = tempfile::tempdir().unwrap();
        let endpoint = spawn_quota_exhausted_server().await;
        let answerer = answerer_with_llm_endpoint(&dir, &endpoint);

        let answer = answerer.generate(&[], "").await;
        assert!(answer.starts_with("Hi! I'm Sarmitha"));
    }

    #[tokio::test]
    async fn test_unreachable_model_yields_apology() {
        // Connect errors classify as transient, which must produce the fixed
        // apology rather than the templated fallback
        let dir = tempfile::tempdir().unwrap();
        let answerer = offline_answerer(&dir);

        let answer = answerer
            .generate(&[ChatMessage::user("Hello")], "")
            .await;
        assert_eq!(answer, GENERIC_APOLOGY);
    }
}
