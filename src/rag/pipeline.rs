//! Session orchestrator: one user message in, one annotated answer out

use std::sync::Arc;

use tracing::debug;
use tracing::info;

use crate::config::AppConfig;
use crate::corpus::CorpusStore;
use crate::corpus::ReloadSummary;
use crate::embeddings::EmbeddingClient;
use crate::errors::Result;
use crate::llm::LlmService;
use crate::models::ChatMessage;
use crate::rag::context_coverage;
use crate::rag::Answerer;
use crate::rag::Retriever;
use crate::translate::Translator;
use crate::translate::DEFAULT_LANGUAGE;

/// Fragments retrieved per query for the generation prompt.
pub const RETRIEVAL_LIMIT: usize = 3;

/// One answered exchange.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub response: String,
    /// Turn-count engagement fraction in [0, 1]; see [`crate::rag::coverage`].
    pub context_coverage: f32,
}

/// Complete chat service: normalization, retrieval, coverage, generation.
///
/// Stateless across calls; the caller owns the conversation window and is
/// responsible for appending the raw user turn and this response to it.
pub struct ChatService {
    corpus: Arc<CorpusStore>,
    retriever: Arc<Retriever>,
    answerer: Answerer,
    translator: Translator,
}

impl ChatService {
    /// Build the full pipeline from configuration.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let corpus = Arc::new(CorpusStore::load(config.corpus.clone())?);
        let embeddings = Arc::new(EmbeddingClient::new(&config.embeddings)?);
        let retriever = Arc::new(Retriever::new(corpus.clone(), embeddings));
        let llm = Arc::new(LlmService::new(&config.llm)?);
        let answerer = Answerer::new(llm, retriever.clone(), config.persona.clone());
        let translator = Translator::new(&config.translation)?;

        Ok(Self {
            corpus,
            retriever,
            answerer,
            translator,
        })
    }

    /// Answer one visitor message given the caller's bounded recent history.
    ///
    /// Never fails outward: every external-service failure has a degraded
    /// tier, so the caller always receives answer text and a coverage number.
    pub async fn answer(&self, user_input: &str, history: &[ChatMessage]) -> ChatResponse {
        info!("Processing chat message ({} history turns)", history.len());

        // Normalize language first so retrieval and generation see English
        let language = self.translator.detect(user_input).await;
        let normalized = self.translator.to_english(user_input).await;
        debug!("Detected language: {}", language);

        let fragments = self.retriever.retrieve(&normalized, RETRIEVAL_LIMIT).await;
        let context = fragments
            .iter()
            .map(|f| f.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        debug!("Retrieved {} fragments for context", fragments.len());

        // Coverage is computed from the history as it stood before this turn
        let coverage = context_coverage(history);

        let mut messages = history.to_vec();
        messages.push(ChatMessage::user(normalized));

        let mut response = self.answerer.generate(&messages, &context).await;

        // Annotation happens strictly after generation; it never alters
        // retrieval or prompt content
        if language != DEFAULT_LANGUAGE {
            response.push_str(&language_note(&language));
        }

        ChatResponse {
            response,
            context_coverage: coverage,
        }
    }

    /// Re-read the corpus artifacts written by the ingestion job.
    ///
    /// The one operation whose failure is surfaced to the operator; the prior
    /// snapshot keeps serving if it fails.
    pub fn reload(&self) -> Result<ReloadSummary> {
        self.corpus.reload()
    }

    /// Retriever handle, for callers that want context without generation.
    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }
}

fn language_note(language: &str) -> String {
    format!(
        "\n[I noticed you wrote in {}. I replied in English for clarity!]",
        language.to_uppercase()
    )
}
