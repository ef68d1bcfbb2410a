//! Retrieval-and-fallback answering engine
//!
//! End-to-end pipeline for one visitor message:
//! - Language detection and English normalization
//! - Two-tier retrieval: dense vector search demoting to BM25 on any failure
//! - Answer generation with a templated fallback when the model is over quota
//! - Turn-count coverage estimation for the caller's UI
//!
//! # Examples
//!
//! ```rust,no_run
//! use resumerag::config::AppConfig;
//! use resumerag::rag::ChatService;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let service = ChatService::new(&config)?;
//!
//!     let reply = service.answer("What are your skills?", &[]).await;
//!     println!("{} (coverage {:.2})", reply.response, reply.context_coverage);
//!
//!     Ok(())
//! }
//! ```

pub mod answerer;
pub mod coverage;
pub mod fallback;
pub mod pipeline;
pub mod retriever;

pub use answerer::Answerer;
pub use coverage::context_coverage;
pub use fallback::TemplatedResponder;
pub use pipeline::ChatResponse;
pub use pipeline::ChatService;
pub use retriever::Retriever;

/// Retrieved fragment with relevance score, ephemeral per query.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub content: String,
    pub title: String,
    /// L2 distance on the dense tier (smaller is better), BM25 score on the
    /// lexical tier (larger is better); interpret together with `tier`.
    pub score: f32,
    pub tier: RetrievalTier,
}

/// Which retrieval tier produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalTier {
    /// Vector similarity over embeddings
    Dense,
    /// BM25 term overlap, used when the dense path is unavailable
    Lexical,
}
