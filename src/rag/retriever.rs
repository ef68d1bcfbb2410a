//! Two-tier retrieval: dense similarity search with a lexical fallback

use std::sync::Arc;

use tracing::debug;
use tracing::warn;

use crate::corpus::CorpusSnapshot;
use crate::corpus::CorpusStore;
use crate::embeddings::EmbeddingClient;
use crate::rag::RetrievalTier;
use crate::rag::SearchResult;

/// Retriever over the corpus store.
///
/// `retrieve` never returns an error: a failing embedding call or dense index
/// demotes to BM25, and missing lexical structures demote to an empty result.
pub struct Retriever {
    corpus: Arc<CorpusStore>,
    embeddings: Arc<EmbeddingClient>,
}

impl Retriever {
    pub fn new(corpus: Arc<CorpusStore>, embeddings: Arc<EmbeddingClient>) -> Self {
        Self { corpus, embeddings }
    }

    /// Return up to `k` fragments, most relevant first.
    pub async fn retrieve(&self, query: &str, k: usize) -> Vec<SearchResult> {
        let snapshot = self.corpus.snapshot();

        // Both tiers share the fragment list; without dense structures the
        // lexical tier is the whole strategy.
        let Some(dense) = snapshot.dense.as_ref() else {
            return Self::lexical_search(&snapshot, query, k);
        };
        if snapshot.lexical.is_none() {
            return Self::lexical_search(&snapshot, query, k);
        }

        let query_vector = match self.embeddings.embed(query).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!("Embedding call failed, demoting to lexical search: {}", e);
                return Self::lexical_search(&snapshot, query, k);
            }
        };

        let hits = match dense.search(&query_vector, k) {
            Ok(hits) => hits,
            Err(e) => {
                warn!("Dense search failed, demoting to lexical search: {}", e);
                return Self::lexical_search(&snapshot, query, k);
            }
        };

        debug!("Dense search returned {} hits", hits.len());

        // Distances ascending; positions outside the fragment list are skipped
        hits.into_iter()
            .filter_map(|(distance, position)| {
                snapshot.fragments.get(position).map(|fragment| SearchResult {
                    content: fragment.content.clone(),
                    title: fragment.title.clone(),
                    score: distance,
                    tier: RetrievalTier::Dense,
                })
            })
            .collect()
    }

    /// Lexical-only retrieval, used directly by the templated fallback so it
    /// stays self-sufficient when every remote service is down.
    pub fn lexical_retrieve(&self, query: &str, k: usize) -> Vec<SearchResult> {
        Self::lexical_search(&self.corpus.snapshot(), query, k)
    }

    fn lexical_search(snapshot: &CorpusSnapshot, query: &str, k: usize) -> Vec<SearchResult> {
        let Some(lexical) = snapshot.lexical.as_ref() else {
            // A missing lexical tier is a valid terminal outcome, not an error
            return Vec::new();
        };

        let query_tokens: Vec<&str> = query.split_whitespace().collect();
        let scores = lexical.scores(&query_tokens);

        let mut ranked: Vec<(f32, usize)> = scores
            .into_iter()
            .enumerate()
            .map(|(position, score)| (score, position))
            .collect();
        ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
        ranked.truncate(k);

        debug!("Lexical search scored {} fragments", snapshot.fragments.len());

        ranked
            .into_iter()
            .filter_map(|(score, position)| {
                snapshot.fragments.get(position).map(|fragment| SearchResult {
                    content: fragment.content.clone(),
                    title: fragment.title.clone(),
                    score,
                    tier: RetrievalTier::Lexical,
                })
            })
            .collect()
    }
}
