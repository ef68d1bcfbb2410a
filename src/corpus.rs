//! Corpus snapshot loading and the two parallel retrieval indexes
//!
//! The dense and lexical indexes are positionally coupled: both must be built
//! from the same flattened fragment sequence, in the same order, because dense
//! search returns positions that are looked up in the fragment list. A
//! `CorpusSnapshot` bundles all three as one versioned value so the coupling
//! is an invariant rather than an accident of file layout.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;

use tracing::info;
use tracing::warn;

use crate::config::CorpusConfig;
use crate::errors::ResumeRagError;
use crate::errors::Result;
use crate::models::Fragment;

/// BM25 parameters (Okapi defaults)
const BM25_K1: f32 = 1.5;
const BM25_B: f32 = 0.75;

/// Flat L2 nearest-neighbor index over the fragment embedding matrix.
pub struct DenseIndex {
    vectors: Vec<Vec<f32>>,
    dimension: usize,
}

impl DenseIndex {
    /// Build from a non-ragged matrix. Returns `None` for an empty or ragged
    /// matrix; a corrupt artifact must degrade, never fail.
    fn from_matrix(vectors: Vec<Vec<f32>>) -> Option<Self> {
        let dimension = vectors.first()?.len();
        if dimension == 0 || vectors.iter().any(|v| v.len() != dimension) {
            return None;
        }
        Some(Self { vectors, dimension })
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Return the `k` nearest vectors as `(l2_distance, position)` pairs,
    /// distance ascending (smaller is more relevant).
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(f32, usize)>> {
        if query.len() != self.dimension {
            return Err(ResumeRagError::Corpus(format!(
                "query dimension {} does not match index dimension {}",
                query.len(),
                self.dimension
            )));
        }

        let mut scored: Vec<(f32, usize)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(position, vector)| (l2_distance(query, vector), position))
            .collect();

        scored.sort_by(|a, b| a.0.total_cmp(&b.0));
        scored.truncate(k);
        Ok(scored)
    }
}

fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// BM25 term statistics over the whitespace-tokenized fragment contents.
///
/// Built at load time from the same ordered fragment sequence the dense index
/// was built from, so positional lookups are consistent by construction.
pub struct LexicalIndex {
    term_freqs: Vec<HashMap<String, f32>>,
    doc_lens: Vec<f32>,
    avg_doc_len: f32,
    idf: HashMap<String, f32>,
}

impl LexicalIndex {
    /// Build BM25 statistics; `None` for an empty corpus.
    pub fn build(fragments: &[Fragment]) -> Option<Self> {
        if fragments.is_empty() {
            return None;
        }

        let tokenized: Vec<Vec<&str>> = fragments
            .iter()
            .map(|f| f.content.split_whitespace().collect())
            .collect();

        let mut term_freqs = Vec::with_capacity(tokenized.len());
        let mut doc_lens = Vec::with_capacity(tokenized.len());
        let mut doc_freqs: HashMap<String, usize> = HashMap::new();

        for tokens in &tokenized {
            let mut freqs: HashMap<String, f32> = HashMap::new();
            for token in tokens {
                *freqs.entry((*token).to_string()).or_insert(0.0) += 1.0;
            }
            for term in freqs.keys() {
                *doc_freqs.entry(term.clone()).or_insert(0) += 1;
            }
            doc_lens.push(tokens.len() as f32);
            term_freqs.push(freqs);
        }

        let n = tokenized.len() as f32;
        let avg_doc_len = doc_lens.iter().sum::<f32>() / n;
        let idf = doc_freqs
            .into_iter()
            .map(|(term, df)| {
                let df = df as f32;
                (term, (1.0 + (n - df + 0.5) / (df + 0.5)).ln())
            })
            .collect();

        Some(Self {
            term_freqs,
            doc_lens,
            avg_doc_len,
            idf,
        })
    }

    pub fn len(&self) -> usize {
        self.doc_lens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_lens.is_empty()
    }

    /// Score every fragment against the tokenized query, in fragment order.
    pub fn scores(&self, query_tokens: &[&str]) -> Vec<f32> {
        (0..self.term_freqs.len())
            .map(|position| {
                query_tokens
                    .iter()
                    .map(|token| self.term_score(position, token))
                    .sum()
            })
            .collect()
    }

    fn term_score(&self, position: usize, term: &str) -> f32 {
        let Some(idf) = self.idf.get(term) else {
            return 0.0;
        };
        let tf = self.term_freqs[position].get(term).copied().unwrap_or(0.0);
        if tf == 0.0 {
            return 0.0;
        }
        let norm = 1.0 - BM25_B + BM25_B * self.doc_lens[position] / self.avg_doc_len;
        idf * tf * (BM25_K1 + 1.0) / (tf + BM25_K1 * norm)
    }
}

/// One consistent, versioned view of the corpus artifacts.
pub struct CorpusSnapshot {
    pub version: u64,
    pub fragments: Vec<Fragment>,
    pub dense: Option<DenseIndex>,
    pub lexical: Option<LexicalIndex>,
}

impl CorpusSnapshot {
    pub fn empty(version: u64) -> Self {
        Self {
            version,
            fragments: Vec::new(),
            dense: None,
            lexical: None,
        }
    }

    /// Load a snapshot from the on-disk artifacts.
    ///
    /// A missing fragment file yields an empty snapshot; a present but
    /// malformed fragment file is an error (the operator must see it). The
    /// dense artifact degrades to `None` on any problem, including a row
    /// count that disagrees with the fragment count.
    fn load(config: &CorpusConfig, version: u64) -> Result<Self> {
        let fragments_path = Path::new(&config.fragments_path);
        if !fragments_path.exists() {
            warn!(
                "Fragment artifact {} missing; serving an empty corpus",
                config.fragments_path
            );
            return Ok(Self::empty(version));
        }

        let content = std::fs::read_to_string(fragments_path)?;
        let fragments: Vec<Fragment> = serde_json::from_str(&content)?;

        let dense = load_dense_artifact(&config.embeddings_path, fragments.len());
        let lexical = LexicalIndex::build(&fragments);

        Ok(Self {
            version,
            fragments,
            dense,
            lexical,
        })
    }
}

/// Read the embedding matrix; any problem degrades to `None` so retrieval
/// falls back to the lexical tier.
fn load_dense_artifact(path: &str, expected_rows: usize) -> Option<DenseIndex> {
    if !Path::new(path).exists() {
        warn!("Dense artifact {} missing; dense retrieval disabled", path);
        return None;
    }

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Failed to read dense artifact {}: {}", path, e);
            return None;
        }
    };

    let matrix: Vec<Vec<f32>> = match serde_json::from_str(&content) {
        Ok(matrix) => matrix,
        Err(e) => {
            warn!("Dense artifact {} is corrupt: {}", path, e);
            return None;
        }
    };

    if matrix.len() != expected_rows {
        warn!(
            "Dense artifact {} has {} rows for {} fragments; dense retrieval disabled",
            path,
            matrix.len(),
            expected_rows
        );
        return None;
    }

    let index = DenseIndex::from_matrix(matrix);
    if index.is_none() {
        warn!("Dense artifact {} is empty or ragged; dense retrieval disabled", path);
    }
    index
}

/// Read-mostly corpus store with atomic snapshot replacement.
///
/// `reload` builds the entire next snapshot before swapping it in; on any
/// failure the previous snapshot keeps serving unmodified.
pub struct CorpusStore {
    config: CorpusConfig,
    current: RwLock<Arc<CorpusSnapshot>>,
}

/// What a reload produced, for operator-facing reporting.
#[derive(Debug, Clone)]
pub struct ReloadSummary {
    pub version: u64,
    pub fragments: usize,
    pub dense: bool,
    pub lexical: bool,
}

impl CorpusStore {
    /// Load the initial snapshot from disk.
    pub fn load(config: CorpusConfig) -> Result<Self> {
        let snapshot = CorpusSnapshot::load(&config, 1)?;
        info!(
            "Corpus loaded: {} fragments, dense={}, lexical={}",
            snapshot.fragments.len(),
            snapshot.dense.is_some(),
            snapshot.lexical.is_some()
        );
        Ok(Self {
            config,
            current: RwLock::new(Arc::new(snapshot)),
        })
    }

    /// Current snapshot. Callers hold the `Arc` for the duration of one
    /// request so a concurrent reload cannot swap indexes out from under them.
    pub fn snapshot(&self) -> Arc<CorpusSnapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Re-read all artifacts and swap in a new consistent snapshot.
    ///
    /// All-or-nothing: the next snapshot is fully built and validated before
    /// the swap, and a failure leaves the prior snapshot in use.
    pub fn reload(&self) -> Result<ReloadSummary> {
        let next_version = self.snapshot().version + 1;
        let snapshot = CorpusSnapshot::load(&self.config, next_version)?;
        let summary = ReloadSummary {
            version: snapshot.version,
            fragments: snapshot.fragments.len(),
            dense: snapshot.dense.is_some(),
            lexical: snapshot.lexical.is_some(),
        };

        let mut guard = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(snapshot);

        info!(
            "Corpus reloaded: version {}, {} fragments, dense={}, lexical={}",
            summary.version, summary.fragments, summary.dense, summary.lexical
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn fragment(title: &str, content: &str) -> Fragment {
        Fragment {
            title: title.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_dense_search_orders_by_distance() {
        let index = DenseIndex::from_matrix(vec![
            vec![0.0, 10.0],
            vec![0.0, 1.0],
            vec![0.0, 4.0],
        ])
        .unwrap();

        let results = index.search(&[0.0, 0.0], 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].1, 1);
        assert_eq!(results[1].1, 2);
        assert!(results[0].0 <= results[1].0);
    }

    #[test]
    fn test_dense_search_rejects_dimension_mismatch() {
        let index = DenseIndex::from_matrix(vec![vec![1.0, 2.0]]).unwrap();
        assert!(index.search(&[1.0], 1).is_err());
    }

    #[test]
    fn test_ragged_matrix_rejected() {
        assert!(DenseIndex::from_matrix(vec![vec![1.0, 2.0], vec![1.0]]).is_none());
        assert!(DenseIndex::from_matrix(Vec::new()).is_none());
    }

    #[test]
    fn test_bm25_prefers_matching_fragment() {
        let fragments = vec![
            fragment("Projects", "pneumonia detection deep learning model"),
            fragment("Hobbies", "sketching painting dancing"),
            fragment("Skills", "python tensorflow keras flask"),
        ];
        let index = LexicalIndex::build(&fragments).unwrap();
        let scores = index.scores(&["python", "tensorflow"]);

        assert_eq!(scores.len(), 3);
        assert!(scores[2] > scores[0]);
        assert!(scores[2] > scores[1]);
        assert_eq!(scores[1], 0.0);
    }

    #[test]
    fn test_bm25_empty_corpus() {
        assert!(LexicalIndex::build(&[]).is_none());
    }

    #[test]
    fn test_missing_fragments_yield_empty_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let config = CorpusConfig {
            fragments_path: dir.path().join("missing.json").display().to_string(),
            embeddings_path: dir.path().join("missing_emb.json").display().to_string(),
        };
        let store = CorpusStore::load(config).unwrap();
        let snapshot = store.snapshot();
        assert!(snapshot.fragments.is_empty());
        assert!(snapshot.dense.is_none());
        assert!(snapshot.lexical.is_none());
    }

    #[test]
    fn test_corrupt_dense_artifact_degrades_to_none() {
        let dir = tempfile::tempdir().unwrap();
        let fragments_path = dir.path().join("fragments.json");
        let embeddings_path = dir.path().join("embeddings.json");

        std::fs::write(
            &fragments_path,
            serde_json::to_string(&vec![fragment("A", "alpha beta")]).unwrap(),
        )
        .unwrap();
        let mut f = std::fs::File::create(&embeddings_path).unwrap();
        f.write_all(b"not json at all").unwrap();

        let store = CorpusStore::load(CorpusConfig {
            fragments_path: fragments_path.display().to_string(),
            embeddings_path: embeddings_path.display().to_string(),
        })
        .unwrap();

        let snapshot = store.snapshot();
        assert!(snapshot.dense.is_none());
        assert!(snapshot.lexical.is_some());
        assert_eq!(snapshot.fragments.len(), 1);
    }

    #[test]
    fn test_row_count_mismatch_disables_dense() {
        let dir = tempfile::tempdir().unwrap();
        let fragments_path = dir.path().join("fragments.json");
        let embeddings_path = dir.path().join("embeddings.json");

        std::fs::write(
            &fragments_path,
            serde_json::to_string(&vec![
                fragment("A", "alpha"),
                fragment("B", "beta"),
            ])
            .unwrap(),
        )
        .unwrap();
        // Three rows for two fragments
        std::fs::write(
            &embeddings_path,
            serde_json::to_string(&vec![vec![1.0_f32], vec![2.0], vec![3.0]]).unwrap(),
        )
        .unwrap();

        let store = CorpusStore::load(CorpusConfig {
            fragments_path: fragments_path.display().to_string(),
            embeddings_path: embeddings_path.display().to_string(),
        })
        .unwrap();
        assert!(store.snapshot().dense.is_none());
    }

    #[test]
    fn test_failed_reload_keeps_prior_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let fragments_path = dir.path().join("fragments.json");
        let embeddings_path = dir.path().join("embeddings.json");

        std::fs::write(
            &fragments_path,
            serde_json::to_string(&vec![fragment("A", "alpha")]).unwrap(),
        )
        .unwrap();
        std::fs::write(
            &embeddings_path,
            serde_json::to_string(&vec![vec![1.0_f32, 0.0]]).unwrap(),
        )
        .unwrap();

        let store = CorpusStore::load(CorpusConfig {
            fragments_path: fragments_path.display().to_string(),
            embeddings_path: embeddings_path.display().to_string(),
        })
        .unwrap();
        assert_eq!(store.snapshot().version, 1);
        assert!(store.snapshot().dense.is_some());

        // Corrupt the fragment artifact, then reload
        std::fs::write(&fragments_path, b"{{{").unwrap();
        assert!(store.reload().is_err());

        let snapshot = store.snapshot();
        assert_eq!(snapshot.version, 1);
        assert_eq!(snapshot.fragments.len(), 1);
        assert!(snapshot.dense.is_some());
    }

    #[test]
    fn test_successful_reload_bumps_version() {
        let dir = tempfile::tempdir().unwrap();
        let fragments_path = dir.path().join("fragments.json");
        let config = CorpusConfig {
            fragments_path: fragments_path.display().to_string(),
            embeddings_path: dir.path().join("embeddings.json").display().to_string(),
        };

        let store = CorpusStore::load(config).unwrap();
        assert!(store.snapshot().fragments.is_empty());

        std::fs::write(
            &fragments_path,
            serde_json::to_string(&vec![fragment("A", "alpha"), fragment("B", "beta")]).unwrap(),
        )
        .unwrap();

        let summary = store.reload().unwrap();
        assert_eq!(summary.version, 2);
        assert_eq!(summary.fragments, 2);
        assert!(!summary.dense);
        assert!(summary.lexical);
        assert_eq!(store.snapshot().fragments.len(), 2);
    }
}
