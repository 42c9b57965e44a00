//! Hybrid search engine.
//!
//! Ranks every stored chunk against a query by a weighted blend of two
//! signals:
//!
//! - **Vector score**: cosine similarity between the query embedding and the
//!   chunk embedding, in `[-1, 1]`. Zero when either vector has zero norm,
//!   which is always the case with the disabled embedder.
//! - **Lexical score**: the fraction of lower-cased query words that appear
//!   as whole words in the lower-cased chunk text, in `[0, 1]`.
//!
//! ```text
//! combined = vector_weight × vector + lexical_weight × lexical
//! ```
//!
//! With the default weights (0.7 / 0.3) the combined score lies in
//! `[-0.7, 1.0]`.
//!
//! The store is scanned in full on every query; the corpus is assumed small
//! enough for linear comparison.
//!
//! # Ordering
//!
//! Results are sorted by combined score, highest first. Equal scores are
//! ordered by ascending chunk id, so identical inputs always produce the
//! same ranking.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::embedding::{cosine_similarity, EmbeddingClient};
use crate::error::{with_timeout, ProviderKind, RagError, Result};
use crate::models::{IndexedChunk, SearchResult};
use crate::store::ChunkStore;

pub struct HybridSearchEngine {
    store: Arc<dyn ChunkStore>,
    embedder: Arc<dyn EmbeddingClient>,
    vector_weight: f64,
    lexical_weight: f64,
    embed_timeout: Duration,
}

impl HybridSearchEngine {
    pub fn new(
        store: Arc<dyn ChunkStore>,
        embedder: Arc<dyn EmbeddingClient>,
        config: &Config,
    ) -> Self {
        Self {
            store,
            embedder,
            vector_weight: config.retrieval.vector_weight,
            lexical_weight: config.retrieval.lexical_weight,
            embed_timeout: config.embedding.timeout(),
        }
    }

    /// Rank stored chunks against `query` and return at most `limit`
    /// results.
    ///
    /// `limit == 0` returns an empty list without calling the embedder. An
    /// embedding failure is returned as an error; partial results are never
    /// produced.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let query_vec = with_timeout(
            ProviderKind::Embedding,
            self.embed_timeout,
            self.embedder.embed(query),
        )
        .await?;

        let chunks = self
            .store
            .list_chunks_with_meta()
            .await
            .map_err(RagError::Storage)?;

        let query_words = query_terms(query);
        let mut results: Vec<SearchResult> = chunks
            .into_iter()
            .map(|chunk| self.score(&query_vec, &query_words, chunk))
            .collect();

        rank(&mut results);
        results.truncate(limit);

        tracing::debug!(query, results = results.len(), "search complete");
        Ok(results)
    }

    fn score(&self, query_vec: &[f32], query_words: &[String], chunk: IndexedChunk) -> SearchResult {
        let vector_score = cosine_similarity(query_vec, &chunk.embedding) as f64;
        let lexical = lexical_overlap(query_words, &chunk.content);
        let combined_score = self.vector_weight * vector_score + self.lexical_weight * lexical;

        SearchResult {
            chunk_id: chunk.id,
            document_id: chunk.document_id,
            chunk_index: chunk.chunk_index,
            content: chunk.content,
            title: chunk.title,
            file_path: chunk.file_path,
            page_number: chunk.page_number,
            paragraph_number: chunk.paragraph_number,
            vector_score,
            lexical_score: lexical,
            combined_score,
        }
    }
}

fn query_terms(query: &str) -> Vec<String> {
    query.split_whitespace().map(str::to_lowercase).collect()
}

fn lexical_overlap(query_words: &[String], text: &str) -> f64 {
    if query_words.is_empty() {
        return 0.0;
    }
    let lowered = text.to_lowercase();
    let content: HashSet<&str> = lowered.split_whitespace().collect();
    let matches = query_words
        .iter()
        .filter(|w| content.contains(w.as_str()))
        .count();
    matches as f64 / query_words.len() as f64
}

/// Fraction of the query's words (lower-cased, duplicates counted) present
/// as whole words in `text`. Zero when the query has no words.
///
/// ```rust
/// use tender_rag::search::lexical_score;
///
/// assert_eq!(lexical_score("Beta", "alpha beta"), 1.0);
/// assert_eq!(lexical_score("beta delta", "alpha beta"), 0.5);
/// assert_eq!(lexical_score("   ", "alpha beta"), 0.0);
/// ```
pub fn lexical_score(query: &str, text: &str) -> f64 {
    lexical_overlap(&query_terms(query), text)
}

/// Sort by combined score descending, then chunk id ascending.
///
/// Uses the IEEE total order, so the sort is consistent for any input; a NaN
/// score (never produced by [`HybridSearchEngine`]) sorts last.
pub fn rank(results: &mut [SearchResult]) {
    results.sort_by(|a, b| {
        sort_key(b.combined_score)
            .total_cmp(&sort_key(a.combined_score))
            .then_with(|| a.chunk_id.cmp(&b.chunk_id))
    });
}

fn sort_key(score: f64) -> f64 {
    if score.is_nan() {
        f64::NEG_INFINITY
    } else {
        score
    }
}
