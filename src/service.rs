//! The retrieval service exposed to the surrounding application.
//!
//! [`RagService`] is constructed explicitly with its collaborators, so tests
//! can substitute in-memory stores and fake providers. [`RagService::open`]
//! wires the production stack from a [`Config`]: SQLite store plus the
//! configured embedding and generation providers.
//!
//! | Operation | Purpose |
//! |-----------|---------|
//! | [`query`](RagService::query) | Validated search + cited answer |
//! | [`search`](RagService::search) | Validated search, raw ranked results |
//! | [`reindex_all`](RagService::reindex_all) | Rebuild every document's chunks |
//! | [`index_document`](RagService::index_document) | Rebuild one document's chunks |
//! | [`delete_document`](RagService::delete_document) | Delete a document and its chunks |
//! | [`stats`](RagService::stats) | Corpus totals |

use std::sync::Arc;

use crate::answer::AnswerSynthesizer;
use crate::config::Config;
use crate::db;
use crate::embedding::{create_embedder, DisabledEmbedder, EmbeddingClient};
use crate::error::{RagError, Result};
use crate::generation::{create_generator, AnswerGenerator};
use crate::migrate;
use crate::models::{QueryResponse, ReindexSummary, SearchResult, Stats};
use crate::reindex::ReindexOrchestrator;
use crate::search::HybridSearchEngine;
use crate::sqlite_store::SqliteStore;
use crate::store::{ChunkStore, DocumentSource};

/// Maximum query length, in characters.
pub const MAX_QUERY_CHARS: usize = 1000;

/// Maximum results per query.
pub const MAX_LIMIT: usize = 50;

pub struct RagService {
    documents: Arc<dyn DocumentSource>,
    store: Arc<dyn ChunkStore>,
    engine: HybridSearchEngine,
    synthesizer: AnswerSynthesizer,
    orchestrator: ReindexOrchestrator,
    default_limit: usize,
}

impl RagService {
    pub fn new(
        documents: Arc<dyn DocumentSource>,
        store: Arc<dyn ChunkStore>,
        embedder: Arc<dyn EmbeddingClient>,
        generator: Option<Arc<dyn AnswerGenerator>>,
        config: &Config,
    ) -> Self {
        Self {
            engine: HybridSearchEngine::new(store.clone(), embedder.clone(), config),
            synthesizer: AnswerSynthesizer::new(generator, config.generation.timeout()),
            orchestrator: ReindexOrchestrator::new(
                documents.clone(),
                store.clone(),
                embedder,
                config,
            ),
            documents,
            store,
            default_limit: config.retrieval.default_limit,
        }
    }

    /// Build the service over the SQLite database named in `config`,
    /// applying the schema if needed.
    pub async fn open(config: &Config) -> Result<Self> {
        Ok(Self::open_with_store(config).await?.0)
    }

    /// Like [`open`](RagService::open), also handing back the SQLite store
    /// for callers that write documents (`trag add`).
    pub async fn open_with_store(config: &Config) -> Result<(Self, Arc<SqliteStore>)> {
        let sqlite = open_sqlite(config).await?;

        let embedder = create_embedder(config).map_err(|e| RagError::Config(format!("{:#}", e)))?;
        let generator =
            create_generator(config).map_err(|e| RagError::Config(format!("{:#}", e)))?;

        tracing::debug!(
            db = %config.db.path.display(),
            embedding_model = embedder.model_name(),
            generation = generator.is_some(),
            "opened retrieval service"
        );

        let service = Self::new(sqlite.clone(), sqlite.clone(), embedder, generator, config);
        Ok((service, sqlite))
    }

    /// Open the SQLite database without constructing any provider.
    ///
    /// For storage-only operations (`stats`, `delete_document`), which must
    /// work even when provider credentials are absent. Embeddings fall back
    /// to the zero-vector placeholder and answers are never generated.
    pub async fn open_storage_only(config: &Config) -> Result<(Self, Arc<SqliteStore>)> {
        let sqlite = open_sqlite(config).await?;
        let embedder = Arc::new(DisabledEmbedder::new(config.embedding_dims()));
        let service = Self::new(sqlite.clone(), sqlite.clone(), embedder, None, config);
        Ok((service, sqlite))
    }

    /// Search and synthesize a cited answer.
    ///
    /// Validation runs before any provider call.
    pub async fn query(&self, text: &str, limit: Option<usize>) -> Result<QueryResponse> {
        let limit = self.validate(text, limit)?;

        let results = self.engine.search(text, limit).await?;
        let answer = self.synthesizer.generate_answer(text, &results).await?;

        Ok(QueryResponse {
            query: text.to_string(),
            answer: answer.answer,
            citations: answer.citations,
            results_count: results.len(),
        })
    }

    pub async fn search(&self, text: &str, limit: Option<usize>) -> Result<Vec<SearchResult>> {
        let limit = self.validate(text, limit)?;
        self.engine.search(text, limit).await
    }

    fn validate(&self, text: &str, limit: Option<usize>) -> Result<usize> {
        if text.trim().is_empty() {
            return Err(RagError::Validation("query must not be empty".to_string()));
        }
        let chars = text.chars().count();
        if chars > MAX_QUERY_CHARS {
            return Err(RagError::Validation(format!(
                "query must be at most {} characters (got {})",
                MAX_QUERY_CHARS, chars
            )));
        }
        let limit = limit.unwrap_or(self.default_limit);
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(RagError::Validation(format!(
                "limit must be between 1 and {} (got {})",
                MAX_LIMIT, limit
            )));
        }
        Ok(limit)
    }

    pub async fn reindex_all(&self) -> Result<ReindexSummary> {
        self.orchestrator.reindex_all().await
    }

    /// Reindex a single document. Returns the number of chunks written.
    pub async fn index_document(&self, id: i64) -> Result<usize> {
        let doc = self
            .documents
            .get_document(id)
            .await
            .map_err(RagError::Storage)?
            .ok_or(RagError::NotFound(id))?;
        self.orchestrator.index_document(&doc).await
    }

    /// Delete a document; its chunks go with it. Waits for an in-flight
    /// reindex of the same document.
    pub async fn delete_document(&self, id: i64) -> Result<()> {
        if self
            .documents
            .get_document(id)
            .await
            .map_err(RagError::Storage)?
            .is_none()
        {
            return Err(RagError::NotFound(id));
        }
        self.orchestrator.delete_document(id).await?;
        tracing::info!(document_id = id, "deleted document");
        Ok(())
    }

    /// Corpus totals. The average counts only documents that have chunks.
    pub async fn stats(&self) -> Result<Stats> {
        let total_documents = self
            .documents
            .count_documents()
            .await
            .map_err(RagError::Storage)?;
        let counts = self
            .store
            .chunk_counts()
            .await
            .map_err(RagError::Storage)?;

        let average_chunks_per_document = if counts.indexed_documents > 0 {
            (counts.total_chunks as f64 / counts.indexed_documents as f64).round() as i64
        } else {
            0
        };

        Ok(Stats {
            total_documents,
            total_chunks: counts.total_chunks,
            average_chunks_per_document,
        })
    }
}

async fn open_sqlite(config: &Config) -> Result<Arc<SqliteStore>> {
    config
        .validate()
        .map_err(|e| RagError::Config(format!("{:#}", e)))?;

    let pool = db::connect(config).await.map_err(RagError::Storage)?;
    migrate::apply_schema(&pool)
        .await
        .map_err(RagError::Storage)?;
    Ok(Arc::new(SqliteStore::new(pool)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;

    fn service(store: Arc<InMemoryStore>) -> RagService {
        let mut config = Config::with_db_path("unused.sqlite");
        config.chunking.chunk_size = 2;
        config.chunking.overlap = 1;
        RagService::new(
            store.clone(),
            store,
            Arc::new(DisabledEmbedder::new(4)),
            None,
            &config,
        )
    }

    #[tokio::test]
    async fn test_query_validation() {
        let svc = service(Arc::new(InMemoryStore::new()));

        for (text, limit) in [
            ("", None),
            ("   \n", None),
            ("ok", Some(0)),
            ("ok", Some(51)),
        ] {
            let err = svc.query(text, limit).await.unwrap_err();
            assert!(matches!(err, RagError::Validation(_)), "{:?}", (text, limit));
        }

        let long = "a".repeat(1001);
        assert!(matches!(
            svc.query(&long, None).await,
            Err(RagError::Validation(_))
        ));
        assert!(svc.query(&"a".repeat(1000), Some(50)).await.is_ok());
    }

    #[tokio::test]
    async fn test_stats_average_is_rounded() {
        let store = Arc::new(InMemoryStore::new());
        store.add_document("A", "/a", "one two three four").await; // 3 chunks
        store.add_document("B", "/b", "one two").await; // 1 chunk
        store.add_document("C", "/c", "").await; // none
        let svc = service(store);
        svc.reindex_all().await.unwrap();

        let stats = svc.stats().await.unwrap();
        assert_eq!(stats.total_documents, 3);
        assert_eq!(stats.total_chunks, 4);
        assert_eq!(stats.average_chunks_per_document, 2);
    }

    #[tokio::test]
    async fn test_unknown_document_is_not_found() {
        let svc = service(Arc::new(InMemoryStore::new()));
        assert!(matches!(
            svc.index_document(9).await,
            Err(RagError::NotFound(9))
        ));
        assert!(matches!(
            svc.delete_document(9).await,
            Err(RagError::NotFound(9))
        ));
    }
}
