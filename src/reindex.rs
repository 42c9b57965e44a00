//! Document (re)indexing.
//!
//! Indexing one document runs chunk → embed → replace:
//!
//! 1. [`split_words`] cuts the content into overlapping word windows.
//! 2. Chunk texts are embedded in batches of `embedding.concurrency`; each
//!    batch is awaited in full before the next starts, bounding the number
//!    of outstanding provider calls. Every call has its own timeout.
//! 3. The document's chunk set is swapped with
//!    [`ChunkStore::replace_chunks`], which is atomic. If any embedding
//!    fails, nothing is written and the previous chunk set stays intact.
//!
//! [`ReindexOrchestrator::reindex_all`] runs this for every document,
//! `reindex.concurrency` at a time. A failing document is counted in
//! `errors` and the run continues. Concurrent reindexes and deletes of the
//! same document are serialized by a per-document lock; different documents
//! never wait on each other. A lock entry lives only while someone holds or
//! waits for it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::sync::Mutex;

use crate::chunk::split_words;
use crate::config::Config;
use crate::embedding::EmbeddingClient;
use crate::error::{with_timeout, ProviderKind, RagError, Result};
use crate::models::{ChunkRecord, ChunkSpan, Document, ReindexSummary};
use crate::store::{ChunkStore, DocumentSource};

pub struct ReindexOrchestrator {
    documents: Arc<dyn DocumentSource>,
    store: Arc<dyn ChunkStore>,
    embedder: Arc<dyn EmbeddingClient>,
    chunk_size: usize,
    overlap: usize,
    embed_concurrency: usize,
    doc_concurrency: usize,
    call_timeout: Duration,
    locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl ReindexOrchestrator {
    pub fn new(
        documents: Arc<dyn DocumentSource>,
        store: Arc<dyn ChunkStore>,
        embedder: Arc<dyn EmbeddingClient>,
        config: &Config,
    ) -> Self {
        Self {
            documents,
            store,
            embedder,
            chunk_size: config.chunking.chunk_size,
            overlap: config.chunking.overlap,
            embed_concurrency: config.embedding.concurrency.max(1),
            doc_concurrency: config.reindex.concurrency.max(1),
            call_timeout: config.embedding.timeout(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Override the per-call embedding timeout.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    async fn acquire(&self, document_id: i64) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(document_id).or_default().clone()
    }

    /// Drop our handle and the map entry once nobody else holds it. Handles
    /// are only cloned and dropped under the map lock, so the count is exact.
    async fn release(&self, document_id: i64, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        drop(lock);
        if locks
            .get(&document_id)
            .is_some_and(|l| Arc::strong_count(l) == 1)
        {
            locks.remove(&document_id);
        }
    }

    /// Chunk, embed, and store `doc`, replacing its previous chunks.
    ///
    /// Returns the number of chunks written. Content without words writes
    /// zero chunks and clears any stale ones. Fails with a storage error if
    /// the document was deleted in the meantime.
    pub async fn index_document(&self, doc: &Document) -> Result<usize> {
        let lock = self.acquire(doc.id).await;
        let result = {
            let _guard = lock.lock().await;
            self.index_locked(doc).await
        };
        self.release(doc.id, lock).await;
        result
    }

    /// Delete a document and its chunks, waiting for any in-flight reindex
    /// of it to finish first.
    pub async fn delete_document(&self, document_id: i64) -> Result<()> {
        let lock = self.acquire(document_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.store
                .delete_document(document_id)
                .await
                .map_err(RagError::Storage)
        };
        self.release(document_id, lock).await;
        result
    }

    async fn index_locked(&self, doc: &Document) -> Result<usize> {
        let spans = split_words(&doc.content, self.chunk_size, self.overlap)?;
        let embeddings = self.embed_spans(&spans).await?;

        let records: Vec<ChunkRecord> = spans
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (span, embedding))| ChunkRecord {
                chunk_index: i as i64,
                metadata: serde_json::json!({
                    "filePath": doc.file_path,
                    "length": span.text.chars().count(),
                }),
                span,
                embedding,
            })
            .collect();

        self.store
            .replace_chunks(doc.id, &records)
            .await
            .map_err(RagError::Storage)?;

        tracing::debug!(document_id = doc.id, chunks = records.len(), "indexed document");
        Ok(records.len())
    }

    async fn embed_spans(&self, spans: &[ChunkSpan]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(spans.len());

        for batch in spans.chunks(self.embed_concurrency) {
            let calls = batch.iter().map(|span| {
                with_timeout(
                    ProviderKind::Embedding,
                    self.call_timeout,
                    self.embedder.embed(&span.text),
                )
            });
            for result in futures::future::join_all(calls).await {
                embeddings.push(result?);
            }
        }

        Ok(embeddings)
    }

    /// Reindex every document in the source.
    ///
    /// Never aborts early on a per-document failure. Only a failure to list
    /// the documents is returned as an error.
    pub async fn reindex_all(&self) -> Result<ReindexSummary> {
        let docs = self
            .documents
            .list_documents()
            .await
            .map_err(RagError::Storage)?;
        let total = docs.len();

        let outcomes: Vec<bool> = stream::iter(docs)
            .map(|doc| async move {
                match self.index_document(&doc).await {
                    Ok(_) => true,
                    Err(e) => {
                        tracing::warn!(
                            document_id = doc.id,
                            file_path = %doc.file_path,
                            error = %e,
                            "failed to reindex document"
                        );
                        false
                    }
                }
            })
            .buffer_unordered(self.doc_concurrency)
            .collect()
            .await;

        let processed = outcomes.iter().filter(|ok| **ok).count();
        let summary = ReindexSummary {
            processed,
            errors: total - processed,
        };

        tracing::info!(
            documents = total,
            processed = summary.processed,
            errors = summary.errors,
            "reindex complete"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::DisabledEmbedder;
    use crate::store::memory::InMemoryStore;

    fn small_config() -> Config {
        let mut config = Config::with_db_path("unused.sqlite");
        config.chunking.chunk_size = 2;
        config.chunking.overlap = 1;
        config
    }

    #[tokio::test]
    async fn test_index_document_writes_ordered_chunks() {
        let store = Arc::new(InMemoryStore::new());
        let id = store
            .add_document("Doc", "/doc.txt", "alpha beta gamma delta")
            .await;
        let orchestrator = ReindexOrchestrator::new(
            store.clone(),
            store.clone(),
            Arc::new(DisabledEmbedder::new(4)),
            &small_config(),
        );

        let doc = store.get_document(id).await.unwrap().unwrap();
        assert_eq!(orchestrator.index_document(&doc).await.unwrap(), 3);

        let chunks = store.list_chunks_with_meta().await.unwrap();
        let indices: Vec<i64> = chunks.iter().map(|c| c.chunk_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(chunks[1].content, "beta gamma");
        assert_eq!(chunks[1].embedding, vec![0.0; 4]);
        assert_eq!(chunks[1].metadata["filePath"], "/doc.txt");
        assert_eq!(chunks[1].metadata["length"], 10);
    }

    #[tokio::test]
    async fn test_empty_content_counts_as_processed() {
        let store = Arc::new(InMemoryStore::new());
        store.add_document("Full", "/full.txt", "one two three").await;
        store.add_document("Empty", "/empty.txt", "").await;
        let orchestrator = ReindexOrchestrator::new(
            store.clone(),
            store.clone(),
            Arc::new(DisabledEmbedder::new(4)),
            &small_config(),
        );

        let summary = orchestrator.reindex_all().await.unwrap();
        assert_eq!(summary, ReindexSummary { processed: 2, errors: 0 });
        assert_eq!(store.chunk_counts().await.unwrap().indexed_documents, 1);
    }

    #[tokio::test]
    async fn test_emptied_document_loses_stale_chunks() {
        let store = Arc::new(InMemoryStore::new());
        let id = store.add_document("Doc", "/doc.txt", "one two three").await;
        let orchestrator = ReindexOrchestrator::new(
            store.clone(),
            store.clone(),
            Arc::new(DisabledEmbedder::new(4)),
            &small_config(),
        );
        orchestrator.reindex_all().await.unwrap();
        assert_eq!(store.chunk_counts().await.unwrap().total_chunks, 2);

        store.update_content(id, "   ").await;
        orchestrator.reindex_all().await.unwrap();
        assert_eq!(store.chunk_counts().await.unwrap().total_chunks, 0);
    }

    #[tokio::test]
    async fn test_delete_releases_document_lock() {
        let store = Arc::new(InMemoryStore::new());
        let id = store.add_document("Doc", "/doc.txt", "one two three").await;
        let orchestrator = ReindexOrchestrator::new(
            store.clone(),
            store.clone(),
            Arc::new(DisabledEmbedder::new(4)),
            &small_config(),
        );

        let doc = store.get_document(id).await.unwrap().unwrap();
        orchestrator.index_document(&doc).await.unwrap();
        assert!(orchestrator.locks.lock().await.is_empty());

        orchestrator.delete_document(id).await.unwrap();
        assert!(orchestrator.locks.lock().await.is_empty());
        assert_eq!(store.chunk_counts().await.unwrap().total_chunks, 0);

        // A stale snapshot of the deleted document cannot resurrect chunks.
        assert!(matches!(
            orchestrator.index_document(&doc).await,
            Err(RagError::Storage(_))
        ));
        assert_eq!(store.chunk_counts().await.unwrap().total_chunks, 0);
        assert!(orchestrator.locks.lock().await.is_empty());
    }
}
