//! In-memory [`ChunkStore`] and [`DocumentSource`] for tests and embedding
//! the engine without a database.
//!
//! Documents and chunks live behind a single `tokio::sync::RwLock`, so a
//! replace holds one write guard across delete + insert and readers never
//! observe a half-replaced document.

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::models::{ChunkCounts, ChunkRecord, Document, IndexedChunk};

use super::{ChunkStore, DocumentSource};

struct StoredChunk {
    id: i64,
    document_id: i64,
    record: ChunkRecord,
}

#[derive(Default)]
struct Inner {
    docs: BTreeMap<i64, Document>,
    chunks: Vec<StoredChunk>,
    next_doc_id: i64,
    next_chunk_id: i64,
}

impl Inner {
    /// Chunks may only reference stored documents, as with the SQLite
    /// foreign key.
    fn ensure_document(&self, document_id: i64) -> Result<()> {
        if !self.docs.contains_key(&document_id) {
            bail!("document {} does not exist", document_id);
        }
        Ok(())
    }

    fn push_chunks(&mut self, document_id: i64, chunks: &[ChunkRecord]) {
        for record in chunks {
            self.next_chunk_id += 1;
            self.chunks.push(StoredChunk {
                id: self.next_chunk_id,
                document_id,
                record: record.clone(),
            });
        }
    }
}

/// In-memory store for testing.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document and return its assigned id (1, 2, 3, …).
    pub async fn add_document(&self, title: &str, file_path: &str, content: &str) -> i64 {
        let mut inner = self.inner.write().await;
        inner.next_doc_id += 1;
        let id = inner.next_doc_id;
        inner.docs.insert(
            id,
            Document {
                id,
                title: title.to_string(),
                file_path: file_path.to_string(),
                content: content.to_string(),
            },
        );
        id
    }

    /// Overwrite a document's content in place.
    pub async fn update_content(&self, id: i64, content: &str) -> bool {
        let mut inner = self.inner.write().await;
        match inner.docs.get_mut(&id) {
            Some(doc) => {
                doc.content = content.to_string();
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl ChunkStore for InMemoryStore {
    async fn replace_chunks(&self, document_id: i64, chunks: &[ChunkRecord]) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.ensure_document(document_id)?;
        inner.chunks.retain(|c| c.document_id != document_id);
        inner.push_chunks(document_id, chunks);
        Ok(())
    }

    async fn delete_chunks(&self, document_id: i64) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.chunks.retain(|c| c.document_id != document_id);
        Ok(())
    }

    async fn insert_chunks(&self, document_id: i64, chunks: &[ChunkRecord]) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.ensure_document(document_id)?;
        inner.push_chunks(document_id, chunks);
        Ok(())
    }

    async fn list_chunks_with_meta(&self) -> Result<Vec<IndexedChunk>> {
        let inner = self.inner.read().await;
        Ok(inner
            .chunks
            .iter()
            .filter_map(|sc| {
                let doc = inner.docs.get(&sc.document_id)?;
                let span = &sc.record.span;
                Some(IndexedChunk {
                    id: sc.id,
                    document_id: sc.document_id,
                    chunk_index: sc.record.chunk_index,
                    content: span.text.clone(),
                    page_number: span.page_number,
                    paragraph_number: span.paragraph_number,
                    start_offset: span.start_offset as i64,
                    end_offset: span.end_offset as i64,
                    embedding: sc.record.embedding.clone(),
                    metadata: sc.record.metadata.clone(),
                    title: doc.title.clone(),
                    file_path: doc.file_path.clone(),
                })
            })
            .collect())
    }

    async fn delete_document(&self, document_id: i64) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.docs.remove(&document_id);
        inner.chunks.retain(|c| c.document_id != document_id);
        Ok(())
    }

    async fn chunk_counts(&self) -> Result<ChunkCounts> {
        let inner = self.inner.read().await;
        let mut owners: Vec<i64> = inner.chunks.iter().map(|c| c.document_id).collect();
        owners.sort_unstable();
        owners.dedup();
        Ok(ChunkCounts {
            total_chunks: inner.chunks.len() as i64,
            indexed_documents: owners.len() as i64,
        })
    }
}

#[async_trait]
impl DocumentSource for InMemoryStore {
    async fn get_document(&self, id: i64) -> Result<Option<Document>> {
        Ok(self.inner.read().await.docs.get(&id).cloned())
    }

    async fn list_documents(&self) -> Result<Vec<Document>> {
        Ok(self.inner.read().await.docs.values().cloned().collect())
    }

    async fn count_documents(&self) -> Result<i64> {
        Ok(self.inner.read().await.docs.len() as i64)
    }
}
