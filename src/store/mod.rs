//! Storage abstraction for the retrieval core.
//!
//! Two traits separate what the core owns from what it only reads:
//!
//! - [`ChunkStore`]: chunks, embeddings, and chunk metadata, which the
//!   core writes on (re)index and scans on every search.
//! - [`DocumentSource`]: the document-store collaborator. The core never
//!   writes documents; it lists them for reindexing and counts them for
//!   stats.
//!
//! Backends: [`SqliteStore`](crate::sqlite_store::SqliteStore) and
//! [`InMemoryStore`](memory::InMemoryStore). Implementations must be
//! `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{ChunkCounts, ChunkRecord, Document, IndexedChunk};

/// Abstract chunk storage.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`replace_chunks`](ChunkStore::replace_chunks) | Atomically swap a document's chunk set |
/// | [`delete_chunks`](ChunkStore::delete_chunks) | Remove a document's chunks |
/// | [`insert_chunks`](ChunkStore::insert_chunks) | Append chunks for a document |
/// | [`list_chunks_with_meta`](ChunkStore::list_chunks_with_meta) | Full scan for search |
/// | [`delete_document`](ChunkStore::delete_document) | Delete a document, cascading to its chunks |
/// | [`chunk_counts`](ChunkStore::chunk_counts) | Totals for stats |
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Replace every chunk of `document_id` with `chunks`.
    ///
    /// Must be atomic with respect to [`list_chunks_with_meta`]: a
    /// concurrent reader sees either the complete old set or the complete
    /// new set, never an empty or partial one.
    ///
    /// [`list_chunks_with_meta`]: ChunkStore::list_chunks_with_meta
    async fn replace_chunks(&self, document_id: i64, chunks: &[ChunkRecord]) -> Result<()>;

    async fn delete_chunks(&self, document_id: i64) -> Result<()>;

    /// Insert `chunks` without touching existing ones. Callers that want
    /// replace semantics should use [`replace_chunks`](ChunkStore::replace_chunks).
    async fn insert_chunks(&self, document_id: i64, chunks: &[ChunkRecord]) -> Result<()>;

    /// Every stored chunk joined with its document's title and path.
    async fn list_chunks_with_meta(&self) -> Result<Vec<IndexedChunk>>;

    /// Delete the document and, by cascade, all of its chunks.
    async fn delete_document(&self, document_id: i64) -> Result<()>;

    async fn chunk_counts(&self) -> Result<ChunkCounts>;
}

/// Read-only view of the document store.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn get_document(&self, id: i64) -> Result<Option<Document>>;

    async fn list_documents(&self) -> Result<Vec<Document>>;

    async fn count_documents(&self) -> Result<i64>;
}
