//! Core data models used throughout the retrieval pipeline.
//!
//! These types represent the documents, chunks, search results, and
//! citations that flow between the chunker, the store, the search engine,
//! and the answer synthesizer. Types that leave the process (HTTP, CLI JSON)
//! serialize in camelCase to match the application's API.

use serde::Serialize;

/// A document as owned by the document store. The core only reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: i64,
    pub title: String,
    pub file_path: String,
    pub content: String,
}

/// A word window produced by the chunker.
///
/// Offsets are word indices into the document's whitespace-split word
/// sequence; `end_offset` is exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSpan {
    pub text: String,
    pub start_offset: usize,
    pub end_offset: usize,
    pub page_number: Option<i64>,
    pub paragraph_number: Option<i64>,
}

/// A chunk ready to be written: span, position, and embedding.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub chunk_index: i64,
    pub span: ChunkSpan,
    pub embedding: Vec<f32>,
    pub metadata: serde_json::Value,
}

/// A stored chunk joined with its owning document's metadata.
#[derive(Debug, Clone)]
pub struct IndexedChunk {
    pub id: i64,
    pub document_id: i64,
    pub chunk_index: i64,
    pub content: String,
    pub page_number: Option<i64>,
    pub paragraph_number: Option<i64>,
    pub start_offset: i64,
    pub end_offset: i64,
    pub embedding: Vec<f32>,
    pub metadata: serde_json::Value,
    pub title: String,
    pub file_path: String,
}

/// A ranked chunk with its score breakdown.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub chunk_id: i64,
    pub document_id: i64,
    pub chunk_index: i64,
    pub content: String,
    pub title: String,
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_number: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paragraph_number: Option<i64>,
    pub vector_score: f64,
    pub lexical_score: f64,
    pub combined_score: f64,
}

/// User-facing reference to the chunk backing part of an answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub document_id: i64,
    pub chunk_id: i64,
    pub title: String,
    pub file_path: String,
    pub page: Option<i64>,
    pub paragraph: Option<i64>,
    pub excerpt: String,
    pub relevance_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub answer: String,
    pub citations: Vec<Citation>,
}

/// Response of [`RagService::query`](crate::service::RagService::query).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub query: String,
    pub answer: String,
    pub citations: Vec<Citation>,
    pub results_count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReindexSummary {
    pub processed: usize,
    pub errors: usize,
}

/// Chunk totals as reported by a [`ChunkStore`](crate::store::ChunkStore).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkCounts {
    pub total_chunks: i64,
    /// Documents that currently own at least one chunk.
    pub indexed_documents: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_documents: i64,
    pub total_chunks: i64,
    pub average_chunks_per_document: i64,
}
