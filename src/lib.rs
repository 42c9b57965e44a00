//! # tender-rag
//!
//! Retrieval-augmented search core for a document management application.
//!
//! tender-rag chunks document text into overlapping word windows, embeds each
//! chunk, stores chunks and vectors in SQLite, ranks them against a query
//! with a hybrid (vector + lexical) score, and synthesizes answers that cite
//! the chunks they were built from.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌─────────────┐   ┌────────────┐
//! │ Documents │──▶│   Reindex    │──▶│ ChunkStore │
//! │ (source)  │   │ Chunk+Embed │   │  SQLite    │
//! └───────────┘   └─────────────┘   └─────┬──────┘
//!                                         │
//!                 ┌──────────────┐        │
//!   query ───────▶│ HybridSearch │◀───────┘
//!                 └──────┬───────┘
//!                        ▼
//!                 ┌──────────────┐
//!                 │   Answer     │──▶ answer + citations
//!                 └──────────────┘
//! ```
//!
//! Every collaborator is a trait object injected into
//! [`RagService`](service::RagService): [`ChunkStore`](store::ChunkStore),
//! [`DocumentSource`](store::DocumentSource),
//! [`EmbeddingClient`](embedding::EmbeddingClient) and
//! [`AnswerGenerator`](generation::AnswerGenerator).
//!
//! Without configured providers the engine still works: embeddings are
//! all-zero vectors (ranking falls back to the lexical signal) and answers
//! are a fixed notice plus citations.
//!
//! ## Quick Start
//!
//! ```bash
//! trag init                       # create database
//! trag add ./tenders              # load and index text files
//! trag search "delivery deadline"
//! trag query "When is the delivery deadline?"
//! trag serve                      # start HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`error`] | Error taxonomy and per-call timeouts |
//! | [`models`] | Core data types |
//! | [`chunk`] | Word-window chunker |
//! | [`embedding`] | Embedding providers, cosine similarity, BLOB codec |
//! | [`generation`] | Answer-generation providers |
//! | [`store`] | Storage traits and the in-memory backend |
//! | [`sqlite_store`] | SQLite backend |
//! | [`search`] | Hybrid search engine |
//! | [`answer`] | Cited answer synthesis |
//! | [`reindex`] | Per-document and corpus reindexing |
//! | [`service`] | The exposed service operations |
//! | [`server`] | HTTP API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema |

pub mod answer;
pub mod chunk;
pub mod commands;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod http;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod reindex;
pub mod search;
pub mod server;
pub mod service;
pub mod sqlite_store;
pub mod stats;
pub mod store;
