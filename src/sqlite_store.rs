//! SQLite-backed [`ChunkStore`] and [`DocumentSource`].
//!
//! Chunk replacement runs delete + insert inside one transaction. With the
//! pool in WAL mode, a search that starts while a reindex is in flight reads
//! the last committed snapshot, so it sees the document's complete old chunk
//! set until the new one commits.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use crate::embedding::{blob_to_vec, vec_to_blob};
use crate::models::{ChunkCounts, ChunkRecord, Document, IndexedChunk};
use crate::store::{ChunkStore, DocumentSource};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert a document, or refresh the content of the one already stored
    /// under `file_path`. Returns the document id.
    ///
    /// Document ownership belongs to the surrounding application; this exists
    /// for the CLI `add` command and tests.
    pub async fn upsert_document(&self, title: &str, file_path: &str, content: &str) -> Result<i64> {
        let now = chrono::Utc::now().timestamp();

        let existing: Option<i64> =
            sqlx::query_scalar("SELECT id FROM documents WHERE file_path = ? ORDER BY id LIMIT 1")
                .bind(file_path)
                .fetch_optional(&self.pool)
                .await?;

        if let Some(id) = existing {
            sqlx::query("UPDATE documents SET title = ?, content = ?, updated_at = ? WHERE id = ?")
                .bind(title)
                .bind(content)
                .bind(now)
                .bind(id)
                .execute(&self.pool)
                .await?;
            return Ok(id);
        }

        let result = sqlx::query(
            "INSERT INTO documents (title, file_path, content, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(title)
        .bind(file_path)
        .bind(content)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Unix timestamp of the most recently written chunk.
    pub async fn last_indexed_at(&self) -> Result<Option<i64>> {
        Ok(
            sqlx::query_scalar("SELECT MAX(created_at) FROM document_chunks")
                .fetch_one(&self.pool)
                .await?,
        )
    }
}

async fn insert_in_tx(
    tx: &mut Transaction<'_, Sqlite>,
    document_id: i64,
    chunks: &[ChunkRecord],
) -> Result<()> {
    let now = chrono::Utc::now().timestamp();

    for chunk in chunks {
        let span = &chunk.span;
        sqlx::query(
            r#"
            INSERT INTO document_chunks (
                document_id, chunk_index, content, page_number, paragraph_number,
                start_char, end_char, embedding, metadata, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(document_id)
        .bind(chunk.chunk_index)
        .bind(&span.text)
        .bind(span.page_number)
        .bind(span.paragraph_number)
        .bind(span.start_offset as i64)
        .bind(span.end_offset as i64)
        .bind(vec_to_blob(&chunk.embedding))
        .bind(chunk.metadata.to_string())
        .bind(now)
        .execute(&mut **tx)
        .await
        .with_context(|| {
            format!(
                "inserting chunk {} of document {}",
                chunk.chunk_index, document_id
            )
        })?;
    }

    Ok(())
}

fn row_to_indexed_chunk(row: &SqliteRow) -> IndexedChunk {
    let blob: Vec<u8> = row.get("embedding");
    let metadata: String = row.get("metadata");
    IndexedChunk {
        id: row.get("id"),
        document_id: row.get("document_id"),
        chunk_index: row.get("chunk_index"),
        content: row.get("content"),
        page_number: row.get("page_number"),
        paragraph_number: row.get("paragraph_number"),
        start_offset: row.get("start_char"),
        end_offset: row.get("end_char"),
        embedding: blob_to_vec(&blob),
        metadata: serde_json::from_str(&metadata).unwrap_or(serde_json::json!({})),
        title: row.get("title"),
        file_path: row.get("file_path"),
    }
}

fn row_to_document(row: &SqliteRow) -> Document {
    let content: Option<String> = row.get("content");
    Document {
        id: row.get("id"),
        title: row.get("title"),
        file_path: row.get("file_path"),
        content: content.unwrap_or_default(),
    }
}

#[async_trait]
impl ChunkStore for SqliteStore {
    async fn replace_chunks(&self, document_id: i64, chunks: &[ChunkRecord]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM document_chunks WHERE document_id = ?")
            .bind(document_id)
            .execute(&mut *tx)
            .await?;

        insert_in_tx(&mut tx, document_id, chunks).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn delete_chunks(&self, document_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM document_chunks WHERE document_id = ?")
            .bind(document_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_chunks(&self, document_id: i64, chunks: &[ChunkRecord]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        insert_in_tx(&mut tx, document_id, chunks).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn list_chunks_with_meta(&self) -> Result<Vec<IndexedChunk>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.document_id, c.chunk_index, c.content, c.page_number,
                   c.paragraph_number, c.start_char, c.end_char, c.embedding, c.metadata,
                   d.title, d.file_path
            FROM document_chunks c
            JOIN documents d ON c.document_id = d.id
            ORDER BY c.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_indexed_chunk).collect())
    }

    async fn delete_document(&self, document_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(document_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn chunk_counts(&self) -> Result<ChunkCounts> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total, COUNT(DISTINCT document_id) AS docs FROM document_chunks",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(ChunkCounts {
            total_chunks: row.get("total"),
            indexed_documents: row.get("docs"),
        })
    }
}

#[async_trait]
impl DocumentSource for SqliteStore {
    async fn get_document(&self, id: i64) -> Result<Option<Document>> {
        let row = sqlx::query("SELECT id, title, file_path, content FROM documents WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_document))
    }

    async fn list_documents(&self) -> Result<Vec<Document>> {
        let rows = sqlx::query("SELECT id, title, file_path, content FROM documents ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_document).collect())
    }

    async fn count_documents(&self) -> Result<i64> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db;
    use crate::migrate::apply_schema;
    use crate::models::ChunkSpan;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn open_store() -> (TempDir, SqliteStore) {
        let tmp = TempDir::new().unwrap();
        let config = Config::with_db_path(tmp.path().join("rag.sqlite"));
        let pool = db::connect(&config).await.unwrap();
        apply_schema(&pool).await.unwrap();
        (tmp, SqliteStore::new(pool))
    }

    fn record(index: i64, text: &str, page: Option<i64>) -> ChunkRecord {
        ChunkRecord {
            chunk_index: index,
            span: ChunkSpan {
                text: text.to_string(),
                start_offset: index as usize,
                end_offset: index as usize + 2,
                page_number: page,
                paragraph_number: Some(1),
            },
            embedding: vec![0.5, -0.25, 0.0],
            metadata: serde_json::json!({"filePath": "/docs/a.txt", "length": text.len()}),
        }
    }

    #[tokio::test]
    async fn test_roundtrip_chunk_fields() {
        let (_tmp, store) = open_store().await;
        let doc = store
            .upsert_document("Tender A", "/docs/a.txt", "alpha beta gamma")
            .await
            .unwrap();
        store
            .replace_chunks(doc, &[record(0, "alpha beta", Some(4))])
            .await
            .unwrap();

        let chunks = store.list_chunks_with_meta().await.unwrap();
        assert_eq!(chunks.len(), 1);
        let c = &chunks[0];
        assert_eq!(c.document_id, doc);
        assert_eq!(c.content, "alpha beta");
        assert_eq!(c.page_number, Some(4));
        assert_eq!((c.start_offset, c.end_offset), (0, 2));
        assert_eq!(c.embedding, vec![0.5, -0.25, 0.0]);
        assert_eq!(c.metadata["filePath"], "/docs/a.txt");
        assert_eq!(c.title, "Tender A");
    }

    #[tokio::test]
    async fn test_upsert_document_by_path() {
        let (_tmp, store) = open_store().await;
        let first = store.upsert_document("a", "/a.txt", "one").await.unwrap();
        let second = store.upsert_document("a", "/a.txt", "two").await.unwrap();
        assert_eq!(first, second);
        let doc = store.get_document(first).await.unwrap().unwrap();
        assert_eq!(doc.content, "two");
        assert_eq!(store.count_documents().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_document_cascades_to_chunks() {
        let (_tmp, store) = open_store().await;
        let a = store.upsert_document("a", "/a.txt", "x").await.unwrap();
        let b = store.upsert_document("b", "/b.txt", "y").await.unwrap();
        store
            .replace_chunks(a, &[record(0, "a0", None), record(1, "a1", None)])
            .await
            .unwrap();
        store.replace_chunks(b, &[record(0, "b0", None)]).await.unwrap();

        store.delete_document(a).await.unwrap();

        let counts = store.chunk_counts().await.unwrap();
        assert_eq!(counts.total_chunks, 1);
        assert_eq!(counts.indexed_documents, 1);
        assert!(store.get_document(a).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_replace_keeps_old_chunks() {
        let (_tmp, store) = open_store().await;
        let a = store.upsert_document("a", "/a.txt", "x").await.unwrap();
        store.replace_chunks(a, &[record(0, "keep me", None)]).await.unwrap();

        // Duplicate chunk_index violates UNIQUE(document_id, chunk_index)
        let result = store
            .replace_chunks(a, &[record(0, "new", None), record(0, "dup", None)])
            .await;
        assert!(result.is_err());

        let texts: Vec<String> = store
            .list_chunks_with_meta()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.content)
            .collect();
        assert_eq!(texts, vec!["keep me".to_string()]);
    }

    #[tokio::test]
    async fn test_concurrent_reader_never_sees_empty_set() {
        let (_tmp, store) = open_store().await;
        let store = Arc::new(store);
        let a = store.upsert_document("a", "/a.txt", "x").await.unwrap();
        let v1 = vec![record(0, "v1-0", None), record(1, "v1-1", None)];
        let v2 = vec![
            record(0, "v2-0", None),
            record(1, "v2-1", None),
            record(2, "v2-2", None),
        ];
        store.replace_chunks(a, &v1).await.unwrap();

        let writer = {
            let store = store.clone();
            tokio::spawn(async move {
                for i in 0..20 {
                    let next = if i % 2 == 0 { &v2 } else { &v1 };
                    store.replace_chunks(a, next).await.unwrap();
                }
            })
        };

        for _ in 0..40 {
            let n = store.list_chunks_with_meta().await.unwrap().len();
            assert!(n == 2 || n == 3, "reader saw {} chunks", n);
            tokio::task::yield_now().await;
        }

        writer.await.unwrap();
    }
}
