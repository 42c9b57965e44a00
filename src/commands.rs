//! CLI command runners for search, query, and index maintenance.
//!
//! Each runner opens a [`RagService`] from the config, performs one
//! operation, and prints a human-readable report to stdout (or JSON with
//! `--json`).

use anyhow::Result;

use crate::config::Config;
use crate::models::{QueryResponse, SearchResult};
use crate::service::RagService;

pub async fn run_search(config: &Config, query: &str, limit: Option<usize>, json: bool) -> Result<()> {
    let service = RagService::open(config).await?;
    let results = service.search(query, limit).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, r) in results.iter().enumerate() {
        print_result(i + 1, r);
    }
    Ok(())
}

fn print_result(rank: usize, r: &SearchResult) {
    println!(
        "{}. [{:.3}] {} (doc {}, chunk {})",
        rank, r.combined_score, r.title, r.document_id, r.chunk_index
    );
    println!("    path: {}", r.file_path);
    if let Some(page) = r.page_number {
        println!("    page: {}", page);
    }
    println!(
        "    vector: {:.3}  lexical: {:.3}",
        r.vector_score, r.lexical_score
    );
    println!("    > {}", snippet(&r.content, 200));
    println!();
}

fn snippet(text: &str, max_chars: usize) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &flat[..cut]),
        None => flat,
    }
}

pub async fn run_query(config: &Config, query: &str, limit: Option<usize>, json: bool) -> Result<()> {
    let service = RagService::open(config).await?;
    let response = service.query(query, limit).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_answer(&response);
    }
    Ok(())
}

fn print_answer(response: &QueryResponse) {
    println!("{}", response.answer);
    println!();
    println!(
        "Sources ({} of {} results):",
        response.citations.len(),
        response.results_count
    );
    for (i, c) in response.citations.iter().enumerate() {
        let location = match (c.page, c.paragraph) {
            (Some(p), _) => format!(", page {}", p),
            (None, Some(p)) => format!(", paragraph {}", p),
            (None, None) => String::new(),
        };
        println!(
            "  [{}] {} ({}{}) relevance {:.2}",
            i + 1,
            c.title,
            c.file_path,
            location,
            c.relevance_score
        );
        println!("      {}", c.excerpt);
    }
}

pub async fn run_reindex(config: &Config) -> Result<()> {
    let service = RagService::open(config).await?;
    let summary = service.reindex_all().await?;

    println!("reindex");
    println!("  processed: {}", summary.processed);
    println!("  errors: {}", summary.errors);
    println!("ok");
    Ok(())
}

pub async fn run_index(config: &Config, id: i64) -> Result<()> {
    let service = RagService::open(config).await?;
    let chunks = service.index_document(id).await?;
    println!("Indexed document {} ({} chunks).", id, chunks);
    Ok(())
}

pub async fn run_delete(config: &Config, id: i64) -> Result<()> {
    let (service, _store) = RagService::open_storage_only(config).await?;
    service.delete_document(id).await?;
    println!("Deleted document {}.", id);
    Ok(())
}
