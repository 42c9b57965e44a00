//! `trag add`: load files into the document table and index them.
//!
//! Document ownership belongs to the surrounding application; this command
//! stands in for its upload hook so the CLI is usable on its own. Each path
//! is walked recursively, every UTF-8 text file becomes (or refreshes) a
//! document keyed by its path, and the document is indexed immediately.

use std::path::{Path, PathBuf};

use anyhow::Result;
use walkdir::{DirEntry, WalkDir};

use crate::config::Config;
use crate::service::RagService;

const SKIPPED_DIRS: &[&str] = &[".git", "target", "node_modules"];

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|name| SKIPPED_DIRS.contains(&name))
            .unwrap_or(false)
}

/// Collect regular files under `paths`, sorted for deterministic ordering.
pub fn collect_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for root in paths {
        for entry in WalkDir::new(root).into_iter().filter_entry(|e| !is_skipped_dir(e)) {
            let entry = entry?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn title_for(path: &Path) -> String {
    path.file_stem()
        .or_else(|| path.file_name())
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

pub async fn run_add(config: &Config, paths: &[PathBuf]) -> Result<()> {
    let (service, store) = RagService::open_with_store(config).await?;
    let files = collect_files(paths)?;

    let mut documents = 0usize;
    let mut chunks = 0usize;
    let mut skipped = 0usize;
    let mut failed = 0usize;

    for path in &files {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable file");
                skipped += 1;
                continue;
            }
        };

        let file_path = path.display().to_string();
        let id = store
            .upsert_document(&title_for(path), &file_path, &content)
            .await?;
        documents += 1;

        match service.index_document(id).await {
            Ok(n) => chunks += n,
            Err(e) => {
                tracing::warn!(document_id = id, path = %file_path, error = %e, "indexing failed");
                failed += 1;
            }
        }
    }

    println!("add");
    println!("  files found: {}", files.len());
    println!("  documents upserted: {}", documents);
    println!("  chunks written: {}", chunks);
    if skipped > 0 {
        println!("  skipped (not UTF-8 text): {}", skipped);
    }
    if failed > 0 {
        println!("  failed to index: {}", failed);
    }
    println!("ok");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_collect_files_skips_vcs_and_build_dirs() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join(".git")).unwrap();
        std::fs::create_dir_all(root.join("sub")).unwrap();
        std::fs::write(root.join(".git/config"), "x").unwrap();
        std::fs::write(root.join("b.txt"), "b").unwrap();
        std::fs::write(root.join("sub/a.md"), "a").unwrap();

        let files = collect_files(&[root.to_path_buf()]).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["b.txt".to_string(), "sub/a.md".to_string()]);
    }

    #[test]
    fn test_title_is_file_stem() {
        assert_eq!(title_for(Path::new("/docs/Tender 2024.pdf.txt")), "Tender 2024.pdf");
        assert_eq!(title_for(Path::new("README")), "README");
    }
}
