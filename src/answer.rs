//! Cited answer synthesis.
//!
//! The top [`TOP_K`] search results become a numbered context block:
//!
//! ```text
//! [1] Title (path/to/file.txt):
//! chunk text
//!
//! [2] ...
//! ```
//!
//! which is sent to the configured [`AnswerGenerator`] with an instruction
//! to answer only from that context and cite with the `[n]` markers. Each
//! selected result also becomes a [`Citation`].
//!
//! Without a generator the synthesizer returns [`DEGRADED_NOTICE`] and the
//! same citations. That path makes no network calls and is deterministic.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{with_timeout, ProviderKind, Result};
use crate::generation::AnswerGenerator;
use crate::models::{Answer, Citation, SearchResult};

/// Results used for context and citations, regardless of the search limit.
pub const TOP_K: usize = 5;

/// Citation excerpt length, in characters.
pub const EXCERPT_CHARS: usize = 150;

pub const SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions based on the provided document context. \
Use only the information in the context. \
Always cite your sources using the format [1], [2], etc. corresponding to the document numbers in the context. \
If the context doesn't contain relevant information, say so clearly.";

pub const DEGRADED_NOTICE: &str =
    "No answer generator configured. Using retrieved context only.";

const EMPTY_ANSWER: &str = "No answer generated.";

pub struct AnswerSynthesizer {
    generator: Option<Arc<dyn AnswerGenerator>>,
    timeout: Duration,
}

impl AnswerSynthesizer {
    pub fn new(generator: Option<Arc<dyn AnswerGenerator>>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }

    /// Answer `query` from `results`, citing the top [`TOP_K`].
    ///
    /// Generator failures and timeouts are returned as errors, never as an
    /// empty answer.
    pub async fn generate_answer(&self, query: &str, results: &[SearchResult]) -> Result<Answer> {
        let top = &results[..results.len().min(TOP_K)];
        let citations: Vec<Citation> = top.iter().map(citation_from).collect();

        let Some(generator) = &self.generator else {
            return Ok(Answer {
                answer: DEGRADED_NOTICE.to_string(),
                citations,
            });
        };

        let user_prompt = format!(
            "Context:\n{}\n\nQuestion: {}\n\nAnswer:",
            build_context(top),
            query
        );

        let text = with_timeout(
            ProviderKind::Generation,
            self.timeout,
            generator.complete(SYSTEM_PROMPT, &user_prompt),
        )
        .await?;

        let answer = if text.trim().is_empty() {
            EMPTY_ANSWER.to_string()
        } else {
            text
        };

        tracing::debug!(
            model = generator.model_name(),
            citations = citations.len(),
            "answer generated"
        );

        Ok(Answer { answer, citations })
    }
}

/// Numbered context block for the generator prompt.
pub fn build_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, r)| format!("[{}] {} ({}):\n{}", i + 1, r.title, r.file_path, r.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn citation_from(result: &SearchResult) -> Citation {
    Citation {
        document_id: result.document_id,
        chunk_id: result.chunk_id,
        title: result.title.clone(),
        file_path: result.file_path.clone(),
        page: result.page_number,
        paragraph: result.paragraph_number,
        excerpt: excerpt(&result.content),
        relevance_score: (result.combined_score * 100.0).round() / 100.0,
    }
}

fn excerpt(content: &str) -> String {
    match content.char_indices().nth(EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}
