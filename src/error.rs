//! Error taxonomy for the retrieval core.
//!
//! Store and provider internals work with [`anyhow::Error`] and attach
//! context as they go. At the [`RagService`](crate::service::RagService)
//! boundary those errors are classified into [`RagError`] so callers (CLI,
//! HTTP) can tell a bad request from a flaky provider from a broken database.
//!
//! An unconfigured provider is not an error: the embedder degrades to zero
//! vectors and the synthesizer to a fixed notice.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Which external collaborator a provider error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Embedding,
    Generation,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Embedding => f.write_str("embedding"),
            ProviderKind::Generation => f.write_str("generation"),
        }
    }
}

#[derive(Debug, Error)]
pub enum RagError {
    /// Malformed request, rejected before any provider call.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("document not found: {0}")]
    NotFound(i64),

    /// Network failure, non-2xx response, or malformed payload.
    #[error("{provider} provider failed: {error:#}")]
    Provider {
        provider: ProviderKind,
        error: anyhow::Error,
    },

    #[error("{provider} call timed out after {}s", timeout.as_secs_f64())]
    Timeout {
        provider: ProviderKind,
        timeout: Duration,
    },

    /// Store read/write failure. Fatal for the current operation.
    #[error("storage error: {0:#}")]
    Storage(anyhow::Error),
}

pub type Result<T> = std::result::Result<T, RagError>;

/// Await `fut` for at most `timeout`, classifying both failure modes as
/// errors of `provider`.
pub async fn with_timeout<T, F>(provider: ProviderKind, timeout: Duration, fut: F) -> Result<T>
where
    F: std::future::Future<Output = anyhow::Result<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => Err(RagError::Provider { provider, error }),
        Err(_) => Err(RagError::Timeout { provider, timeout }),
    }
}
