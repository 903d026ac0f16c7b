//! # Beats Errors
//!
//! Structured error types for every stage of the enrichment pipeline.
//!
//! - Uses `thiserror` for structured error definitions
//! - Named fields everywhere so messages carry context
//! - Distinct variants for conditions callers present differently
//!   (unavailable service, not enough data, corrupt cache)

use std::path::PathBuf;

use thiserror::Error;

/// Hint shown when no embedding service answers.
pub const EMBEDDING_INSTALL_HINT: &str =
    "Install Ollama (https://ollama.ai) and run: ollama pull nomic-embed-text";

/// Errors reading the append-only beats log
#[derive(Debug, Error)]
pub enum BeatLogError {
    #[error("Failed to read beats log {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error
    },

    #[error("No .beats directory found from {start} upwards")]
    BeatsDirNotFound { start: PathBuf },

    #[error("Project discovery under {root} failed: {reason}")]
    Discovery { root: PathBuf, reason: String }
}

/// Cache store errors
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache I/O on {path} failed: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error
    },

    #[error("Cache file {path} is corrupt: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("Cache encoding failed: {reason}")]
    Encode { reason: String },

    #[error("Atomic replace of {path} failed: {reason}")]
    Persist { path: PathBuf, reason: String }
}

/// Errors talking to the embedding service
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("Embedding request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("Embedding service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Embedding request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Embedding response could not be decoded: {reason}")]
    Decode { reason: String },

    #[error("Embedding service returned an empty vector")]
    EmptyEmbedding
}

/// Clustering and similarity errors
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("Embedding service not available: {hint}")]
    Unavailable { hint: String },

    #[error("Not enough beats for clustering: {available} usable, {required} required")]
    NotEnoughData { available: usize, required: usize },

    #[error("Failed to embed beat {beat_id}: {reason}")]
    Embedding { beat_id: String, reason: String },

    #[error("Clustering exceeded its deadline of {timeout_ms}ms")]
    DeadlineExceeded { timeout_ms: u64 },

    #[error("Clustering was cancelled")]
    Cancelled
}

impl ClusterError {
    pub fn unavailable() -> Self {
        Self::Unavailable {
            hint: EMBEDDING_INSTALL_HINT.to_string()
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Chain store errors
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("Chain not found: {id}")]
    NotFound { id: String },

    #[error("Chain name is required")]
    NameRequired,

    #[error("Beat {beat_id} is not in chain {chain_id}")]
    BeatNotInChain { chain_id: String, beat_id: String }
}

/// Pipeline orchestration errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Log(#[from] BeatLogError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Beat not found: {id}")]
    BeatNotFound { id: String }
}
