//! # Beat Clustering
//!
//! Semantic grouping and similarity search over beats, backed by an
//! external embedding service.
//!
//! The engine degrades to [`errors::ClusterError::Unavailable`] when the
//! service cannot be reached; every other part of the workspace keeps
//! working without it.

pub mod embedding_cache;
pub mod engine;
pub mod keywords;
pub mod kmeans;
pub mod ollama;

pub use embedding_cache::EmbeddingCache;
pub use engine::{ClusterEngine, ClusterOptions, ScoredBeat, store_clusters};
pub use keywords::{cluster_name, extract_keywords};
pub use kmeans::{KMeansResult, cosine_similarity, euclidean_distance, kmeans};
pub use ollama::OllamaClient;
