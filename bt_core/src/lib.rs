//! # Beats Core
//!
//! Shared types and traits for the beats enrichment pipeline.
//!
//! This crate provides:
//! - The beat data model as it appears in the append-only source log
//! - Derived records (taxonomy, entities, clusters, chains, view stats)
//! - The persisted cache document and the enriched beat join
//! - The embedding provider seam used by the clustering engine
//!
//! # Best Practices
//!
//! - Uses Rust Edition 2024
//! - Derived data is plain serde data; no behavior lives on the cache itself

pub mod cache;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use cache::{
    CACHE_FILE_NAME, CACHE_VERSION, Cache, Chain, Cluster, EnrichedBeat, RipenessBreakdown,
    RipenessTier, ViewStat
};
pub use traits::EmbeddingProvider;
pub use types::{Beat, Channel, Entity, EntityType, Impetus, Project, Source, Taxonomy};
