//! # Beats Enrichment
//!
//! Turns a raw beats log into a cache of derived facts and joins the two
//! back together for readers.
//!
//! - [`taxonomy`]: channel and source classification
//! - [`entity`]: dictionary and proper-noun entity extraction
//! - [`ripeness`]: five-factor readiness score
//! - [`cache`]: persistence and source-hash validity
//! - [`pipeline`]: rebuild, ensure and the enrichment join

pub mod cache;
pub mod chain;
pub mod entity;
pub mod loader;
pub mod pipeline;
pub mod review;
pub mod ripeness;
pub mod taxonomy;
pub mod timeline;
pub mod views;

pub use cache::{compute_source_hash, is_valid, load_cache, matches_source, save_cache};
pub use chain::{ChainStore, chain_ripeness};
pub use entity::{EntityDictionaries, EntityExtractor, EntityIndex, ExtractedEntities};
pub use loader::{
    BEATS_DIR_NAME, BEATS_FILE_NAME, BeatsPaths, LogSnapshot, discover_projects, find_beat,
    find_beats_dir, load_beats, read_log, search_beats
};
pub use pipeline::{Pipeline, Progress, RebuildOptions, enrich, no_progress};
pub use review::{StaleCode, StalePolicy, StaleReason, find_stale, is_stale, stale_reasons};
pub use ripeness::{RipenessLimits, RipenessScorer, RipenessWeights};
pub use taxonomy::{TaxonomyClassifier, TaxonomyPatterns, TaxonomyStats};
pub use timeline::{Gap, Timeline, TimelineBucket, Zoom, build_timeline, find_gaps};
pub use views::record_view;
