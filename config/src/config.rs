//! # Configuration Structures
//!
//! All configuration structures:
//! - Use `serde` for serialization/deserialization with per-field defaults
//! - Use `validator` for input validation
//! - Implement `Default` with the same values as the serde defaults

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Main configuration structure for the beats pipeline.
///
/// ## Usage
/// ```rust,no_run
/// use config::Config;
///
/// let config = Config::default();
/// println!("Embedding model: {}", config.embedding.model);
/// ```
///
/// ## Fields
/// - `beats`: where the log and the cache live
/// - `pipeline`: rebuild behavior
/// - `embedding`: embedding service connection
/// - `clustering`: k-means and similarity tuning
/// - `review`: staleness thresholds
/// - `observability`: logging
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    #[validate(nested)]
    pub beats: BeatsConfig,

    #[serde(default)]
    #[validate(nested)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    #[validate(nested)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    #[validate(nested)]
    pub clustering: ClusteringConfig,

    #[serde(default)]
    #[validate(nested)]
    pub review: ReviewConfig,

    #[serde(default)]
    #[validate(nested)]
    pub observability: ObservabilityConfig
}

/// Location of the beats log and cache.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct BeatsConfig {
    /// Directory searched upwards for the beats directory
    #[serde(default = "default_beats_root")]
    pub root: PathBuf,

    #[serde(default = "default_beats_dir_name")]
    #[validate(length(min = 1, max = 255))]
    pub dir_name: String,

    #[serde(default = "default_beats_log_file")]
    #[validate(length(min = 1, max = 255))]
    pub log_file: String,

    #[serde(default = "default_beats_cache_file")]
    #[validate(length(min = 1, max = 255))]
    pub cache_file: String
}

fn default_beats_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_beats_dir_name() -> String {
    ".beats".to_string()
}

fn default_beats_log_file() -> String {
    "beats.jsonl".to_string()
}

fn default_beats_cache_file() -> String {
    "btv-cache.json".to_string()
}

impl Default for BeatsConfig {
    fn default() -> Self {
        Self {
            root: default_beats_root(),
            dir_name: default_beats_dir_name(),
            log_file: default_beats_log_file(),
            cache_file: default_beats_cache_file()
        }
    }
}

impl BeatsConfig {
    pub fn log_path(&self, beats_dir: &Path) -> PathBuf {
        beats_dir.join(&self.log_file)
    }

    pub fn cache_path(&self, beats_dir: &Path) -> PathBuf {
        beats_dir.join(&self.cache_file)
    }
}

/// Rebuild behavior.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq, Default)]
pub struct PipelineConfig {
    /// Carry view counts across rebuilds instead of resetting them
    #[serde(default)]
    pub preserve_view_stats: bool,

    /// Treat an undecodable cache file as absent instead of failing
    #[serde(default)]
    pub rebuild_on_corrupt_cache: bool
}

/// Embedding service connection.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_base_url")]
    #[validate(custom(function = "validate_base_url"))]
    pub base_url: String,

    #[serde(default = "default_embedding_model")]
    #[validate(length(min = 1, max = 255))]
    pub model: String,

    #[serde(default = "default_embedding_request_timeout")]
    #[validate(range(min = 1, max = 600))]
    pub request_timeout_secs: u64,

    #[serde(default = "default_embedding_probe_timeout")]
    #[validate(range(min = 1, max = 60))]
    pub probe_timeout_secs: u64,

    /// Bounded worker pool size for batch embedding
    #[serde(default = "default_embedding_concurrency")]
    #[validate(range(min = 1, max = 64))]
    pub concurrency: usize
}

fn default_embedding_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_embedding_request_timeout() -> u64 {
    30
}

fn default_embedding_probe_timeout() -> u64 {
    5
}

fn default_embedding_concurrency() -> usize {
    4
}

fn validate_base_url(value: &str) -> Result<(), validator::ValidationError> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(validator::ValidationError::new(
            "Embedding base_url must start with http:// or https://"
        ))
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: default_embedding_base_url(),
            model: default_embedding_model(),
            request_timeout_secs: default_embedding_request_timeout(),
            probe_timeout_secs: default_embedding_probe_timeout(),
            concurrency: default_embedding_concurrency()
        }
    }
}

/// K-means and similarity tuning.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct ClusteringConfig {
    #[serde(default = "default_clustering_k")]
    #[validate(range(min = 2, max = 100))]
    pub default_k: usize,

    #[serde(default = "default_clustering_max_iterations")]
    #[validate(range(min = 1, max = 10000))]
    pub max_iterations: usize,

    /// Clusters smaller than this are discarded as noise
    #[serde(default = "default_clustering_min_cluster_size")]
    #[validate(range(min = 1, max = 1000))]
    pub min_cluster_size: usize,

    /// Overall deadline for a clustering pass
    #[serde(default = "default_clustering_deadline")]
    #[validate(range(min = 1, max = 3600))]
    pub deadline_secs: u64,

    #[serde(default = "default_clustering_similar_limit")]
    #[validate(range(min = 1, max = 1000))]
    pub similar_limit: usize,

    #[serde(default = "default_clustering_similar_deadline")]
    #[validate(range(min = 1, max = 3600))]
    pub similar_deadline_secs: u64,

    /// Fixed seed for centroid initialisation; random when absent
    #[serde(default)]
    pub seed: Option<u64>
}

fn default_clustering_k() -> usize {
    8
}

fn default_clustering_max_iterations() -> usize {
    100
}

fn default_clustering_min_cluster_size() -> usize {
    2
}

fn default_clustering_deadline() -> u64 {
    300
}

fn default_clustering_similar_limit() -> usize {
    5
}

fn default_clustering_similar_deadline() -> u64 {
    60
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            default_k: default_clustering_k(),
            max_iterations: default_clustering_max_iterations(),
            min_cluster_size: default_clustering_min_cluster_size(),
            deadline_secs: default_clustering_deadline(),
            similar_limit: default_clustering_similar_limit(),
            similar_deadline_secs: default_clustering_similar_deadline(),
            seed: None
        }
    }
}

/// Staleness thresholds, in days.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct ReviewConfig {
    #[serde(default = "default_review_stale_after")]
    #[validate(range(min = 1, max = 3650))]
    pub stale_after_days: i64,

    #[serde(default = "default_review_recent_view")]
    #[validate(range(min = 1, max = 3650))]
    pub recent_view_days: i64,

    #[serde(default = "default_review_very_old")]
    #[validate(range(min = 1, max = 3650))]
    pub very_old_days: i64
}

fn default_review_stale_after() -> i64 {
    30
}

fn default_review_recent_view() -> i64 {
    14
}

fn default_review_very_old() -> i64 {
    60
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            stale_after_days: default_review_stale_after(),
            recent_view_days: default_review_recent_view(),
            very_old_days: default_review_very_old()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct ObservabilityConfig {
    /// Logging level
    #[serde(default = "default_observability_logging_level")]
    #[validate(custom(function = "validate_logging_level"))]
    pub logging_level: String
}

fn default_observability_logging_level() -> String {
    "info".to_string()
}

fn validate_logging_level(value: &str) -> Result<(), validator::ValidationError> {
    match value {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(validator::ValidationError::new("Invalid logging level"))
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            logging_level: default_observability_logging_level()
        }
    }
}
