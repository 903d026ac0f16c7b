//! # Environment Variable Loader
//!
//! Applies `BTV_*` environment variables on top of an existing
//! configuration.
//!
//! # Variables
//! - `BTV_ROOT` (legacy `BEATS_ROOT`): directory searched for `.beats`
//! - `BTV_OLLAMA_URL`: embedding service base URL
//! - `BTV_EMBEDDING_MODEL`: embedding model name
//! - `BTV_EMBED_CONCURRENCY`: batch embedding worker count
//! - `BTV_EMBED_TIMEOUT_SECS`: per-request embedding timeout
//! - `BTV_CLUSTER_K`: default cluster count
//! - `BTV_CLUSTER_SEED`: fixed k-means seed
//! - `BTV_PRESERVE_VIEW_STATS`: keep view counts across rebuilds
//! - `BTV_REBUILD_ON_CORRUPT_CACHE`: rebuild instead of failing on a corrupt
//!   cache
//! - `BTV_STALE_AFTER_DAYS`: staleness age threshold
//! - `BTV_LOG_LEVEL`: logging level (trace/debug/info/warn/error)

use std::env;
use std::path::PathBuf;

use crate::config::Config;

/// Environment loading error.
#[derive(Debug, thiserror::Error)]
#[error("Invalid value for {key}: {reason}")]
pub struct EnvError {
    pub key: String,
    pub reason: String
}

/// Load configuration from defaults plus environment variables.
///
/// ## Usage
/// ```rust,no_run
/// use config::load_from_env;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = load_from_env()?;
///     println!("Embedding service: {}", config.embedding.base_url);
///     Ok(())
/// }
/// ```
pub fn load_from_env() -> Result<Config, EnvError> {
    let mut config = Config::default();
    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Override fields of `config` from the environment. Returns the dotted
/// names of the fields that were set.
pub fn apply_env_overrides(config: &mut Config) -> Result<Vec<String>, EnvError> {
    let mut changes = Vec::new();

    let root = env::var("BTV_ROOT").or_else(|_| env::var("BEATS_ROOT")).ok();
    if let Some(root) = root.filter(|r| !r.is_empty()) {
        config.beats.root = PathBuf::from(root);
        changes.push("beats.root".to_string());
    }

    if let Some(url) = parse_env::<String>("BTV_OLLAMA_URL")? {
        config.embedding.base_url = url;
        changes.push("embedding.base_url".to_string());
    }
    if let Some(model) = parse_env::<String>("BTV_EMBEDDING_MODEL")? {
        config.embedding.model = model;
        changes.push("embedding.model".to_string());
    }
    if let Some(concurrency) = parse_env("BTV_EMBED_CONCURRENCY")? {
        config.embedding.concurrency = concurrency;
        changes.push("embedding.concurrency".to_string());
    }
    if let Some(timeout) = parse_env("BTV_EMBED_TIMEOUT_SECS")? {
        config.embedding.request_timeout_secs = timeout;
        changes.push("embedding.request_timeout_secs".to_string());
    }

    if let Some(k) = parse_env("BTV_CLUSTER_K")? {
        config.clustering.default_k = k;
        changes.push("clustering.default_k".to_string());
    }
    if let Some(seed) = parse_env("BTV_CLUSTER_SEED")? {
        config.clustering.seed = Some(seed);
        changes.push("clustering.seed".to_string());
    }

    if let Some(preserve) = parse_env("BTV_PRESERVE_VIEW_STATS")? {
        config.pipeline.preserve_view_stats = preserve;
        changes.push("pipeline.preserve_view_stats".to_string());
    }
    if let Some(rebuild) = parse_env("BTV_REBUILD_ON_CORRUPT_CACHE")? {
        config.pipeline.rebuild_on_corrupt_cache = rebuild;
        changes.push("pipeline.rebuild_on_corrupt_cache".to_string());
    }

    if let Some(days) = parse_env("BTV_STALE_AFTER_DAYS")? {
        config.review.stale_after_days = days;
        changes.push("review.stale_after_days".to_string());
    }

    if let Some(level) = parse_env::<String>("BTV_LOG_LEVEL")? {
        config.observability.logging_level = level.to_lowercase();
        changes.push("observability.logging_level".to_string());
    }

    Ok(changes)
}

/// Parse an environment variable. Unset or empty yields `None`; a value
/// that does not parse is an error.
fn parse_env<T>(key: &str) -> Result<Option<T>, EnvError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display
{
    match env::var(key) {
        Ok(s) if s.trim().is_empty() => Ok(None),
        Ok(s) => s.trim().parse::<T>().map(Some).map_err(|e| EnvError {
            key: key.to_string(),
            reason: e.to_string()
        }),
        Err(_) => Ok(None)
    }
}
