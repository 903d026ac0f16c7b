//! The persisted derived-data document and the per-beat enrichment join.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::types::{Beat, Entity, Taxonomy};

/// Current cache format version. A cache carrying any other version is
/// invalid and gets rebuilt.
pub const CACHE_VERSION: &str = "0.2.0";

/// File name of the cache inside the beats directory.
pub const CACHE_FILE_NAME: &str = "btv-cache.json";

/// Per-beat usage data maintained by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ViewStat {
    #[serde(default)]
    pub view_count: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_viewed_at: Option<DateTime<Utc>>
}

/// A thematic grouping of beats derived from embedding similarity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: String,
    pub name: String,
    pub beat_ids: Vec<String>,
    pub centroid: Vec<f32>,
    pub keywords: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub avg_ripeness: f64
}

/// A user-authored ordered sequence of beats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chain {
    pub id: String,
    pub name: String,
    pub beat_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub ripeness: f64
}

/// Everything the pipeline derives from a beats log, bound to the log by
/// `source_hash`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cache {
    pub version: String,
    pub generated_at: DateTime<Utc>,
    pub source_hash: String,

    #[serde(default)]
    pub taxonomies: BTreeMap<String, Taxonomy>,

    #[serde(default)]
    pub entities: Vec<Entity>,

    #[serde(default)]
    pub entity_index: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    pub ripeness: BTreeMap<String, f64>,

    #[serde(default)]
    pub clusters: Vec<Cluster>,

    #[serde(default)]
    pub chains: Vec<Chain>,

    #[serde(default)]
    pub view_stats: BTreeMap<String, ViewStat>,

    #[serde(default)]
    pub embeddings_available: bool
}

impl Cache {
    /// An empty cache at the current version for the given source hash.
    pub fn new(source_hash: impl Into<String>) -> Self {
        Self {
            version: CACHE_VERSION.to_string(),
            generated_at: Utc::now(),
            source_hash: source_hash.into(),
            taxonomies: BTreeMap::new(),
            entities: Vec::new(),
            entity_index: BTreeMap::new(),
            ripeness: BTreeMap::new(),
            clusters: Vec::new(),
            chains: Vec::new(),
            view_stats: BTreeMap::new(),
            embeddings_available: false
        }
    }

    pub fn ripeness_of(&self, beat_id: &str) -> f64 {
        self.ripeness.get(beat_id).copied().unwrap_or(0.0)
    }

    pub fn view_stat(&self, beat_id: &str) -> ViewStat {
        self.view_stats.get(beat_id).cloned().unwrap_or_default()
    }
}

/// The five weighted factors of a ripeness score and their capped sum.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RipenessBreakdown {
    pub total: f64,
    pub age: f64,
    pub revisit: f64,
    pub connection: f64,
    pub action: f64,
    pub completeness: f64
}

impl RipenessBreakdown {
    pub fn tier(&self) -> RipenessTier {
        RipenessTier::from_score(self.total)
    }
}

/// Display tier for a ripeness score.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
    EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum RipenessTier {
    Fresh,
    Maturing,
    Ripe,
    Overripe
}

impl RipenessTier {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            Self::Overripe
        } else if score >= 0.6 {
            Self::Ripe
        } else if score >= 0.3 {
            Self::Maturing
        } else {
            Self::Fresh
        }
    }
}

/// A beat joined with everything the cache knows about it. Built fresh on
/// every pipeline invocation and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedBeat {
    #[serde(flatten)]
    pub beat: Beat,

    pub taxonomy: Taxonomy,
    pub ripeness: f64,
    pub tier: RipenessTier,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chain_ids: Vec<String>,

    pub view_count: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_viewed_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extracted_entities: Vec<Entity>
}

impl EnrichedBeat {
    pub fn id(&self) -> &str {
        &self.beat.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(RipenessTier::from_score(0.0), RipenessTier::Fresh);
        assert_eq!(RipenessTier::from_score(0.29), RipenessTier::Fresh);
        assert_eq!(RipenessTier::from_score(0.3), RipenessTier::Maturing);
        assert_eq!(RipenessTier::from_score(0.6), RipenessTier::Ripe);
        assert_eq!(RipenessTier::from_score(0.8), RipenessTier::Overripe);
        assert_eq!(RipenessTier::from_score(1.0), RipenessTier::Overripe);
    }

    #[test]
    fn test_new_cache_is_current_version_and_empty() {
        let cache = Cache::new("abcdef0123456789");
        assert_eq!(cache.version, CACHE_VERSION);
        assert_eq!(cache.source_hash, "abcdef0123456789");
        assert!(cache.taxonomies.is_empty());
        assert!(!cache.embeddings_available);
        assert_eq!(cache.ripeness_of("missing"), 0.0);
        assert_eq!(cache.view_stat("missing"), ViewStat::default());
    }

    #[test]
    fn test_cache_json_field_names() {
        let cache = Cache::new("h");
        let value = serde_json::to_value(&cache).unwrap();
        for field in [
            "version",
            "generated_at",
            "source_hash",
            "taxonomies",
            "entities",
            "entity_index",
            "ripeness",
            "clusters",
            "chains",
            "view_stats",
            "embeddings_available"
        ] {
            assert!(value.get(field).is_some(), "missing field {field}");
        }
    }
}
