//! Rebuild ("migration") and the enrichment join.
//!
//! A rebuild reads the log once and derives every field of the cache from
//! those same bytes, so the stored `source_hash` always describes the beats
//! that were actually scored. Clusters and chains are not derived from the
//! log; they are carried over from a decodable prior cache and pruned to the
//! beats that still exist.

use std::collections::{BTreeMap, HashMap, HashSet};

use bt_core::{Beat, Cache, Chain, Cluster, EnrichedBeat, RipenessBreakdown, RipenessTier, ViewStat};
use chrono::{DateTime, Utc};
use config::Config;
use errors::{CacheError, PipelineError};
use tracing::{debug, info, instrument, warn};

use crate::cache::{load_cache, matches_source, save_cache};
use crate::chain::ChainStore;
use crate::entity::{EntityExtractor, EntityIndex};
use crate::loader::{BeatsPaths, LogSnapshot, find_beat, read_log};
use crate::ripeness::RipenessScorer;
use crate::taxonomy::TaxonomyClassifier;

/// Rebuild progress: step name, current, total. A total of 0 marks an
/// indeterminate step.
pub type Progress<'a> = &'a mut dyn FnMut(&str, usize, usize);

/// A progress sink that discards every report.
pub fn no_progress(_step: &str, _current: usize, _total: usize) {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebuildOptions {
    /// Keep view counts of beats still in the log instead of zeroing them
    pub preserve_view_stats: bool,
    /// Treat an undecodable cache as missing instead of failing
    pub rebuild_on_corrupt_cache: bool,
    /// Carried-over clusters smaller than this are dropped
    pub min_cluster_size: usize
}

impl Default for RebuildOptions {
    fn default() -> Self {
        Self {
            preserve_view_stats: false,
            rebuild_on_corrupt_cache: false,
            min_cluster_size: 2
        }
    }
}

impl From<&Config> for RebuildOptions {
    fn from(config: &Config) -> Self {
        Self {
            preserve_view_stats: config.pipeline.preserve_view_stats,
            rebuild_on_corrupt_cache: config.pipeline.rebuild_on_corrupt_cache,
            min_cluster_size: config.clustering.min_cluster_size
        }
    }
}

/// Orchestrates loading, rebuilding and joining for one beats directory.
#[derive(Debug, Clone)]
pub struct Pipeline {
    paths: BeatsPaths,
    options: RebuildOptions,
    classifier: TaxonomyClassifier,
    extractor: EntityExtractor,
    scorer: RipenessScorer
}

impl Pipeline {
    pub fn new(paths: BeatsPaths, options: RebuildOptions) -> Self {
        Self::with_components(
            paths,
            options,
            TaxonomyClassifier::default(),
            EntityExtractor::default(),
            RipenessScorer::default()
        )
    }

    pub fn with_components(
        paths: BeatsPaths,
        options: RebuildOptions,
        classifier: TaxonomyClassifier,
        extractor: EntityExtractor,
        scorer: RipenessScorer
    ) -> Self {
        Self {
            paths,
            options,
            classifier,
            extractor,
            scorer
        }
    }

    pub fn paths(&self) -> &BeatsPaths {
        &self.paths
    }

    pub fn options(&self) -> &RebuildOptions {
        &self.options
    }

    pub fn scorer(&self) -> &RipenessScorer {
        &self.scorer
    }

    /// Recompute the whole cache from the log and persist it atomically.
    pub fn rebuild(&self, progress: Progress<'_>) -> Result<Cache, PipelineError> {
        progress("Loading beats", 0, 0);
        let snapshot = read_log(&self.paths)?;
        self.rebuild_from(&snapshot, progress)
    }

    #[instrument(skip(self, snapshot, progress), fields(dir = %self.paths.dir().display()))]
    fn rebuild_from(
        &self,
        snapshot: &LogSnapshot,
        progress: Progress<'_>
    ) -> Result<Cache, PipelineError> {
        let beats = &snapshot.beats;
        let source_hash = snapshot.source_hash();
        let prior = self.load_prior()?;
        let now = Utc::now();
        let total = beats.len();

        let mut cache = Cache::new(source_hash);
        cache.generated_at = now;

        progress("Classifying taxonomies", 0, total);
        for (i, beat) in beats.iter().enumerate() {
            cache
                .taxonomies
                .insert(beat.id.clone(), self.classifier.classify(beat));
            progress("Classifying taxonomies", i + 1, total);
        }

        progress("Extracting entities", 0, total);
        let extracted = self.extractor.extract_all(beats);
        cache.entities = extracted.entities;
        cache.entity_index = extracted.index;
        progress("Extracting entities", total, total);

        progress("Calculating ripeness", 0, total);
        cache.view_stats = self.initial_view_stats(beats, prior.as_ref());
        cache.ripeness = self.scorer.score_all(beats, &cache.view_stats, now);
        progress("Calculating ripeness", total, total);

        if let Some(prior) = prior {
            let live: HashSet<&str> = beats.iter().map(|b| b.id.as_str()).collect();
            cache.chains = carry_chains(prior.chains, &live, &cache.ripeness);
            cache.clusters = carry_clusters(
                prior.clusters,
                &live,
                &cache.ripeness,
                self.options.min_cluster_size
            );
            cache.embeddings_available = prior.embeddings_available && !cache.clusters.is_empty();
        }

        progress("Saving cache", 0, 1);
        save_cache(&self.paths, &cache)?;
        progress("Saving cache", 1, 1);

        info!(
            beats = total,
            entities = cache.entities.len(),
            chains = cache.chains.len(),
            clusters = cache.clusters.len(),
            "Cache rebuilt"
        );
        Ok(cache)
    }

    /// Rebuild regardless of validity.
    pub fn refresh_cache(&self, progress: Progress<'_>) -> Result<Cache, PipelineError> {
        self.rebuild(progress)
    }

    /// The stored cache when it is valid for the current log, otherwise a
    /// fresh rebuild.
    pub fn ensure_cache(&self, progress: Progress<'_>) -> Result<Cache, PipelineError> {
        Ok(self.ensure_snapshot(progress)?.0)
    }

    /// Beats joined with a valid cache, newest first. Both come from the
    /// same read of the log.
    pub fn load_enriched_beats(
        &self,
        progress: Progress<'_>
    ) -> Result<(Vec<EnrichedBeat>, Cache), PipelineError> {
        let (cache, snapshot) = self.ensure_snapshot(progress)?;
        Ok((enrich(&snapshot.beats, &cache), cache))
    }

    /// Read the log once and return it with a cache that describes exactly
    /// those bytes.
    fn ensure_snapshot(
        &self,
        progress: Progress<'_>
    ) -> Result<(Cache, LogSnapshot), PipelineError> {
        let snapshot = read_log(&self.paths)?;
        match load_cache(&self.paths) {
            Ok(Some(cache)) if matches_source(&cache, &snapshot.source_hash()) => {
                debug!("Cache is valid");
                return Ok((cache, snapshot));
            }
            Ok(Some(_)) => debug!("Cache is stale"),
            Ok(None) => debug!("No cache found"),
            Err(CacheError::Decode { path, reason }) if self.options.rebuild_on_corrupt_cache => {
                warn!(path = %path.display(), %reason, "Rebuilding over corrupt cache");
            }
            Err(e) => return Err(e.into())
        }
        progress("Loading beats", 0, 0);
        let cache = self.rebuild_from(&snapshot, progress)?;
        Ok((cache, snapshot))
    }

    /// Persist a cache mutated outside a rebuild (views, chains, clusters).
    pub fn save(&self, cache: &Cache) -> Result<(), PipelineError> {
        save_cache(&self.paths, cache)?;
        Ok(())
    }

    /// Full factor breakdown for one beat against the current log.
    pub fn breakdown(
        &self,
        beat_id: &str,
        cache: &Cache,
        now: DateTime<Utc>
    ) -> Result<RipenessBreakdown, PipelineError> {
        let beats = read_log(&self.paths)?.beats;
        let beat = find_beat(&beats, beat_id).ok_or_else(|| PipelineError::BeatNotFound {
            id: beat_id.to_string()
        })?;
        Ok(self
            .scorer
            .score(beat, &beats, &cache.view_stat(beat_id), now))
    }

    /// A prior cache to carry chains, clusters and views from. Corrupt
    /// caches are skipped here since the rebuild replaces them anyway.
    fn load_prior(&self) -> Result<Option<Cache>, PipelineError> {
        match load_cache(&self.paths) {
            Ok(prior) => Ok(prior),
            Err(CacheError::Decode { path, reason }) => {
                warn!(path = %path.display(), %reason, "Ignoring undecodable prior cache");
                Ok(None)
            }
            Err(e) => Err(e.into())
        }
    }

    fn initial_view_stats(
        &self,
        beats: &[Beat],
        prior: Option<&Cache>
    ) -> BTreeMap<String, ViewStat> {
        beats
            .iter()
            .map(|beat| {
                let stat = prior
                    .filter(|_| self.options.preserve_view_stats)
                    .and_then(|p| p.view_stats.get(&beat.id).cloned())
                    .unwrap_or_default();
                (beat.id.clone(), stat)
            })
            .collect()
    }
}

fn carry_chains(
    chains: Vec<Chain>,
    live: &HashSet<&str>,
    ripeness: &BTreeMap<String, f64>
) -> Vec<Chain> {
    let mut store = ChainStore::load(chains);
    store.retain_beats(|id| live.contains(id));
    store.refresh_ripeness(ripeness);
    store.into_chains()
}

fn carry_clusters(
    clusters: Vec<Cluster>,
    live: &HashSet<&str>,
    ripeness: &BTreeMap<String, f64>,
    min_size: usize
) -> Vec<Cluster> {
    let mut kept: Vec<Cluster> = clusters
        .into_iter()
        .filter_map(|mut cluster| {
            cluster.beat_ids.retain(|id| live.contains(id.as_str()));
            if cluster.beat_ids.len() < min_size {
                return None;
            }
            cluster.avg_ripeness = cluster
                .beat_ids
                .iter()
                .map(|id| ripeness.get(id).copied().unwrap_or(0.0))
                .sum::<f64>()
                / cluster.beat_ids.len() as f64;
            Some(cluster)
        })
        .collect();
    kept.sort_by(|a, b| b.avg_ripeness.total_cmp(&a.avg_ripeness));
    kept
}

/// Join raw beats with cached derived data. Beats missing from the cache
/// get default taxonomy and a zero score.
pub fn enrich(beats: &[Beat], cache: &Cache) -> Vec<EnrichedBeat> {
    let mut cluster_of: HashMap<&str, &str> = HashMap::new();
    for cluster in &cache.clusters {
        for beat_id in &cluster.beat_ids {
            cluster_of.insert(beat_id.as_str(), cluster.id.as_str());
        }
    }

    let mut chains_of: HashMap<&str, Vec<String>> = HashMap::new();
    for chain in &cache.chains {
        for beat_id in &chain.beat_ids {
            chains_of
                .entry(beat_id.as_str())
                .or_default()
                .push(chain.id.clone());
        }
    }

    let entities = EntityIndex::new(cache.entities.clone(), cache.entity_index.clone());

    beats
        .iter()
        .map(|beat| {
            let ripeness = cache.ripeness_of(&beat.id);
            let stat = cache.view_stat(&beat.id);
            EnrichedBeat {
                beat: beat.clone(),
                taxonomy: cache.taxonomies.get(&beat.id).copied().unwrap_or_default(),
                ripeness,
                tier: RipenessTier::from_score(ripeness),
                cluster_id: cluster_of.get(beat.id.as_str()).map(|id| (*id).to_string()),
                chain_ids: chains_of.remove(beat.id.as_str()).unwrap_or_default(),
                view_count: stat.view_count,
                last_viewed_at: stat.last_viewed_at,
                extracted_entities: entities
                    .get_for_beat(&beat.id)
                    .into_iter()
                    .cloned()
                    .collect()
            }
        })
        .collect()
}
