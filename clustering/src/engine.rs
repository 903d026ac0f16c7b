//! Clustering and similarity search over enriched beats.
//!
//! Embeddings are fetched concurrently through a bounded pool and collected
//! before any vector math runs. Each pass runs under a deadline and a
//! cancellation token; dropping the pass aborts its outstanding requests.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bt_core::{Cache, Cluster, EmbeddingProvider, EnrichedBeat};
use chrono::Utc;
use config::Config;
use errors::ClusterError;
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::embedding_cache::EmbeddingCache;
use crate::keywords::{cluster_name, extract_keywords};
use crate::kmeans::{cosine_similarity, kmeans};

/// Smallest number of clusters worth computing.
const MIN_CLUSTERS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterOptions {
    pub default_k: usize,
    pub max_iterations: usize,
    pub min_cluster_size: usize,
    pub concurrency: usize,
    pub deadline: Duration,
    pub similar_deadline: Duration,
    pub seed: Option<u64>
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            default_k: 8,
            max_iterations: 100,
            min_cluster_size: 2,
            concurrency: 4,
            deadline: Duration::from_secs(300),
            similar_deadline: Duration::from_secs(60),
            seed: None
        }
    }
}

impl From<&Config> for ClusterOptions {
    fn from(config: &Config) -> Self {
        Self {
            default_k: config.clustering.default_k,
            max_iterations: config.clustering.max_iterations,
            min_cluster_size: config.clustering.min_cluster_size,
            concurrency: config.embedding.concurrency,
            deadline: Duration::from_secs(config.clustering.deadline_secs),
            similar_deadline: Duration::from_secs(config.clustering.similar_deadline_secs),
            seed: config.clustering.seed
        }
    }
}

/// A similarity hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredBeat {
    pub beat: EnrichedBeat,
    pub similarity: f32
}

pub struct ClusterEngine<P: EmbeddingProvider> {
    provider: Arc<P>,
    cache: Arc<EmbeddingCache>,
    options: ClusterOptions
}

impl<P: EmbeddingProvider> ClusterEngine<P> {
    pub fn new(provider: Arc<P>, cache: Arc<EmbeddingCache>, options: ClusterOptions) -> Self {
        Self {
            provider,
            cache,
            options
        }
    }

    pub fn options(&self) -> &ClusterOptions {
        &self.options
    }

    pub fn embedding_cache(&self) -> &Arc<EmbeddingCache> {
        &self.cache
    }

    pub async fn is_available(&self) -> bool {
        self.provider.is_available().await
    }

    pub async fn refresh(&self) -> bool {
        self.provider.refresh().await
    }

    /// Group beats into at most `k` themes (`0` means the configured
    /// default). Beats whose embedding fails are left out. Clusters below
    /// the minimum size are dropped; the rest are ordered by mean ripeness,
    /// highest first.
    #[instrument(skip(self, beats, cancel), fields(beats = beats.len()))]
    pub async fn generate_clusters(
        &self,
        beats: &[EnrichedBeat],
        k: usize,
        cancel: &CancellationToken
    ) -> Result<Vec<Cluster>, ClusterError> {
        if !self.provider.is_available().await {
            return Err(ClusterError::unavailable());
        }

        let requested = if k == 0 { self.options.default_k } else { k };
        let embedded = self
            .bounded(self.options.deadline, cancel, self.embed_all(beats.iter()))
            .await?;
        let embedded = same_dimension(embedded);

        let k = requested.min(embedded.len());
        if k < MIN_CLUSTERS {
            return Err(ClusterError::NotEnoughData {
                available: embedded.len(),
                required: MIN_CLUSTERS
            });
        }

        let points: Vec<Vec<f32>> = embedded.iter().map(|(_, v)| v.clone()).collect();
        let result = kmeans(&points, k, self.options.max_iterations, self.options.seed);

        let mut members: BTreeMap<usize, Vec<&EnrichedBeat>> = BTreeMap::new();
        for ((beat, _), cluster) in embedded.iter().zip(&result.assignments) {
            members.entry(*cluster).or_default().push(*beat);
        }

        let created_at = Utc::now();
        let mut clusters: Vec<Cluster> = members
            .into_iter()
            .filter(|(_, beats)| beats.len() >= self.options.min_cluster_size)
            .map(|(idx, beats)| {
                let contents: Vec<&str> = beats.iter().map(|b| b.beat.content.as_str()).collect();
                let keywords = extract_keywords(&contents);
                Cluster {
                    id: format!("cluster-{}-{}", created_at.timestamp(), idx),
                    name: cluster_name(&keywords),
                    beat_ids: beats.iter().map(|b| b.beat.id.clone()).collect(),
                    centroid: result.centroids[idx].clone(),
                    keywords,
                    created_at,
                    avg_ripeness: beats.iter().map(|b| b.ripeness).sum::<f64>() / beats.len() as f64
                }
            })
            .collect();
        clusters.sort_by(|a, b| b.avg_ripeness.total_cmp(&a.avg_ripeness));

        info!(
            embedded = points.len(),
            k,
            iterations = result.iterations,
            clusters = clusters.len(),
            "Clusters generated"
        );
        Ok(clusters)
    }

    /// The `limit` beats most similar to `target` by cosine similarity,
    /// excluding the target itself. Failing to embed the target is fatal;
    /// other failures only drop that candidate.
    #[instrument(skip(self, target, all_beats, cancel), fields(target = %target.beat.id))]
    pub async fn find_similar(
        &self,
        target: &EnrichedBeat,
        all_beats: &[EnrichedBeat],
        limit: usize,
        cancel: &CancellationToken
    ) -> Result<Vec<ScoredBeat>, ClusterError> {
        if !self.provider.is_available().await {
            return Err(ClusterError::unavailable());
        }

        let work = async {
            let anchor = self
                .embedding_for(target)
                .await
                .map_err(|e| ClusterError::Embedding {
                    beat_id: target.beat.id.clone(),
                    reason: e.to_string()
                })?;
            let others = all_beats.iter().filter(|b| b.beat.id != target.beat.id);
            Ok::<_, ClusterError>((anchor, self.embed_all(others).await))
        };
        let (anchor, candidates) = self
            .bounded(self.options.similar_deadline, cancel, work)
            .await??;

        let mut scored: Vec<ScoredBeat> = candidates
            .into_iter()
            .map(|(beat, vector)| ScoredBeat {
                beat: beat.clone(),
                similarity: cosine_similarity(&anchor, &vector)
            })
            .collect();
        scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn embedding_for(&self, beat: &EnrichedBeat) -> Result<Vec<f32>, P::Error> {
        if let Some(vector) = self.cache.get(&beat.beat.id) {
            return Ok(vector);
        }
        let vector = self.provider.embed(&beat.beat.content).await?;
        self.cache.insert(beat.beat.id.clone(), vector.clone());
        Ok(vector)
    }

    /// Embed every beat through the bounded pool, in input order, skipping
    /// failures.
    async fn embed_all<'a>(
        &self,
        beats: impl Iterator<Item = &'a EnrichedBeat>
    ) -> Vec<(&'a EnrichedBeat, Vec<f32>)> {
        let mut embedded: Vec<(usize, &'a EnrichedBeat, Vec<f32>)> = stream::iter(beats.enumerate())
            .map(|(i, beat)| async move {
                match self.embedding_for(beat).await {
                    Ok(vector) => Some((i, beat, vector)),
                    Err(e) => {
                        debug!(beat_id = %beat.beat.id, error = %e, "Skipping beat without embedding");
                        None
                    }
                }
            })
            .buffer_unordered(self.options.concurrency.max(1))
            .filter_map(|r| async move { r })
            .collect()
            .await;
        embedded.sort_by_key(|(i, _, _)| *i);
        embedded.into_iter().map(|(_, b, v)| (b, v)).collect()
    }

    async fn bounded<T>(
        &self,
        deadline: Duration,
        cancel: &CancellationToken,
        work: impl Future<Output = T>
    ) -> Result<T, ClusterError> {
        tokio::select! {
            () = cancel.cancelled() => Err(ClusterError::Cancelled),
            result = tokio::time::timeout(deadline, work) => result.map_err(|_| {
                ClusterError::DeadlineExceeded {
                    timeout_ms: deadline.as_millis() as u64
                }
            })
        }
    }
}

/// Keep only vectors matching the first vector's dimension.
fn same_dimension(embedded: Vec<(&EnrichedBeat, Vec<f32>)>) -> Vec<(&EnrichedBeat, Vec<f32>)> {
    let Some(dim) = embedded.first().map(|(_, v)| v.len()) else {
        return embedded;
    };
    embedded
        .into_iter()
        .filter(|(beat, v)| {
            let keep = v.len() == dim;
            if !keep {
                debug!(beat_id = %beat.beat.id, len = v.len(), dim, "Dropping mismatched embedding");
            }
            keep
        })
        .collect()
}

/// Replace the cache's clusters with a fresh generation.
pub fn store_clusters(cache: &mut Cache, clusters: Vec<Cluster>) {
    cache.clusters = clusters;
    cache.embeddings_available = true;
}
