use anyhow::Result;
use bt_core::Cluster;
use clap::Args;
use clustering::store_clusters;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::app::App;
use crate::commands::beats::find;
use crate::output::{self, PREVIEW_LEN};

#[derive(Args)]
pub struct ClusterArgs {
    /// Number of clusters (defaults to the configured k)
    #[arg(short, long)]
    pub k: Option<usize>
}

#[derive(Args)]
pub struct SimilarArgs {
    /// Beat ID to compare against
    pub id: String,

    /// Maximum number of results (defaults to the configured limit)
    #[arg(short, long)]
    pub limit: Option<usize>
}

#[derive(Serialize)]
struct ClusterSummary {
    id: String,
    name: String,
    beat_count: usize,
    keywords: Vec<String>,
    ripeness: f64
}

impl From<&Cluster> for ClusterSummary {
    fn from(cluster: &Cluster) -> Self {
        Self {
            id: cluster.id.clone(),
            name: cluster.name.clone(),
            beat_count: cluster.beat_ids.len(),
            keywords: cluster.keywords.clone(),
            ripeness: cluster.avg_ripeness
        }
    }
}

#[derive(Serialize)]
struct ClustersOutput {
    clusters: Vec<ClusterSummary>,
    count: usize,
    embeddings_available: bool
}

#[derive(Serialize)]
struct SimilarBeat {
    id: String,
    similarity: f32,
    preview: String
}

#[derive(Serialize)]
struct SimilarOutput {
    similar: Vec<SimilarBeat>,
    source_beat: String,
    count: usize
}

/// Cancelled on Ctrl+C so an in-flight pass stops at the next await.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, cancelling");
            child.cancel();
        }
    });
    token
}

fn clusters_output(clusters: &[Cluster], embeddings_available: bool) -> ClustersOutput {
    ClustersOutput {
        clusters: clusters.iter().map(ClusterSummary::from).collect(),
        count: clusters.len(),
        embeddings_available
    }
}

pub async fn generate(args: ClusterArgs, app: &App) -> Result<()> {
    let (pipeline, beats, mut cache) = app.enriched()?;
    let engine = app.engine();
    let cancel = cancel_on_ctrl_c();

    let clusters = engine
        .generate_clusters(&beats, args.k.unwrap_or(0), &cancel)
        .await?;
    store_clusters(&mut cache, clusters);
    pipeline.save(&cache)?;

    output::print_json(&clusters_output(&cache.clusters, cache.embeddings_available))
}

pub fn list(app: &App) -> Result<()> {
    let (_, _, cache) = app.enriched()?;
    output::print_json(&clusters_output(&cache.clusters, cache.embeddings_available))
}

pub async fn similar(args: SimilarArgs, app: &App) -> Result<()> {
    let (_, beats, _) = app.enriched()?;
    let target = find(&beats, &args.id)?;
    let limit = args
        .limit
        .unwrap_or(app.config.clustering.similar_limit);

    let engine = app.engine();
    let cancel = cancel_on_ctrl_c();
    let scored = engine.find_similar(target, &beats, limit, &cancel).await?;

    let similar: Vec<SimilarBeat> = scored
        .into_iter()
        .map(|s| SimilarBeat {
            preview: s.beat.beat.content_preview(PREVIEW_LEN),
            id: s.beat.beat.id,
            similarity: s.similarity
        })
        .collect();
    output::print_json(&SimilarOutput {
        count: similar.len(),
        similar,
        source_beat: args.id
    })
}
