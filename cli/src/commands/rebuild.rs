use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;
use tracing::info;

use crate::app::App;
use crate::output;

#[derive(Args)]
pub struct RebuildArgs {
    /// Only rebuild when the log changed since the last build
    #[arg(long)]
    pub if_stale: bool
}

#[derive(Serialize)]
struct RebuildOutput {
    success: bool,
    version: String,
    generated_at: DateTime<Utc>,
    source_hash: String,
    beats_count: usize,
    entities_count: usize,
    chains_count: usize,
    clusters_count: usize,
    cache_path: String
}

pub fn run(args: RebuildArgs, app: &App) -> Result<()> {
    let pipeline = app.pipeline()?;
    info!(dir = %pipeline.paths().dir().display(), "Rebuilding cache");

    let mut progress = app.progress();
    let mut report = |step: &str, current: usize, total: usize| {
        progress.update(step, current, total);
    };
    let cache = if args.if_stale {
        pipeline.ensure_cache(&mut report)?
    } else {
        pipeline.refresh_cache(&mut report)?
    };
    progress.finish();

    output::print_json(&RebuildOutput {
        success: true,
        version: cache.version.clone(),
        generated_at: cache.generated_at,
        source_hash: cache.source_hash.clone(),
        beats_count: cache.taxonomies.len(),
        entities_count: cache.entities.len(),
        chains_count: cache.chains.len(),
        clusters_count: cache.clusters.len(),
        cache_path: pipeline.paths().cache_path().display().to_string()
    })
}
