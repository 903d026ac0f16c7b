pub mod beats;
pub mod chain;
pub mod cluster;
pub mod entities;
pub mod projects;
pub mod rebuild;
pub mod ripeness;
pub mod taxonomy;
pub mod timeline;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "btv",
    author,
    version,
    about = "btv - enrichment, ripeness and clustering over a beats log",
    long_about = "Every command prints a single JSON document on stdout.\n\nThe cache is rebuilt \
                  automatically whenever the beats log has changed. Progress and logs go to \
                  stderr."
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Beats directory holding the log and cache (skips discovery)
    #[arg(long, global = true, env = "BTV_DIR")]
    pub dir: Option<PathBuf>,

    /// Directory searched upwards for a beats directory
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Pick a discovered project under the root by name
    #[arg(long, global = true)]
    pub project: Option<String>,

    /// Configuration file (TOML or YAML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Embedding service base URL
    #[arg(long, global = true)]
    pub ollama_url: Option<String>,

    /// Embedding model name
    #[arg(long, global = true)]
    pub embedding_model: Option<String>,

    /// Keep view counts across rebuilds
    #[arg(long, global = true)]
    pub preserve_view_stats: bool,

    /// Logging level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Hide the progress bar
    #[arg(short, long, global = true)]
    pub quiet: bool
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Recompute the cache from the beats log")]
    Rebuild(rebuild::RebuildArgs),

    #[command(about = "List beats directories under the root")]
    Projects(projects::ProjectsArgs),

    #[command(about = "List beats, newest first")]
    List(beats::ListArgs),

    #[command(about = "Search beat content, labels and ids")]
    Search(beats::SearchArgs),

    #[command(about = "Show one enriched beat")]
    Show(beats::ShowArgs),

    #[command(about = "Record a view of a beat")]
    View(beats::ViewArgs),

    #[command(about = "Channel and source counts")]
    TaxonomyStats,

    #[command(about = "Ripeness factor breakdown for a beat")]
    Ripeness(ripeness::RipenessArgs),

    #[command(about = "Ripest beats above a threshold")]
    Ripe(ripeness::RipeArgs),

    #[command(about = "Beats due for review")]
    Stale(ripeness::StaleArgs),

    #[command(about = "Most-mentioned entities by type")]
    Entities(entities::EntitiesArgs),

    #[command(about = "Beats mentioning an entity")]
    EntityBeats(entities::EntityBeatsArgs),

    #[command(about = "Beat counts bucketed over time")]
    Timeline(timeline::TimelineArgs),

    #[command(about = "Quiet stretches between beats")]
    Gaps(timeline::GapsArgs),

    #[command(about = "Group beats into themes via embeddings")]
    Cluster(cluster::ClusterArgs),

    #[command(about = "Show the stored clusters")]
    Clusters,

    #[command(about = "Beats most similar to a beat")]
    Similar(cluster::SimilarArgs),

    #[command(about = "List thought chains")]
    Chains,

    #[command(about = "Create a thought chain")]
    ChainCreate(chain::ChainCreateArgs),

    #[command(about = "Append a beat to a chain")]
    ChainAdd(chain::ChainBeatArgs),

    #[command(about = "Remove a beat from a chain")]
    ChainRemove(chain::ChainBeatArgs),

    #[command(about = "Rename a chain")]
    ChainRename(chain::ChainRenameArgs),

    #[command(about = "Delete a chain")]
    ChainDelete(chain::ChainDeleteArgs)
}
