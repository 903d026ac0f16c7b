use anyhow::Result;
use bt_core::{Channel, EnrichedBeat, Source};
use chrono::{DateTime, Utc};
use clap::{Args, ValueEnum};
use enrichment::loader::matches_query;
use enrichment::{ChainStore, record_view};
use errors::PipelineError;
use serde::Serialize;

use crate::app::App;
use crate::output::{self, BeatSummary};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SortKey {
    /// Newest first
    #[default]
    Created,
    /// Ripest first
    Ripeness
}

#[derive(Args)]
pub struct ListArgs {
    /// Only beats in this channel (e.g. research, development)
    #[arg(long)]
    pub channel: Option<Channel>,

    /// Only beats from this source (e.g. web, github)
    #[arg(long)]
    pub source: Option<Source>,

    #[arg(long, value_enum, default_value_t = SortKey::Created)]
    pub sort: SortKey,

    /// Maximum number of beats (0 for all)
    #[arg(short, long, default_value = "0")]
    pub limit: usize
}

#[derive(Args)]
pub struct SearchArgs {
    /// Case-insensitive text to look for
    pub query: String,

    /// Maximum number of results
    #[arg(short, long, default_value = "50")]
    pub limit: usize
}

#[derive(Args)]
pub struct ShowArgs {
    /// Beat ID
    pub id: String
}

#[derive(Args)]
pub struct ViewArgs {
    /// Beat ID
    pub id: String
}

#[derive(Serialize)]
struct ListOutput {
    beats: Vec<BeatSummary>,
    total: usize
}

#[derive(Serialize)]
struct SearchOutput {
    results: Vec<BeatSummary>,
    query: String,
    total_matches: usize
}

#[derive(Serialize)]
struct ChainContext {
    id: String,
    name: String,
    /// One-based
    position: usize,
    total: usize,
    prev: Option<String>,
    next: Option<String>
}

#[derive(Serialize)]
struct ShowOutput<'a> {
    #[serde(flatten)]
    beat: &'a EnrichedBeat,
    age_days: i64,
    chains: Vec<ChainContext>
}

#[derive(Serialize)]
struct ViewOutput {
    beat_id: String,
    view_count: u32,
    last_viewed_at: Option<DateTime<Utc>>
}

pub fn list(args: ListArgs, app: &App) -> Result<()> {
    let (_, beats, _) = app.enriched()?;

    let mut selected: Vec<&EnrichedBeat> = beats
        .iter()
        .filter(|b| args.channel.is_none_or(|c| b.taxonomy.channel == c))
        .filter(|b| args.source.is_none_or(|s| b.taxonomy.source == s))
        .collect();
    match args.sort {
        SortKey::Created => selected.sort_by(|a, b| b.beat.created_at.cmp(&a.beat.created_at)),
        SortKey::Ripeness => selected.sort_by(|a, b| b.ripeness.total_cmp(&a.ripeness))
    }

    let total = selected.len();
    if args.limit > 0 {
        selected.truncate(args.limit);
    }
    output::print_json(&ListOutput {
        beats: selected.into_iter().map(BeatSummary::from).collect(),
        total
    })
}

pub fn search(args: SearchArgs, app: &App) -> Result<()> {
    let (_, beats, _) = app.enriched()?;

    let matches: Vec<&EnrichedBeat> = beats
        .iter()
        .filter(|b| matches_query(&b.beat, &args.query))
        .collect();
    let total_matches = matches.len();

    output::print_json(&SearchOutput {
        results: matches
            .into_iter()
            .take(args.limit)
            .map(BeatSummary::from)
            .collect(),
        query: args.query,
        total_matches
    })
}

pub fn show(args: ShowArgs, app: &App) -> Result<()> {
    let (_, beats, cache) = app.enriched()?;
    let beat = find(&beats, &args.id)?;

    let store = ChainStore::load(cache.chains);
    let chains = store
        .chains_for_beat(&args.id)
        .into_iter()
        .filter_map(|chain| {
            let (index, total) = store.beat_position(&chain.id, &args.id)?;
            let (prev, next) = store.adjacent_beats(&chain.id, &args.id);
            Some(ChainContext {
                id: chain.id.clone(),
                name: chain.name.clone(),
                position: index + 1,
                total,
                prev: prev.map(str::to_string),
                next: next.map(str::to_string)
            })
        })
        .collect();

    output::print_json(&ShowOutput {
        beat,
        age_days: beat.beat.age_days(Utc::now()),
        chains
    })
}

pub fn view(args: ViewArgs, app: &App) -> Result<()> {
    let (pipeline, beats, mut cache) = app.enriched()?;
    find(&beats, &args.id)?;

    let stat = record_view(&mut cache, &args.id, Utc::now());
    pipeline.save(&cache)?;

    output::print_json(&ViewOutput {
        beat_id: args.id,
        view_count: stat.view_count,
        last_viewed_at: stat.last_viewed_at
    })
}

pub(crate) fn find<'a>(beats: &'a [EnrichedBeat], id: &str) -> Result<&'a EnrichedBeat, PipelineError> {
    beats
        .iter()
        .find(|b| b.beat.id == id)
        .ok_or_else(|| PipelineError::BeatNotFound { id: id.to_string() })
}
