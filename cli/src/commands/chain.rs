use anyhow::Result;
use bt_core::{Cache, Chain};
use clap::Args;
use enrichment::{ChainStore, Pipeline};
use errors::ChainError;
use serde::Serialize;

use crate::app::App;
use crate::commands::beats::find;
use crate::output;

#[derive(Args)]
pub struct ChainCreateArgs {
    /// Chain name
    #[arg(short, long)]
    pub name: String,

    /// Beat IDs in order
    pub beat_ids: Vec<String>
}

#[derive(Args)]
pub struct ChainBeatArgs {
    /// Chain ID or exact name
    pub chain: String,

    /// Beat ID
    pub beat_id: String
}

#[derive(Args)]
pub struct ChainRenameArgs {
    /// Chain ID or exact name
    pub chain: String,

    /// New name
    pub name: String
}

#[derive(Args)]
pub struct ChainDeleteArgs {
    /// Chain ID or exact name
    pub chain: String
}

#[derive(Serialize)]
struct ChainSummary {
    id: String,
    name: String,
    beat_count: usize,
    ripeness: f64
}

#[derive(Serialize)]
struct ChainsOutput {
    chains: Vec<ChainSummary>,
    count: usize
}

#[derive(Serialize)]
struct ChainOutput {
    success: bool,
    chain: Chain
}

#[derive(Serialize)]
struct MembershipOutput {
    success: bool,
    chain_id: String,
    beat_id: String,
    beat_count: usize
}

pub fn list(app: &App) -> Result<()> {
    let (_, _, cache) = app.enriched()?;
    let chains: Vec<ChainSummary> = cache
        .chains
        .iter()
        .map(|c| ChainSummary {
            id: c.id.clone(),
            name: c.name.clone(),
            beat_count: c.beat_ids.len(),
            ripeness: c.ripeness
        })
        .collect();
    output::print_json(&ChainsOutput {
        count: chains.len(),
        chains
    })
}

pub fn create(args: ChainCreateArgs, app: &App) -> Result<()> {
    let (pipeline, beats, cache) = app.enriched()?;
    for id in &args.beat_ids {
        find(&beats, id)?;
    }

    let chain = mutate(&pipeline, cache, |store| {
        Ok(store.create(&args.name, args.beat_ids.clone())?.id.clone())
    })?;
    output::print_json(&ChainOutput {
        success: true,
        chain
    })
}

pub fn add(args: ChainBeatArgs, app: &App) -> Result<()> {
    let (pipeline, beats, cache) = app.enriched()?;
    find(&beats, &args.beat_id)?;

    let chain = mutate(&pipeline, cache, |store| {
        let chain_id = resolve(store, &args.chain)?;
        store.add_beat(&chain_id, &args.beat_id)?;
        Ok(chain_id)
    })?;
    membership(chain, args.beat_id)
}

pub fn remove(args: ChainBeatArgs, app: &App) -> Result<()> {
    let (pipeline, _, cache) = app.enriched()?;

    let chain = mutate(&pipeline, cache, |store| {
        let chain_id = resolve(store, &args.chain)?;
        store.remove_beat(&chain_id, &args.beat_id)?;
        Ok(chain_id)
    })?;
    membership(chain, args.beat_id)
}

pub fn rename(args: ChainRenameArgs, app: &App) -> Result<()> {
    let (pipeline, _, cache) = app.enriched()?;

    let chain = mutate(&pipeline, cache, |store| {
        let chain_id = resolve(store, &args.chain)?;
        store.rename(&chain_id, &args.name)?;
        Ok(chain_id)
    })?;
    output::print_json(&ChainOutput {
        success: true,
        chain
    })
}

pub fn delete(args: ChainDeleteArgs, app: &App) -> Result<()> {
    let (pipeline, _, mut cache) = app.enriched()?;

    let mut store = ChainStore::load(std::mem::take(&mut cache.chains));
    let chain_id = resolve(&store, &args.chain)?;
    let removed = store.delete(&chain_id)?;
    cache.chains = store.into_chains();
    pipeline.save(&cache)?;

    output::print_json(&ChainOutput {
        success: true,
        chain: removed
    })
}

fn resolve(store: &ChainStore, id_or_name: &str) -> Result<String, ChainError> {
    store
        .resolve(id_or_name)
        .map(|c| c.id.clone())
        .ok_or_else(|| ChainError::NotFound {
            id: id_or_name.to_string()
        })
}

/// Apply `change` to the cache's chains, refresh chain ripeness, persist,
/// and return the chain whose id `change` yields.
fn mutate(
    pipeline: &Pipeline,
    mut cache: Cache,
    change: impl FnOnce(&mut ChainStore) -> Result<String, ChainError>
) -> Result<Chain> {
    let mut store = ChainStore::load(std::mem::take(&mut cache.chains));
    let chain_id = change(&mut store)?;
    store.refresh_ripeness(&cache.ripeness);

    let chain = store
        .get(&chain_id)
        .cloned()
        .ok_or_else(|| ChainError::NotFound {
            id: chain_id.clone()
        })?;
    cache.chains = store.into_chains();
    pipeline.save(&cache)?;
    Ok(chain)
}

fn membership(chain: Chain, beat_id: String) -> Result<()> {
    output::print_json(&MembershipOutput {
        success: true,
        beat_count: chain.beat_ids.len(),
        chain_id: chain.id,
        beat_id
    })
}
