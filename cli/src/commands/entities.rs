use std::collections::BTreeMap;

use anyhow::Result;
use bt_core::EntityType;
use clap::Args;
use enrichment::EntityIndex;
use serde::Serialize;

use crate::app::App;
use crate::output::{self, BeatRef};

#[derive(Args)]
pub struct EntitiesArgs {
    /// Entities per type
    #[arg(short, long, default_value = "10")]
    pub limit: usize,

    /// Only this type (person, tool, concept, project, organization)
    #[arg(long = "type")]
    pub entity_type: Option<EntityType>
}

#[derive(Args)]
pub struct EntityBeatsArgs {
    /// Entity name, any case
    pub name: String
}

#[derive(Serialize)]
struct EntityCount {
    name: String,
    beat_count: usize
}

#[derive(Serialize)]
struct EntityBeatsOutput {
    beats: Vec<BeatRef>,
    entity: String,
    count: usize
}

/// Plural output key for an entity type.
fn group_key(entity_type: EntityType) -> &'static str {
    match entity_type {
        EntityType::Person => "people",
        EntityType::Tool => "tools",
        EntityType::Concept => "concepts",
        EntityType::Project => "projects",
        EntityType::Organization => "organizations"
    }
}

pub fn top(args: EntitiesArgs, app: &App) -> Result<()> {
    let (_, _, cache) = app.enriched()?;
    let index = EntityIndex::new(cache.entities, cache.entity_index);

    let mut groups: BTreeMap<&'static str, Vec<EntityCount>> = BTreeMap::new();
    for (entity_type, entities) in index.top_by_type(args.limit) {
        if args.entity_type.is_some_and(|t| t != entity_type) {
            continue;
        }
        groups.insert(
            group_key(entity_type),
            entities
                .into_iter()
                .map(|e| EntityCount {
                    name: e.name.clone(),
                    beat_count: e.beat_ids.len()
                })
                .collect()
        );
    }
    output::print_json(&groups)
}

pub fn beats(args: EntityBeatsArgs, app: &App) -> Result<()> {
    let (_, beats, cache) = app.enriched()?;
    let index = EntityIndex::new(cache.entities, cache.entity_index);

    let ids = index.beat_ids_for(&args.name);
    let matched: Vec<BeatRef> = ids
        .iter()
        .filter_map(|id| beats.iter().find(|b| &b.beat.id == id))
        .map(BeatRef::from)
        .collect();

    output::print_json(&EntityBeatsOutput {
        count: matched.len(),
        beats: matched,
        entity: args.name
    })
}
