use std::collections::BTreeMap;

use anyhow::Result;
use bt_core::{Channel, Source};
use enrichment::TaxonomyStats;
use serde::Serialize;

use crate::app::App;
use crate::output;

#[derive(Serialize)]
struct StatsOutput {
    channels: BTreeMap<Channel, usize>,
    sources: BTreeMap<Source, usize>,
    total: usize
}

pub fn stats(app: &App) -> Result<()> {
    let (_, beats, _) = app.enriched()?;
    let stats = TaxonomyStats::from_taxonomies(beats.iter().map(|b| &b.taxonomy));
    output::print_json(&StatsOutput {
        channels: stats.by_channel,
        sources: stats.by_source,
        total: stats.total
    })
}
