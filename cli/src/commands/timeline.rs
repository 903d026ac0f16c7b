use std::collections::BTreeMap;

use anyhow::Result;
use bt_core::Channel;
use chrono::{DateTime, Duration, Utc};
use clap::Args;
use enrichment::{Zoom, build_timeline, find_gaps};
use serde::Serialize;

use crate::app::App;
use crate::output;

#[derive(Args)]
pub struct TimelineArgs {
    /// Bucket width (day, week, month, quarter)
    #[arg(short, long, default_value = "month")]
    pub zoom: Zoom
}

#[derive(Args)]
pub struct GapsArgs {
    /// Report gaps longer than this many days
    #[arg(short, long, default_value = "7")]
    pub days: i64,

    /// Bucket width used to find gaps
    #[arg(short, long, default_value = "day")]
    pub zoom: Zoom
}

#[derive(Serialize)]
struct BucketOutput {
    date: String,
    count: usize,
    beat_ids: Vec<String>,
    by_channel: BTreeMap<Channel, usize>
}

#[derive(Serialize)]
struct TimelineOutput {
    buckets: Vec<BucketOutput>,
    zoom_level: Zoom,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    max_count: usize
}

#[derive(Serialize)]
struct GapOutput {
    start: String,
    end: String,
    days: i64
}

#[derive(Serialize)]
struct GapsOutput {
    gaps: Vec<GapOutput>,
    threshold_days: i64
}

fn day(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

pub fn timeline(args: TimelineArgs, app: &App) -> Result<()> {
    let (_, beats, _) = app.enriched()?;
    let timeline = build_timeline(&beats, args.zoom);

    output::print_json(&TimelineOutput {
        max_count: timeline.max_beat_count(),
        zoom_level: timeline.zoom,
        start: timeline.start,
        end: timeline.end,
        buckets: timeline
            .buckets
            .into_iter()
            .map(|b| BucketOutput {
                date: day(b.date),
                count: b.beat_count,
                beat_ids: b.beat_ids,
                by_channel: b.by_channel
            })
            .collect()
    })
}

pub fn gaps(args: GapsArgs, app: &App) -> Result<()> {
    let (_, beats, _) = app.enriched()?;
    let timeline = build_timeline(&beats, args.zoom);

    let gaps = find_gaps(&timeline, Duration::days(args.days))
        .into_iter()
        .map(|g| GapOutput {
            start: day(g.from),
            end: day(g.to),
            days: g.days
        })
        .collect();
    output::print_json(&GapsOutput {
        gaps,
        threshold_days: args.days
    })
}
