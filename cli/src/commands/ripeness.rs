use anyhow::Result;
use bt_core::{RipenessTier, Taxonomy};
use chrono::Utc;
use clap::Args;
use enrichment::{StaleReason, find_stale, stale_reasons};
use serde::Serialize;

use crate::app::App;
use crate::output::{self, PREVIEW_LEN};

const DEFAULT_SUGGESTION: &str = "Review and take action";

#[derive(Args)]
pub struct RipenessArgs {
    /// Beat ID
    pub id: String
}

#[derive(Args)]
pub struct RipeArgs {
    /// Maximum number of beats
    #[arg(short, long, default_value = "10")]
    pub limit: usize,

    /// Minimum ripeness score (0.0-1.0)
    #[arg(short, long, default_value = "0.0")]
    pub threshold: f64
}

#[derive(Args)]
pub struct StaleArgs {
    /// Maximum number of beats (0 for all)
    #[arg(short, long, default_value = "0")]
    pub limit: usize
}

#[derive(Serialize)]
struct Factors {
    age: f64,
    revisit: f64,
    connection: f64,
    action: f64,
    completeness: f64
}

#[derive(Serialize)]
struct BreakdownOutput {
    beat_id: String,
    score: f64,
    tier: RipenessTier,
    factors: Factors
}

#[derive(Serialize)]
struct RipeBeat {
    id: String,
    ripeness: f64,
    tier: RipenessTier,
    taxonomy: Taxonomy,
    preview: String
}

#[derive(Serialize)]
struct RipeOutput {
    beats: Vec<RipeBeat>,
    count: usize
}

#[derive(Serialize)]
struct StaleBeat {
    id: String,
    age_days: i64,
    view_count: u32,
    preview: String,
    reasons: Vec<StaleReason>,
    suggested_action: String
}

#[derive(Serialize)]
struct StaleOutput {
    stale_beats: Vec<StaleBeat>,
    count: usize
}

pub fn breakdown(args: RipenessArgs, app: &App) -> Result<()> {
    let (pipeline, _, cache) = app.enriched()?;
    let breakdown = pipeline.breakdown(&args.id, &cache, Utc::now())?;

    output::print_json(&BreakdownOutput {
        beat_id: args.id,
        score: breakdown.total,
        tier: breakdown.tier(),
        factors: Factors {
            age: breakdown.age,
            revisit: breakdown.revisit,
            connection: breakdown.connection,
            action: breakdown.action,
            completeness: breakdown.completeness
        }
    })
}

pub fn ripe(args: RipeArgs, app: &App) -> Result<()> {
    let (_, mut beats, _) = app.enriched()?;
    beats.retain(|b| b.ripeness >= args.threshold);
    beats.sort_by(|a, b| b.ripeness.total_cmp(&a.ripeness));
    beats.truncate(args.limit);

    let ripe: Vec<RipeBeat> = beats
        .iter()
        .map(|b| RipeBeat {
            id: b.beat.id.clone(),
            ripeness: b.ripeness,
            tier: b.tier,
            taxonomy: b.taxonomy,
            preview: b.beat.content_preview(PREVIEW_LEN)
        })
        .collect();
    output::print_json(&RipeOutput {
        count: ripe.len(),
        beats: ripe
    })
}

pub fn stale(args: StaleArgs, app: &App) -> Result<()> {
    let (_, beats, _) = app.enriched()?;
    let policy = app.stale_policy();
    let now = Utc::now();

    let mut stale: Vec<StaleBeat> = find_stale(&beats, now, &policy)
        .into_iter()
        .map(|b| {
            let reasons = stale_reasons(b, now, &policy);
            let suggested_action = reasons
                .first()
                .map_or_else(|| DEFAULT_SUGGESTION.to_string(), |r| r.suggestion.clone());
            StaleBeat {
                id: b.beat.id.clone(),
                age_days: b.beat.age_days(now),
                view_count: b.view_count,
                preview: b.beat.content_preview(PREVIEW_LEN),
                reasons,
                suggested_action
            }
        })
        .collect();
    if args.limit > 0 {
        stale.truncate(args.limit);
    }

    output::print_json(&StaleOutput {
        count: stale.len(),
        stale_beats: stale
    })
}
