use anyhow::Result;
use bt_core::{Channel, EnrichedBeat, RipenessTier, Source};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde::Serialize;

/// Characters of content shown in list output.
pub const PREVIEW_LEN: usize = 80;

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One beat in list-style output.
#[derive(Debug, Serialize)]
pub struct BeatSummary {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub channel: Channel,
    pub source: Source,
    pub ripeness: f64,
    pub tier: RipenessTier,
    pub view_count: u32,
    pub preview: String
}

impl From<&EnrichedBeat> for BeatSummary {
    fn from(beat: &EnrichedBeat) -> Self {
        Self {
            id: beat.beat.id.clone(),
            created_at: beat.beat.created_at,
            channel: beat.taxonomy.channel,
            source: beat.taxonomy.source,
            ripeness: beat.ripeness,
            tier: beat.tier,
            view_count: beat.view_count,
            preview: beat.beat.content_preview(PREVIEW_LEN)
        }
    }
}

/// Id and preview only.
#[derive(Debug, Serialize)]
pub struct BeatRef {
    pub id: String,
    pub preview: String
}

impl From<&EnrichedBeat> for BeatRef {
    fn from(beat: &EnrichedBeat) -> Self {
        Self {
            id: beat.beat.id.clone(),
            preview: beat.beat.content_preview(PREVIEW_LEN)
        }
    }
}

/// Rebuild progress on stderr. Hidden when quiet or when stderr is not a
/// terminal.
pub struct RebuildProgress {
    bar: ProgressBar,
    step: String
}

impl RebuildProgress {
    pub fn new(quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr())
        };
        let style = ProgressStyle::with_template("{msg:24} [{bar:30}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(style);
        Self {
            bar,
            step: String::new()
        }
    }

    pub fn update(&mut self, step: &str, current: usize, total: usize) {
        if self.step != step {
            self.step = step.to_string();
            self.bar.set_message(self.step.clone());
        }
        self.bar.set_length(total as u64);
        self.bar.set_position(current as u64);
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
