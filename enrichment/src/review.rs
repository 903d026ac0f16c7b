//! Stale-beat detection for periodic review.
//!
//! A beat is stale when it is old, has not been looked at recently, and is
//! not connected to anything: no linked tasks and no chain.

use bt_core::EnrichedBeat;
use chrono::{DateTime, Duration, Utc};
use config::ReviewConfig;
use serde::Serialize;
use strum::{Display, EnumString};

/// Thresholds, in days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalePolicy {
    pub stale_after_days: i64,
    pub recent_view_days: i64,
    pub very_old_days: i64
}

impl Default for StalePolicy {
    fn default() -> Self {
        Self {
            stale_after_days: 30,
            recent_view_days: 14,
            very_old_days: 60
        }
    }
}

impl From<&ReviewConfig> for StalePolicy {
    fn from(config: &ReviewConfig) -> Self {
        Self {
            stale_after_days: config.stale_after_days,
            recent_view_days: config.recent_view_days,
            very_old_days: config.very_old_days
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StaleCode {
    VeryOld,
    Old,
    NeverViewed,
    NotRecentlyViewed,
    NoLinkedBeads,
    NotInChain
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaleReason {
    pub code: StaleCode,
    pub message: String,
    pub suggestion: String
}

impl StaleReason {
    fn new(code: StaleCode, message: String, suggestion: &str) -> Self {
        Self {
            code,
            message,
            suggestion: suggestion.to_string()
        }
    }
}

fn recently_viewed(beat: &EnrichedBeat, now: DateTime<Utc>, policy: &StalePolicy) -> bool {
    beat.view_count > 0
        && beat
            .last_viewed_at
            .is_some_and(|at| now - at < Duration::days(policy.recent_view_days))
}

pub fn is_stale(beat: &EnrichedBeat, now: DateTime<Utc>, policy: &StalePolicy) -> bool {
    now - beat.beat.created_at >= Duration::days(policy.stale_after_days)
        && !recently_viewed(beat, now, policy)
        && beat.beat.linked_beads.is_empty()
        && beat.chain_ids.is_empty()
}

/// Why a beat looks stale, most significant first.
pub fn stale_reasons(
    beat: &EnrichedBeat,
    now: DateTime<Utc>,
    policy: &StalePolicy
) -> Vec<StaleReason> {
    let mut reasons = Vec::new();
    let age_days = beat.beat.age_days(now);

    if age_days > policy.very_old_days {
        reasons.push(StaleReason::new(
            StaleCode::VeryOld,
            format!("Beat is {age_days} days old"),
            "Review for relevance, archive if outdated"
        ));
    } else if age_days > policy.stale_after_days {
        reasons.push(StaleReason::new(
            StaleCode::Old,
            format!("Beat is {age_days} days old"),
            "Consider converting to bead or archiving"
        ));
    }

    if beat.view_count == 0 {
        reasons.push(StaleReason::new(
            StaleCode::NeverViewed,
            "Never viewed in btv".to_string(),
            "Review content, may contain forgotten insight"
        ));
    } else if let Some(at) = beat.last_viewed_at {
        let days = (now - at).num_days();
        if days > policy.recent_view_days {
            reasons.push(StaleReason::new(
                StaleCode::NotRecentlyViewed,
                format!("Not viewed in {days} days"),
                "Revisit to assess current relevance"
            ));
        }
    }

    if beat.beat.linked_beads.is_empty() {
        reasons.push(StaleReason::new(
            StaleCode::NoLinkedBeads,
            "Not linked to any beads".to_string(),
            "Convert to bead if actionable"
        ));
    }

    if beat.chain_ids.is_empty() {
        reasons.push(StaleReason::new(
            StaleCode::NotInChain,
            "Not part of any thought chain".to_string(),
            "Add to chain if related to other beats"
        ));
    }

    reasons
}

pub fn find_stale<'a>(
    beats: &'a [EnrichedBeat],
    now: DateTime<Utc>,
    policy: &StalePolicy
) -> Vec<&'a EnrichedBeat> {
    beats.iter().filter(|b| is_stale(b, now, policy)).collect()
}
